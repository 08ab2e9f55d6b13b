pub mod codes;
pub mod driver;
