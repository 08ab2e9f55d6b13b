pub mod controller;
pub mod hle;
pub mod manager;
#[cfg(test)]
mod manager_test;
pub mod service;
