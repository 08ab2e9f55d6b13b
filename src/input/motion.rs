pub mod filter;

use std::ops::{Add, Div, Mul, Neg, Sub};

use self::filter::MotionSensorFilter;

/// Standard gravity in m/s²
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Three-axis sample used for both accelerometer and gyroscope data
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn to_radians(self) -> Self {
        Self::new(self.x.to_radians(), self.y.to_radians(), self.z.to_radians())
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Self) -> Self::Output {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f32) -> Self::Output {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f32> for Vector3 {
    type Output = Vector3;

    fn div(self, rhs: f32) -> Self::Output {
        Vector3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Self::Output {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

/// Integrates one 6-axis motion stream over time, producing the values the
/// console expects: acceleration, angular velocity, accumulated rotation and
/// an orientation estimate.
#[derive(Debug, Clone)]
pub struct MotionInput {
    timestamp: u64,
    accelerometer: Vector3,
    gyroscope: Vector3,
    rotation: Vector3,
    filter: MotionSensorFilter,
}

impl Default for MotionInput {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionInput {
    pub fn new() -> Self {
        Self {
            timestamp: 0,
            accelerometer: Vector3::ZERO,
            gyroscope: Vector3::ZERO,
            rotation: Vector3::ZERO,
            filter: MotionSensorFilter::new(),
        }
    }

    /// Feed a new sample. `accel` is in g, `gyro` in degrees per second and
    /// `timestamp` in microseconds. The first sample only establishes the
    /// time base.
    pub fn update(
        &mut self,
        accel: Vector3,
        gyro: Vector3,
        timestamp: u64,
        sensitivity: i32,
        deadzone: f32,
    ) {
        if self.timestamp != 0 {
            self.accelerometer = -accel;

            let gyro = if gyro.length() < deadzone {
                Vector3::ZERO
            } else {
                gyro
            };
            let gyro = gyro * (sensitivity as f32 / 100.0);
            self.gyroscope = gyro;

            let delta = timestamp.abs_diff(self.timestamp) as f32 / 1_000_000.0;
            self.rotation = self.rotation + gyro * delta;

            self.filter.sample_period = delta;
            self.filter.update(accel, gyro.to_radians());
        }

        self.timestamp = timestamp;
    }

    /// Forget the time base and integrated rotation
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn accelerometer(&self) -> Vector3 {
        self.accelerometer
    }

    pub fn gyroscope(&self) -> Vector3 {
        self.gyroscope
    }

    pub fn rotation(&self) -> Vector3 {
        self.rotation
    }

    /// Row-major 3x3 rotation matrix of the current orientation estimate
    pub fn orientation(&self) -> [f32; 9] {
        self.filter.quaternion().rotation_matrix()
    }
}
