use super::Vector3;

/// Unit quaternion in (w, x, y, z) order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Row-major 3x3 rotation matrix for this quaternion
    pub fn rotation_matrix(&self) -> [f32; 9] {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        [
            1.0 - 2.0 * (yy + zz),
            2.0 * (xy + wz),
            2.0 * (xz - wy),
            2.0 * (xy - wz),
            1.0 - 2.0 * (xx + zz),
            2.0 * (yz + wx),
            2.0 * (xz + wy),
            2.0 * (yz - wx),
            1.0 - 2.0 * (xx + yy),
        ]
    }
}

/// Gradient-descent orientation filter (Madgwick, IMU variant without a
/// magnetometer).
#[derive(Debug, Clone)]
pub struct MotionSensorFilter {
    /// Seconds elapsed since the previous sample
    pub sample_period: f32,
    /// Algorithm gain
    pub beta: f32,
    quaternion: Quaternion,
}

impl Default for MotionSensorFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSensorFilter {
    pub fn new() -> Self {
        Self {
            sample_period: 1.0 / 60.0,
            beta: 0.1,
            quaternion: Quaternion::IDENTITY,
        }
    }

    pub fn quaternion(&self) -> Quaternion {
        self.quaternion
    }

    /// Update the estimate from an accelerometer sample (any unit) and a
    /// gyroscope sample in radians per second.
    pub fn update(&mut self, accel: Vector3, gyro: Vector3) {
        let Quaternion {
            w: q0,
            x: q1,
            y: q2,
            z: q3,
        } = self.quaternion;

        // A zero-length accelerometer vector carries no attitude information
        let norm = accel.length();
        if norm == 0.0 {
            return;
        }
        let a = accel / norm;

        let q2x0 = 2.0 * q0;
        let q2x1 = 2.0 * q1;
        let q2x2 = 2.0 * q2;
        let q2x3 = 2.0 * q3;
        let q4x0 = 4.0 * q0;
        let q4x1 = 4.0 * q1;
        let q4x2 = 4.0 * q2;
        let q8x1 = 8.0 * q1;
        let q8x2 = 8.0 * q2;
        let q0q0 = q0 * q0;
        let q1q1 = q1 * q1;
        let q2q2 = q2 * q2;
        let q3q3 = q3 * q3;

        let mut s0 = q4x0 * q2q2 + q2x2 * a.x + q4x0 * q1q1 - q2x1 * a.y;
        let mut s1 = q4x1 * q3q3 - q2x3 * a.x + 4.0 * q0q0 * q1 - q2x0 * a.y - q4x1
            + q8x1 * q1q1
            + q8x1 * q2q2
            + q4x1 * a.z;
        let mut s2 = 4.0 * q0q0 * q2 + q2x0 * a.x + q4x2 * q3q3 - q2x3 * a.y - q4x2
            + q8x2 * q1q1
            + q8x2 * q2q2
            + q4x2 * a.z;
        let mut s3 = 4.0 * q1q1 * q3 - q2x1 * a.x + 4.0 * q2q2 * q3 - q2x2 * a.y;

        let s_norm = (s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3).sqrt();
        if s_norm > 0.0 {
            s0 /= s_norm;
            s1 /= s_norm;
            s2 /= s_norm;
            s3 /= s_norm;
        }

        let (gx, gy, gz) = (gyro.x, gyro.y, gyro.z);
        let dot0 = 0.5 * (-q1 * gx - q2 * gy - q3 * gz) - self.beta * s0;
        let dot1 = 0.5 * (q0 * gx + q2 * gz - q3 * gy) - self.beta * s1;
        let dot2 = 0.5 * (q0 * gy - q1 * gz + q3 * gx) - self.beta * s2;
        let dot3 = 0.5 * (q0 * gz + q1 * gy - q2 * gx) - self.beta * s3;

        let w = q0 + dot0 * self.sample_period;
        let x = q1 + dot1 * self.sample_period;
        let y = q2 + dot2 * self.sample_period;
        let z = q3 + dot3 * self.sample_period;

        let q_norm = (w * w + x * x + y * y + z * z).sqrt();
        if q_norm == 0.0 {
            return;
        }
        self.quaternion = Quaternion {
            w: w / q_norm,
            x: x / q_norm,
            y: y / q_norm,
            z: z / q_norm,
        };
    }
}
