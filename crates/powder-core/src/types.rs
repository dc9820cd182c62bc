//! Spatial and common types

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A 3D vector
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Self = Self {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };
    pub const UP: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const DOWN: Self = Self {
        x: 0.0,
        y: -1.0,
        z: 0.0,
    };
    pub const FORWARD: Self = Self {
        x: 0.0,
        y: 0.0,
        z: -1.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(arr: [f32; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            *self / len
        } else {
            Self::ZERO
        }
    }

    /// Unit vector in the same direction, or `None` when shorter than `min_len`.
    ///
    /// Every direction derived from simulation state goes through this so a
    /// near-zero vector never turns into NaN.
    pub fn try_normalized(&self, min_len: f32) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > min_len {
            Some(*self / len)
        } else {
            None
        }
    }

    /// Unit vector, or `fallback` when degenerate
    pub fn normalized_or(&self, fallback: Self) -> Self {
        self.try_normalized(1e-6).unwrap_or(fallback)
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Remove the component along `normal` (assumed unit length)
    pub fn project_on_plane(&self, normal: &Self) -> Self {
        *self - *normal * self.dot(normal)
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        *self + (*other - *self) * t
    }

    /// Rotate around the world Y axis (right-handed, counter-clockwise seen from above)
    pub fn rotate_y(&self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            x: self.x * c + self.z * s,
            y: self.y,
            z: -self.x * s + self.z * c,
        }
    }

    /// Distance in the XZ plane, ignoring height
    pub fn distance_xz(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// A 3D transform with position, quaternion rotation and scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation quaternion [x, y, z, w]
    pub rotation: [f32; 4],
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, q: [f32; 4]) -> Self {
        self.rotation = q;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation around the world Y axis by `yaw` radians
    pub fn yaw_rotation(yaw: f32) -> [f32; 4] {
        let (s, c) = (yaw * 0.5).sin_cos();
        [0.0, s, 0.0, c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let v1 = Vec3::new(1.0, 2.0, 3.0);
        let v2 = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(v1 + v2, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(v2 - v1, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(v1 * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(-v1, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(v2 / 2.0, Vec3::new(2.0, 2.5, 3.0));
    }

    #[test]
    fn try_normalized_rejects_tiny_vectors() {
        assert!(Vec3::new(1e-9, 0.0, 0.0).try_normalized(1e-6).is_none());
        assert!(Vec3::new(f32::NAN, 0.0, 0.0).try_normalized(1e-6).is_none());
        let n = Vec3::new(0.0, 3.0, 4.0).try_normalized(1e-6).unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec3::ZERO.normalized_or(Vec3::UP), Vec3::UP);
    }

    #[test]
    fn projection_removes_normal_component() {
        let n = Vec3::new(0.0, 1.0, 1.0).normalized();
        let v = Vec3::new(2.0, -1.0, 3.0);
        let p = v.project_on_plane(&n);
        assert!(p.dot(&n).abs() < 1e-5);
    }

    #[test]
    fn rotate_y_turns_forward_to_the_left() {
        let left = Vec3::FORWARD.rotate_y(std::f32::consts::FRAC_PI_2);
        assert!((left.x + 1.0).abs() < 1e-6);
        assert!(left.z.abs() < 1e-6);
    }

    #[test]
    fn yaw_rotation_matches_rotate_y() {
        let yaw = 0.7;
        let [x, y, z, w] = Transform::yaw_rotation(yaw);
        // v' = v + 2w(q x v) + 2q x (q x v)
        let q = Vec3::new(x, y, z);
        let v = Vec3::FORWARD;
        let t = q.cross(&v) * 2.0;
        let rotated = v + t * w + q.cross(&t);
        let expected = Vec3::FORWARD.rotate_y(yaw);
        assert!((rotated - expected).length() < 1e-5);
    }

    #[test]
    fn test_transform_default() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.scale, Vec3::ONE);
    }
}
