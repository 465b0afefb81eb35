//! Orientation sensor input.

use compass_core::SubscriptionHandle;
use nalgebra::{Matrix3, Quaternion, UnitQuaternion};

/// Quaternions shorter than this cannot be normalized meaningfully.
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Slack allowed on |xyz| <= 1 for rotation vectors without a `w` term.
const ROTATION_VECTOR_SLACK: f64 = 1e-6;

/// A raw reading from the rotation sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationSample {
    /// Rotation vector in the Android layout `[x, y, z, w]`, where `w` may be omitted.
    RotationVector {
        x: f64,
        y: f64,
        z: f64,
        w: Option<f64>,
    },
    /// Row-major 3x3 rotation matrix (device frame to world frame).
    Matrix([f64; 9]),
}

impl OrientationSample {
    pub fn rotation_vector(x: f64, y: f64, z: f64, w: Option<f64>) -> Self {
        Self::RotationVector { x, y, z, w }
    }

    /// Rotation matrix for this sample, or `None` when the reading is degenerate.
    pub fn rotation_matrix(&self) -> Option<Matrix3<f64>> {
        match *self {
            OrientationSample::RotationVector { x, y, z, w } => {
                if ![x, y, z].iter().all(|v| v.is_finite()) {
                    return None;
                }
                let w = match w {
                    Some(w) if w.is_finite() => w,
                    Some(_) => return None,
                    None => {
                        let remainder = 1.0 - (x * x + y * y + z * z);
                        if remainder < -ROTATION_VECTOR_SLACK {
                            return None;
                        }
                        remainder.max(0.0).sqrt()
                    }
                };
                let unit =
                    UnitQuaternion::try_new(Quaternion::new(w, x, y, z), MIN_QUATERNION_NORM)?;
                Some(unit.to_rotation_matrix().into_inner())
            }
            OrientationSample::Matrix(values) => {
                if !values.iter().all(|v| v.is_finite()) {
                    return None;
                }
                Some(Matrix3::from_row_slice(&values))
            }
        }
    }
}

/// Rotation of the screen relative to the device's natural orientation.
///
/// The device is assumed to be held flat; each rotation swaps the device X/Y
/// axes the way the display does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl DisplayRotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Self::Rotation0),
            90 => Some(Self::Rotation90),
            180 => Some(Self::Rotation180),
            270 => Some(Self::Rotation270),
            _ => None,
        }
    }

    /// Remap the device axes of `rotation` so that X/Y follow the screen.
    pub fn remap(&self, rotation: &Matrix3<f64>) -> Matrix3<f64> {
        let x = rotation.column(0).into_owned();
        let y = rotation.column(1).into_owned();
        let z = rotation.column(2).into_owned();
        match self {
            DisplayRotation::Rotation0 => *rotation,
            // (AXIS_Y, AXIS_MINUS_X)
            DisplayRotation::Rotation90 => Matrix3::from_columns(&[y, -x, z]),
            // (AXIS_MINUS_X, AXIS_MINUS_Y)
            DisplayRotation::Rotation180 => Matrix3::from_columns(&[-x, -y, z]),
            // (AXIS_MINUS_Y, AXIS_X)
            DisplayRotation::Rotation270 => Matrix3::from_columns(&[-y, x, z]),
        }
    }
}

/// Callback invoked for every sensor reading.
pub type SampleCallback = Box<dyn Fn(OrientationSample) + Send + Sync>;

/// Push-based orientation sensor provided by the platform layer.
pub trait OrientationSource: Send + Sync + 'static {
    /// Start delivering samples to `on_sample` until unsubscribed.
    fn subscribe_orientation(&self, on_sample: SampleCallback) -> SubscriptionHandle;

    fn unsubscribe_orientation(&self, handle: SubscriptionHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_rotation_vector() {
        let sample = OrientationSample::rotation_vector(0.0, 0.0, 0.0, None);
        let m = sample.rotation_matrix().unwrap();
        assert!((m - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_rotation_vector_derives_w() {
        let half = (30.0_f64.to_radians() / 2.0).sin();
        let explicit = OrientationSample::rotation_vector(
            0.0,
            0.0,
            half,
            Some((30.0_f64.to_radians() / 2.0).cos()),
        );
        let implicit = OrientationSample::rotation_vector(0.0, 0.0, half, None);
        let a = explicit.rotation_matrix().unwrap();
        let b = implicit.rotation_matrix().unwrap();
        assert!((a - b).norm() < 1e-9);
    }

    #[test]
    fn test_degenerate_rotation_vectors() {
        assert!(OrientationSample::rotation_vector(0.0, 0.0, 0.0, Some(0.0))
            .rotation_matrix()
            .is_none());
        assert!(OrientationSample::rotation_vector(1.0, 1.0, 0.0, None)
            .rotation_matrix()
            .is_none());
        assert!(OrientationSample::rotation_vector(f64::NAN, 0.0, 0.0, None)
            .rotation_matrix()
            .is_none());
        assert!(OrientationSample::rotation_vector(0.0, 0.0, 0.0, Some(f64::INFINITY))
            .rotation_matrix()
            .is_none());
    }

    #[test]
    fn test_matrix_rejects_non_finite() {
        let mut values = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        assert!(OrientationSample::Matrix(values).rotation_matrix().is_some());
        values[4] = f64::NAN;
        assert!(OrientationSample::Matrix(values).rotation_matrix().is_none());
    }

    #[test]
    fn test_rotation_0_is_identity_remap() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert_eq!(DisplayRotation::Rotation0.remap(&m), m);
    }

    #[test]
    fn test_rotation_180_negates_horizontal_axes() {
        let m = Matrix3::identity();
        let remapped = DisplayRotation::Rotation180.remap(&m);
        assert_eq!(remapped[(0, 0)], -1.0);
        assert_eq!(remapped[(1, 1)], -1.0);
        assert_eq!(remapped[(2, 2)], 1.0);
    }

    #[test]
    fn test_display_rotation_from_degrees() {
        assert_eq!(DisplayRotation::from_degrees(90), Some(DisplayRotation::Rotation90));
        assert_eq!(DisplayRotation::from_degrees(45), None);
    }
}
