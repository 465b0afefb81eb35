//! Orientation sample + last fix -> heading.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use compass_core::GeographicFix;

use crate::cardinal::{normalize_degrees, Heading, HeadingReference};
use crate::declination::DeclinationModel;
use crate::sample::{DisplayRotation, OrientationSample};

/// Below this the horizontal projection of the device Y axis has no usable direction.
const MIN_HORIZONTAL_MAGNITUDE: f64 = 1e-6;

/// Magnetic azimuth in [0, 360) for a sample, or `None` if the sample is degenerate.
///
/// 0° means the top of the screen points at magnetic north; angles grow clockwise.
pub fn raw_azimuth(sample: &OrientationSample, rotation: DisplayRotation) -> Option<f64> {
    let matrix = rotation.remap(&sample.rotation_matrix()?);
    let (east, north) = (matrix[(0, 1)], matrix[(1, 1)]);
    if east.hypot(north) < MIN_HORIZONTAL_MAGNITUDE {
        return None;
    }
    Some(normalize_degrees(east.atan2(north).to_degrees()))
}

/// Heading for a single sample.
///
/// With a fix the result is declination-corrected and marked true-north;
/// without one the magnetic azimuth is returned as-is.
pub fn compute_heading(
    sample: &OrientationSample,
    fix: Option<&GeographicFix>,
    at: DateTime<Utc>,
    model: &dyn DeclinationModel,
    rotation: DisplayRotation,
) -> Option<Heading> {
    let azimuth = raw_azimuth(sample, rotation)?;

    let Some(fix) = fix else {
        return Some(Heading::new(azimuth, HeadingReference::Magnetic));
    };

    let declination = model.declination_degrees(
        fix.latitude,
        fix.longitude,
        fix.altitude_meters.unwrap_or(0.0),
        at,
    );
    if !declination.is_finite() {
        tracing::warn!(
            latitude = fix.latitude,
            longitude = fix.longitude,
            "Declination model returned a non-finite value; using magnetic heading"
        );
        return Some(Heading::new(azimuth, HeadingReference::Magnetic));
    }

    Some(Heading::new(azimuth + declination, HeadingReference::True))
}

/// Stateful wrapper that keeps the last stable heading.
pub struct HeadingFusion {
    model: Arc<dyn DeclinationModel>,
    rotation: DisplayRotation,
    current: Heading,
}

impl HeadingFusion {
    pub fn new(model: Arc<dyn DeclinationModel>, rotation: DisplayRotation) -> Self {
        Self {
            model,
            rotation,
            current: Heading::default(),
        }
    }

    pub fn current(&self) -> Heading {
        self.current
    }

    pub fn set_rotation(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
    }

    /// Fold a sample in. Degenerate samples leave the previous heading in place.
    pub fn update(
        &mut self,
        sample: &OrientationSample,
        fix: Option<&GeographicFix>,
        at: DateTime<Utc>,
    ) -> Heading {
        match compute_heading(sample, fix, at, self.model.as_ref(), self.rotation) {
            Some(heading) => self.current = heading,
            None => tracing::trace!("Ignoring degenerate orientation sample"),
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardinal::Cardinal;
    use crate::declination::FixedDeclination;

    const TOLERANCE: f64 = 1e-6;

    /// Flat device turned so that its top points `degrees` clockwise from north.
    fn facing(degrees: f64) -> OrientationSample {
        let half = (-degrees).to_radians() / 2.0;
        OrientationSample::rotation_vector(0.0, 0.0, half.sin(), Some(half.cos()))
    }

    fn angle_diff(a: f64, b: f64) -> f64 {
        let d = normalize_degrees(a - b);
        d.min(360.0 - d)
    }

    #[test]
    fn test_identity_faces_north() {
        let identity = OrientationSample::rotation_vector(0.0, 0.0, 0.0, None);
        let azimuth = raw_azimuth(&identity, DisplayRotation::Rotation0).unwrap();
        assert!(angle_diff(azimuth, 0.0) < TOLERANCE);

        let matrix = OrientationSample::Matrix([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let azimuth = raw_azimuth(&matrix, DisplayRotation::Rotation0).unwrap();
        assert!(angle_diff(azimuth, 0.0) < TOLERANCE);
    }

    #[test]
    fn test_azimuth_follows_device_turn() {
        for deg in [10.0, 45.0, 90.0, 179.0, 270.0, 359.0] {
            let azimuth = raw_azimuth(&facing(deg), DisplayRotation::Rotation0).unwrap();
            assert!(angle_diff(azimuth, deg) < TOLERANCE, "{} vs {}", azimuth, deg);
        }
    }

    #[test]
    fn test_azimuth_always_in_range() {
        let mut deg = -720.0;
        while deg < 720.0 {
            let azimuth = raw_azimuth(&facing(deg), DisplayRotation::Rotation0).unwrap();
            assert!((0.0..360.0).contains(&azimuth));
            deg += 7.3;
        }
    }

    #[test]
    fn test_display_rotation_offsets_azimuth() {
        let sample = facing(100.0);
        let r90 = raw_azimuth(&sample, DisplayRotation::Rotation90).unwrap();
        let r180 = raw_azimuth(&sample, DisplayRotation::Rotation180).unwrap();
        let r270 = raw_azimuth(&sample, DisplayRotation::Rotation270).unwrap();
        assert!(angle_diff(r90, 10.0) < TOLERANCE, "{}", r90);
        assert!(angle_diff(r180, 280.0) < TOLERANCE, "{}", r180);
        assert!(angle_diff(r270, 190.0) < TOLERANCE, "{}", r270);
    }

    #[test]
    fn test_zero_matrix_is_degenerate() {
        let zero = OrientationSample::Matrix([0.0; 9]);
        assert!(raw_azimuth(&zero, DisplayRotation::Rotation0).is_none());
    }

    #[test]
    fn test_without_fix_heading_is_magnetic() {
        let heading = compute_heading(
            &facing(30.0),
            None,
            Utc::now(),
            &FixedDeclination(13.0),
            DisplayRotation::Rotation0,
        )
        .unwrap();
        assert!(angle_diff(heading.degrees, 30.0) < TOLERANCE);
        assert_eq!(heading.reference, HeadingReference::Magnetic);
    }

    #[test]
    fn test_declination_is_additive() {
        let fix = GeographicFix::new(37.7749, -122.4194, Utc::now());
        let model = FixedDeclination(13.0);
        let now = Utc::now();
        let a = compute_heading(&facing(20.0), Some(&fix), now, &model, DisplayRotation::Rotation0)
            .unwrap();
        let b = compute_heading(&facing(110.0), Some(&fix), now, &model, DisplayRotation::Rotation0)
            .unwrap();
        assert!(angle_diff(b.degrees - a.degrees, 90.0) < TOLERANCE);
        assert!(a.is_true_north() && b.is_true_north());
    }

    #[test]
    fn test_declination_wraps_past_north() {
        let fix = GeographicFix::new(0.0, 0.0, Utc::now());
        let heading = compute_heading(
            &facing(5.0),
            Some(&fix),
            Utc::now(),
            &FixedDeclination(-10.0),
            DisplayRotation::Rotation0,
        )
        .unwrap();
        assert!(angle_diff(heading.degrees, 355.0) < TOLERANCE);
        assert_eq!(heading.cardinal, Cardinal::N);
    }

    #[test]
    fn test_non_finite_declination_falls_back_to_magnetic() {
        let fix = GeographicFix::new(0.0, 0.0, Utc::now());
        let heading = compute_heading(
            &facing(40.0),
            Some(&fix),
            Utc::now(),
            &FixedDeclination(f64::NAN),
            DisplayRotation::Rotation0,
        )
        .unwrap();
        assert!(angle_diff(heading.degrees, 40.0) < TOLERANCE);
        assert_eq!(heading.reference, HeadingReference::Magnetic);
    }

    #[test]
    fn test_fusion_retains_previous_heading_on_degenerate_input() {
        let mut fusion = HeadingFusion::new(Arc::new(FixedDeclination(0.0)), DisplayRotation::Rotation0);
        let first = fusion.update(&facing(135.0), None, Utc::now());
        assert_eq!(first.cardinal, Cardinal::SE);

        let after_zero = fusion.update(&OrientationSample::Matrix([0.0; 9]), None, Utc::now());
        assert_eq!(after_zero, first);

        let after_nan = fusion.update(
            &OrientationSample::rotation_vector(f64::NAN, 0.0, 0.0, None),
            None,
            Utc::now(),
        );
        assert_eq!(after_nan, first);
        assert!(after_nan.degrees.is_finite());
    }

    #[test]
    fn test_fusion_starts_at_north() {
        let fusion = HeadingFusion::new(Arc::new(FixedDeclination(0.0)), DisplayRotation::Rotation0);
        assert_eq!(fusion.current().degrees, 0.0);
        assert_eq!(fusion.current().cardinal, Cardinal::N);
    }
}
