//! Heading fusion for the compass.
//!
//! Turns rotation-sensor readings into a normalized heading, corrected to
//! true north with the magnetic declination at the last known fix.

pub mod cardinal;
pub mod declination;
mod wmm2025;
pub mod fusion;
pub mod sample;

pub use cardinal::{normalize_degrees, Cardinal, Heading, HeadingReference};
pub use declination::{DeclinationModel, FixedDeclination, WorldMagneticModel};
pub use fusion::{compute_heading, raw_azimuth, HeadingFusion};
pub use sample::{DisplayRotation, OrientationSample, OrientationSource, SampleCallback};
