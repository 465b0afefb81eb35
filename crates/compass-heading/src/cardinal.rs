use serde::{Deserialize, Serialize};

/// Wrap any angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// One of the eight compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cardinal {
    #[default]
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Cardinal {
    const ALL: [Cardinal; 8] = [
        Cardinal::N,
        Cardinal::NE,
        Cardinal::E,
        Cardinal::SE,
        Cardinal::S,
        Cardinal::SW,
        Cardinal::W,
        Cardinal::NW,
    ];

    /// Nearest compass point: 45° sectors centred on each point, 360 wraps to N.
    pub fn from_degrees(degrees: f64) -> Self {
        if !degrees.is_finite() {
            return Cardinal::N;
        }
        let index = (normalize_degrees(degrees) / 45.0).round() as usize % 8;
        Self::ALL[index]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cardinal::N => "N",
            Cardinal::NE => "NE",
            Cardinal::E => "E",
            Cardinal::SE => "SE",
            Cardinal::S => "S",
            Cardinal::SW => "SW",
            Cardinal::W => "W",
            Cardinal::NW => "NW",
        }
    }
}

impl std::fmt::Display for Cardinal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which north a heading is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HeadingReference {
    /// Declination-corrected, geographic north
    True,
    /// Raw sensor north, no fix available yet
    #[default]
    Magnetic,
}

/// A normalized compass heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Heading {
    /// Always within [0, 360)
    pub degrees: f64,
    pub cardinal: Cardinal,
    pub reference: HeadingReference,
}

impl Heading {
    pub fn new(degrees: f64, reference: HeadingReference) -> Self {
        let degrees = normalize_degrees(degrees);
        Self {
            degrees,
            cardinal: Cardinal::from_degrees(degrees),
            reference,
        }
    }

    pub fn is_true_north(&self) -> bool {
        self.reference == HeadingReference::True
    }
}
