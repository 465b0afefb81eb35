//! Magnetic declination models.
//!
//! Declination is the angle from magnetic north to true north, positive when
//! magnetic north lies east of true north. It is added to a magnetic azimuth
//! to obtain a true heading.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::wmm2025::{COEFFICIENTS, EPOCH_YEAR, MAX_DEGREE};

/// Source of magnetic declination for a position and time.
pub trait DeclinationModel: Send + Sync {
    /// Declination in degrees, east positive.
    fn declination_degrees(
        &self,
        latitude: f64,
        longitude: f64,
        altitude_meters: f64,
        at: DateTime<Utc>,
    ) -> f64;
}

/// A constant declination, for configured overrides and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDeclination(pub f64);

impl DeclinationModel for FixedDeclination {
    fn declination_degrees(&self, _: f64, _: f64, _: f64, _: DateTime<Utc>) -> f64 {
        self.0
    }
}

/// WGS-84 semi-major axis (km).
const WGS84_A: f64 = 6378.137;
/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Geomagnetic reference radius (km).
const REFERENCE_RADIUS: f64 = 6371.2;

/// Secular variation is only extrapolated this far from the epoch.
const MAX_EXTRAPOLATION_YEARS: f64 = 10.0;

/// Keeps the east component finite at the geographic poles.
const MIN_SIN_COLATITUDE: f64 = 1e-10;

const SIZE: usize = MAX_DEGREE + 1;
type Table = [[f64; SIZE]; SIZE];

/// The World Magnetic Model (WMM2025), a degree-12 spherical-harmonic model
/// of the main geomagnetic field.
///
/// Coefficients are stored pre-multiplied by their Schmidt factors so the
/// evaluation works with unnormalized Legendre functions. Positions are
/// geodetic (WGS-84); secular variation is applied linearly from 2025.0.
#[derive(Debug, Clone)]
pub struct WorldMagneticModel {
    g: Table,
    h: Table,
    g_dot: Table,
    h_dot: Table,
}

impl WorldMagneticModel {
    pub fn new() -> Self {
        let schmidt = schmidt_factors();
        let mut model = Self {
            g: [[0.0; SIZE]; SIZE],
            h: [[0.0; SIZE]; SIZE],
            g_dot: [[0.0; SIZE]; SIZE],
            h_dot: [[0.0; SIZE]; SIZE],
        };
        for &(n, m, g, h, g_dot, h_dot) in COEFFICIENTS.iter() {
            let s = schmidt[n][m];
            model.g[n][m] = g * s;
            model.h[n][m] = h * s;
            model.g_dot[n][m] = g_dot * s;
            model.h_dot[n][m] = h_dot * s;
        }
        model
    }

    /// Northward, eastward and downward field (nT) in the geodetic frame.
    pub fn field(
        &self,
        latitude: f64,
        longitude: f64,
        altitude_meters: f64,
        at: DateTime<Utc>,
    ) -> (f64, f64, f64) {
        let dt = (decimal_year(at) - EPOCH_YEAR)
            .clamp(-MAX_EXTRAPOLATION_YEARS, MAX_EXTRAPOLATION_YEARS);

        let (radius, geocentric_lat) = geocentric(latitude, altitude_meters / 1000.0);
        let colatitude = std::f64::consts::FRAC_PI_2 - geocentric_lat;
        let cos_t = colatitude.cos();
        let sin_t = colatitude.sin().max(MIN_SIN_COLATITUDE);
        let (p, dp) = legendre(cos_t, sin_t);

        let lon = longitude.to_radians();
        let ratio = REFERENCE_RADIUS / radius;
        let (mut north, mut east, mut down) = (0.0, 0.0, 0.0);

        for n in 1..=MAX_DEGREE {
            let scale = ratio.powi(n as i32 + 2);
            for m in 0..=n {
                let g = self.g[n][m] + dt * self.g_dot[n][m];
                let h = self.h[n][m] + dt * self.h_dot[n][m];
                let (sin_ml, cos_ml) = (m as f64 * lon).sin_cos();
                let radial = g * cos_ml + h * sin_ml;

                north += scale * radial * dp[n][m];
                east += scale * m as f64 * (g * sin_ml - h * cos_ml) * p[n][m];
                down -= scale * (n as f64 + 1.0) * radial * p[n][m];
            }
        }
        east /= sin_t;

        // Rotate from geocentric to geodetic
        let psi = geocentric_lat - latitude.to_radians();
        let (sin_psi, cos_psi) = psi.sin_cos();
        (
            north * cos_psi - down * sin_psi,
            east,
            north * sin_psi + down * cos_psi,
        )
    }
}

impl Default for WorldMagneticModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclinationModel for WorldMagneticModel {
    fn declination_degrees(
        &self,
        latitude: f64,
        longitude: f64,
        altitude_meters: f64,
        at: DateTime<Utc>,
    ) -> f64 {
        let (north, east, _) = self.field(latitude, longitude, altitude_meters, at);
        if north == 0.0 && east == 0.0 {
            return 0.0;
        }
        east.atan2(north).to_degrees()
    }
}

/// Geocentric radius (km) and latitude (radians) of a geodetic position.
fn geocentric(latitude: f64, altitude_km: f64) -> (f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let prime_vertical = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let p = (prime_vertical + altitude_km) * cos_lat;
    let z = (prime_vertical * (1.0 - e2) + altitude_km) * sin_lat;
    let radius = p.hypot(z);
    (radius, (z / radius).asin())
}

/// Schmidt semi-normalization factors relative to Gauss-normalized functions.
fn schmidt_factors() -> Table {
    let mut s = [[0.0; SIZE]; SIZE];
    s[0][0] = 1.0;
    for n in 1..SIZE {
        s[n][0] = s[n - 1][0] * (2 * n - 1) as f64 / n as f64;
        for m in 1..=n {
            let delta = if m == 1 { 2.0 } else { 1.0 };
            s[n][m] = s[n][m - 1] * ((n - m + 1) as f64 * delta / (n + m) as f64).sqrt();
        }
    }
    s
}

/// Gauss-normalized associated Legendre functions and their colatitude
/// derivatives.
fn legendre(cos_t: f64, sin_t: f64) -> (Table, Table) {
    let mut p = [[0.0; SIZE]; SIZE];
    let mut dp = [[0.0; SIZE]; SIZE];
    p[0][0] = 1.0;
    for n in 1..SIZE {
        for m in 0..=n {
            if m == n {
                p[n][m] = sin_t * p[n - 1][m - 1];
                dp[n][m] = sin_t * dp[n - 1][m - 1] + cos_t * p[n - 1][m - 1];
            } else {
                let (p2, dp2, k) = if n >= 2 {
                    let k = ((n - 1) * (n - 1)) as f64 - (m * m) as f64;
                    let k = k / ((2 * n - 1) * (2 * n - 3)) as f64;
                    (p[n - 2][m], dp[n - 2][m], k)
                } else {
                    (0.0, 0.0, 0.0)
                };
                p[n][m] = cos_t * p[n - 1][m] - k * p2;
                dp[n][m] = cos_t * dp[n - 1][m] - sin_t * p[n - 1][m] - k * dp2;
            }
        }
    }
    (p, dp)
}

/// Fractional year, e.g. 2025-07-02 is roughly 2025.5.
fn decimal_year(at: DateTime<Utc>) -> f64 {
    let year = at.year();
    let days_in_year = if chrono::NaiveDate::from_ymd_opt(year, 12, 31)
        .is_some_and(|d| d.ordinal() == 366)
    {
        366.0
    } else {
        365.0
    };
    let seconds_into_day = f64::from(at.num_seconds_from_midnight()) / 86_400.0;
    f64::from(year) + (f64::from(at.ordinal0()) + seconds_into_day) / days_in_year
}
