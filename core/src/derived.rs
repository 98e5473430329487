// core/src/derived.rs
use serde::{Deserialize, Serialize};

use crate::models::{Bmp280, Gps, Reading};

/// Positive time delta `b - a`; None when not positive or not representable.
fn positive_dt(a: i64, b: i64) -> Option<f64> {
    match b.checked_sub(a) {
        Some(dt) if dt > 0 => Some(dt as f64),
        _ => None,
    }
}

/// Samples that carry a height.
pub trait Altitude: Reading {
    fn altitude_m(&self) -> f64;
}

impl Altitude for Bmp280 {
    fn altitude_m(&self) -> f64 {
        self.height
    }
}

impl Altitude for Gps {
    fn altitude_m(&self) -> f64 {
        self.altitude
    }
}

/// Vertical speed |Δh| / Δt. Zero when Δt is not positive or overflows.
pub fn speed<R: Altitude>(current: &R, previous: &R) -> f64 {
    let Some(dt) = positive_dt(previous.time(), current.time()) else {
        return 0.0;
    };
    let v = (current.altitude_m() - previous.altitude_m()).abs() / dt;
    if v.is_finite() { v } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub time: i64,
    pub height: f64,
    pub speed: f64,
    pub acceleration: f64,
}

/// |Δspeed| / Δt. Zero when Δt is not positive or overflows.
pub fn acceleration(current: &Kinematics, previous: &Kinematics) -> f64 {
    let Some(dt) = positive_dt(previous.time, current.time) else {
        return 0.0;
    };
    let a = (current.speed - previous.speed).abs() / dt;
    if a.is_finite() { a } else { 0.0 }
}

/// Speed and acceleration along the non-outlier samples of `seq`.
/// The first point has zero speed and acceleration.
pub fn vertical_profile<R: Altitude>(seq: &[R]) -> Vec<Kinematics> {
    let clean: Vec<&R> = seq.iter().filter(|s| !s.is_outlier()).collect();
    let mut out: Vec<Kinematics> = Vec::with_capacity(clean.len());

    for (i, s) in clean.iter().enumerate() {
        let mut k = Kinematics {
            time: s.time(),
            height: s.altitude_m(),
            speed: 0.0,
            acceleration: 0.0,
        };
        if i > 0 {
            k.speed = speed(*s, clean[i - 1]);
            k.acceleration = acceleration(&k, &out[i - 1]);
        }
        out.push(k);
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalSummary {
    pub max_height: f64,
    pub apex_time: i64,
    pub max_speed: f64,
    pub max_acceleration: f64,
}

pub fn summarize(profile: &[Kinematics]) -> Option<VerticalSummary> {
    let apex = profile
        .iter()
        .filter(|k| k.height.is_finite())
        .fold(None::<&Kinematics>, |best, k| match best {
            Some(b) if b.height >= k.height => Some(b),
            _ => Some(k),
        })?;

    Some(VerticalSummary {
        max_height: apex.height,
        apex_time: apex.time,
        max_speed: profile.iter().map(|k| k.speed).fold(0.0, f64::max),
        max_acceleration: profile.iter().map(|k| k.acceleration).fold(0.0, f64::max),
    })
}

/// Drag model constants of the probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeProfile {
    pub drag_coefficient: f64,
    pub air_density: f64, // kg/m³
    pub surface_area: f64, // m²
    pub mass: f64,         // kg
}

impl Default for ProbeProfile {
    fn default() -> Self {
        Self {
            drag_coefficient: 0.5,
            air_density: 1.225,
            surface_area: 0.1,
            mass: 1.0,
        }
    }
}

impl ProbeProfile {
    #[inline]
    pub fn drag_force(&self, v: f64) -> f64 {
        let f = 0.5 * self.air_density * v * v * self.drag_coefficient * self.surface_area;
        if f.is_finite() { f.max(0.0) } else { 0.0 }
    }

    #[inline]
    pub fn drag_acceleration(&self, v: f64) -> f64 {
        if self.mass > 0.0 {
            self.drag_force(v) / self.mass
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindVector {
    pub time: i64,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub direction_rad: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindEstimate {
    pub vectors: Vec<WindVector>,
    pub average_speed: f64,
    pub average_direction_rad: f64,
    pub average_direction_deg: f64,
}

/// Wind estimate from a GPS track with the simplified drag model.
///
/// Velocity comes from consecutive non-outlier fixes (lat → x, lon → y per
/// time unit). The drag acceleration magnitude is subtracted from both
/// velocity components. This mixes a velocity with an acceleration and is a
/// known approximation, kept until the model is validated against flight data.
///
/// Pairs with a non-positive (or overflowing) time delta are skipped. None when no pair is usable.
pub fn wind_estimate(track: &[Gps], profile: &ProbeProfile) -> Option<WindEstimate> {
    let points: Vec<&Gps> = track
        .iter()
        .filter(|g| !g.is_outlier() && g.latitude.is_finite() && g.longitude.is_finite())
        .collect();

    let mut vectors = Vec::with_capacity(points.len().saturating_sub(1));
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let Some(dt) = positive_dt(a.time, b.time) else {
            continue;
        };
        let vx = (b.latitude - a.latitude) / dt;
        let vy = (b.longitude - a.longitude) / dt;
        let a_drag = profile.drag_acceleration(vx.hypot(vy));

        let x = vx - a_drag;
        let y = vy - a_drag;
        vectors.push(WindVector {
            time: b.time,
            x,
            y,
            speed: x.hypot(y),
            direction_rad: y.atan2(x),
        });
    }

    if vectors.is_empty() {
        return None;
    }

    let n = vectors.len() as f64;
    let average_speed = vectors.iter().map(|v| v.speed).sum::<f64>() / n;
    let average_direction_rad = vectors.iter().map(|v| v.direction_rad).sum::<f64>() / n;

    Some(WindEstimate {
        vectors,
        average_speed,
        average_direction_rad,
        average_direction_deg: average_direction_rad.to_degrees(),
    })
}

/// One arrow of the uniform wind field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindArrow {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub u: f64,
    pub v: f64,
    pub w: f64,
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return None;
    }
    let pad = 0.1 * (hi - lo);
    Some((lo - pad, hi + pad))
}

/// `grid³` arrows over the track's bounding box (10% padding), all carrying
/// the average wind vector. Empty when the track has no finite fixes.
pub fn wind_field(estimate: &WindEstimate, track: &[Gps], grid: usize) -> Vec<WindArrow> {
    let (Some(lat), Some(lon), Some(alt)) = (
        padded_range(track.iter().map(|g| g.latitude)),
        padded_range(track.iter().map(|g| g.longitude)),
        padded_range(track.iter().map(|g| g.altitude)),
    ) else {
        return Vec::new();
    };

    let u = estimate.average_speed * estimate.average_direction_rad.cos();
    let v = estimate.average_speed * estimate.average_direction_rad.sin();

    let lats = linspace(lat.0, lat.1, grid);
    let lons = linspace(lon.0, lon.1, grid);
    let alts = linspace(alt.0, alt.1, grid);

    let mut out = Vec::with_capacity(grid.pow(3));
    for &latitude in &lats {
        for &longitude in &lons {
            for &altitude in &alts {
                out.push(WindArrow {
                    latitude,
                    longitude,
                    altitude,
                    u,
                    v,
                    w: 0.0,
                });
            }
        }
    }
    out
}
