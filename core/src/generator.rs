// core/src/generator.rs
//
// Bounded random walk used when no probe is attached.
use std::fmt;

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Bmp280, Dht11, Flight, Gps, Mpu6050};

/// Numeric types the walk can step, keeping their own type.
pub trait Perturb: Copy + PartialOrd + fmt::Debug {
    /// One step: in `1..=dispersion` when `increasing`, otherwise in `-dispersion..=dispersion`.
    fn perturb<G: Rng + ?Sized>(self, rng: &mut G, dispersion: Self, increasing: bool) -> Self;
}

impl Perturb for i64 {
    fn perturb<G: Rng + ?Sized>(self, rng: &mut G, dispersion: Self, increasing: bool) -> Self {
        let d = dispersion.saturating_abs();
        if increasing {
            self.saturating_add(rng.gen_range(1..=d.max(1)))
        } else {
            self.saturating_add(rng.gen_range(-d..=d))
        }
    }
}

impl Perturb for f64 {
    fn perturb<G: Rng + ?Sized>(self, rng: &mut G, dispersion: Self, increasing: bool) -> Self {
        let d = if dispersion.is_finite() { dispersion.abs() } else { 0.0 };
        if increasing {
            self + rng.gen_range(f64::EPSILON..=d.max(f64::EPSILON))
        } else {
            self + rng.gen_range(-d..=d)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub lower: T,
    pub upper: T,
    pub dispersion: T,
    /// Steps are strictly positive (timestamps).
    pub is_time_data: bool,
    pub max_attempts: usize,
    /// Returned when no attempt lands inside the bounds.
    pub default: T,
}

impl<T: Perturb + Default> Bounds<T> {
    pub fn new(lower: T, upper: T, dispersion: T) -> Self {
        Self {
            lower,
            upper,
            dispersion,
            is_time_data: false,
            max_attempts: 100,
            default: T::default(),
        }
    }

    pub fn time(mut self) -> Self {
        self.is_time_data = true;
        self
    }

    pub fn attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn or_default(mut self, default: T) -> Self {
        self.default = default;
        self
    }
}

/// Walk from `current` until a value lands in `[lower, upper]`, at most
/// `max_attempts` steps; `default` otherwise. Steps accumulate.
pub fn generate_with<T: Perturb, G: Rng + ?Sized>(rng: &mut G, current: T, bounds: &Bounds<T>) -> T {
    let mut x = current;
    for _ in 0..bounds.max_attempts {
        x = x.perturb(rng, bounds.dispersion, bounds.is_time_data);
        if bounds.lower <= x && x <= bounds.upper {
            return x;
        }
    }
    warn!(
        "no value within [{:?}, {:?}] after {} attempts from {:?}",
        bounds.lower, bounds.upper, bounds.max_attempts, current
    );
    bounds.default
}

pub fn generate<T: Perturb>(current: T, bounds: &Bounds<T>) -> T {
    generate_with(&mut rand::thread_rng(), current, bounds)
}

/// Sample counts for a synthetic flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticPlan {
    pub bmp280: usize,
    pub dht11: usize,
    pub gps: usize,
    pub mpu6050: usize,
}

impl Default for SyntheticPlan {
    fn default() -> Self {
        Self {
            bmp280: 2000,
            dht11: 2000,
            gps: 80,
            mpu6050: 2000,
        }
    }
}

const MAX_TIME: i64 = 3_000_000;

/// Random-walk flight shaped like the probe's real cadence.
pub fn synthetic_flight<G: Rng + ?Sized>(rng: &mut G, plan: &SyntheticPlan) -> Flight {
    let mut flight = Flight::default();

    let t_bmp = Bounds::new(0, MAX_TIME, 20).time();
    let temp = Bounds::new(-100.0, 100.0, 5.0);
    let pressure = Bounds::new(0.0, 100_000.0, 20.0);
    let height = Bounds::new(20.0, 1000.0, 20.0).or_default(100.0);
    let mut cur = Bmp280::new(0, 30.0, 4000.0, 100.0);
    for _ in 0..plan.bmp280 {
        flight.bmp280.push(cur.clone());
        cur = Bmp280::new(
            generate_with(rng, cur.time, &t_bmp),
            generate_with(rng, cur.temperature, &temp),
            generate_with(rng, cur.pressure, &pressure),
            generate_with(rng, cur.height, &height),
        );
    }

    let t_dht = Bounds::new(0, MAX_TIME, 5).time();
    let humidity = Bounds::new(0.0, 100.0, 5.0);
    let mut cur = Dht11::new(0, 50.0, 30.0);
    for _ in 0..plan.dht11 {
        flight.dht11.push(cur.clone());
        cur = Dht11::new(
            generate_with(rng, cur.time, &t_dht),
            generate_with(rng, cur.humidity, &humidity),
            generate_with(rng, cur.temperature, &temp),
        );
    }

    let t_gps = Bounds::new(0, MAX_TIME, 400).time();
    let lat = Bounds::new(-90.0, 90.0, 20.0);
    let lon = Bounds::new(-180.0, 180.0, 20.0);
    let mut cur = Gps::new(0, 0.0, 0.0, 100.0);
    for _ in 0..plan.gps {
        flight.gps.push(cur.clone());
        cur = Gps::new(
            generate_with(rng, cur.time, &t_gps),
            generate_with(rng, cur.latitude, &lat),
            generate_with(rng, cur.longitude, &lon),
            generate_with(rng, cur.altitude, &height),
        );
    }

    let t_mpu = Bounds::new(0, MAX_TIME, 20).time();
    let accel = Bounds::new(-20.0, 20.0, 1.0);
    let gyro = Bounds::new(-250.0, 250.0, 5.0);
    let mut cur = Mpu6050::new(0, [0.0, 0.0, 9.81], [0.0; 3]);
    for _ in 0..plan.mpu6050 {
        flight.mpu6050.push(cur.clone());
        cur = Mpu6050::new(
            generate_with(rng, cur.time, &t_mpu),
            [
                generate_with(rng, cur.accel_x, &accel),
                generate_with(rng, cur.accel_y, &accel),
                generate_with(rng, cur.accel_z, &accel),
            ],
            [
                generate_with(rng, cur.gyro_x, &gyro),
                generate_with(rng, cur.gyro_y, &gyro),
                generate_with(rng, cur.gyro_z, &gyro),
            ],
        );
    }

    flight
}
