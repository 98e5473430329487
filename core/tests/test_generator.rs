use cansat_core::generator::{generate, generate_with, synthetic_flight, Bounds, SyntheticPlan};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn stays_inside_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    let bounds = Bounds::new(0.0, 100.0, 5.0);
    let mut x = 50.0;
    for _ in 0..500 {
        x = generate_with(&mut rng, x, &bounds);
        assert!((0.0..=100.0).contains(&x), "{x}");
    }

    let ints = Bounds::new(-10i64, 10, 3);
    let mut n = 0i64;
    for _ in 0..500 {
        n = generate_with(&mut rng, n, &ints);
        assert!((-10..=10).contains(&n));
    }
}

#[test]
fn keeps_the_numeric_type() {
    let i: i64 = generate(5, &Bounds::new(0, 10, 2));
    let f: f64 = generate(5.0, &Bounds::new(0.0, 10.0, 2.0));
    assert!((0..=10).contains(&i));
    assert!((0.0..=10.0).contains(&f));
}

#[test]
fn empty_range_falls_back_to_default() {
    let mut rng = StdRng::seed_from_u64(1);
    let bounds = Bounds::new(10i64, 0, 3).or_default(-1);
    assert_eq!(generate_with(&mut rng, 5, &bounds), -1);

    let bounds = Bounds::new(1.0, -1.0, 0.5).attempts(10);
    assert_eq!(generate_with(&mut rng, 0.0, &bounds), 0.0);
}

#[test]
fn time_data_strictly_increases() {
    let mut rng = StdRng::seed_from_u64(42);
    let bounds = Bounds::new(0, i64::MAX, 20).time();
    let mut t = 0i64;
    for _ in 0..1000 {
        let next = generate_with(&mut rng, t, &bounds);
        assert!(next > t && next - t <= 20);
        t = next;
    }
}

#[test]
fn synthetic_flight_is_reproducible() {
    let plan = SyntheticPlan {
        bmp280: 200,
        dht11: 50,
        gps: 20,
        mpu6050: 100,
    };
    let a = synthetic_flight(&mut StdRng::seed_from_u64(3), &plan);
    let b = synthetic_flight(&mut StdRng::seed_from_u64(3), &plan);
    assert_eq!(a, b);

    assert_eq!(a.bmp280.len(), 200);
    assert_eq!(a.dht11.len(), 50);
    assert_eq!(a.gps.len(), 20);
    assert_eq!(a.mpu6050.len(), 100);

    assert!(a.bmp280.windows(2).all(|w| w[1].time > w[0].time));
    assert!(a.gps.windows(2).all(|w| w[1].time > w[0].time));
    assert!(a.bmp280.iter().all(|s| (20.0..=1000.0).contains(&s.height)));
    assert!(a.dht11.iter().all(|s| (0.0..=100.0).contains(&s.humidity)));
}
