use std::fs;

use cansat_core::comparator::{compare, JsonFileReference, ReferenceProvider, ReferenceSeries, StaticReference};
use cansat_core::error::ReferenceError;
use cansat_core::models::Bmp280;

fn probe(temps: &[f64]) -> Vec<Bmp280> {
    temps
        .iter()
        .enumerate()
        .map(|(i, t)| Bmp280::new(i as i64 * 10, *t, 1000.0, 100.0))
        .collect()
}

#[test]
fn last_clean_probe_against_first_reference() {
    let mut bmp = probe(&[18.0, 21.0, 25.0, 80.0]);
    bmp[3].outliers[0] = true;
    let reference = ReferenceSeries::from_pairs(&[(0, 20.0), (3600, 21.0)]);

    let c = compare(&bmp, &reference, 3.0).unwrap();
    assert_eq!(c.probe_time, 20);
    assert_eq!(c.probe_temperature, 25.0);
    assert_eq!(c.reference_temperature, 20.0);
    assert!((c.difference - 5.0).abs() < 1e-12);
    assert!(c.significant);

    assert!(!compare(&bmp, &reference, 6.0).unwrap().significant);
}

#[test]
fn colder_probe_is_also_significant() {
    let reference = ReferenceSeries::from_pairs(&[(0, 20.0)]);
    let c = compare(&probe(&[15.0]), &reference, 3.0).unwrap();
    assert!((c.difference + 5.0).abs() < 1e-12);
    assert!(c.significant);

    let c = compare(&probe(&[22.0]), &reference, 3.0).unwrap();
    assert!(!c.significant);
}

#[test]
fn nothing_to_compare() {
    let reference = ReferenceSeries::from_pairs(&[(0, 20.0)]);
    assert!(compare(&[], &reference, 3.0).is_none());
    assert!(compare(&probe(&[20.0]), &ReferenceSeries::default(), 3.0).is_none());
}

#[test]
fn rebase_onto_probe_time() {
    let mut s = ReferenceSeries::from_pairs(&[(0, 1.0), (3600, 2.0), (7200, 3.0)]);
    s.rebase(5000, 1000);
    assert_eq!(s.times, vec![5000, 6000, 7000]);
    assert_eq!(s.pairs(), vec![(5000, 1.0), (6000, 2.0), (7000, 3.0)]);

    s.rebase(i64::MAX - 1, 1000);
    assert_eq!(s.times, vec![i64::MAX - 1, i64::MAX, i64::MAX]);
}

#[test]
fn static_reference() {
    let empty = StaticReference::default();
    assert!(matches!(empty.reference_series(), Err(ReferenceError::Empty)));

    let full = StaticReference {
        series: ReferenceSeries::from_pairs(&[(0, 12.5)]),
    };
    assert_eq!(full.reference_series().unwrap().temperatures, vec![12.5]);
}

#[test]
fn json_file_reference() {
    let path = "tests/tmp_reference.json";
    fs::write(path, r#"{ "temperatures": [14.0, 15.5], "times": [0, 3600] }"#).unwrap();

    let series = JsonFileReference::new(path).reference_series().unwrap();
    assert_eq!(series.pairs(), vec![(0, 14.0), (3600, 15.5)]);
    fs::remove_file(path).ok();

    let missing = JsonFileReference::new("tests/no_reference.json");
    assert!(matches!(missing.reference_series(), Err(ReferenceError::Payload(_))));
}
