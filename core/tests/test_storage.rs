use std::fs;

use cansat_core::error::StoreError;
use cansat_core::models::{Bmp280, Gps, Mpu6050, SensorKind};
use cansat_core::storage::TableStore;

fn flagged_bmp(t: i64, h: f64) -> Bmp280 {
    let mut s = Bmp280::new(t, 21.5, 101_325.0, h);
    s.missing_data = t % 2 == 1;
    s.outliers[2] = h > 500.0;
    s
}

#[test]
fn test_tables_round_trip_with_flags() {
    let dir = "tests/tmp_store_round_trip";
    let store = TableStore::create(dir, true).expect("could not create tables");

    for kind in SensorKind::ALL {
        assert!(store.table_path(kind).exists());
    }

    let rows = vec![flagged_bmp(0, 100.0), flagged_bmp(1, 900.0), flagged_bmp(2, 120.25)];
    assert_eq!(store.write_all(&rows).unwrap(), 3);
    assert_eq!(store.count(SensorKind::Bmp280).unwrap(), 3);

    let loaded: Vec<Bmp280> = store.read_all().unwrap();
    assert_eq!(loaded, rows);
    assert!(loaded[1].missing_data);
    assert_eq!(loaded[1].outliers, [false, false, true]);

    let imu = vec![Mpu6050::new(5, [0.1, -0.2, 9.81], [1.0, 2.0, 3.0])];
    store.write_all(&imu).unwrap();
    let loaded: Vec<Mpu6050> = store.read_all().unwrap();
    assert_eq!(loaded, imu);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_append_continues_ids() {
    let dir = "tests/tmp_store_append";
    let store = TableStore::create(dir, true).unwrap();

    store.write_all(&[Gps::new(0, 47.0, 19.0, 100.0), Gps::new(10, 47.1, 19.1, 110.0)]).unwrap();
    store.write_all(&[Gps::new(20, 47.2, 19.2, 120.0)]).unwrap();
    assert_eq!(store.count(SensorKind::Gps).unwrap(), 3);

    let text = fs::read_to_string(store.table_path(SensorKind::Gps)).unwrap();
    let last = text.lines().last().unwrap();
    assert!(last.starts_with("3,20,"), "last row: {last}");

    // replace restarts ids
    store.replace_all(&[Gps::new(30, 47.3, 19.3, 130.0)]).unwrap();
    let text = fs::read_to_string(store.table_path(SensorKind::Gps)).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("1,30,"));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_create_keeps_existing_rows() {
    let dir = "tests/tmp_store_keep";
    let store = TableStore::create(dir, true).unwrap();
    store.write_all(&[flagged_bmp(0, 100.0)]).unwrap();

    let reopened = TableStore::create(dir, false).unwrap();
    assert_eq!(reopened.count(SensorKind::Bmp280).unwrap(), 1);

    let replaced = TableStore::create(dir, true).unwrap();
    assert_eq!(replaced.count(SensorKind::Bmp280).unwrap(), 0);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_missing_table_reads_empty() {
    let dir = "tests/tmp_store_missing";
    let store = TableStore::open(dir).unwrap();
    let rows: Vec<Gps> = store.read_all().unwrap();
    assert!(rows.is_empty());
    assert_eq!(store.count(SensorKind::Gps).unwrap(), 0);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_schema_mismatch() {
    let dir = "tests/tmp_store_schema";
    let store = TableStore::open(dir).unwrap();
    fs::write(store.table_path(SensorKind::Bmp280), "Id,Time,Foo\n1,0,2.0\n").unwrap();

    let res = store.read_all::<Bmp280>();
    assert!(matches!(res, Err(StoreError::Schema { ref table, .. }) if table == "BMP280"));

    fs::remove_dir_all(dir).ok();
}

#[test]
fn test_bad_flag_is_a_row_error() {
    let dir = "tests/tmp_store_bad_flag";
    let store = TableStore::open(dir).unwrap();
    let header = SensorKind::Gps.columns().join(",");
    fs::write(
        store.table_path(SensorKind::Gps),
        format!("{header}\n1,0,47.0,19.0,100.0,yes,0,0,0\n"),
    )
    .unwrap();

    let res = store.read_all::<Gps>();
    assert!(matches!(res, Err(StoreError::Row { row: 1, .. })));

    fs::remove_dir_all(dir).ok();
}
