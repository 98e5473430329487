use cansat_core::*;
use serde_json::json;

#[test]
fn refine_json_flags_gps_gap() {
    let samples = json!([
        { "time": 0, "latitude": 47.0, "longitude": 19.0, "altitude": 100.0 },
        { "time": 100, "latitude": 47.0, "longitude": 19.0, "altitude": 101.0 },
        { "time": 1000, "latitude": 47.0, "longitude": 19.0, "altitude": null }
    ]);

    let out = refine_json("gps", &samples.to_string(), None).unwrap();
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(v["kind"], "Gps");
    assert_eq!(v["samples"][1]["missing_data"], false);
    assert_eq!(v["samples"][2]["missing_data"], true);
    assert!(v["samples"][2]["altitude"].is_null());
    assert_eq!(v["stats"]["gaps"], 1);
}

#[test]
fn refine_json_with_params() {
    let samples = json!([
        { "time": 0, "temperature": 20.0, "pressure": 1000.0, "height": 100.0 },
        { "time": 10, "temperature": 20.0, "pressure": 1000.0, "height": 105.0 }
    ]);
    let params = json!({
        "outlier_iqr_multiplier": 1.5,
        "outlier_step_threshold": 2.0,
        "lacking_data_threshold": 100
    });

    let out = refine_json("BMP280", &samples.to_string(), Some(&params.to_string())).unwrap();
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["samples"][1]["outliers"], json!([false, false, true]));
}

#[test]
fn refine_json_errors() {
    assert!(refine_json("BME680", "[]", None).unwrap_err().contains("unknown sensor kind"));

    let err = refine_json("DHT11", r#"[{ "time": "x", "humidity": 1.0, "temperature": 2.0 }]"#, None).unwrap_err();
    assert!(err.contains("[0].time"), "{err}");
}

#[test]
fn wind_estimate_json_round() {
    let track = json!([
        { "time": 0, "latitude": 0.0, "longitude": 0.0, "altitude": 100.0 },
        { "time": 10, "latitude": 10.0, "longitude": 0.0, "altitude": 100.0 }
    ]);
    let out = wind_estimate_json(&track.to_string(), None).unwrap();
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["vectors"].as_array().unwrap().len(), 1);
    assert!(v["average_speed"].as_f64().unwrap() > 0.9);

    assert_eq!(wind_estimate_json("[]", None).unwrap(), "null");
}

#[test]
fn analyze_raw_json_smoke() {
    let raw = "BMP280 20.0 101325 100 0\nERROR BMP280\nBMP280 20.1 101320 110 10\nGPS 47.0 19.0 100 0\n";
    let out = analyze_raw_json(raw, None).unwrap();
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();

    assert_eq!(v["flight"]["bmp280"].as_array().unwrap().len(), 2);
    assert_eq!(v["flight"]["gps"].as_array().unwrap().len(), 1);
    assert_eq!(v["stats"]["Bmp280"]["samples"], 2);
}
