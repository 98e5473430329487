use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Sensor kinds carried by the probe. One table and one sample sequence per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorKind {
    Bmp280,
    Dht11,
    Gps,
    Mpu6050,
}

/// Descriptor for one measured field of a sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub unit: &'static str,
}

const fn field(name: &'static str, column: &'static str, unit: &'static str) -> Field {
    Field { name, column, unit }
}

const BMP280_FIELDS: [Field; 3] = [
    field("temperature", "Temperature", "°C"),
    field("pressure", "Pressure", "Pa"),
    field("height", "Height", "m"),
];

const DHT11_FIELDS: [Field; 2] = [
    field("humidity", "Humidity", "%"),
    field("temperature", "Temperature", "°C"),
];

const GPS_FIELDS: [Field; 3] = [
    field("latitude", "Latitude", "deg"),
    field("longitude", "Longitude", "deg"),
    field("altitude", "Altitude", "m"),
];

const MPU6050_FIELDS: [Field; 6] = [
    field("accel_x", "AccelX", "m/s²"),
    field("accel_y", "AccelY", "m/s²"),
    field("accel_z", "AccelZ", "m/s²"),
    field("gyro_x", "GyroX", "deg/s"),
    field("gyro_y", "GyroY", "deg/s"),
    field("gyro_z", "GyroZ", "deg/s"),
];

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Bmp280,
        SensorKind::Dht11,
        SensorKind::Gps,
        SensorKind::Mpu6050,
    ];

    /// Label used on the wire and as table name.
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Bmp280 => "BMP280",
            SensorKind::Dht11 => "DHT11",
            SensorKind::Gps => "GPS",
            SensorKind::Mpu6050 => "MPU6050",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        SensorKind::ALL
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(label))
    }

    /// Ordered measured fields. The time field is not part of this list.
    pub fn fields(self) -> &'static [Field] {
        match self {
            SensorKind::Bmp280 => &BMP280_FIELDS,
            SensorKind::Dht11 => &DHT11_FIELDS,
            SensorKind::Gps => &GPS_FIELDS,
            SensorKind::Mpu6050 => &MPU6050_FIELDS,
        }
    }

    pub fn field_index(self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name == name)
    }

    /// Table columns: Id, Time, measured fields, MissingData, one Is<Field>Outlier per field.
    pub fn columns(self) -> Vec<String> {
        let fields = self.fields();
        let mut cols = Vec::with_capacity(3 + 2 * fields.len());
        cols.push("Id".to_string());
        cols.push("Time".to_string());
        cols.extend(fields.iter().map(|f| f.column.to_string()));
        cols.push("MissingData".to_string());
        cols.extend(fields.iter().map(|f| format!("Is{}Outlier", f.column)));
        cols
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One reading of one sensor kind, with its refinement flags.
///
/// Field values are addressed by index into `Self::KIND.fields()`.
pub trait Reading: Clone + fmt::Debug {
    const KIND: SensorKind;

    fn time(&self) -> i64;

    /// Raw field value; NaN for an index outside the field list.
    fn raw_value(&self, field: usize) -> f64;

    /// Build a sample from a time and the values in field order.
    fn from_values(time: i64, values: &[f64]) -> Option<Self>;

    fn missing_data(&self) -> bool;
    fn set_missing_data(&mut self, flag: bool);

    fn outliers(&self) -> &[bool];
    fn outliers_mut(&mut self) -> &mut [bool];

    /// Field value, absent when the sensor reported nothing usable (NaN/inf).
    fn value(&self, field: usize) -> Option<f64> {
        let v = self.raw_value(field);
        if v.is_finite() {
            Some(v)
        } else {
            None
        }
    }

    fn values(&self) -> Vec<f64> {
        (0..Self::KIND.fields().len())
            .map(|i| self.raw_value(i))
            .collect()
    }

    fn is_outlier(&self) -> bool {
        self.outliers().iter().any(|f| *f)
    }

    fn is_field_outlier(&self, field: usize) -> bool {
        self.outliers().get(field).copied().unwrap_or(false)
    }

    fn clear_flags(&mut self) {
        self.set_missing_data(false);
        self.outliers_mut().iter_mut().for_each(|f| *f = false);
    }
}

/// Absent readings are NaN in memory and `null` in JSON.
fn nan_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bmp280 {
    pub time: i64,
    #[serde(deserialize_with = "nan_if_null")]
    pub temperature: f64, // °C
    #[serde(deserialize_with = "nan_if_null")]
    pub pressure: f64,    // Pa
    #[serde(deserialize_with = "nan_if_null")]
    pub height: f64,      // m, barometric
    #[serde(default)]
    pub missing_data: bool,
    #[serde(default)]
    pub outliers: [bool; 3],
}

impl Bmp280 {
    pub fn new(time: i64, temperature: f64, pressure: f64, height: f64) -> Self {
        Self {
            time,
            temperature,
            pressure,
            height,
            missing_data: false,
            outliers: [false; 3],
        }
    }
}

impl Reading for Bmp280 {
    const KIND: SensorKind = SensorKind::Bmp280;

    fn time(&self) -> i64 {
        self.time
    }

    fn raw_value(&self, field: usize) -> f64 {
        match field {
            0 => self.temperature,
            1 => self.pressure,
            2 => self.height,
            _ => f64::NAN,
        }
    }

    fn from_values(time: i64, values: &[f64]) -> Option<Self> {
        match *values {
            [temperature, pressure, height] => Some(Self::new(time, temperature, pressure, height)),
            _ => None,
        }
    }

    fn missing_data(&self) -> bool {
        self.missing_data
    }

    fn set_missing_data(&mut self, flag: bool) {
        self.missing_data = flag;
    }

    fn outliers(&self) -> &[bool] {
        &self.outliers
    }

    fn outliers_mut(&mut self) -> &mut [bool] {
        &mut self.outliers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dht11 {
    pub time: i64,
    #[serde(deserialize_with = "nan_if_null")]
    pub humidity: f64,    // %
    #[serde(deserialize_with = "nan_if_null")]
    pub temperature: f64, // °C
    #[serde(default)]
    pub missing_data: bool,
    #[serde(default)]
    pub outliers: [bool; 2],
}

impl Dht11 {
    pub fn new(time: i64, humidity: f64, temperature: f64) -> Self {
        Self {
            time,
            humidity,
            temperature,
            missing_data: false,
            outliers: [false; 2],
        }
    }
}

impl Reading for Dht11 {
    const KIND: SensorKind = SensorKind::Dht11;

    fn time(&self) -> i64 {
        self.time
    }

    fn raw_value(&self, field: usize) -> f64 {
        match field {
            0 => self.humidity,
            1 => self.temperature,
            _ => f64::NAN,
        }
    }

    fn from_values(time: i64, values: &[f64]) -> Option<Self> {
        match *values {
            [humidity, temperature] => Some(Self::new(time, humidity, temperature)),
            _ => None,
        }
    }

    fn missing_data(&self) -> bool {
        self.missing_data
    }

    fn set_missing_data(&mut self, flag: bool) {
        self.missing_data = flag;
    }

    fn outliers(&self) -> &[bool] {
        &self.outliers
    }

    fn outliers_mut(&mut self) -> &mut [bool] {
        &mut self.outliers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub time: i64,
    #[serde(deserialize_with = "nan_if_null")]
    pub latitude: f64,  // deg
    #[serde(deserialize_with = "nan_if_null")]
    pub longitude: f64, // deg
    #[serde(deserialize_with = "nan_if_null")]
    pub altitude: f64,  // m
    #[serde(default)]
    pub missing_data: bool,
    #[serde(default)]
    pub outliers: [bool; 3],
}

impl Gps {
    pub fn new(time: i64, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
            altitude,
            missing_data: false,
            outliers: [false; 3],
        }
    }
}

impl Reading for Gps {
    const KIND: SensorKind = SensorKind::Gps;

    fn time(&self) -> i64 {
        self.time
    }

    fn raw_value(&self, field: usize) -> f64 {
        match field {
            0 => self.latitude,
            1 => self.longitude,
            2 => self.altitude,
            _ => f64::NAN,
        }
    }

    fn from_values(time: i64, values: &[f64]) -> Option<Self> {
        match *values {
            [latitude, longitude, altitude] => Some(Self::new(time, latitude, longitude, altitude)),
            _ => None,
        }
    }

    fn missing_data(&self) -> bool {
        self.missing_data
    }

    fn set_missing_data(&mut self, flag: bool) {
        self.missing_data = flag;
    }

    fn outliers(&self) -> &[bool] {
        &self.outliers
    }

    fn outliers_mut(&mut self) -> &mut [bool] {
        &mut self.outliers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mpu6050 {
    pub time: i64,
    #[serde(deserialize_with = "nan_if_null")]
    pub accel_x: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub accel_y: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub accel_z: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub gyro_x: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub gyro_y: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub gyro_z: f64,
    #[serde(default)]
    pub missing_data: bool,
    #[serde(default)]
    pub outliers: [bool; 6],
}

impl Mpu6050 {
    pub fn new(time: i64, accel: [f64; 3], gyro: [f64; 3]) -> Self {
        Self {
            time,
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
            gyro_x: gyro[0],
            gyro_y: gyro[1],
            gyro_z: gyro[2],
            missing_data: false,
            outliers: [false; 6],
        }
    }
}

impl Reading for Mpu6050 {
    const KIND: SensorKind = SensorKind::Mpu6050;

    fn time(&self) -> i64 {
        self.time
    }

    fn raw_value(&self, field: usize) -> f64 {
        match field {
            0 => self.accel_x,
            1 => self.accel_y,
            2 => self.accel_z,
            3 => self.gyro_x,
            4 => self.gyro_y,
            5 => self.gyro_z,
            _ => f64::NAN,
        }
    }

    fn from_values(time: i64, values: &[f64]) -> Option<Self> {
        match *values {
            [ax, ay, az, gx, gy, gz] => Some(Self::new(time, [ax, ay, az], [gx, gy, gz])),
            _ => None,
        }
    }

    fn missing_data(&self) -> bool {
        self.missing_data
    }

    fn set_missing_data(&mut self, flag: bool) {
        self.missing_data = flag;
    }

    fn outliers(&self) -> &[bool] {
        &self.outliers
    }

    fn outliers_mut(&mut self) -> &mut [bool] {
        &mut self.outliers
    }
}

/// A parsed line of any sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Record {
    Bmp280(Bmp280),
    Dht11(Dht11),
    Gps(Gps),
    Mpu6050(Mpu6050),
}

impl Record {
    pub fn kind(&self) -> SensorKind {
        match self {
            Record::Bmp280(_) => SensorKind::Bmp280,
            Record::Dht11(_) => SensorKind::Dht11,
            Record::Gps(_) => SensorKind::Gps,
            Record::Mpu6050(_) => SensorKind::Mpu6050,
        }
    }

    pub fn time(&self) -> i64 {
        match self {
            Record::Bmp280(s) => s.time,
            Record::Dht11(s) => s.time,
            Record::Gps(s) => s.time,
            Record::Mpu6050(s) => s.time,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            Record::Bmp280(s) => s.values(),
            Record::Dht11(s) => s.values(),
            Record::Gps(s) => s.values(),
            Record::Mpu6050(s) => s.values(),
        }
    }
}

/// All sample sequences of one flight, one working copy per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub bmp280: Vec<Bmp280>,
    pub dht11: Vec<Dht11>,
    pub gps: Vec<Gps>,
    pub mpu6050: Vec<Mpu6050>,
}

impl Flight {
    pub fn push(&mut self, record: Record) {
        match record {
            Record::Bmp280(s) => self.bmp280.push(s),
            Record::Dht11(s) => self.dht11.push(s),
            Record::Gps(s) => self.gps.push(s),
            Record::Mpu6050(s) => self.mpu6050.push(s),
        }
    }

    pub fn len_of(&self, kind: SensorKind) -> usize {
        match kind {
            SensorKind::Bmp280 => self.bmp280.len(),
            SensorKind::Dht11 => self.dht11.len(),
            SensorKind::Gps => self.gps.len(),
            SensorKind::Mpu6050 => self.mpu6050.len(),
        }
    }

    pub fn total(&self) -> usize {
        SensorKind::ALL.into_iter().map(|k| self.len_of(k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
