//! Canned device payloads.

use plantsync_protocol::DeviceReading;

/// A `/data` body as sent by current firmware.
pub const SAMPLE_READING_JSON: &str = r#"{
    "temperature": 21.5,
    "airHumidity": 60.0,
    "soilMoisture": 1200,
    "lightLevel": 300,
    "desiredMoisture": 1500,
    "autoWatering": true,
    "fullDate": "2024-01-01T00:00:00"
}"#;

/// The decoded form of [`SAMPLE_READING_JSON`].
pub fn sample_reading() -> DeviceReading {
    DeviceReading {
        temperature: 21.5,
        air_humidity: 60.0,
        soil_moisture: 1200,
        light_level: 300,
        desired_moisture: 1500,
        auto_watering: Some(true),
        full_date: Some("2024-01-01T00:00:00".into()),
        pump_duration: None,
    }
}

/// A reading from firmware that reports the pump duration.
pub fn reading_with_pump_duration(seconds: i64) -> DeviceReading {
    DeviceReading {
        pump_duration: Some(seconds),
        ..sample_reading()
    }
}

/// The sample reading with a different moisture set-point.
pub fn reading_with_desired_moisture(level: i64) -> DeviceReading {
    DeviceReading {
        desired_moisture: level,
        ..sample_reading()
    }
}
