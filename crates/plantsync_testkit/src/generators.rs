//! Property-based test generators using proptest.

use plantsync_protocol::{Command, DeviceReading, MAX_MOISTURE_LEVEL};
use proptest::prelude::*;

/// Strategy for `/data` payloads, including out-of-range integers and
/// omitted optional fields.
pub fn reading_strategy() -> impl Strategy<Value = DeviceReading> {
    (
        -40.0f32..60.0,
        0.0f32..100.0,
        -100i64..10_000,
        -100i64..100_000,
        -5_000i64..10_000,
        prop::option::of(any::<bool>()),
        prop::option::of(-10i64..600),
    )
        .prop_map(
            |(temperature, air_humidity, soil, light, desired, auto_watering, pump)| {
                DeviceReading {
                    temperature,
                    air_humidity,
                    soil_moisture: soil,
                    light_level: light,
                    desired_moisture: desired,
                    auto_watering,
                    full_date: None,
                    pump_duration: pump,
                }
            },
        )
}

/// Strategy for commands that pass validation.
pub fn valid_command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        (0..=MAX_MOISTURE_LEVEL).prop_map(Command::SetDesiredMoisture),
        any::<bool>().prop_map(Command::SetAutoWatering),
        (1u32..3_600).prop_map(Command::SetPumpDuration),
        Just(Command::TriggerWaterNow),
        Just(Command::TriggerDebugPump),
    ]
}

/// Strategy for commands that fail validation.
pub fn invalid_command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        (MAX_MOISTURE_LEVEL + 1..=u16::MAX).prop_map(Command::SetDesiredMoisture),
        Just(Command::SetPumpDuration(0)),
    ]
}
