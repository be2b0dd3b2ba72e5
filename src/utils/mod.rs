// src/utils/mod.rs
//! Small shared utilities: clocks and unit conversion

pub mod conversion;
pub mod time;

pub use conversion::{adc_to_voltage, millis_to_secs, voltage_to_adc, ChannelUnits};
pub use time::{current_timestamp_nanos, current_timestamp_secs, MockTimeProvider, SystemTimeProvider, TimeProvider};
