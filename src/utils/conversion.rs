// src/utils/conversion.rs
//! Raw ADC count to physical unit conversion

use serde::{Deserialize, Serialize};

use crate::config::constants::units::{DEFAULT_ADC_RESOLUTION, DEFAULT_MAX_VOLTAGE};

/// Scale of the acquisition front end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelUnits {
    /// Voltage reported at full scale
    pub max_voltage: f64,
    /// ADC count reported at full scale
    pub adc_resolution: f64,
}

impl Default for ChannelUnits {
    fn default() -> Self {
        Self { max_voltage: DEFAULT_MAX_VOLTAGE, adc_resolution: DEFAULT_ADC_RESOLUTION }
    }
}

impl ChannelUnits {
    pub fn volts_per_count(&self) -> f64 {
        self.max_voltage / self.adc_resolution
    }

    pub fn is_valid(&self) -> bool {
        self.max_voltage.is_finite() && self.max_voltage > 0.0 && self.adc_resolution.is_finite() && self.adc_resolution > 0.0
    }
}

/// Convert an ADC count to volts
pub fn adc_to_voltage(count: f64, units: &ChannelUnits) -> f64 {
    count * units.volts_per_count()
}

/// Convert volts back to the nearest ADC count
pub fn voltage_to_adc(voltage: f64, units: &ChannelUnits) -> f64 {
    (voltage / units.volts_per_count()).round()
}

/// Convert acquisition timestamps in milliseconds to seconds
pub fn millis_to_secs(millis: f64) -> f64 {
    millis / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adc_to_voltage() {
        let units = ChannelUnits::default();
        assert!((adc_to_voltage(1023.0, &units) - 3.3).abs() < 1e-12);
        assert!((adc_to_voltage(512.0, &units) - 1.6516).abs() < 1e-4);
        assert_eq!(voltage_to_adc(3.3, &units), 1023.0);
    }

    #[test]
    fn test_units_validation() {
        assert!(ChannelUnits::default().is_valid());
        assert!(!ChannelUnits { max_voltage: 3.3, adc_resolution: 0.0 }.is_valid());
        assert_eq!(millis_to_secs(1500.0), 1.5);
    }
}
