//! In-memory gauge for bring-up and host testing.

use core::convert::Infallible;

use enumset::{enum_set, EnumSet};

use crate::{
    gauge::{BatteryIdentity, Gauge},
    info::{
        battery_string, BatteryInformation, BatteryStatus, Capability, ManufactureDate,
        PowerState, ReportingScale, BATTERY_UNKNOWN_TIME, TECHNOLOGY_RECHARGEABLE,
    },
    set::SetLevel,
};

/// Everything the simulated gauge reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedState {
    pub status: BatteryStatus,
    pub information: BatteryInformation,
    pub identity: BatteryIdentity,
    pub granularity: ReportingScale,
    pub estimated_time: u32,
    pub temperature: u32,
}

impl Default for SimulatedState {
    /// A full, relative capacity pack on external power.
    fn default() -> Self {
        Self {
            status: BatteryStatus {
                power_state: PowerState::OnLine,
                capacity: 100,
                voltage: 4200,
                rate: 0,
            },
            information: BatteryInformation {
                capabilities: enum_set!(Capability::SystemBattery | Capability::CapacityRelative),
                technology: TECHNOLOGY_RECHARGEABLE,
                chemistry: *b"Fake",
                designed_capacity: 100,
                full_charged_capacity: 100,
                default_alert1: 0,
                default_alert2: 0,
                critical_bias: 0,
                cycle_count: 100,
            },
            identity: BatteryIdentity {
                manufacture_name: battery_string("Fake Manufacturer"),
                device_name: battery_string("Fake Battery"),
                serial_number: battery_string("12345"),
                unique_id: battery_string("Fake Battery 12345"),
                manufacture_date: ManufactureDate {
                    day: 1,
                    month: 1,
                    year: 2019,
                },
                chemistry: *b"Fake",
            },
            granularity: ReportingScale {
                granularity: 1,
                capacity: 100,
            },
            estimated_time: BATTERY_UNKNOWN_TIME,
            // 25 °C
            temperature: 2981,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SimulatedGauge {
    state: SimulatedState,
}

impl SimulatedGauge {
    pub fn new(state: SimulatedState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SimulatedState {
        &self.state
    }

    /// Replaces the dynamic status. The battery stays the same.
    pub fn set_status(&mut self, status: BatteryStatus) {
        self.state.status = status;
    }

    /// Replaces the whole record.
    ///
    /// Pair with a tag change, see
    /// [`BatteryDevice::update_static_properties`](crate::device::BatteryDevice::update_static_properties).
    pub fn set_state(&mut self, state: SimulatedState) {
        self.state = state;
    }
}

impl Gauge for SimulatedGauge {
    type Error = Infallible;

    const SET_LEVELS: EnumSet<SetLevel> =
        enum_set!(SetLevel::ChargingSource | SetLevel::CriticalBias);

    fn status(&mut self) -> Result<BatteryStatus, Infallible> {
        Ok(self.state.status)
    }

    fn information(&mut self) -> Result<BatteryInformation, Infallible> {
        Ok(self.state.information)
    }

    fn estimated_time(&mut self, at_rate: i32) -> Result<u32, Infallible> {
        if at_rate != 0 {
            return Ok(BATTERY_UNKNOWN_TIME);
        }

        Ok(self.state.estimated_time)
    }

    fn granularity(&mut self) -> Result<ReportingScale, Infallible> {
        Ok(self.state.granularity)
    }

    fn temperature(&mut self) -> Result<u32, Infallible> {
        Ok(self.state.temperature)
    }

    fn identity(&mut self) -> Result<BatteryIdentity, Infallible> {
        Ok(self.state.identity.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reports_cached_status() {
        let mut gauge = SimulatedGauge::default();
        let status = BatteryStatus {
            power_state: PowerState::Discharging,
            capacity: 42,
            voltage: 3700,
            rate: -500,
        };

        gauge.set_status(status);

        assert_eq!(gauge.status(), Ok(status));
        assert_eq!(gauge.status(), Ok(status));
    }

    #[test]
    fn replacing_the_state_replaces_everything() {
        let mut gauge = SimulatedGauge::default();
        let state = SimulatedState {
            temperature: 3030,
            granularity: ReportingScale {
                granularity: 2,
                capacity: 80,
            },
            ..SimulatedState::default()
        };

        gauge.set_state(state.clone());

        assert_eq!(gauge.state(), &state);
        assert_eq!(gauge.temperature(), Ok(3030));
    }

    #[test]
    fn estimated_time_only_at_current_rate() {
        let mut gauge = SimulatedGauge::new(SimulatedState {
            estimated_time: 3600,
            ..SimulatedState::default()
        });

        assert_eq!(gauge.estimated_time(0), Ok(3600));
        assert_eq!(gauge.estimated_time(-100), Ok(BATTERY_UNKNOWN_TIME));
    }
}
