//! Translation of raw gauge registers into normalized battery records.

use enumset::EnumSet;
use register_access::{RegisterAccess, RegisterAccessExt};

use crate::{
    info::{
        BatteryInformation, BatteryStatus, PowerState, ReportingScale, BATTERY_UNKNOWN_TIME,
    },
    set::SetLevel,
};

pub mod bq27541;
pub mod bq27742;
pub mod identity;
pub mod simulated;

pub use identity::{BatteryIdentity, IdentitySource, StaticIdentity};

/// A source of battery records.
///
/// Hardware gauges read fresh register values on every call.
pub trait Gauge {
    type Error;

    /// Set-information levels the gauge acknowledges.
    const SET_LEVELS: EnumSet<SetLevel>;

    fn status(&mut self) -> Result<BatteryStatus, Self::Error>;

    fn information(&mut self) -> Result<BatteryInformation, Self::Error>;

    /// Seconds until empty at the current drain, or [`BATTERY_UNKNOWN_TIME`].
    ///
    /// Only `at_rate == 0` is answered; any other rate is unknown.
    fn estimated_time(&mut self, at_rate: i32) -> Result<u32, Self::Error>;

    fn granularity(&mut self) -> Result<ReportingScale, Self::Error>;

    /// 0.1 K
    fn temperature(&mut self) -> Result<u32, Self::Error>;

    fn identity(&mut self) -> Result<BatteryIdentity, Self::Error>;
}

/// Bit masks of the status flags register.
#[derive(Clone, Copy, Debug)]
pub struct FlagBits {
    pub ac_present: u16,
    pub discharging: u16,
    pub critical: u16,
}

impl FlagBits {
    /// Picks the power state, checking AC presence first, then discharge,
    /// then critical. Anything else counts as charging.
    pub const fn power_state(&self, flags: u16) -> PowerState {
        if flags & self.ac_present != 0 {
            PowerState::OnLine
        } else if flags & self.discharging != 0 {
            PowerState::Discharging
        } else if flags & self.critical != 0 {
            PowerState::Critical
        } else {
            PowerState::Charging
        }
    }

    pub const fn draining(&self, flags: u16) -> bool {
        flags & (self.discharging | self.critical) != 0
    }
}

/// Converts a time-to-empty register value to seconds.
///
/// ```rust
/// # use fuel_gauge_miniclass::{gauge::minutes_to_seconds, info::BATTERY_UNKNOWN_TIME};
/// assert_eq!(minutes_to_seconds(30), 1800);
/// assert_eq!(minutes_to_seconds(0), 0);
/// assert_eq!(minutes_to_seconds(0xFFFF), BATTERY_UNKNOWN_TIME);
/// ```
pub const fn minutes_to_seconds(raw: u16) -> u32 {
    if raw == 0xFFFF {
        BATTERY_UNKNOWN_TIME
    } else {
        raw as u32 * 60
    }
}

/// Reads the time to empty if the pack is draining.
fn time_to_empty<A>(
    regs: &A,
    bits: &FlagBits,
    flags_register: u8,
    time_register: u8,
) -> Result<u32, A::Error>
where
    A: RegisterAccess,
{
    let flags = read_u16(regs, flags_register)?;
    if !bits.draining(flags) {
        return Ok(BATTERY_UNKNOWN_TIME);
    }

    let minutes = read_u16(regs, time_register)?;
    Ok(minutes_to_seconds(minutes))
}

fn read_u16<A>(regs: &A, address: u8) -> Result<u16, A::Error>
where
    A: RegisterAccess,
{
    regs.read_u16(address).map_err(|e| {
        logger::error!("Failed to read register {:#x}", address);
        e
    })
}

fn read_i16<A>(regs: &A, address: u8) -> Result<i16, A::Error>
where
    A: RegisterAccess,
{
    regs.read_i16(address).map_err(|e| {
        logger::error!("Failed to read register {:#x}", address);
        e
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const BITS: FlagBits = FlagBits {
        ac_present: 1 << 9,
        discharging: 1 << 0,
        critical: 1 << 1,
    };

    #[test]
    fn ac_present_wins_over_discharging() {
        assert_eq!(BITS.power_state(0x0201), PowerState::OnLine);
    }

    #[test]
    fn discharging_wins_over_critical() {
        assert_eq!(BITS.power_state(0x0003), PowerState::Discharging);
    }

    #[test]
    fn critical_alone() {
        assert_eq!(BITS.power_state(0x0002), PowerState::Critical);
    }

    #[test]
    fn no_flags_means_charging() {
        assert_eq!(BITS.power_state(0x0000), PowerState::Charging);
        assert_eq!(BITS.power_state(0x0100), PowerState::Charging);
    }
}
