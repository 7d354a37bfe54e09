//! BQ27541 single cell gauge.
//!
//! Capacities and rates are reported in mAh / mA and converted to mWh / mW
//! assuming a fixed nominal cell voltage.

use enumset::{enum_set, EnumSet};
use register_access::RegisterAccess;

use crate::{
    gauge::{
        read_i16, read_u16, time_to_empty, BatteryIdentity, FlagBits, Gauge, IdentitySource,
        StaticIdentity,
    },
    info::{
        BatteryInformation, BatteryStatus, Capability, ReportingScale, BATTERY_UNKNOWN_TIME,
        TECHNOLOGY_RECHARGEABLE,
    },
    set::SetLevel,
};

pub mod registers {
    pub const TEMPERATURE: u8 = 0x02;
    pub const VOLTAGE: u8 = 0x04;
    pub const FLAGS: u8 = 0x06;
    pub const REMAINING_CAPACITY: u8 = 0x08;
    pub const FULL_CHARGE_CAPACITY: u8 = 0x0A;
    pub const TIME_TO_EMPTY: u8 = 0x0C;
    pub const AVERAGE_CURRENT: u8 = 0x10;
    pub const CYCLE_COUNT: u8 = 0x2A;
    pub const DESIGN_CAPACITY: u8 = 0x3C;
}

pub const FLAG_BITS: FlagBits = FlagBits {
    ac_present: 1 << 9,
    discharging: 1 << 0,
    critical: 1 << 1,
};

/// mV
pub const NOMINAL_VOLTAGE: u32 = 3870;

/// Percent of the full charge capacity.
pub const ALERT1_PERCENT: u32 = 7;
/// Percent of the full charge capacity.
pub const ALERT2_PERCENT: u32 = 9;

pub const CAPABILITIES: EnumSet<Capability> = enum_set!(
    Capability::SystemBattery
        | Capability::SetChargeSupported
        | Capability::SetDischargeSupported
        | Capability::SetChargingSourceSupported
        | Capability::SetChargerIdSupported
);

/// Converts a mAh register value to mWh.
///
/// ```rust
/// # use fuel_gauge_miniclass::gauge::bq27541::raw_to_mwh;
/// assert_eq!(raw_to_mwh(0), 0);
/// assert_eq!(raw_to_mwh(1000), 3870);
/// assert_eq!(raw_to_mwh(1), 3);
/// assert_eq!(raw_to_mwh(0xFFFF), 253_620);
/// ```
#[inline]
pub const fn raw_to_mwh(raw: u16) -> u32 {
    raw as u32 * NOMINAL_VOLTAGE / 1000
}

/// Converts a signed mA register value to mW, truncating toward zero.
///
/// ```rust
/// # use fuel_gauge_miniclass::gauge::bq27541::raw_rate_to_mw;
/// assert_eq!(raw_rate_to_mw(1000), 3870);
/// assert_eq!(raw_rate_to_mw(-1000), -3870);
/// assert_eq!(raw_rate_to_mw(-1), -3);
/// ```
#[inline]
pub const fn raw_rate_to_mw(raw: i16) -> i32 {
    raw as i32 * NOMINAL_VOLTAGE as i32 / 1000
}

pub struct Bq27541<A, I = StaticIdentity> {
    regs: A,
    identity: I,
}

impl<A> Bq27541<A, StaticIdentity>
where
    A: RegisterAccess,
{
    pub fn new(regs: A) -> Self {
        Self::with_identity(regs, StaticIdentity::default())
    }
}

impl<A, I> Bq27541<A, I>
where
    A: RegisterAccess,
    I: IdentitySource<A>,
{
    pub fn with_identity(regs: A, identity: I) -> Self {
        Self { regs, identity }
    }
}

impl<A, I> Gauge for Bq27541<A, I>
where
    A: RegisterAccess,
    I: IdentitySource<A>,
{
    type Error = A::Error;

    const SET_LEVELS: EnumSet<SetLevel> = enum_set!(
        SetLevel::Charge
            | SetLevel::Discharge
            | SetLevel::ChargingSource
            | SetLevel::CriticalBias
            | SetLevel::ChargerId
            | SetLevel::ChargerStatus
    );

    fn status(&mut self) -> Result<BatteryStatus, A::Error> {
        let flags = read_u16(&self.regs, registers::FLAGS)?;
        let capacity = read_u16(&self.regs, registers::REMAINING_CAPACITY)?;
        let voltage = read_u16(&self.regs, registers::VOLTAGE)?;
        let rate = read_i16(&self.regs, registers::AVERAGE_CURRENT)?;

        let status = BatteryStatus {
            power_state: FLAG_BITS.power_state(flags),
            capacity: raw_to_mwh(capacity),
            voltage: voltage as u32,
            rate: raw_rate_to_mw(rate),
        };

        logger::debug!(
            "BQ27541 status: {:?}, {} mWh, {} mV, {} mW",
            status.power_state,
            status.capacity,
            status.voltage,
            status.rate
        );

        Ok(status)
    }

    fn information(&mut self) -> Result<BatteryInformation, A::Error> {
        let identity = self.identity.identity(&self.regs)?;
        let designed_capacity = raw_to_mwh(read_u16(&self.regs, registers::DESIGN_CAPACITY)?);
        let full_charged_capacity =
            raw_to_mwh(read_u16(&self.regs, registers::FULL_CHARGE_CAPACITY)?);
        let cycle_count = read_u16(&self.regs, registers::CYCLE_COUNT)?;

        logger::debug!(
            "BQ27541 design capacity: {} mWh, full charge: {} mWh, cycles: {}",
            designed_capacity,
            full_charged_capacity,
            cycle_count
        );

        Ok(BatteryInformation {
            capabilities: CAPABILITIES,
            technology: TECHNOLOGY_RECHARGEABLE,
            chemistry: identity.chemistry,
            designed_capacity,
            full_charged_capacity,
            default_alert1: full_charged_capacity * ALERT1_PERCENT / 100,
            default_alert2: full_charged_capacity * ALERT2_PERCENT / 100,
            critical_bias: 0,
            cycle_count: cycle_count as u32,
        })
    }

    fn estimated_time(&mut self, at_rate: i32) -> Result<u32, A::Error> {
        if at_rate != 0 {
            return Ok(BATTERY_UNKNOWN_TIME);
        }

        time_to_empty(
            &self.regs,
            &FLAG_BITS,
            registers::FLAGS,
            registers::TIME_TO_EMPTY,
        )
    }

    fn granularity(&mut self) -> Result<ReportingScale, A::Error> {
        let capacity = read_u16(&self.regs, registers::FULL_CHARGE_CAPACITY)?;

        Ok(ReportingScale {
            granularity: 1,
            capacity: raw_to_mwh(capacity),
        })
    }

    fn temperature(&mut self) -> Result<u32, A::Error> {
        read_u16(&self.regs, registers::TEMPERATURE).map(u32::from)
    }

    fn identity(&mut self) -> Result<BatteryIdentity, A::Error> {
        self.identity.identity(&self.regs)
    }
}
