//! Normalized battery records and their little endian wire layouts.

use core::fmt::{self, Write};

use byteorder::{ByteOrder, LittleEndian};
use enumset::{EnumSet, EnumSetType};

/// Tag value meaning "no battery present".
pub const BATTERY_TAG_INVALID: u32 = 0;

/// Estimated time value for "cannot be determined".
pub const BATTERY_UNKNOWN_TIME: u32 = 0xFFFF_FFFF;

/// Maximum length of an identity string in UTF-16 code units, terminator
/// included.
pub const MAX_BATTERY_STRING_SIZE: usize = 128;

/// Identity string, at most `MAX_BATTERY_STRING_SIZE - 1` ASCII characters.
pub type BatteryString = heapless::String<{ MAX_BATTERY_STRING_SIZE - 1 }>;

/// Technology value of rechargeable batteries.
pub const TECHNOLOGY_RECHARGEABLE: u8 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    OnLine,
    Discharging,
    Charging,
    Critical,
}

impl PowerState {
    pub const fn bits(self) -> u32 {
        match self {
            PowerState::OnLine => 0x0000_0001,
            PowerState::Discharging => 0x0000_0002,
            PowerState::Charging => 0x0000_0004,
            PowerState::Critical => 0x0000_0008,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryStatus {
    pub power_state: PowerState,
    /// Remaining capacity, mWh or relative units depending on the gauge.
    pub capacity: u32,
    /// mV
    pub voltage: u32,
    /// Charge (positive) or discharge (negative) rate.
    pub rate: i32,
}

#[derive(EnumSetType, Debug)]
pub enum Capability {
    SetChargeSupported = 0,
    SetDischargeSupported = 1,
    SetChargingSourceSupported = 2,
    SetChargerIdSupported = 3,
    IsShortTerm = 29,
    CapacityRelative = 30,
    SystemBattery = 31,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatteryInformation {
    pub capabilities: EnumSet<Capability>,
    pub technology: u8,
    pub chemistry: [u8; 4],
    pub designed_capacity: u32,
    pub full_charged_capacity: u32,
    pub default_alert1: u32,
    pub default_alert2: u32,
    pub critical_bias: u32,
    pub cycle_count: u32,
}

impl BatteryInformation {
    pub const ENCODED_LEN: usize = 36;

    fn encode(&self, out: &mut [u8]) {
        LittleEndian::write_u32(&mut out[0..4], self.capabilities.as_u32());
        out[4] = self.technology;
        out[5..8].fill(0);
        out[8..12].copy_from_slice(&self.chemistry);
        LittleEndian::write_u32(&mut out[12..16], self.designed_capacity);
        LittleEndian::write_u32(&mut out[16..20], self.full_charged_capacity);
        LittleEndian::write_u32(&mut out[20..24], self.default_alert1);
        LittleEndian::write_u32(&mut out[24..28], self.default_alert2);
        LittleEndian::write_u32(&mut out[28..32], self.critical_bias);
        LittleEndian::write_u32(&mut out[32..36], self.cycle_count);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportingScale {
    pub granularity: u32,
    pub capacity: u32,
}

impl ReportingScale {
    pub const ENCODED_LEN: usize = 8;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ManufactureDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl ManufactureDate {
    pub const ENCODED_LEN: usize = 4;
}

/// Requested status change notification thresholds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryNotify {
    pub power_state: u32,
    pub low_capacity: u32,
    pub high_capacity: u32,
}

/// Value produced by an information query, ready to be encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Information {
    Battery(BatteryInformation),
    Granularity(ReportingScale),
    /// 0.1 K
    Temperature(u32),
    /// Seconds, or [`BATTERY_UNKNOWN_TIME`].
    EstimatedTime(u32),
    ManufactureDate(ManufactureDate),
    Text(BatteryString),
}

impl Information {
    /// Number of bytes [`Information::encode`] writes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Information::Battery(_) => BatteryInformation::ENCODED_LEN,
            Information::Granularity(_) => ReportingScale::ENCODED_LEN,
            Information::Temperature(_) | Information::EstimatedTime(_) => 4,
            Information::ManufactureDate(_) => ManufactureDate::ENCODED_LEN,
            Information::Text(text) => (text.encode_utf16().count() + 1) * 2,
        }
    }

    /// Encodes the value into `out`, which must hold at least
    /// [`Information::encoded_len`] bytes. Returns the number of bytes
    /// written.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let len = self.encoded_len();
        let out = &mut out[..len];

        match self {
            Information::Battery(info) => info.encode(out),
            Information::Granularity(scale) => {
                LittleEndian::write_u32(&mut out[0..4], scale.granularity);
                LittleEndian::write_u32(&mut out[4..8], scale.capacity);
            }
            Information::Temperature(value) | Information::EstimatedTime(value) => {
                LittleEndian::write_u32(out, *value)
            }
            Information::ManufactureDate(date) => {
                out[0] = date.day;
                out[1] = date.month;
                LittleEndian::write_u16(&mut out[2..4], date.year);
            }
            Information::Text(text) => {
                let mut chunks = out.chunks_exact_mut(2);
                for (unit, chunk) in text.encode_utf16().zip(&mut chunks) {
                    LittleEndian::write_u16(chunk, unit);
                }
                for chunk in chunks {
                    chunk.fill(0);
                }
            }
        }

        len
    }
}

/// Query levels of the information callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InformationLevel {
    Information,
    Granularity,
    Temperature,
    EstimatedTime,
    DeviceName,
    ManufactureDate,
    ManufactureName,
    UniqueId,
    SerialNumber,
}

impl TryFrom<u32> for InformationLevel {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, u32> {
        let level = match value {
            0 => InformationLevel::Information,
            1 => InformationLevel::Granularity,
            2 => InformationLevel::Temperature,
            3 => InformationLevel::EstimatedTime,
            4 => InformationLevel::DeviceName,
            5 => InformationLevel::ManufactureDate,
            6 => InformationLevel::ManufactureName,
            7 => InformationLevel::UniqueId,
            8 => InformationLevel::SerialNumber,
            _ => return Err(value),
        };

        Ok(level)
    }
}

struct Truncating<'a>(&'a mut BatteryString);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Formats `args` into a [`BatteryString`], dropping whatever does not fit.
pub fn format_battery_string(args: fmt::Arguments<'_>) -> BatteryString {
    let mut text = BatteryString::new();
    _ = Truncating(&mut text).write_fmt(args);
    text
}

/// Copies `text` into a [`BatteryString`], dropping whatever does not fit.
pub fn battery_string(text: &str) -> BatteryString {
    format_battery_string(format_args!("{}", text))
}
