//! Set-information requests and their payload shapes.

use byteorder::{ByteOrder, LittleEndian};
use enumset::EnumSetType;

#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetLevel {
    CriticalBias = 0,
    Charge = 1,
    Discharge = 2,
    ChargingSource = 3,
    ChargerId = 4,
    ChargerStatus = 5,
}

impl TryFrom<u32> for SetLevel {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, u32> {
        let level = match value {
            0 => SetLevel::CriticalBias,
            1 => SetLevel::Charge,
            2 => SetLevel::Discharge,
            3 => SetLevel::ChargingSource,
            4 => SetLevel::ChargerId,
            5 => SetLevel::ChargerStatus,
            _ => return Err(value),
        };

        Ok(level)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargingSourceType {
    Ac,
    Usb,
    Wireless,
    Other(u32),
}

impl From<u32> for ChargingSourceType {
    fn from(value: u32) -> Self {
        match value {
            1 => ChargingSourceType::Ac,
            2 => ChargingSourceType::Usb,
            3 => ChargingSourceType::Wireless,
            other => ChargingSourceType::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargingSource {
    pub source_type: ChargingSourceType,
    /// mA
    pub max_current: u32,
}

/// A decoded set-information request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetInformation {
    /// mW
    CriticalBias(u32),
    Charge,
    Discharge,
    ChargingSource(ChargingSource),
    ChargerId([u8; 16]),
    ChargerStatus(ChargingSourceType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    Missing,
    TooShort { required: usize, received: usize },
}

fn require(buffer: Option<&[u8]>, required: usize) -> Result<&[u8], PayloadError> {
    let buffer = buffer.ok_or(PayloadError::Missing)?;
    if buffer.len() < required {
        return Err(PayloadError::TooShort {
            required,
            received: buffer.len(),
        });
    }

    Ok(&buffer[..required])
}

impl SetInformation {
    /// Decodes the payload accompanying a request at `level`.
    ///
    /// Charge and discharge take no payload. Every other level needs a
    /// buffer at least as long as its record.
    pub fn parse(level: SetLevel, buffer: Option<&[u8]>) -> Result<Self, PayloadError> {
        let request = match level {
            SetLevel::Charge => SetInformation::Charge,
            SetLevel::Discharge => SetInformation::Discharge,
            SetLevel::CriticalBias => {
                let payload = require(buffer, 4)?;
                SetInformation::CriticalBias(LittleEndian::read_u32(payload))
            }
            SetLevel::ChargingSource => {
                let payload = require(buffer, 8)?;
                SetInformation::ChargingSource(ChargingSource {
                    source_type: LittleEndian::read_u32(&payload[0..4]).into(),
                    max_current: LittleEndian::read_u32(&payload[4..8]),
                })
            }
            SetLevel::ChargerId => {
                let payload = require(buffer, 16)?;
                let mut guid = [0; 16];
                guid.copy_from_slice(payload);
                SetInformation::ChargerId(guid)
            }
            SetLevel::ChargerStatus => {
                let payload = require(buffer, 4)?;
                SetInformation::ChargerStatus(LittleEndian::read_u32(payload).into())
            }
        };

        Ok(request)
    }

    pub fn level(&self) -> SetLevel {
        match self {
            SetInformation::CriticalBias(_) => SetLevel::CriticalBias,
            SetInformation::Charge => SetLevel::Charge,
            SetInformation::Discharge => SetLevel::Discharge,
            SetInformation::ChargingSource(_) => SetLevel::ChargingSource,
            SetInformation::ChargerId(_) => SetLevel::ChargerId,
            SetInformation::ChargerStatus(_) => SetLevel::ChargerStatus,
        }
    }

    /// Writes the request to the log.
    pub fn log(&self) {
        match self {
            SetInformation::CriticalBias(bias) => {
                logger::info!("Set critical bias: {} mW", bias)
            }
            SetInformation::Charge => logger::info!("Set charge"),
            SetInformation::Discharge => logger::info!("Set discharge"),
            SetInformation::ChargingSource(source) => logger::info!(
                "Set charging source: {:?}, max current {} mA",
                source.source_type,
                source.max_current
            ),
            SetInformation::ChargerId(guid) => logger::info!("Set charger id: {:?}", guid),
            SetInformation::ChargerStatus(source_type) => {
                logger::info!("Set charger status: {:?}", source_type)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn charge_and_discharge_need_no_payload() {
        assert_eq!(
            SetInformation::parse(SetLevel::Charge, None),
            Ok(SetInformation::Charge)
        );
        assert_eq!(
            SetInformation::parse(SetLevel::Discharge, None),
            Ok(SetInformation::Discharge)
        );
    }

    #[test]
    fn charging_source_is_decoded() {
        let payload = [2, 0, 0, 0, 0xDC, 0x05, 0, 0];

        assert_eq!(
            SetInformation::parse(SetLevel::ChargingSource, Some(&payload)),
            Ok(SetInformation::ChargingSource(ChargingSource {
                source_type: ChargingSourceType::Usb,
                max_current: 1500,
            }))
        );
    }

    #[test]
    fn missing_payload_is_rejected() {
        assert_eq!(
            SetInformation::parse(SetLevel::CriticalBias, None),
            Err(PayloadError::Missing)
        );
    }

    #[test]
    fn short_payload_is_rejected() {
        assert_eq!(
            SetInformation::parse(SetLevel::ChargerId, Some(&[0; 15])),
            Err(PayloadError::TooShort {
                required: 16,
                received: 15
            })
        );
    }

    #[test]
    fn unknown_source_types_are_kept() {
        let payload = [9, 0, 0, 0];

        assert_eq!(
            SetInformation::parse(SetLevel::ChargerStatus, Some(&payload)),
            Ok(SetInformation::ChargerStatus(ChargingSourceType::Other(9)))
        );
    }

    #[test]
    fn parsed_requests_keep_their_level() {
        for (level, payload) in [
            (SetLevel::CriticalBias, &[0u8; 4][..]),
            (SetLevel::Charge, &[][..]),
            (SetLevel::Discharge, &[][..]),
            (SetLevel::ChargingSource, &[0; 8][..]),
            (SetLevel::ChargerId, &[0; 16][..]),
            (SetLevel::ChargerStatus, &[0; 4][..]),
        ] {
            let request = SetInformation::parse(level, Some(payload)).unwrap();
            assert_eq!(request.level(), level);
        }
    }

    #[test]
    fn unknown_levels_do_not_map() {
        assert_eq!(SetLevel::try_from(5), Ok(SetLevel::ChargerStatus));
        assert_eq!(SetLevel::try_from(6), Err(6));
    }
}
