//! Battery session and the callback contract of the battery class.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};

use crate::{
    gauge::Gauge,
    info::{
        BatteryNotify, BatteryStatus, Information, InformationLevel, BATTERY_TAG_INVALID,
    },
    set::{SetInformation, SetLevel},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The gauge failed to talk to the hardware.
    Transport(E),
    /// The caller's tag does not match the fitted battery.
    NoSuchDevice,
    /// The output buffer is missing or shorter than `required` bytes.
    BufferTooSmall { required: usize },
    NotSupported,
    InvalidParameter,
}

impl<E> Error<E> {
    pub const fn name(&self) -> &'static str {
        match self {
            Error::Transport(_) => "Transport",
            Error::NoSuchDevice => "NoSuchDevice",
            Error::BufferTooSmall { .. } => "BufferTooSmall",
            Error::NotSupported => "NotSupported",
            Error::InvalidParameter => "InvalidParameter",
        }
    }
}

struct DeviceState<G> {
    tag: u32,
    gauge: G,
}

impl<G> DeviceState<G>
where
    G: Gauge,
{
    fn check_tag(&self, tag: u32) -> Result<(), Error<G::Error>> {
        if self.tag == BATTERY_TAG_INVALID || tag != self.tag {
            logger::warn!("Tag mismatch: requested {}, current {}", tag, self.tag);
            return Err(Error::NoSuchDevice);
        }

        Ok(())
    }

    fn query(&mut self, level: InformationLevel, at_rate: i32) -> Result<Information, G::Error> {
        let gauge = &mut self.gauge;

        let information = match level {
            InformationLevel::Information => Information::Battery(gauge.information()?),
            InformationLevel::Granularity => Information::Granularity(gauge.granularity()?),
            InformationLevel::Temperature => Information::Temperature(gauge.temperature()?),
            InformationLevel::EstimatedTime => {
                Information::EstimatedTime(gauge.estimated_time(at_rate)?)
            }
            InformationLevel::DeviceName => Information::Text(gauge.identity()?.device_name),
            InformationLevel::ManufactureDate => {
                Information::ManufactureDate(gauge.identity()?.manufacture_date)
            }
            InformationLevel::ManufactureName => {
                Information::Text(gauge.identity()?.manufacture_name)
            }
            InformationLevel::UniqueId => Information::Text(gauge.identity()?.unique_id),
            InformationLevel::SerialNumber => Information::Text(gauge.identity()?.serial_number),
        };

        Ok(information)
    }
}

fn leave<T, E>(operation: &str, result: Result<T, Error<E>>) -> Result<T, Error<E>> {
    match &result {
        Ok(_) => logger::debug!("Leaving {}: Ok", operation),
        Err(e) => logger::debug!("Leaving {}: {}", operation, e.name()),
    }
    result
}

/// One battery exposed to the battery class.
///
/// All callbacks run under a single lock, so a callback never observes another
/// one half way through, and tag changes are atomic with respect to them.
pub struct BatteryDevice<R, G>
where
    R: RawMutex,
{
    state: Mutex<R, RefCell<DeviceState<G>>>,
}

impl<R, G> BatteryDevice<R, G>
where
    R: RawMutex,
    G: Gauge,
{
    /// Creates a device with no battery present.
    pub fn new(gauge: G) -> Self {
        Self {
            state: Mutex::new(RefCell::new(DeviceState {
                tag: BATTERY_TAG_INVALID,
                gauge,
            })),
        }
    }

    /// Marks the battery as (re)fitted by assigning a fresh tag.
    pub fn prepare_hardware(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.tag = next_tag(state.tag);
            logger::info!("Battery tag is now {}", state.tag);
        })
    }

    /// Changes the gauge's static properties. Callers holding the old tag are
    /// rejected afterwards.
    pub fn update_static_properties<U>(&self, update: impl FnOnce(&mut G) -> U) -> U {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let result = update(&mut state.gauge);
            state.tag = next_tag(state.tag);
            logger::info!("Static properties changed, battery tag is now {}", state.tag);
            result
        })
    }

    /// Runs `f` on the gauge without changing the tag.
    pub fn with_gauge<U>(&self, f: impl FnOnce(&mut G) -> U) -> U {
        self.state.lock(|state| f(&mut state.borrow_mut().gauge))
    }

    pub fn query_tag(&self) -> Result<u32, Error<G::Error>> {
        let result = self.state.lock(|state| -> Result<_, Error<G::Error>> {
            let tag = state.borrow().tag;
            if tag == BATTERY_TAG_INVALID {
                Err(Error::NoSuchDevice)
            } else {
                Ok(tag)
            }
        });

        leave("query_tag", result)
    }

    /// Writes the value of `level` into `buffer` and returns its length.
    ///
    /// `at_rate` only matters for the estimated time level.
    pub fn query_information(
        &self,
        tag: u32,
        level: u32,
        at_rate: i32,
        buffer: Option<&mut [u8]>,
    ) -> Result<usize, Error<G::Error>> {
        logger::debug!("Query for information level {:#x}", level);

        let result = self.state.lock(|state| -> Result<_, Error<G::Error>> {
            let mut state = state.borrow_mut();
            state.check_tag(tag)?;

            let level = InformationLevel::try_from(level).map_err(|_| Error::InvalidParameter)?;
            let information = state.query(level, at_rate).map_err(|e| {
                logger::error!("Failed to query {:?}", level);
                Error::Transport(e)
            })?;

            let required = information.encoded_len();
            match buffer {
                Some(buffer) if buffer.len() >= required => Ok(information.encode(buffer)),
                _ => Err(Error::BufferTooSmall { required }),
            }
        });

        leave("query_information", result)
    }

    /// Validates and acknowledges a set request. Nothing is sent to the
    /// gauge.
    pub fn set_information(
        &self,
        tag: u32,
        level: u32,
        buffer: Option<&[u8]>,
    ) -> Result<(), Error<G::Error>> {
        let result = self.state.lock(|state| -> Result<_, Error<G::Error>> {
            state.borrow().check_tag(tag)?;

            let level = SetLevel::try_from(level).map_err(|level| {
                logger::warn!("Unknown set information level {}", level);
                Error::NotSupported
            })?;

            if !G::SET_LEVELS.contains(level) {
                logger::warn!("Set information level {:?} is not supported", level);
                return Err(Error::NotSupported);
            }

            let request = SetInformation::parse(level, buffer).map_err(|e| {
                logger::warn!("Invalid payload for {:?}: {:?}", level, e);
                Error::InvalidParameter
            })?;
            request.log();

            Ok(())
        });

        leave("set_information", result)
    }

    pub fn query_status(&self, tag: u32) -> Result<BatteryStatus, Error<G::Error>> {
        let result = self.state.lock(|state| -> Result<_, Error<G::Error>> {
            let mut state = state.borrow_mut();
            state.check_tag(tag)?;

            state.gauge.status().map_err(|e| {
                logger::error!("Failed to query battery status");
                Error::Transport(e)
            })
        });

        leave("query_status", result)
    }

    /// Status notifications are not implemented.
    pub fn set_status_notify(
        &self,
        tag: u32,
        notify: &BatteryNotify,
    ) -> Result<(), Error<G::Error>> {
        let result = self.state.lock(|state| -> Result<_, Error<G::Error>> {
            state.borrow().check_tag(tag)?;

            logger::debug!(
                "Status notify requested: power state {:#x}, low {}, high {}",
                notify.power_state,
                notify.low_capacity,
                notify.high_capacity
            );
            Err(Error::NotSupported)
        });

        leave("set_status_notify", result)
    }

    pub fn disable_status_notify(&self) -> Result<(), Error<G::Error>> {
        leave("disable_status_notify", Err(Error::NotSupported))
    }

    pub fn into_gauge(self) -> G {
        self.state.into_inner().into_inner().gauge
    }
}

const fn next_tag(tag: u32) -> u32 {
    match tag.wrapping_add(1) {
        BATTERY_TAG_INVALID => BATTERY_TAG_INVALID.wrapping_add(1),
        tag => tag,
    }
}
