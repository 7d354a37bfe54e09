//! Platform resources handed to the driver when hardware is prepared.

use crate::transport::{
    ConnectionId, ResourceHub, SpbTransport, TransferAllocator, TransportError,
};
use embassy_sync::blocking_mutex::raw::RawMutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionClass {
    Gpio,
    Serial,
    FunctionConfig,
    Other(u8),
}

impl From<u8> for ConnectionClass {
    fn from(value: u8) -> Self {
        match value {
            0x01 => ConnectionClass::Gpio,
            0x02 => ConnectionClass::Serial,
            0x03 => ConnectionClass::FunctionConfig,
            other => ConnectionClass::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialConnection {
    I2c,
    Spi,
    Uart,
    Other(u8),
}

impl From<u8> for SerialConnection {
    fn from(value: u8) -> Self {
        match value {
            0x01 => SerialConnection::I2c,
            0x02 => SerialConnection::Spi,
            0x03 => SerialConnection::Uart,
            other => SerialConnection::Other(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceDescriptor {
    Memory { start: u64, length: u32 },
    Interrupt { vector: u32 },
    Connection {
        class: ConnectionClass,
        /// Class specific connection type, see [`SerialConnection`].
        kind: u8,
        id: ConnectionId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResourceError {
    MissingI2cConnection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrepareError {
    Resources(ResourceError),
    Transport(TransportError),
}

/// Returns the connection id of the first I2C connection in `resources`.
pub fn find_i2c_connection(resources: &[ResourceDescriptor]) -> Result<ConnectionId, ResourceError> {
    let connection = resources.iter().find_map(|resource| match *resource {
        ResourceDescriptor::Connection {
            class: ConnectionClass::Serial,
            kind,
            id,
        } if SerialConnection::from(kind) == SerialConnection::I2c => Some(id),
        _ => None,
    });

    match connection {
        Some(id) => {
            logger::info!("I2C resource found with connection id: {:#x}", id.as_u64());
            Ok(id)
        }
        None => {
            logger::error!("No I2C connection resource");
            Err(ResourceError::MissingI2cConnection)
        }
    }
}

/// Locates the I2C connection in `resources` and opens a transport to it.
pub fn open_transport<R, H, A>(
    resources: &[ResourceDescriptor],
    hub: &mut H,
    allocator: A,
) -> Result<SpbTransport<R, H::Target, A>, PrepareError>
where
    R: RawMutex,
    H: ResourceHub,
    A: TransferAllocator,
{
    let connection = find_i2c_connection(resources).map_err(PrepareError::Resources)?;
    SpbTransport::open(hub, connection, allocator).map_err(PrepareError::Transport)
}
