//! Synchronous register access over an exclusively owned I2C target.
//!
//! Every transaction goes through one of two scratch buffers sized for the
//! common case. Transfers that do not fit are staged in a buffer obtained from
//! the [`TransferAllocator`] and released when the transaction ends.

use alloc::vec::Vec;
use core::{
    cell::RefCell,
    ops::{Deref, DerefMut},
};

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::i2c::{ErrorKind, I2c};
use register_access::RegisterAccess;

/// Size of each pre-allocated scratch buffer, in bytes.
pub const DEFAULT_SCRATCH_SIZE: usize = 64;

/// Opaque bus connection identifier handed out by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId {
    pub low: u32,
    pub high: u32,
}

impl ConnectionId {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    pub const fn as_u64(self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }
}

/// A byte stream endpoint on the bus with a fixed slave address.
pub trait SpbTarget {
    /// Sends `frame` as a single write transfer.
    fn send(&mut self, frame: &[u8]) -> Result<(), ErrorKind>;

    /// Reads into `buffer`, returning the number of bytes the bus delivered.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, ErrorKind>;
}

/// Resolves connection identifiers to open bus targets.
pub trait ResourceHub {
    type Target: SpbTarget;

    fn open(&mut self, connection: ConnectionId) -> Result<Self::Target, ErrorKind>;
}

/// [`SpbTarget`] over a blocking `embedded-hal` I2C bus.
pub struct I2cTarget<I> {
    i2c: I,
    address: u8,
}

impl<I> I2cTarget<I> {
    /// Factory default slave address of the BQ27xxx gauges.
    pub const DEFAULT_ADDRESS: u8 = 0x55;

    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }
}

impl<I> SpbTarget for I2cTarget<I>
where
    I: I2c,
{
    fn send(&mut self, frame: &[u8]) -> Result<(), ErrorKind> {
        self.i2c
            .write(self.address, frame)
            .map_err(|e| embedded_hal::i2c::Error::kind(&e))
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, ErrorKind> {
        self.i2c
            .read(self.address, buffer)
            .map_err(|e| embedded_hal::i2c::Error::kind(&e))?;
        Ok(buffer.len())
    }
}

/// Source of temporary buffers for transfers larger than the scratch buffers.
pub trait TransferAllocator {
    /// Returns a zeroed buffer of exactly `len` bytes, or `None` when out of
    /// memory.
    fn allocate(&self, len: usize) -> Option<Vec<u8>>;
}

impl<A> TransferAllocator for &A
where
    A: TransferAllocator + ?Sized,
{
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        (**self).allocate(len)
    }
}

/// Allocates from the global heap without aborting on exhaustion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Heap;

impl TransferAllocator for Heap {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).ok()?;
        buffer.resize(len, 0);
        Some(buffer)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The bus target could not be opened.
    Open(ErrorKind),
    /// A send or receive was rejected by the bus.
    Bus(ErrorKind),
    /// The bus delivered fewer bytes than requested.
    ShortRead { expected: usize, received: usize },
    /// No memory for an oversized transfer buffer.
    Allocation { len: usize },
}

/// Transfer buffer valid for the duration of one transaction.
enum TransferBuffer<'a> {
    Scratch(&'a mut [u8]),
    Allocated(Vec<u8>),
}

impl<'a> TransferBuffer<'a> {
    fn acquire<const N: usize>(
        scratch: &'a mut [u8; N],
        len: usize,
        allocator: &impl TransferAllocator,
    ) -> Result<Self, TransportError> {
        if len <= N {
            return Ok(Self::Scratch(&mut scratch[..len]));
        }

        match allocator.allocate(len) {
            Some(buffer) => Ok(Self::Allocated(buffer)),
            None => {
                logger::error!("Error allocating {} bytes for Spb transfer", len);
                Err(TransportError::Allocation { len })
            }
        }
    }
}

impl Deref for TransferBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Scratch(buffer) => buffer,
            Self::Allocated(buffer) => buffer,
        }
    }
}

impl DerefMut for TransferBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match self {
            Self::Scratch(buffer) => buffer,
            Self::Allocated(buffer) => buffer,
        }
    }
}

struct SpbContext<T, A, const N: usize> {
    target: T,
    allocator: A,
    write_buffer: [u8; N],
    read_buffer: [u8; N],
}

impl<T, A, const N: usize> SpbContext<T, A, N>
where
    T: SpbTarget,
    A: TransferAllocator,
{
    /// Callers must hold the transport lock.
    fn write_unlocked(&mut self, address: u8, data: &[u8]) -> Result<(), TransportError> {
        let mut frame =
            TransferBuffer::acquire(&mut self.write_buffer, data.len() + 1, &self.allocator)?;

        frame[0] = address;
        frame[1..].copy_from_slice(data);

        logger::trace!("I2CWRITE: register {:#x}, {} bytes", address, data.len());

        self.target.send(&frame).map_err(|e| {
            logger::error!("Error writing to Spb register {:#x}: {:?}", address, e);
            TransportError::Bus(e)
        })
    }

    fn read_unlocked(&mut self, address: u8, data: &mut [u8]) -> Result<(), TransportError> {
        self.write_unlocked(address, &[]).map_err(|e| {
            logger::error!("Error setting address pointer for Spb read");
            e
        })?;

        let expected = data.len();
        let mut buffer = TransferBuffer::acquire(&mut self.read_buffer, expected, &self.allocator)?;

        let received = self.target.receive(&mut buffer).map_err(|e| {
            logger::error!("Error reading from Spb register {:#x}: {:?}", address, e);
            TransportError::Bus(e)
        })?;

        if received != expected {
            logger::error!(
                "Short read from Spb register {:#x}: {} of {} bytes",
                address,
                received,
                expected
            );
            return Err(TransportError::ShortRead { expected, received });
        }

        data.copy_from_slice(&buffer);

        Ok(())
    }
}

/// Serialized register access to one bus target.
pub struct SpbTransport<R, T, A = Heap, const N: usize = DEFAULT_SCRATCH_SIZE>
where
    R: RawMutex,
{
    context: Mutex<R, RefCell<SpbContext<T, A, N>>>,
}

impl<R, T, A, const N: usize> SpbTransport<R, T, A, N>
where
    R: RawMutex,
    T: SpbTarget,
    A: TransferAllocator,
{
    pub fn new(target: T, allocator: A) -> Self {
        Self {
            context: Mutex::new(RefCell::new(SpbContext {
                target,
                allocator,
                write_buffer: [0; N],
                read_buffer: [0; N],
            })),
        }
    }

    /// Opens the target behind `connection` and sets up the scratch buffers.
    pub fn open<H>(hub: &mut H, connection: ConnectionId, allocator: A) -> Result<Self, TransportError>
    where
        H: ResourceHub<Target = T>,
    {
        let target = hub.open(connection).map_err(|e| {
            logger::error!(
                "Error opening Spb target {:#x}: {:?}",
                connection.as_u64(),
                e
            );
            TransportError::Open(e)
        })?;

        Ok(Self::new(target, allocator))
    }

    /// Writes `data` to the registers starting at `address`.
    pub fn write(&self, address: u8, data: &[u8]) -> Result<(), TransportError> {
        self.context
            .lock(|context| context.borrow_mut().write_unlocked(address, data))
    }

    /// Reads `data.len()` bytes starting at `address`.
    pub fn read(&self, address: u8, data: &mut [u8]) -> Result<(), TransportError> {
        self.context
            .lock(|context| context.borrow_mut().read_unlocked(address, data))
    }

    pub fn into_target(self) -> T {
        self.context.into_inner().into_inner().target
    }
}

impl<R, T, A, const N: usize> RegisterAccess for SpbTransport<R, T, A, N>
where
    R: RawMutex,
    T: SpbTarget,
    A: TransferAllocator,
{
    type Error = TransportError;

    fn write_register(&self, address: u8, data: &[u8]) -> Result<(), TransportError> {
        self.write(address, data)
    }

    fn read_register(&self, address: u8, data: &mut [u8]) -> Result<(), TransportError> {
        self.read(address, data)
    }
}
