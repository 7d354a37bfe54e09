use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

use crate::transport::{ConnectionId, ResourceHub, SpbTarget, TransferAllocator};

struct BusState {
    registers: [u8; 256],
    pointer: u8,
    sends: usize,
    receives: usize,
    fail_sends: bool,
    fail_receives: bool,
    short_by: usize,
    frames: Vec<Vec<u8>>,
}

/// Register file behind an auto-incrementing register pointer, like the gauges.
pub struct MockBus {
    state: Mutex<BusState>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState {
                registers: [0; 256],
                pointer: 0,
                sends: 0,
                receives: 0,
                fail_sends: false,
                fail_receives: false,
                short_by: 0,
                frames: Vec::new(),
            }),
        }
    }

    pub fn set_u16(&self, address: u8, value: u16) {
        self.set_bytes(address, &value.to_le_bytes());
    }

    pub fn set_bytes(&self, address: u8, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (i, byte) in bytes.iter().enumerate() {
            state.registers[(address as usize + i) % 256] = *byte;
        }
    }

    pub fn bytes(&self, address: u8, len: usize) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        (0..len)
            .map(|i| state.registers[(address as usize + i) % 256])
            .collect()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn receives(&self) -> usize {
        self.state.lock().unwrap().receives
    }

    pub fn operations(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.sends + state.receives
    }

    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    pub fn fail_receives(&self) {
        self.state.lock().unwrap().fail_receives = true;
    }

    pub fn short_reads(&self, by: usize) {
        self.state.lock().unwrap().short_by = by;
    }
}

impl SpbTarget for &MockBus {
    fn send(&mut self, frame: &[u8]) -> Result<(), ErrorKind> {
        let mut state = self.state.lock().unwrap();
        state.sends += 1;
        state.frames.push(frame.to_vec());

        if state.fail_sends {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        state.pointer = frame[0];
        for (i, byte) in frame[1..].iter().enumerate() {
            let index = (state.pointer as usize + i) % 256;
            state.registers[index] = *byte;
        }

        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut state = self.state.lock().unwrap();
        state.receives += 1;

        if state.fail_receives {
            return Err(ErrorKind::Bus);
        }

        let received = buffer.len().saturating_sub(state.short_by);
        for (i, byte) in buffer[..received].iter_mut().enumerate() {
            *byte = state.registers[(state.pointer as usize + i) % 256];
        }

        Ok(received)
    }
}

pub struct MockHub<'a> {
    bus: &'a MockBus,
    opened: Option<ConnectionId>,
    fail: bool,
}

impl<'a> MockHub<'a> {
    pub fn new(bus: &'a MockBus) -> Self {
        Self {
            bus,
            opened: None,
            fail: false,
        }
    }

    pub fn failing(bus: &'a MockBus) -> Self {
        Self {
            fail: true,
            ..Self::new(bus)
        }
    }

    pub fn opened(&self) -> Option<ConnectionId> {
        self.opened
    }
}

impl<'a> ResourceHub for MockHub<'a> {
    type Target = &'a MockBus;

    fn open(&mut self, connection: ConnectionId) -> Result<&'a MockBus, ErrorKind> {
        if self.fail {
            return Err(ErrorKind::Other);
        }

        self.opened = Some(connection);
        Ok(self.bus)
    }
}

pub struct CountingAllocator {
    allocations: AtomicUsize,
    fail: bool,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self {
            allocations: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }
}

impl TransferAllocator for CountingAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        if self.fail {
            return None;
        }

        self.allocations.fetch_add(1, Ordering::Relaxed);
        Some(vec![0; len])
    }
}

pub fn init_logger() {
    _ = simple_logger::SimpleLogger::new().init();
}
