//! BQ27742 gauge.
//!
//! Capacities are passed through as relative values. The pack identity lives
//! in manufacturer info block A.

use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;
use enumset::{enum_set, EnumSet};
use register_access::{RegisterAccess, RegisterAccessExt};

use crate::{
    gauge::{
        read_i16, read_u16, time_to_empty, BatteryIdentity, FlagBits, Gauge, IdentitySource,
    },
    info::{
        battery_string, format_battery_string, BatteryInformation, BatteryStatus, Capability,
        ManufactureDate, ReportingScale, BATTERY_UNKNOWN_TIME, TECHNOLOGY_RECHARGEABLE,
    },
    set::SetLevel,
};

pub mod registers {
    pub const TEMPERATURE: u8 = 0x06;
    pub const VOLTAGE: u8 = 0x08;
    pub const FLAGS: u8 = 0x0A;
    pub const REMAINING_CAPACITY: u8 = 0x10;
    pub const FULL_CHARGE_CAPACITY: u8 = 0x12;
    pub const AVERAGE_CURRENT: u8 = 0x14;
    pub const TIME_TO_EMPTY: u8 = 0x16;
    pub const CYCLE_COUNT: u8 = 0x2A;
    pub const DESIGN_CAPACITY: u8 = 0x3C;
    pub const MANUFACTURER_INFO_CONTROL: u8 = 0x3F;
    pub const MANUFACTURER_INFO: u8 = 0x40;
}

pub const FLAG_BITS: FlagBits = FlagBits {
    ac_present: 1 << 9,
    discharging: 1 << 0,
    critical: 1 << 1,
};

pub const DEFAULT_ALERT1: u32 = 75;
pub const DEFAULT_ALERT2: u32 = 150;

pub const CAPABILITIES: EnumSet<Capability> =
    enum_set!(Capability::SystemBattery | Capability::CapacityRelative);

/// Selects block A in [`registers::MANUFACTURER_INFO_CONTROL`].
pub const MANUFACTURER_BLOCK_A: u8 = 0x01;
pub const MANUFACTURER_BLOCK_SIZE: usize = 32;
/// Time the gauge needs to swap the block into the data window.
pub const MANUFACTURER_BLOCK_SETTLE_MS: u32 = 1;

/// Decoded manufacturer info block A.
///
/// Layout, packed little endian: date (u16), serial (u32), name (3),
/// device name (8), chemistry (4). The rest of the block is unused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManufacturerInfo {
    pub date: u16,
    pub serial: u32,
    pub name: [u8; 3],
    pub device_name: [u8; 8],
    pub chemistry: [u8; 4],
}

impl ManufacturerInfo {
    pub fn parse(block: &[u8; MANUFACTURER_BLOCK_SIZE]) -> Self {
        let mut name = [0; 3];
        let mut device_name = [0; 8];
        let mut chemistry = [0; 4];

        name.copy_from_slice(&block[6..9]);
        device_name.copy_from_slice(&block[9..17]);
        chemistry.copy_from_slice(&block[17..21]);

        Self {
            date: LittleEndian::read_u16(&block[0..2]),
            serial: LittleEndian::read_u32(&block[2..6]),
            name,
            device_name,
            chemistry,
        }
    }

    pub fn identity(&self) -> BatteryIdentity {
        let name = field_str(&self.name);
        let device_name = field_str(&self.device_name);
        // The serial number is printed as a signed value.
        let serial = self.serial as i32;

        BatteryIdentity {
            manufacture_name: battery_string(name),
            device_name: battery_string(device_name),
            serial_number: format_battery_string(format_args!("{}", serial)),
            unique_id: format_battery_string(format_args!(
                "{}{}{}{}",
                name, device_name, self.date, serial
            )),
            manufacture_date: ManufactureDate {
                day: 0,
                month: 0,
                year: self.date,
            },
            chemistry: self.chemistry,
        }
    }
}

/// Text of a fixed size field, up to the first NUL or invalid byte.
fn field_str(field: &[u8]) -> &str {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    let field = &field[..end];

    match core::str::from_utf8(field) {
        Ok(text) => text,
        Err(e) => core::str::from_utf8(&field[..e.valid_up_to()]).unwrap_or_default(),
    }
}

/// Reads the identity from manufacturer info block A on every request.
pub struct ManufacturerBlock<D> {
    delay: D,
}

impl<D> ManufacturerBlock<D>
where
    D: DelayNs,
{
    pub fn new(delay: D) -> Self {
        Self { delay }
    }

    pub fn read<A>(&mut self, regs: &A) -> Result<ManufacturerInfo, A::Error>
    where
        A: RegisterAccess,
    {
        regs.write_u8(registers::MANUFACTURER_INFO_CONTROL, MANUFACTURER_BLOCK_A)
            .map_err(|e| {
                logger::error!("Failed to select manufacturer block A");
                e
            })?;

        self.delay.delay_ms(MANUFACTURER_BLOCK_SETTLE_MS);

        let mut block = [0; MANUFACTURER_BLOCK_SIZE];
        regs.read_register(registers::MANUFACTURER_INFO, &mut block)
            .map_err(|e| {
                logger::error!("Failed to read manufacturer block A");
                e
            })?;

        Ok(ManufacturerInfo::parse(&block))
    }
}

impl<A, D> IdentitySource<A> for ManufacturerBlock<D>
where
    A: RegisterAccess,
    D: DelayNs,
{
    fn identity(&mut self, regs: &A) -> Result<BatteryIdentity, A::Error> {
        self.read(regs).map(|info| info.identity())
    }
}

pub struct Bq27742<A, I> {
    regs: A,
    identity: I,
}

impl<A, D> Bq27742<A, ManufacturerBlock<D>>
where
    A: RegisterAccess,
    D: DelayNs,
{
    pub fn new(regs: A, delay: D) -> Self {
        Self::with_identity(regs, ManufacturerBlock::new(delay))
    }
}

impl<A, I> Bq27742<A, I>
where
    A: RegisterAccess,
    I: IdentitySource<A>,
{
    pub fn with_identity(regs: A, identity: I) -> Self {
        Self { regs, identity }
    }
}

impl<A, I> Gauge for Bq27742<A, I>
where
    A: RegisterAccess,
    I: IdentitySource<A>,
{
    type Error = A::Error;

    const SET_LEVELS: EnumSet<SetLevel> = enum_set!(SetLevel::ChargingSource);

    fn status(&mut self) -> Result<BatteryStatus, A::Error> {
        let flags = read_u16(&self.regs, registers::FLAGS)?;
        let capacity = read_u16(&self.regs, registers::REMAINING_CAPACITY)?;
        let voltage = read_u16(&self.regs, registers::VOLTAGE)?;
        let rate = read_i16(&self.regs, registers::AVERAGE_CURRENT)?;

        let status = BatteryStatus {
            power_state: FLAG_BITS.power_state(flags),
            capacity: capacity as u32,
            voltage: voltage as u32,
            rate: rate as i32,
        };

        logger::debug!(
            "BQ27742 status: {:?}, capacity {}, {} mV, rate {}",
            status.power_state,
            status.capacity,
            status.voltage,
            status.rate
        );

        Ok(status)
    }

    fn information(&mut self) -> Result<BatteryInformation, A::Error> {
        let identity = self.identity.identity(&self.regs)?;
        let designed_capacity = read_u16(&self.regs, registers::DESIGN_CAPACITY)?;
        let full_charged_capacity = read_u16(&self.regs, registers::FULL_CHARGE_CAPACITY)?;
        let cycle_count = read_u16(&self.regs, registers::CYCLE_COUNT)?;

        Ok(BatteryInformation {
            capabilities: CAPABILITIES,
            technology: TECHNOLOGY_RECHARGEABLE,
            chemistry: identity.chemistry,
            designed_capacity: designed_capacity as u32,
            full_charged_capacity: full_charged_capacity as u32,
            default_alert1: DEFAULT_ALERT1,
            default_alert2: DEFAULT_ALERT2,
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
            capacity: capacity as u32,
        })
    }

    fn temperature(&mut self) -> Result<u32, A::Error> {
        read_u16(&self.regs, registers::TEMPERATURE).map(u32::from)
    }

    fn identity(&mut self) -> Result<BatteryIdentity, A::Error> {
        self.identity.identity(&self.regs)
    }
}

#[cfg(test)]
mod test {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    use super::*;
    use crate::{
        info::PowerState,
        test_util::MockBus,
        transport::{Heap, SpbTransport},
    };

    type Transport<'a> = SpbTransport<NoopRawMutex, &'a MockBus>;

    fn gauge(bus: &MockBus) -> Bq27742<Transport<'_>, ManufacturerBlock<NoopDelay>> {
        Bq27742::new(SpbTransport::new(bus, Heap), NoopDelay::new())
    }

    fn block() -> [u8; MANUFACTURER_BLOCK_SIZE] {
        let mut block = [0; MANUFACTURER_BLOCK_SIZE];
        block[0..2].copy_from_slice(&2019u16.to_le_bytes());
        block[2..6].copy_from_slice(&12345u32.to_le_bytes());
        block[6..9].copy_from_slice(b"SNY");
        block[9..17].copy_from_slice(b"SURF3\0\0\0");
        block[17..21].copy_from_slice(b"LIP ");
        block
    }

    #[test]
    fn manufacturer_block_is_parsed() {
        let info = ManufacturerInfo::parse(&block());

        assert_eq!(info.date, 2019);
        assert_eq!(info.serial, 12345);
        assert_eq!(&info.name, b"SNY");
        assert_eq!(&info.chemistry, b"LIP ");
    }

    #[test]
    fn identity_strings_come_from_the_block() {
        let identity = ManufacturerInfo::parse(&block()).identity();

        assert_eq!(identity.manufacture_name.as_str(), "SNY");
        assert_eq!(identity.device_name.as_str(), "SURF3");
        assert_eq!(identity.serial_number.as_str(), "12345");
        assert_eq!(identity.unique_id.as_str(), "SNYSURF3201912345");
        assert_eq!(
            identity.manufacture_date,
            ManufactureDate {
                day: 0,
                month: 0,
                year: 2019
            }
        );
    }

    #[test]
    fn serial_number_is_signed() {
        let mut raw = block();
        raw[2..6].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());

        let identity = ManufacturerInfo::parse(&raw).identity();

        assert_eq!(identity.serial_number.as_str(), "-1");
    }

    #[test]
    fn unterminated_fields_use_their_full_width() {
        let mut raw = block();
        raw[9..17].copy_from_slice(b"ABCDEFGH");

        let identity = ManufacturerInfo::parse(&raw).identity();

        assert_eq!(identity.device_name.as_str(), "ABCDEFGH");
    }

    #[test]
    fn identity_selects_block_before_reading() {
        let bus = MockBus::new();
        bus.set_bytes(registers::MANUFACTURER_INFO, &block());

        let identity = gauge(&bus).identity().unwrap();

        assert_eq!(identity.unique_id.as_str(), "SNYSURF3201912345");
        assert_eq!(
            bus.frames(),
            vec![
                vec![registers::MANUFACTURER_INFO_CONTROL, MANUFACTURER_BLOCK_A],
                vec![registers::MANUFACTURER_INFO],
            ]
        );
    }

    #[test]
    fn status_is_not_converted() {
        let bus = MockBus::new();
        bus.set_u16(registers::FLAGS, 0x0201);
        bus.set_u16(registers::REMAINING_CAPACITY, 87);
        bus.set_u16(registers::VOLTAGE, 8100);
        bus.set_u16(registers::AVERAGE_CURRENT, (-1200i16) as u16);

        let status = gauge(&bus).status().unwrap();

        assert_eq!(
            status,
            BatteryStatus {
                power_state: PowerState::OnLine,
                capacity: 87,
                voltage: 8100,
                rate: -1200,
            }
        );
    }

    #[test]
    fn information_is_relative() {
        let bus = MockBus::new();
        bus.set_bytes(registers::MANUFACTURER_INFO, &block());
        bus.set_u16(registers::DESIGN_CAPACITY, 5000);
        bus.set_u16(registers::FULL_CHARGE_CAPACITY, 4800);
        bus.set_u16(registers::CYCLE_COUNT, 3);

        let info = gauge(&bus).information().unwrap();

        assert_eq!(info.capabilities, CAPABILITIES);
        assert_eq!(info.chemistry, *b"LIP ");
        assert_eq!(info.designed_capacity, 5000);
        assert_eq!(info.full_charged_capacity, 4800);
        assert_eq!(info.default_alert1, 75);
        assert_eq!(info.default_alert2, 150);
        assert_eq!(info.cycle_count, 3);
    }

    #[test]
    fn estimated_time_uses_its_own_registers() {
        let bus = MockBus::new();
        bus.set_u16(registers::FLAGS, 0x0001);
        bus.set_u16(registers::TIME_TO_EMPTY, 90);

        assert_eq!(gauge(&bus).estimated_time(0).unwrap(), 5400);
    }

    #[test]
    fn granularity_reports_raw_full_charge() {
        let bus = MockBus::new();
        bus.set_u16(registers::FULL_CHARGE_CAPACITY, 4800);

        assert_eq!(
            gauge(&bus).granularity().unwrap(),
            ReportingScale {
                granularity: 1,
                capacity: 4800
            }
        );
    }

    #[test]
    fn temperature_passes_through() {
        let bus = MockBus::new();
        bus.set_u16(registers::TEMPERATURE, 3012);

        assert_eq!(gauge(&bus).temperature().unwrap(), 3012);
        assert_eq!(bus.frames(), vec![vec![0x06]]);
    }

    #[test]
    fn failed_block_select_skips_the_read() {
        let bus = MockBus::new();
        bus.fail_sends();

        assert!(gauge(&bus).identity().is_err());
        assert_eq!(bus.receives(), 0);
    }
}
