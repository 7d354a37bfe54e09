use register_access::RegisterAccess;

use crate::info::{battery_string, BatteryString, ManufactureDate};

/// Identity strings and static facts of the fitted battery pack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatteryIdentity {
    pub manufacture_name: BatteryString,
    pub device_name: BatteryString,
    pub serial_number: BatteryString,
    pub unique_id: BatteryString,
    pub manufacture_date: ManufactureDate,
    pub chemistry: [u8; 4],
}

/// Where a gauge gets the pack identity from.
pub trait IdentitySource<A>
where
    A: RegisterAccess,
{
    fn identity(&mut self, regs: &A) -> Result<BatteryIdentity, A::Error>;
}

/// A fixed identity for packs that do not report one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticIdentity {
    identity: BatteryIdentity,
}

impl StaticIdentity {
    pub const fn new(identity: BatteryIdentity) -> Self {
        Self { identity }
    }
}

impl Default for StaticIdentity {
    /// The BLP745 pack fitted next to the BQ27541.
    fn default() -> Self {
        Self::new(BatteryIdentity {
            manufacture_name: battery_string("OP"),
            device_name: battery_string("BLP745"),
            serial_number: battery_string("2333"),
            unique_id: battery_string("OP7PPBATTERY2333"),
            manufacture_date: ManufactureDate {
                day: 1,
                month: 1,
                year: 2019,
            },
            chemistry: *b"LION",
        })
    }
}

impl<A> IdentitySource<A> for StaticIdentity
where
    A: RegisterAccess,
{
    fn identity(&mut self, _regs: &A) -> Result<BatteryIdentity, A::Error> {
        Ok(self.identity.clone())
    }
}
