#![cfg_attr(not(test), no_std)]

use byteorder::{ByteOrder, LittleEndian};

/// Byte-addressed register access over a device that keeps an internal
/// register pointer.
///
/// Implementations serialize their own bus access, so both operations take
/// `&self`.
pub trait RegisterAccess {
    type Error;

    /// Writes `data` starting at register `address`.
    fn write_register(&self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Fills `data` with the bytes starting at register `address`.
    fn read_register(&self, address: u8, data: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T> RegisterAccess for &T
where
    T: RegisterAccess + ?Sized,
{
    type Error = T::Error;

    fn write_register(&self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write_register(address, data)
    }

    fn read_register(&self, address: u8, data: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read_register(address, data)
    }
}

/// Typed helpers for the little endian standard commands of TI gauges.
pub trait RegisterAccessExt: RegisterAccess {
    fn read_u16(&self, address: u8) -> Result<u16, Self::Error> {
        let mut bytes = [0; 2];
        self.read_register(address, &mut bytes)?;
        Ok(LittleEndian::read_u16(&bytes))
    }

    fn read_i16(&self, address: u8) -> Result<i16, Self::Error> {
        let mut bytes = [0; 2];
        self.read_register(address, &mut bytes)?;
        Ok(LittleEndian::read_i16(&bytes))
    }

    fn write_u8(&self, address: u8, value: u8) -> Result<(), Self::Error> {
        self.write_register(address, &[value])
    }

    fn write_u16(&self, address: u8, value: u16) -> Result<(), Self::Error> {
        let mut bytes = [0; 2];
        LittleEndian::write_u16(&mut bytes, value);
        self.write_register(address, &bytes)
    }
}

impl<T> RegisterAccessExt for T where T: RegisterAccess + ?Sized {}

#[cfg(test)]
mod test {
    use core::cell::RefCell;

    use super::*;

    struct RegisterFile {
        bytes: RefCell<[u8; 256]>,
    }

    impl RegisterAccess for RegisterFile {
        type Error = ();

        fn write_register(&self, address: u8, data: &[u8]) -> Result<(), ()> {
            let start = address as usize;
            self.bytes.borrow_mut()[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn read_register(&self, address: u8, data: &mut [u8]) -> Result<(), ()> {
            let start = address as usize;
            data.copy_from_slice(&self.bytes.borrow()[start..start + data.len()]);
            Ok(())
        }
    }

    #[test]
    fn words_are_little_endian() {
        let regs = RegisterFile {
            bytes: RefCell::new([0; 256]),
        };

        regs.write_register(0x04, &[0x34, 0x12]).unwrap();

        assert_eq!(regs.read_u16(0x04).unwrap(), 0x1234);
    }

    #[test]
    fn signed_words_keep_their_sign() {
        let regs = RegisterFile {
            bytes: RefCell::new([0; 256]),
        };

        regs.write_u16(0x10, (-250i16) as u16).unwrap();

        assert_eq!(regs.read_i16(0x10).unwrap(), -250);
        assert_eq!(regs.read_u16(0x10).unwrap(), 0xFF06);
    }

    #[test]
    fn references_forward_to_the_target() {
        let regs = RegisterFile {
            bytes: RefCell::new([0; 256]),
        };
        let by_ref = &regs;

        by_ref.write_u8(0x3F, 0x01).unwrap();

        assert_eq!(regs.bytes.borrow()[0x3F], 0x01);
    }
}
