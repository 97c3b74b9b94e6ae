pub mod header;
pub mod mbc;

use std::fmt;

pub use header::MbcType;
pub use mbc::Mbc;

/// Error type representing possible errors when using cartridge functions.
#[derive(Debug)]
pub enum CartridgeError {
    /// The ROM image is too short to hold a header bank, or its length is not
    /// an exact multiple of the 16 KiB bank size
    MalformedImage(String),
    /// The cartridge-type header byte at 0x0147 matches no documented MBC
    UnknownCartridgeType(u8),
    /// A recognized MBC was exercised in a protocol region this controller
    /// does not implement (MBC6 flash, MBC7 EEPROM)
    UnimplementedMbc(MbcType),
    /// The address falls outside every window the cartridge decodes
    InvalidAddress(u16),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CartridgeError::MalformedImage(ref s) => write!(f, "Malformed ROM image: {}", s),
            CartridgeError::UnknownCartridgeType(v) => {
                write!(f, "Unknown cartridge type {:02X}", v)
            }
            CartridgeError::UnimplementedMbc(t) => {
                write!(f, "Unimplemented MBC function attempted: {}", t)
            }
            CartridgeError::InvalidAddress(a) => {
                write!(f, "Invalid cartridge address {:04X}", a)
            }
        }
    }
}
