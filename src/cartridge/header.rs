use std::fmt;

use super::CartridgeError;

/// Fixed header offsets within ROM bank 0.
pub const TITLE_START: usize = 0x0134;
pub const TITLE_END: usize = 0x0143;
pub const CART_TYPE_OFFSET: usize = 0x0147;
pub const RAM_SIZE_OFFSET: usize = 0x0149;

/// The Memory Bank Controller wired into the cartridge, identified by the
/// cartridge-type byte at 0x0147. Closed set; each variant implies a distinct
/// register protocol in the ROM window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    /// No banking circuitry, 32 KiB of ROM and optionally a single RAM bank
    Mbc0,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc5,
    Mbc6,
    Mbc7,
}

impl fmt::Display for MbcType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            MbcType::Mbc0 => "MBC0/No MBC",
            MbcType::Mbc1 => "MBC1",
            MbcType::Mbc2 => "MBC2",
            MbcType::Mbc3 => "MBC3",
            MbcType::Mbc5 => "MBC5",
            MbcType::Mbc6 => "MBC6",
            MbcType::Mbc7 => "MBC7",
        };
        write!(f, "{}", name)
    }
}

/// Decodes the title region of the header, stripping the 0x00 fill bytes that
/// pad short titles out to the full 15-byte field.
pub fn title(bank0: &[u8]) -> String {
    String::from_utf8_lossy(&bank0[TITLE_START..TITLE_END]).replace('\0', "")
}

/// Maps the cartridge-type byte to its MBC.
pub fn mbc_type(bank0: &[u8]) -> Result<MbcType, CartridgeError> {
    match bank0[CART_TYPE_OFFSET] {
        0x00 | 0x08 | 0x09 => Ok(MbcType::Mbc0),
        0x01..=0x03 => Ok(MbcType::Mbc1),
        0x05 | 0x06 => Ok(MbcType::Mbc2),
        0x0F..=0x13 => Ok(MbcType::Mbc3),
        0x19..=0x1E => Ok(MbcType::Mbc5),
        0x20 | 0x22 => Ok(MbcType::Mbc6),
        0x23 | 0x25 => Ok(MbcType::Mbc7),
        v => Err(CartridgeError::UnknownCartridgeType(v)),
    }
}

/// Checks the RAM-size byte. 0x00 is no RAM and 0x01 was never used.
pub fn has_ram(bank0: &[u8]) -> bool {
    !matches!(bank0[RAM_SIZE_OFFSET], 0x00 | 0x01)
}

/// Checks the cartridge type to determine if battery-backed RAM is present.
pub fn has_battery(bank0: &[u8]) -> bool {
    matches!(
        bank0[CART_TYPE_OFFSET],
        0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22 | 0xFF
    )
}

/// Checks the cartridge type to determine if a real-time clock is present.
pub fn has_timer(bank0: &[u8]) -> bool {
    matches!(bank0[CART_TYPE_OFFSET], 0x0F | 0x10)
}

/// Checks the cartridge type to determine if a rumble motor is present.
pub fn has_rumble(bank0: &[u8]) -> bool {
    matches!(bank0[CART_TYPE_OFFSET], 0x1C | 0x1D | 0x1E | 0x22)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank0(cart_type: u8, ram_size: u8) -> Vec<u8> {
        let mut bank = vec![0u8; 0x150];
        bank[CART_TYPE_OFFSET] = cart_type;
        bank[RAM_SIZE_OFFSET] = ram_size;
        bank
    }

    fn bank0_with_title(text: &str) -> Vec<u8> {
        let mut bank = vec![0u8; 0x150];
        bank[TITLE_START..TITLE_START + text.len()].copy_from_slice(text.as_bytes());
        bank
    }

    #[test]
    fn title_strips_fill_bytes() {
        assert_eq!(title(&bank0_with_title("TETRIS")), "TETRIS");
        assert_eq!(title(&bank0_with_title("DR.MARIO")), "DR.MARIO");
    }

    #[test]
    fn title_full_width_field() {
        assert_eq!(title(&bank0_with_title("POKEMON YELLOW!")), "POKEMON YELLOW!");
    }

    #[test]
    fn mbc_type_documented_values() {
        assert_eq!(mbc_type(&bank0(0x00, 0)).unwrap(), MbcType::Mbc0);
        assert_eq!(mbc_type(&bank0(0x09, 0)).unwrap(), MbcType::Mbc0);
        assert_eq!(mbc_type(&bank0(0x01, 0)).unwrap(), MbcType::Mbc1);
        assert_eq!(mbc_type(&bank0(0x06, 0)).unwrap(), MbcType::Mbc2);
        assert_eq!(mbc_type(&bank0(0x10, 0)).unwrap(), MbcType::Mbc3);
        assert_eq!(mbc_type(&bank0(0x1E, 0)).unwrap(), MbcType::Mbc5);
        assert_eq!(mbc_type(&bank0(0x20, 0)).unwrap(), MbcType::Mbc6);
        assert_eq!(mbc_type(&bank0(0x25, 0)).unwrap(), MbcType::Mbc7);
    }

    #[test]
    fn mbc_type_unknown_value() {
        match mbc_type(&bank0(0x04, 0)) {
            Err(CartridgeError::UnknownCartridgeType(0x04)) => (),
            other => panic!("expected UnknownCartridgeType, got {:?}", other),
        }
    }

    #[test]
    fn ram_size_table() {
        assert!(!has_ram(&bank0(0x00, 0x00)));
        assert!(!has_ram(&bank0(0x00, 0x01)));
        assert!(has_ram(&bank0(0x00, 0x02)));
        assert!(has_ram(&bank0(0x00, 0x03)));
        assert!(has_ram(&bank0(0x00, 0x04)));
        assert!(has_ram(&bank0(0x00, 0x05)));
    }

    #[test]
    fn capability_tables() {
        assert!(has_battery(&bank0(0x03, 0)));
        assert!(has_battery(&bank0(0x13, 0)));
        assert!(!has_battery(&bank0(0x01, 0)));

        assert!(has_timer(&bank0(0x0F, 0)));
        assert!(has_timer(&bank0(0x10, 0)));
        assert!(!has_timer(&bank0(0x13, 0)));

        assert!(has_rumble(&bank0(0x1C, 0)));
        assert!(has_rumble(&bank0(0x22, 0)));
        assert!(!has_rumble(&bank0(0x19, 0)));
    }
}
