#![allow(dead_code)]

pub const ROM_BANK_SIZE: usize = 0x4000;

pub const TITLE_OFFSET: usize = 0x0134;
pub const CART_TYPE_OFFSET: usize = 0x0147;
pub const RAM_SIZE_OFFSET: usize = 0x0149;

/// Builds a synthetic ROM image of `banks` 16 KiB banks. Every byte of bank
/// `n` is filled with `n as u8`, so reads reveal which bank a window is
/// showing. The header bytes of bank 0 are then patched in.
pub fn make_rom(banks: usize, cart_type: u8, ram_size: u8) -> Vec<u8> {
    let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
    for (i, bank) in rom.chunks_exact_mut(ROM_BANK_SIZE).enumerate() {
        bank.fill(i as u8);
    }
    rom[CART_TYPE_OFFSET] = cart_type;
    rom[RAM_SIZE_OFFSET] = ram_size;
    rom
}

pub fn with_title(mut rom: Vec<u8>, title: &str) -> Vec<u8> {
    rom[TITLE_OFFSET..TITLE_OFFSET + 15].fill(0);
    rom[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title.as_bytes());
    rom
}
