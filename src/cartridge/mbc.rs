use super::header;
use super::{CartridgeError, MbcType};

/// ROM banks are fixed at 16 KiB; the image is partitioned at power-on.
pub const ROM_BANK_SIZE: usize = 0x4000;
/// RAM banks are fixed at 8 KiB, matching the external RAM window.
pub const RAM_BANK_SIZE: usize = 0x2000;
/// Number of RAM banks provisioned at power-on regardless of the declared
/// RAM size. Covers the largest addressable set (MBC5's 4-bit selector);
/// banks a cartridge never declares are simply never selected.
pub const RAM_BANK_COUNT: usize = 16;

/// Value driven onto the bus when reading a region with no enabled memory
/// behind it.
const OPEN_BUS: u8 = 0xFF;

/// Neutral ADXL202E accelerometer reading, cartridge held flat.
const ACCEL_CENTER: u16 = 0x81D0;

/// Banking registers for each MBC. Only the fields a given chip actually
/// wires up exist in its variant; the write path mutates these and nothing
/// else besides RAM contents.
enum BankRegisters {
    Mbc0,
    Mbc1 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enabled: bool,
        /// Mode register: false = simple ROM banking, true = RAM banking.
        /// Selects how the 2-bit secondary register is interpreted.
        advanced_mode: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enabled: bool,
    },
    Mbc3 {
        rom_bank: u8,
        /// 0x00-0x07 selects a RAM bank, 0x08-0x0C selects an RTC field.
        ram_select: u8,
        ram_enabled: bool,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enabled: bool,
    },
    Mbc6,
    Mbc7 {
        rom_bank: u8,
        /// Both gates must be open for any RAM-window access.
        gate1: bool,
        gate2: bool,
    },
}

/// The cartridge-side memory bank controller. Owns the ROM banks partitioned
/// from the loaded image and the provisioned RAM banks, and decodes every
/// CPU-visible cartridge access (0x0000-0x7FFF and 0xA000-0xBFFF).
///
/// Writes into the ROM window never touch ROM contents; they are register
/// writes that change which banks the two ROM slots and the RAM window
/// expose. Exactly one driver may own an `Mbc` at a time: bank selection is
/// order-sensitive, so the controller is never shared.
pub struct Mbc {
    rom: Vec<Box<[u8]>>,
    ram: Vec<Box<[u8]>>,
    mbc_type: MbcType,
    regs: BankRegisters,
}

impl Mbc {
    /// Partitions the raw image into 16 KiB ROM banks, provisions the RAM
    /// banks, and initializes the banking registers to their power-on state
    /// (upper ROM slot on bank 1, RAM bank 0, RAM disabled).
    ///
    /// Fails with `MalformedImage` if the image cannot hold a header bank or
    /// is not bank-aligned, and `UnknownCartridgeType` if the header names no
    /// documented MBC. MBC6/MBC7 images load fine so the embedder can still
    /// query the header and report an unsupported cartridge; their missing
    /// protocol pieces error at access time instead.
    pub fn power_on(rom_data: Vec<u8>) -> Result<Self, CartridgeError> {
        if rom_data.len() < ROM_BANK_SIZE {
            return Err(CartridgeError::MalformedImage(format!(
                "{} byte image is too short to hold the header bank",
                rom_data.len()
            )));
        }
        if rom_data.len() % ROM_BANK_SIZE != 0 {
            return Err(CartridgeError::MalformedImage(format!(
                "{} byte image is not a multiple of the {} byte bank size",
                rom_data.len(),
                ROM_BANK_SIZE
            )));
        }
        let rom: Vec<Box<[u8]>> = rom_data
            .chunks_exact(ROM_BANK_SIZE)
            .map(|bank| bank.to_vec().into_boxed_slice())
            .collect();
        let mbc_type = header::mbc_type(&rom[0])?;
        let ram: Vec<Box<[u8]>> = (0..RAM_BANK_COUNT)
            .map(|_| vec![0u8; RAM_BANK_SIZE].into_boxed_slice())
            .collect();

        info!("Cartridge Info:");
        info!("\tTitle: {}", header::title(&rom[0]));
        info!("\tROM Size: {} KiB", rom.len() * 16);
        match rom[0][header::RAM_SIZE_OFFSET] {
            0x0 | 0x1 => info!("\tRAM Size: None"),
            0x2 => info!("\tRAM Size: 8 KiB"),
            0x3 => info!("\tRAM Size: 32 KiB"),
            0x4 => info!("\tRAM Size: 128 KiB"),
            0x5 => info!("\tRAM Size: 64 KiB"),
            _ => info!("\tRAM Size: Unknown"),
        };
        info!("\tMBC Type: {}", mbc_type);

        let regs = match mbc_type {
            MbcType::Mbc0 => BankRegisters::Mbc0,
            MbcType::Mbc1 => BankRegisters::Mbc1 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enabled: false,
                advanced_mode: false,
            },
            MbcType::Mbc2 => BankRegisters::Mbc2 {
                rom_bank: 1,
                ram_enabled: false,
            },
            MbcType::Mbc3 => {
                if header::has_timer(&rom[0]) {
                    warn!("MBC3 RTC values are not generated here, clock reads return open bus.");
                }
                BankRegisters::Mbc3 {
                    rom_bank: 1,
                    ram_select: 0,
                    ram_enabled: false,
                }
            }
            MbcType::Mbc5 => BankRegisters::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enabled: false,
            },
            MbcType::Mbc6 => {
                warn!("MBC6 flash banking not implemented, register writes will error.");
                BankRegisters::Mbc6
            }
            MbcType::Mbc7 => {
                warn!("MBC7 EEPROM not implemented, sensor reads return fixed neutral values.");
                BankRegisters::Mbc7 {
                    rom_bank: 1,
                    gate1: false,
                    gate2: false,
                }
            }
        };

        Ok(Mbc {
            rom,
            ram,
            mbc_type,
            regs,
        })
    }

    /// Reads the byte the cartridge currently exposes at `addr`. Never
    /// mutates any state.
    ///
    /// Addresses in 0x8000-0x9FFF and 0xC000-0xFFFF belong to other bus
    /// components and indicate a routing bug in the caller.
    pub fn read(&self, addr: u16) -> Result<u8, CartridgeError> {
        match addr {
            // Bank 0 is always mapped into the lower slot
            0x0000..=0x3FFF => Ok(self.rom[0][addr as usize]),
            0x4000..=0x7FFF => {
                // Wrap rather than index out of range when the image has
                // fewer banks than the selector can name
                let bank = self.current_rom_bank() as usize % self.rom.len();
                Ok(self.rom[bank][(addr - 0x4000) as usize])
            }
            0xA000..=0xBFFF => Ok(self.read_ram(addr)),
            _ => Err(CartridgeError::InvalidAddress(addr)),
        }
    }

    /// Performs a cartridge write. Writes into 0x0000-0x7FFF are register
    /// writes decoded per MBC; writes into 0xA000-0xBFFF store into the
    /// selected RAM bank when RAM is enabled and are silently dropped
    /// otherwise, matching hardware.
    pub fn write(&mut self, addr: u16, val: u8) -> Result<(), CartridgeError> {
        if !matches!(addr, 0x0000..=0x7FFF | 0xA000..=0xBFFF) {
            return Err(CartridgeError::InvalidAddress(addr));
        }
        match &mut self.regs {
            BankRegisters::Mbc0 => match addr {
                // No banking registers to write
                0x0000..=0x7FFF => {}
                _ => {
                    if header::has_ram(&self.rom[0]) {
                        self.ram[0][(addr - 0xA000) as usize] = val;
                    } else {
                        debug!("MBC0 RAM write dropped, cartridge declares no RAM");
                    }
                }
            },
            BankRegisters::Mbc1 {
                rom_bank,
                ram_bank,
                ram_enabled,
                advanced_mode,
            } => match addr {
                0x0000..=0x1FFF => *ram_enabled = (val & 0x0F) == 0x0A,
                0x2000..=0x3FFF => {
                    // Bank 0 is unselectable through this register, the chip
                    // substitutes bank 1 before the upper bits are applied
                    let low = if val & 0x1F == 0 { 1 } else { val & 0x1F };
                    *rom_bank = (*rom_bank & 0x60) | low;
                }
                0x4000..=0x5FFF => {
                    if *advanced_mode {
                        *ram_bank = val & 0x03;
                    } else {
                        *rom_bank = (*rom_bank & 0x1F) | ((val & 0x03) << 5);
                    }
                }
                0x6000..=0x7FFF => *advanced_mode = (val & 0x01) == 0x01,
                _ => {
                    if *ram_enabled {
                        self.ram[*ram_bank as usize][(addr - 0xA000) as usize] = val;
                    }
                }
            },
            BankRegisters::Mbc2 {
                rom_bank,
                ram_enabled,
            } => match addr {
                0x0000..=0x3FFF => {
                    // Address bit 8 picks the register: clear is the RAM
                    // gate, set is the ROM bank number
                    if addr & 0x0100 == 0 {
                        *ram_enabled = (val & 0x0F) == 0x0A;
                    } else {
                        let bank = val & 0x0F;
                        *rom_bank = if bank == 0 { 1 } else { bank };
                    }
                }
                0x4000..=0x7FFF => {}
                _ => {
                    if *ram_enabled {
                        // 512 nibbles on the MBC chip itself, mirrored
                        // through the rest of the window
                        self.ram[0][(addr - 0xA000) as usize & 0x1FF] = val & 0x0F;
                    }
                }
            },
            BankRegisters::Mbc3 {
                rom_bank,
                ram_select,
                ram_enabled,
            } => match addr {
                0x0000..=0x1FFF => *ram_enabled = (val & 0x0F) == 0x0A,
                0x2000..=0x3FFF => {
                    let bank = val & 0x7F;
                    *rom_bank = if bank == 0 { 1 } else { bank };
                }
                0x4000..=0x5FFF => *ram_select = val & 0x0F,
                // Clock latch sequence, consumed by the RTC collaborator
                0x6000..=0x7FFF => {}
                _ => {
                    if *ram_enabled && !(0x08..=0x0C).contains(ram_select) {
                        let bank = *ram_select as usize % RAM_BANK_COUNT;
                        self.ram[bank][(addr - 0xA000) as usize] = val;
                    }
                }
            },
            BankRegisters::Mbc5 {
                rom_bank,
                ram_bank,
                ram_enabled,
            } => match addr {
                0x0000..=0x1FFF => *ram_enabled = (val & 0x0F) == 0x0A,
                0x2000..=0x2FFF => *rom_bank = (*rom_bank & 0x100) | val as u16,
                0x3000..=0x3FFF => *rom_bank = (*rom_bank & 0x00FF) | ((val as u16 & 0x01) << 8),
                0x4000..=0x5FFF => *ram_bank = val & 0x0F,
                0x6000..=0x7FFF => {}
                _ => {
                    if *ram_enabled {
                        self.ram[*ram_bank as usize][(addr - 0xA000) as usize] = val;
                    }
                }
            },
            BankRegisters::Mbc6 => match addr {
                0x0000..=0x7FFF => return Err(CartridgeError::UnimplementedMbc(MbcType::Mbc6)),
                // RAM is never enabled, the write is dropped
                _ => {}
            },
            BankRegisters::Mbc7 {
                rom_bank,
                gate1,
                gate2,
            } => match addr {
                0x0000..=0x1FFF => *gate1 = val == 0x0A,
                0x2000..=0x3FFF => {
                    let bank = val & 0x7F;
                    *rom_bank = if bank == 0 { 1 } else { bank };
                }
                0x4000..=0x5FFF => *gate2 = val == 0x40,
                0x6000..=0x7FFF => {}
                _ => {
                    if *gate1 && *gate2 {
                        // Latch steps are accepted and routed; the captured
                        // reading is the fixed neutral value. Everything else
                        // in the window is the EEPROM serial interface.
                        match (addr >> 4) & 0x0F {
                            0x0 if val == 0x55 => {}
                            0x1 if val == 0xAA => {}
                            _ => {
                                return Err(CartridgeError::UnimplementedMbc(MbcType::Mbc7));
                            }
                        }
                    }
                }
            },
        }
        Ok(())
    }

    fn read_ram(&self, addr: u16) -> u8 {
        let offset = (addr - 0xA000) as usize;
        match self.regs {
            BankRegisters::Mbc0 => {
                if header::has_ram(&self.rom[0]) {
                    self.ram[0][offset]
                } else {
                    OPEN_BUS
                }
            }
            BankRegisters::Mbc1 {
                ram_bank,
                ram_enabled,
                ..
            } => {
                if ram_enabled {
                    self.ram[ram_bank as usize][offset]
                } else {
                    OPEN_BUS
                }
            }
            BankRegisters::Mbc2 { ram_enabled, .. } => {
                if ram_enabled {
                    // Only the low nibble of each entry is wired up
                    self.ram[0][offset & 0x1FF] & 0x0F
                } else {
                    OPEN_BUS
                }
            }
            BankRegisters::Mbc3 {
                ram_select,
                ram_enabled,
                ..
            } => {
                if !ram_enabled {
                    OPEN_BUS
                } else if (0x08..=0x0C).contains(&ram_select) {
                    // Clock field values come from the RTC collaborator, this
                    // controller only routes the register index
                    OPEN_BUS
                } else {
                    self.ram[ram_select as usize % RAM_BANK_COUNT][offset]
                }
            }
            BankRegisters::Mbc5 {
                ram_bank,
                ram_enabled,
                ..
            } => {
                if ram_enabled {
                    self.ram[ram_bank as usize][offset]
                } else {
                    OPEN_BUS
                }
            }
            BankRegisters::Mbc6 => OPEN_BUS,
            BankRegisters::Mbc7 { gate1, gate2, .. } => {
                if gate1 && gate2 {
                    mbc7_sensor_read(addr)
                } else {
                    OPEN_BUS
                }
            }
        }
    }

    /// The MBC wired into this cartridge.
    pub fn mbc_type(&self) -> MbcType {
        self.mbc_type
    }

    /// Cartridge title from the header, fill bytes stripped.
    pub fn title(&self) -> String {
        header::title(&self.rom[0])
    }

    /// Whether the header declares external RAM.
    pub fn has_ram(&self) -> bool {
        header::has_ram(&self.rom[0])
    }

    /// Whether the cartridge RAM is battery-backed. When true, the embedder
    /// should persist `ram_data` across runs.
    pub fn has_battery(&self) -> bool {
        header::has_battery(&self.rom[0])
    }

    /// Whether the cartridge carries a real-time clock.
    pub fn has_timer(&self) -> bool {
        header::has_timer(&self.rom[0])
    }

    /// Whether the cartridge carries a rumble motor.
    pub fn has_rumble(&self) -> bool {
        header::has_rumble(&self.rom[0])
    }

    /// Number of 16 KiB ROM banks in the image.
    pub fn rom_bank_count(&self) -> usize {
        self.rom.len()
    }

    /// The bank selector currently driving the upper ROM slot, before the
    /// modulo wrap the read path applies.
    pub fn current_rom_bank(&self) -> u16 {
        match self.regs {
            BankRegisters::Mbc0 => 1,
            BankRegisters::Mbc1 { rom_bank, .. } => rom_bank as u16,
            BankRegisters::Mbc2 { rom_bank, .. } => rom_bank as u16,
            BankRegisters::Mbc3 { rom_bank, .. } => rom_bank as u16,
            BankRegisters::Mbc5 { rom_bank, .. } => rom_bank,
            BankRegisters::Mbc6 => 1,
            BankRegisters::Mbc7 { rom_bank, .. } => rom_bank as u16,
        }
    }

    /// The RAM bank the window currently selects.
    pub fn current_ram_bank(&self) -> u8 {
        match self.regs {
            BankRegisters::Mbc1 { ram_bank, .. } => ram_bank,
            BankRegisters::Mbc3 { ram_select, .. } => ram_select,
            BankRegisters::Mbc5 { ram_bank, .. } => ram_bank,
            _ => 0,
        }
    }

    /// Whether RAM-window accesses currently reach RAM.
    pub fn is_ram_enabled(&self) -> bool {
        match self.regs {
            BankRegisters::Mbc0 => header::has_ram(&self.rom[0]),
            BankRegisters::Mbc1 { ram_enabled, .. } => ram_enabled,
            BankRegisters::Mbc2 { ram_enabled, .. } => ram_enabled,
            BankRegisters::Mbc3 { ram_enabled, .. } => ram_enabled,
            BankRegisters::Mbc5 { ram_enabled, .. } => ram_enabled,
            BankRegisters::Mbc6 => false,
            BankRegisters::Mbc7 { gate1, gate2, .. } => gate1 && gate2,
        }
    }

    /// The RTC register index an MBC3 cartridge currently routes the RAM
    /// window to, if any. The RTC collaborator answers reads for it.
    pub fn clock_register(&self) -> Option<u8> {
        match self.regs {
            BankRegisters::Mbc3 { ram_select, .. } if (0x08..=0x0C).contains(&ram_select) => {
                Some(ram_select)
            }
            _ => None,
        }
    }

    /// Byte-for-byte copy of every RAM bank in order, for the save-file
    /// collaborator. This core performs no file I/O itself.
    pub fn ram_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(RAM_BANK_COUNT * RAM_BANK_SIZE);
        for bank in &self.ram {
            data.extend_from_slice(bank);
        }
        data
    }

    /// Restores RAM contents from a previous `ram_data` dump. Shorter dumps
    /// leave the remaining banks zeroed; longer ones are truncated.
    pub fn load_ram(&mut self, data: &[u8]) {
        for (i, bank) in self.ram.iter_mut().enumerate() {
            let start = i * RAM_BANK_SIZE;
            if start >= data.len() {
                break;
            }
            let end = data.len().min(start + RAM_BANK_SIZE);
            bank[..end - start].copy_from_slice(&data[start..end]);
        }
    }
}

/// Fixed neutral accelerometer register values. Address bits 4-7 select the
/// register, bits 0-3 are ignored.
fn mbc7_sensor_read(addr: u16) -> u8 {
    match (addr >> 4) & 0x0F {
        0x2 | 0x4 => (ACCEL_CENTER & 0xFF) as u8, // X/Y low
        0x3 | 0x5 => (ACCEL_CENTER >> 8) as u8,   // X/Y high
        0x6 => 0x00,                              // Z low
        0x7 => 0xFF,                              // Z high
        _ => OPEN_BUS,
    }
}
