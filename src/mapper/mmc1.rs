use crate::cartridge::{Mirroring, PRG_BANK_SIZE};
use crate::mapper::{read_save_ram, write_save_ram, Mapper, SAVE_RAM_END, SAVE_RAM_START};

const CHR_4K: usize = 4 * 1024;
const CONTROL_POWER_ON: u8 = 0x0C;

/// Register a completed serial write lands in, chosen by the address of the
/// fifth write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mmc1Register {
    Control,
    ChrBank0,
    ChrBank1,
    PrgBank,
}

impl Mmc1Register {
    fn for_address(addr: u16) -> Self {
        match addr {
            0x8000..=0x9FFF => Mmc1Register::Control,
            0xA000..=0xBFFF => Mmc1Register::ChrBank0,
            0xC000..=0xDFFF => Mmc1Register::ChrBank1,
            _ => Mmc1Register::PrgBank,
        }
    }
}

/// 5-bit serial load register. Bits arrive LSB first and enter from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftRegister {
    value: u8,
    count: u8,
}

impl ShiftRegister {
    /// Shifts in bit 0 of `data`. Returns the assembled value once the fifth
    /// bit arrives, leaving the register empty again.
    pub fn push(&mut self, data: u8) -> Option<u8> {
        self.value = (self.value >> 1) | ((data & 1) << 4);
        self.count += 1;
        if self.count == 5 {
            let value = self.value & 0x1F;
            self.clear();
            Some(value)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.value = 0;
        self.count = 0;
    }

    pub fn pending_bits(&self) -> u8 {
        self.count
    }
}

/// Serial-shift-register bank switching (SxROM boards).
pub struct Mmc1Mapper {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    save_ram: Vec<u8>,

    shift: ShiftRegister,
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,

    prg_bank_count: usize,
    chr_bank_count: usize,
    // 16KB bank indices for $8000 and $C000
    prg_banks: [usize; 2],
    // 4KB bank indices for $0000 and $1000
    chr_banks: [usize; 2],
}

impl Mmc1Mapper {
    /// `mirroring` seeds the control register's low bits until the program
    /// writes its own arrangement.
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_is_ram: bool,
        save_ram: Vec<u8>,
        mirroring: Mirroring,
    ) -> Self {
        let prg_bank_count = (prg_rom.len() / PRG_BANK_SIZE).max(1);
        let chr_bank_count = (chr.len() / CHR_4K).max(1);

        let mut mapper = Self {
            prg_rom,
            chr,
            chr_is_ram,
            save_ram,
            shift: ShiftRegister::default(),
            control: CONTROL_POWER_ON | mirroring_bits(mirroring),
            chr_bank0: 0,
            chr_bank1: 0,
            prg_bank: 0,
            prg_bank_count,
            chr_bank_count,
            prg_banks: [0, prg_bank_count - 1],
            chr_banks: [0, 1 % chr_bank_count],
        };
        mapper.update_banks();
        mapper
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn register(&self, register: Mmc1Register) -> u8 {
        match register {
            Mmc1Register::Control => self.control,
            Mmc1Register::ChrBank0 => self.chr_bank0,
            Mmc1Register::ChrBank1 => self.chr_bank1,
            Mmc1Register::PrgBank => self.prg_bank,
        }
    }

    pub fn pending_bits(&self) -> u8 {
        self.shift.pending_bits()
    }

    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    fn chr_4k_mode(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn serial_write(&mut self, addr: u16, data: u8) {
        if data & 0x80 != 0 {
            self.shift.clear();
            self.control |= CONTROL_POWER_ON;
            self.update_banks();
            return;
        }

        if let Some(value) = self.shift.push(data) {
            self.commit(Mmc1Register::for_address(addr), value);
        }
    }

    fn commit(&mut self, register: Mmc1Register, value: u8) {
        debug!("MMC1 {:?} <- {:#04x}", register, value);
        match register {
            Mmc1Register::Control => {
                let before = self.mirroring();
                self.control = value;
                if self.mirroring() != before {
                    debug!("MMC1 mirroring {:?} -> {:?}", before, self.mirroring());
                }
            }
            Mmc1Register::ChrBank0 => self.chr_bank0 = value,
            Mmc1Register::ChrBank1 => self.chr_bank1 = value,
            Mmc1Register::PrgBank => self.prg_bank = value,
        }
        self.update_banks();
    }

    fn update_banks(&mut self) {
        let last = self.prg_bank_count - 1;
        let selected = (self.prg_bank & 0x0F) as usize;
        self.prg_banks = match self.prg_mode() {
            0 | 1 => {
                let base = (selected & !1) % self.prg_bank_count;
                [base, (base + 1) % self.prg_bank_count]
            }
            2 => [0, selected % self.prg_bank_count],
            _ => [selected % self.prg_bank_count, last],
        };

        self.chr_banks = if self.chr_4k_mode() {
            [
                self.chr_bank0 as usize % self.chr_bank_count,
                self.chr_bank1 as usize % self.chr_bank_count,
            ]
        } else {
            let base = (self.chr_bank0 & !1) as usize;
            [base % self.chr_bank_count, (base + 1) % self.chr_bank_count]
        };
    }

    fn chr_index(&self, addr: u16) -> usize {
        let slot = (addr as usize >> 12) & 1;
        let index = self.chr_banks[slot] * CHR_4K + (addr as usize & 0x0FFF);
        index % self.chr.len()
    }
}

// Four-screen is not representable in the control register; vertical is the
// closest arrangement that keeps both physical tables distinct.
fn mirroring_bits(mirroring: Mirroring) -> u8 {
    match mirroring {
        Mirroring::SingleScreenLower => 0,
        Mirroring::SingleScreenUpper => 1,
        Mirroring::Vertical | Mirroring::FourScreen => 2,
        Mirroring::Horizontal => 3,
    }
}

impl Mapper for Mmc1Mapper {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            SAVE_RAM_START..=SAVE_RAM_END => Some(read_save_ram(&self.save_ram, addr)),
            0x8000..=0xFFFF => {
                let slot = ((addr - 0x8000) as usize) / PRG_BANK_SIZE;
                let offset = (addr as usize) & (PRG_BANK_SIZE - 1);
                let index = self.prg_banks[slot] * PRG_BANK_SIZE + offset;
                Some(self.prg_rom[index % self.prg_rom.len()])
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) -> bool {
        match addr {
            SAVE_RAM_START..=SAVE_RAM_END => {
                write_save_ram(&mut self.save_ram, addr, data);
                true
            }
            0x8000..=0xFFFF => {
                self.serial_write(addr, data);
                true
            }
            _ => false,
        }
    }

    fn ppu_read(&self, addr: u16) -> Option<u8> {
        if addr > 0x1FFF {
            return None;
        }
        if self.chr.is_empty() {
            return Some(0);
        }
        Some(self.chr[self.chr_index(addr)])
    }

    fn ppu_write(&mut self, addr: u16, data: u8) -> bool {
        if addr > 0x1FFF {
            return false;
        }
        if self.chr_is_ram && !self.chr.is_empty() {
            let index = self.chr_index(addr);
            self.chr[index] = data;
        }
        true
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }

    fn save_ram(&self) -> &[u8] {
        &self.save_ram
    }
}
