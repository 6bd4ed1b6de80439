use crate::cartridge::{Mirroring, CHR_BANK_SIZE, PRG_BANK_SIZE};
use crate::mapper::{read_save_ram, write_save_ram, Mapper, SAVE_RAM_END, SAVE_RAM_START};

/// Fixed mapping: one or two 16KB program banks, one 8KB character bank.
pub struct NromMapper {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    save_ram: Vec<u8>,
    mirroring: Mirroring,
}

impl NromMapper {
    pub fn new(
        prg_rom: Vec<u8>,
        chr: Vec<u8>,
        chr_is_ram: bool,
        save_ram: Vec<u8>,
        mirroring: Mirroring,
    ) -> Self {
        Self {
            prg_rom,
            chr,
            chr_is_ram,
            save_ram,
            mirroring,
        }
    }
}

impl Mapper for NromMapper {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            SAVE_RAM_START..=SAVE_RAM_END => Some(read_save_ram(&self.save_ram, addr)),
            0x8000..=0xFFFF => {
                // A lone 16KB bank answers at both $8000 and $C000.
                let mapped = if self.prg_rom.len() == PRG_BANK_SIZE {
                    ((addr - 0x8000) as usize) % PRG_BANK_SIZE
                } else {
                    ((addr - 0x8000) as usize) % self.prg_rom.len()
                };
                Some(self.prg_rom[mapped])
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
            0x8000..=0xFFFF => true,
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

        Some(self.chr[addr as usize % CHR_BANK_SIZE.min(self.chr.len())])
    }

    fn ppu_write(&mut self, addr: u16, data: u8) -> bool {
        if addr > 0x1FFF {
            return false;
        }

        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[addr as usize % len] = data;
        }
        true
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn save_ram(&self) -> &[u8] {
        &self.save_ram
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cartridge::SAVE_RAM_BANK_SIZE;

    fn mapper(prg: Vec<u8>, chr: Vec<u8>, chr_is_ram: bool) -> NromMapper {
        NromMapper::new(
            prg,
            chr,
            chr_is_ram,
            vec![0; SAVE_RAM_BANK_SIZE],
            Mirroring::Vertical,
        )
    }

    #[test]
    fn test_nrom_128_cpu_mirrors_upper_bank() {
        let mut prg = vec![0u8; 0x4000];
        prg[0] = 0x11;
        prg[0x3FFF] = 0x22;
        let mapper = mapper(prg, vec![0; CHR_BANK_SIZE], false);

        assert_eq!(mapper.cpu_read(0x8000), Some(0x11));
        assert_eq!(mapper.cpu_read(0xBFFF), Some(0x22));
        assert_eq!(mapper.cpu_read(0xC000), Some(0x11));
        assert_eq!(mapper.cpu_read(0xFFFF), Some(0x22));
    }

    #[test]
    fn test_nrom_256_cpu_uses_full_32kb_prg() {
        let mut prg = vec![0u8; 0x8000];
        prg[0] = 0x33;
        prg[0x7FFF] = 0x44;
        let mapper = mapper(prg, vec![0; CHR_BANK_SIZE], false);

        assert_eq!(mapper.cpu_read(0x8000), Some(0x33));
        assert_eq!(mapper.cpu_read(0xFFFF), Some(0x44));
    }

    #[test]
    fn test_nrom_program_rom_ignores_writes() {
        let mut mapper = mapper(vec![0x55; 0x4000], vec![0; CHR_BANK_SIZE], false);

        assert!(mapper.cpu_write(0x8000, 0x00));
        assert_eq!(mapper.cpu_read(0x8000), Some(0x55));
    }

    #[test]
    fn test_nrom_save_ram_window() {
        let mut mapper = mapper(vec![0; 0x4000], vec![0; CHR_BANK_SIZE], false);

        assert!(mapper.cpu_write(0x6000, 0x12));
        assert!(mapper.cpu_write(0x7FFF, 0x34));
        assert_eq!(mapper.cpu_read(0x6000), Some(0x12));
        assert_eq!(mapper.cpu_read(0x7FFF), Some(0x34));
        assert_eq!(mapper.save_ram()[0], 0x12);
    }

    #[test]
    fn test_nrom_expansion_area_is_unmapped() {
        let mut mapper = mapper(vec![0; 0x4000], vec![0; CHR_BANK_SIZE], false);

        assert_eq!(mapper.cpu_read(0x5000), None);
        assert!(!mapper.cpu_write(0x5000, 0x01));
    }

    #[test]
    fn test_nrom_chr_rom_ignores_writes() {
        let mut mapper = mapper(vec![0; 0x4000], vec![0xAB; CHR_BANK_SIZE], false);

        assert_eq!(mapper.ppu_read(0x0010), Some(0xAB));
        assert!(mapper.ppu_write(0x0010, 0xCD));
        assert_eq!(mapper.ppu_read(0x0010), Some(0xAB));
    }

    #[test]
    fn test_nrom_chr_ram_stores_written_values() {
        let mut mapper = mapper(vec![0; 0x4000], vec![0; CHR_BANK_SIZE], true);

        assert_eq!(mapper.ppu_read(0x0010), Some(0x00));
        assert!(mapper.ppu_write(0x0010, 0xCD));
        assert_eq!(mapper.ppu_read(0x0010), Some(0xCD));
    }

    #[test]
    fn test_nrom_reports_fixed_mirroring() {
        let mapper = mapper(vec![0; 0x4000], vec![0; CHR_BANK_SIZE], false);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }
}
