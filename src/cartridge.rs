use crate::error::ConfigError;
use crate::mapper::mmc1::Mmc1Mapper;
use crate::mapper::nrom::NromMapper;
use crate::mapper::Mapper;

pub const PRG_BANK_SIZE: usize = 16 * 1024;
pub const CHR_BANK_SIZE: usize = 8 * 1024;
pub const SAVE_RAM_BANK_SIZE: usize = 8 * 1024;

/// How the four logical name tables fold onto physical storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    FourScreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperKind {
    Nrom,
    Mmc1,
}

impl MapperKind {
    /// Maps the numeric mapper id a cartridge loader reports.
    pub fn from_number(number: u8) -> Result<Self, ConfigError> {
        match number {
            0 => Ok(MapperKind::Nrom),
            1 => Ok(MapperKind::Mmc1),
            other => Err(ConfigError::UnsupportedMapper(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MapperKind::Nrom => "NROM",
            MapperKind::Mmc1 => "MMC1",
        }
    }
}

/// Cartridge contents as handed over by an external loader. Banks are
/// fixed-size blocks: 16KB program, 8KB character, 8KB save RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cartridge {
    pub mapper: MapperKind,
    pub prg_banks: Vec<Vec<u8>>,
    pub chr_banks: Vec<Vec<u8>>,
    pub save_ram_banks: Vec<Vec<u8>>,
    pub mirroring: Mirroring,
    pub battery: bool,
}

impl Cartridge {
    pub fn new(
        mapper: MapperKind,
        prg_banks: Vec<Vec<u8>>,
        chr_banks: Vec<Vec<u8>>,
        mirroring: Mirroring,
    ) -> Self {
        Cartridge {
            mapper,
            prg_banks,
            chr_banks,
            save_ram_banks: vec![],
            mirroring,
            battery: false,
        }
    }

    pub fn with_save_ram(mut self, banks: Vec<Vec<u8>>, battery: bool) -> Self {
        self.save_ram_banks = banks;
        self.battery = battery;
        self
    }

    pub fn has_battery(&self) -> bool {
        self.battery
    }

    pub fn has_chr_ram(&self) -> bool {
        self.chr_banks.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prg_banks.is_empty() {
            return Err(ConfigError::NoProgramBanks);
        }
        check_banks("program", &self.prg_banks, PRG_BANK_SIZE)?;
        check_banks("character", &self.chr_banks, CHR_BANK_SIZE)?;
        check_banks("save RAM", &self.save_ram_banks, SAVE_RAM_BANK_SIZE)?;

        if self.mapper == MapperKind::Nrom && self.prg_banks.len() > 2 {
            return Err(ConfigError::TooManyProgramBanks {
                kind: self.mapper.name(),
                expected: 2,
                actual: self.prg_banks.len(),
            });
        }
        Ok(())
    }

    /// Validates the banks and builds the mapper that will own them.
    pub fn into_mapper(self) -> Result<Box<dyn Mapper>, ConfigError> {
        self.validate()?;
        info!(
            "loading {} cartridge: {} PRG bank(s), {} CHR bank(s){}, {:?} mirroring",
            self.mapper.name(),
            self.prg_banks.len(),
            self.chr_banks.len(),
            if self.has_chr_ram() { " (CHR RAM)" } else { "" },
            self.mirroring
        );

        let chr_is_ram = self.has_chr_ram();
        let prg_rom = self.prg_banks.concat();
        let chr = if chr_is_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            self.chr_banks.concat()
        };
        let save_ram = if self.save_ram_banks.is_empty() {
            vec![0; SAVE_RAM_BANK_SIZE]
        } else {
            self.save_ram_banks.concat()
        };

        let mapper: Box<dyn Mapper> = match self.mapper {
            MapperKind::Nrom => Box::new(NromMapper::new(
                prg_rom,
                chr,
                chr_is_ram,
                save_ram,
                self.mirroring,
            )),
            MapperKind::Mmc1 => Box::new(Mmc1Mapper::new(
                prg_rom,
                chr,
                chr_is_ram,
                save_ram,
                self.mirroring,
            )),
        };
        Ok(mapper)
    }
}

fn check_banks(region: &'static str, banks: &[Vec<u8>], expected: usize) -> Result<(), ConfigError> {
    match banks.iter().position(|bank| bank.len() != expected) {
        Some(index) => Err(ConfigError::BankSize {
            region,
            index,
            expected,
            actual: banks[index].len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn nrom(prg_banks: usize, chr_banks: usize) -> Cartridge {
        Cartridge::new(
            MapperKind::Nrom,
            vec![vec![0xAA; PRG_BANK_SIZE]; prg_banks],
            vec![vec![0xBB; CHR_BANK_SIZE]; chr_banks],
            Mirroring::Horizontal,
        )
    }

    #[test]
    fn test_mapper_kind_from_number() {
        assert_eq!(MapperKind::from_number(0), Ok(MapperKind::Nrom));
        assert_eq!(MapperKind::from_number(1), Ok(MapperKind::Mmc1));
        assert_eq!(
            MapperKind::from_number(4),
            Err(ConfigError::UnsupportedMapper(4))
        );
    }

    #[test]
    fn test_validate_rejects_missing_program_banks() {
        let cart = nrom(0, 1);
        assert_eq!(cart.validate(), Err(ConfigError::NoProgramBanks));
        assert!(cart.into_mapper().is_err());
    }

    #[test]
    fn test_validate_rejects_short_bank() {
        let mut cart = nrom(1, 1);
        cart.chr_banks[0].truncate(100);
        assert_eq!(
            cart.validate(),
            Err(ConfigError::BankSize {
                region: "character",
                index: 0,
                expected: CHR_BANK_SIZE,
                actual: 100,
            })
        );
    }

    #[test]
    fn test_validate_rejects_oversized_nrom() {
        let cart = nrom(4, 1);
        assert!(matches!(
            cart.validate(),
            Err(ConfigError::TooManyProgramBanks { actual: 4, .. })
        ));
    }

    #[test]
    fn test_into_mapper_reads_program_and_character_data() {
        let mapper = nrom(1, 1).into_mapper().unwrap();
        assert_eq!(mapper.cpu_read(0x8000), Some(0xAA));
        assert_eq!(mapper.ppu_read(0x0000), Some(0xBB));
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn test_mmc1_starts_with_declared_mirroring() {
        let cart = Cartridge::new(
            MapperKind::Mmc1,
            vec![vec![0; PRG_BANK_SIZE]; 2],
            vec![],
            Mirroring::Vertical,
        );
        let mapper = cart.into_mapper().unwrap();
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn test_battery_flag_is_reported() {
        let cart = nrom(1, 0).with_save_ram(vec![vec![0; SAVE_RAM_BANK_SIZE]], true);
        assert!(cart.has_battery());
        assert!(cart.has_chr_ram());
    }
}
