use crate::cartridge::Mirroring;

pub mod mmc1;
pub mod nrom;

pub const SAVE_RAM_START: u16 = 0x6000;
pub const SAVE_RAM_END: u16 = 0x7FFF;

/// Cartridge-side view of both address spaces. CPU addresses arrive
/// untranslated ($4020-$FFFF); PPU addresses are pattern-table offsets
/// ($0000-$1FFF).
pub trait Mapper {
    /// `None` when nothing on the cartridge answers at `addr`.
    fn cpu_read(&self, addr: u16) -> Option<u8>;
    /// Returns whether the cartridge claimed the write.
    fn cpu_write(&mut self, addr: u16, data: u8) -> bool;
    fn ppu_read(&self, addr: u16) -> Option<u8>;
    fn ppu_write(&mut self, addr: u16, data: u8) -> bool;
    /// Current name-table arrangement. Bank-switching boards may change it at
    /// runtime.
    fn mirroring(&self) -> Mirroring;
    fn save_ram(&self) -> &[u8];
}

pub(crate) fn read_save_ram(save_ram: &[u8], addr: u16) -> u8 {
    if save_ram.is_empty() {
        return 0;
    }
    save_ram[(addr - SAVE_RAM_START) as usize % save_ram.len()]
}

pub(crate) fn write_save_ram(save_ram: &mut [u8], addr: u16, data: u8) {
    if save_ram.is_empty() {
        return;
    }
    let len = save_ram.len();
    save_ram[(addr - SAVE_RAM_START) as usize % len] = data;
}
