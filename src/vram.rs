use crate::cartridge::Mirroring;
use crate::mapper::Mapper;

pub const NAME_TABLE_SIZE: usize = 0x400;
pub const PALETTE_SIZE: usize = 0x20;

/// The picture engine's view of memory: pattern tables, name tables and
/// palette, all behind a 14-bit address.
pub trait PpuBus {
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, data: u8);
}

/// Console-side video memory. Four physical name tables are kept so that
/// four-screen boards have somewhere to put the extra two; every other
/// arrangement only touches the first two.
pub struct VideoMemory {
    name_tables: [u8; 4 * NAME_TABLE_SIZE],
    palette: [u8; PALETTE_SIZE],
}

impl VideoMemory {
    pub fn new() -> Self {
        VideoMemory {
            name_tables: [0; 4 * NAME_TABLE_SIZE],
            palette: [0; PALETTE_SIZE],
        }
    }

    pub fn read_name_table(&self, addr: u16, mirroring: Mirroring) -> u8 {
        self.name_tables[name_table_index(addr, mirroring)]
    }

    pub fn write_name_table(&mut self, addr: u16, mirroring: Mirroring, data: u8) {
        self.name_tables[name_table_index(addr, mirroring)] = data;
    }

    pub fn read_palette(&self, addr: u16) -> u8 {
        self.palette[palette_index(addr)]
    }

    pub fn write_palette(&mut self, addr: u16, data: u8) {
        self.palette[palette_index(addr)] = data;
    }
}

impl Default for VideoMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Physical offset of a name-table address ($2000-$3EFF) after mirroring.
pub fn name_table_index(addr: u16, mirroring: Mirroring) -> usize {
    let vram_index = ((addr - 0x2000) as usize) % (4 * NAME_TABLE_SIZE);
    let table = vram_index / NAME_TABLE_SIZE;
    let offset = vram_index % NAME_TABLE_SIZE;

    let mapped_table = match mirroring {
        Mirroring::Vertical => table & 1,
        Mirroring::Horizontal => table >> 1,
        Mirroring::SingleScreenLower => 0,
        Mirroring::SingleScreenUpper => 1,
        Mirroring::FourScreen => table,
    };

    mapped_table * NAME_TABLE_SIZE + offset
}

/// $3F10/$3F14/$3F18/$3F1C alias the background entries below them.
pub fn palette_index(addr: u16) -> usize {
    let mut idx = (addr as usize) % PALETTE_SIZE;
    if matches!(idx, 0x10 | 0x14 | 0x18 | 0x1C) {
        idx -= 0x10;
    }
    idx
}

/// Decodes picture-engine addresses onto the cartridge and console memory.
pub struct VideoBus<'a> {
    memory: &'a mut VideoMemory,
    mapper: &'a mut dyn Mapper,
}

impl<'a> VideoBus<'a> {
    pub fn new(memory: &'a mut VideoMemory, mapper: &'a mut dyn Mapper) -> Self {
        VideoBus { memory, mapper }
    }
}

impl<'a> PpuBus for VideoBus<'a> {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => self.mapper.ppu_read(addr).unwrap_or(0),
            0x2000..=0x3EFF => self
                .memory
                .read_name_table(addr, self.mapper.mirroring()),
            _ => self.memory.read_palette(addr),
        }
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => {
                self.mapper.ppu_write(addr, data);
            }
            0x2000..=0x3EFF => {
                let mirroring = self.mapper.mirroring();
                self.memory.write_name_table(addr, mirroring, data)
            }
            _ => self.memory.write_palette(addr, data),
        }
    }
}
