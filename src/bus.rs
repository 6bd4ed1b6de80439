use crate::config::Config;
use crate::controller::Controller;
use crate::cpu::Mem;
use crate::mapper::Mapper;
use crate::ppu::Ppu;
use crate::vram::{VideoBus, VideoMemory};

//  _______________ $10000  _______________
// | PRG-ROM       |       |               |
// | Upper Bank    |       |               |
// |_ _ _ _ _ _ _ _| $C000 | PRG-ROM       |
// | PRG-ROM       |       |               |
// | Lower Bank    |       |               |
// |_______________| $8000 |_______________|
// | SRAM          |       | SRAM          |
// |_______________| $6000 |_______________|
// | Expansion ROM |       | Expansion ROM |
// |_______________| $4020 |_______________|
// | I/O Registers |       |               |
// |_ _ _ _ _ _ _ _| $4000 |               |
// | Mirrors       |       | I/O Registers |
// | $2000-$2007   |       |               |
// |_ _ _ _ _ _ _ _| $2008 |               |
// | I/O Registers |       |               |
// |_______________| $2000 |_______________|
// | Mirrors       |       |               |
// | $0000-$07FF   |       |               |
// |_ _ _ _ _ _ _ _| $0800 |               |
// | RAM           |       | RAM           |
// |_ _ _ _ _ _ _ _| $0200 |               |
// | Stack         |       |               |
// |_ _ _ _ _ _ _ _| $0100 |               |
// | Zero Page     |       |               |
// |_______________| $0000 |_______________|

const RAM: u16 = 0x0000;
const RAM_MIRRORS_END: u16 = 0x1FFF;
const PPU_REGISTERS: u16 = 0x2000;
const PPU_REGISTERS_MIRRORS_END: u16 = 0x3FFF;
const IO_REGISTERS: u16 = 0x4000;
const IO_REGISTERS_END: u16 = 0x401F;
const OAM_DMA: u16 = 0x4014;
const JOYPAD_1: u16 = 0x4016;
const JOYPAD_2: u16 = 0x4017;

/// CPU address space: internal RAM, the picture engine's ports, the I/O
/// window and the cartridge.
pub struct Bus {
    cpu_vram: [u8; 2048],
    ppu: Ppu,
    vram: VideoMemory,
    mapper: Box<dyn Mapper>,
    controllers: [Option<Box<dyn Controller>>; 2],
    data_latch: u8,
    dma_request: bool,
}

impl Bus {
    pub fn new(mapper: Box<dyn Mapper>, config: &Config) -> Self {
        Bus {
            cpu_vram: [0; 2048],
            ppu: Ppu::new(config),
            vram: VideoMemory::new(),
            mapper,
            controllers: [None, None],
            data_latch: 0,
            dma_request: false,
        }
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    /// Plugs a device into port 0 or 1, returning whatever was there. Only
    /// those two ports exist; any other `port` leaves the bus untouched and
    /// hands `controller` back.
    pub fn connect_controller(
        &mut self,
        port: usize,
        controller: Option<Box<dyn Controller>>,
    ) -> Option<Box<dyn Controller>> {
        match self.controllers.get_mut(port) {
            Some(slot) => std::mem::replace(slot, controller),
            None => {
                warn!("no controller port {}", port);
                controller
            }
        }
    }

    /// Advances the picture engine by one dot.
    pub fn tick_ppu(&mut self) {
        let mut video = VideoBus::new(&mut self.vram, self.mapper.as_mut());
        self.ppu.tick(&mut video);
    }

    pub fn take_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }

    pub fn reset(&mut self) {
        self.ppu.reset();
        self.dma_request = false;
    }

    fn read_controller(&mut self, port: usize) -> u8 {
        match self.controllers[port].as_mut() {
            Some(controller) => controller.read(),
            None => 0,
        }
    }

    fn start_oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        let mut buffer = [0u8; 256];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.mem_read(base + i as u16);
        }
        self.ppu.write_oam_dma(&buffer);
        self.dma_request = true;
    }
}

impl Mem for Bus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        let data = match addr {
            RAM..=RAM_MIRRORS_END => {
                let mirror_down_addr = addr & 0b0000_0111_1111_1111;
                self.cpu_vram[mirror_down_addr as usize]
            }
            PPU_REGISTERS..=PPU_REGISTERS_MIRRORS_END => {
                let mut video = VideoBus::new(&mut self.vram, self.mapper.as_mut());
                self.ppu.read_register(addr, &mut video)
            }
            JOYPAD_1 => (self.data_latch & 0xE0) | self.read_controller(0),
            JOYPAD_2 => (self.data_latch & 0xE0) | self.read_controller(1),
            IO_REGISTERS..=IO_REGISTERS_END => self.data_latch,
            _ => self.mapper.cpu_read(addr).unwrap_or(self.data_latch),
        };
        self.data_latch = data;
        data
    }

    fn mem_write(&mut self, addr: u16, data: u8) {
        self.data_latch = data;
        match addr {
            RAM..=RAM_MIRRORS_END => {
                let mirror_down_addr = addr & 0b0000_0111_1111_1111;
                self.cpu_vram[mirror_down_addr as usize] = data;
            }
            PPU_REGISTERS..=PPU_REGISTERS_MIRRORS_END => {
                let mut video = VideoBus::new(&mut self.vram, self.mapper.as_mut());
                self.ppu.write_register(addr, data, &mut video);
            }
            OAM_DMA => self.start_oam_dma(data),
            JOYPAD_1 => {
                for controller in self.controllers.iter_mut().flatten() {
                    controller.write(data);
                }
            }
            IO_REGISTERS..=IO_REGISTERS_END => {
                // Sound and test registers have no backing here.
            }
            _ => {
                self.mapper.cpu_write(addr, data);
            }
        }
    }

    fn mem_fetch(&self, addr: u16) -> Option<u8> {
        match addr {
            RAM..=RAM_MIRRORS_END => Some(self.cpu_vram[(addr & 0x07FF) as usize]),
            PPU_REGISTERS..=IO_REGISTERS_END => None,
            _ => self.mapper.cpu_read(addr),
        }
    }

    fn take_dma_request(&mut self) -> bool {
        let requested = self.dma_request;
        self.dma_request = false;
        requested
    }
}
