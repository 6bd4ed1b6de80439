use crate::config::{Config, SpriteOverflow, WARM_UP_CPU_CYCLES};
use crate::vram::PpuBus;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub mod registers;
pub mod sprites;

use registers::{ControlRegister, MaskRegister, StatusRegister};
use sprites::{SpriteSlot, OAM_SIZE, SPRITES_PER_LINE};

pub const PPU_CTRL: u16 = 0x2000;
pub const PPU_MASK: u16 = 0x2001;
pub const PPU_STATUS: u16 = 0x2002;
pub const PPU_OAM_ADDR: u16 = 0x2003;
pub const PPU_OAM_DATA: u16 = 0x2004;
pub const PPU_SCROLL: u16 = 0x2005;
pub const PPU_ADDR: u16 = 0x2006;
pub const PPU_DATA: u16 = 0x2007;

pub const FRAME_WIDTH: usize = 256;
pub const FRAME_HEIGHT: usize = 240;

pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;

const WARM_UP_DOTS: u32 = WARM_UP_CPU_CYCLES * 3;
// Roughly 600ms of dots before an undriven data bus reads back as zero.
const OPEN_BUS_DECAY_DOTS: u32 = 3_200_000;

/// Dot-stepped picture processor. Memory traffic goes through a [`PpuBus`]
/// supplied by the caller on every access.
pub struct Ppu {
    ctrl: ControlRegister,
    mask: MaskRegister,
    status: StatusRegister,
    oam_addr: u8,
    oam: [u8; OAM_SIZE],

    // loopy v/t, fine X and the shared $2005/$2006 write toggle
    vram_addr: u16,
    temp_vram_addr: u16,
    fine_x: u8,
    write_latch: bool,
    read_buffer: u8,

    io_latch: u8,
    io_decay: u32,

    scanline: u16,
    dot: u16,
    frame: u64,
    odd_frame: bool,
    nmi_pending: bool,

    warm_up_enabled: bool,
    warm_up_dots: u32,
    power_up_noise: Option<StdRng>,
    sprite_overflow: SpriteOverflow,

    next_tile_id: u8,
    next_tile_attr: u8,
    next_tile_lo: u8,
    next_tile_hi: u8,
    bg_pattern_lo: u16,
    bg_pattern_hi: u16,
    bg_attr_lo: u16,
    bg_attr_hi: u16,

    sprites: [SpriteSlot; SPRITES_PER_LINE],
    sprite_count: usize,

    frame_buffer: Vec<u8>,
}

impl Ppu {
    pub fn new(config: &Config) -> Self {
        Ppu {
            ctrl: ControlRegister::empty(),
            mask: MaskRegister::empty(),
            status: StatusRegister::empty(),
            oam_addr: 0,
            oam: [0; OAM_SIZE],
            vram_addr: 0,
            temp_vram_addr: 0,
            fine_x: 0,
            write_latch: false,
            read_buffer: 0,
            io_latch: 0,
            io_decay: 0,
            scanline: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            nmi_pending: false,
            warm_up_enabled: config.warm_up,
            warm_up_dots: if config.warm_up { WARM_UP_DOTS } else { 0 },
            power_up_noise: config.power_up_seed.map(StdRng::seed_from_u64),
            sprite_overflow: config.sprite_overflow,
            next_tile_id: 0,
            next_tile_attr: 0,
            next_tile_lo: 0,
            next_tile_hi: 0,
            bg_pattern_lo: 0,
            bg_pattern_hi: 0,
            bg_attr_lo: 0,
            bg_attr_hi: 0,
            sprites: [SpriteSlot::default(); SPRITES_PER_LINE],
            sprite_count: 0,
            frame_buffer: vec![0; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    /// Reset line. OAM, VRAM address and status survive; control, mask, the
    /// write toggle and the read buffer clear and the warm-up window restarts.
    pub fn reset(&mut self) {
        self.ctrl = ControlRegister::empty();
        self.mask = MaskRegister::empty();
        self.write_latch = false;
        self.read_buffer = 0;
        self.fine_x = 0;
        self.temp_vram_addr = 0;
        self.odd_frame = false;
        self.nmi_pending = false;
        self.scanline = 0;
        self.dot = 0;
        self.sprite_count = 0;
        if self.warm_up_enabled {
            self.warm_up_dots = WARM_UP_DOTS;
        }
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Frames completed, counted at the start of each vertical blank.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn odd_frame(&self) -> bool {
        self.odd_frame
    }

    pub fn status(&self) -> StatusRegister {
        self.status
    }

    pub fn ctrl(&self) -> ControlRegister {
        self.ctrl
    }

    pub fn mask(&self) -> MaskRegister {
        self.mask
    }

    pub fn vram_addr(&self) -> u16 {
        self.vram_addr
    }

    pub fn temp_vram_addr(&self) -> u16 {
        self.temp_vram_addr
    }

    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }

    pub fn write_latch(&self) -> bool {
        self.write_latch
    }

    pub fn oam(&self) -> &[u8; OAM_SIZE] {
        &self.oam
    }

    /// Sprites selected for the line currently being drawn.
    pub fn line_sprites(&self) -> &[SpriteSlot] {
        &self.sprites[..self.sprite_count]
    }

    /// Palette color indices, one byte per pixel, row-major.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.frame_buffer
    }

    pub fn take_nmi(&mut self) -> bool {
        let pending = self.nmi_pending;
        self.nmi_pending = false;
        pending
    }

    pub fn rendering_enabled(&self) -> bool {
        self.mask.rendering_enabled()
    }

    fn warming_up(&self) -> bool {
        self.warm_up_dots > 0
    }

    fn drive_bus(&mut self, value: u8) {
        self.io_latch = value;
        self.io_decay = OPEN_BUS_DECAY_DOTS;
    }

    pub fn read_register<B: PpuBus>(&mut self, reg: u16, bus: &mut B) -> u8 {
        match 0x2000 | (reg & 0x0007) {
            PPU_STATUS => {
                let mut value = self.status.bits() | (self.io_latch & 0x1F);
                if let Some(rng) = self.power_up_noise.as_mut() {
                    if rng.gen::<bool>() {
                        value |= StatusRegister::VBLANK_STARTED.bits();
                    }
                    if rng.gen::<bool>() {
                        value |= StatusRegister::SPRITE_OVERFLOW.bits();
                    }
                }
                self.status.remove(StatusRegister::VBLANK_STARTED);
                self.write_latch = false;
                self.drive_bus((value & 0xE0) | (self.io_latch & 0x1F));
                value
            }
            PPU_OAM_DATA => {
                let value = self.oam[self.oam_addr as usize];
                self.drive_bus(value);
                value
            }
            PPU_DATA => {
                let value = self.read_ppu_data(bus);
                self.drive_bus(value);
                value
            }
            _ => self.io_latch,
        }
    }

    pub fn write_register<B: PpuBus>(&mut self, reg: u16, data: u8, bus: &mut B) {
        self.drive_bus(data);
        let reg = 0x2000 | (reg & 0x0007);
        if self.warming_up() && matches!(reg, PPU_CTRL | PPU_MASK | PPU_SCROLL | PPU_ADDR) {
            return;
        }

        match reg {
            PPU_CTRL => {
                let nmi_was_enabled = self.ctrl.contains(ControlRegister::GENERATE_NMI);
                self.ctrl = ControlRegister::from_bits_truncate(data);
                self.temp_vram_addr = (self.temp_vram_addr & !0x0C00) | self.ctrl.nametable_bits();
                if !nmi_was_enabled
                    && self.ctrl.contains(ControlRegister::GENERATE_NMI)
                    && self.status.contains(StatusRegister::VBLANK_STARTED)
                {
                    self.raise_nmi();
                }
            }
            PPU_MASK => self.mask = MaskRegister::from_bits_truncate(data),
            PPU_STATUS => {}
            PPU_OAM_ADDR => self.oam_addr = data,
            PPU_OAM_DATA => {
                self.oam[self.oam_addr as usize] = data;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            PPU_SCROLL => {
                if !self.write_latch {
                    self.fine_x = data & 0x07;
                    self.temp_vram_addr = (self.temp_vram_addr & !0x001F) | ((data as u16) >> 3);
                } else {
                    self.temp_vram_addr = (self.temp_vram_addr & !0x73E0)
                        | (((data as u16) & 0x07) << 12)
                        | (((data as u16) & 0xF8) << 2);
                }
                self.write_latch = !self.write_latch;
            }
            PPU_ADDR => {
                if !self.write_latch {
                    self.temp_vram_addr =
                        (self.temp_vram_addr & 0x00FF) | (((data as u16) & 0x3F) << 8);
                } else {
                    self.temp_vram_addr = (self.temp_vram_addr & 0x7F00) | data as u16;
                    self.vram_addr = self.temp_vram_addr;
                }
                self.write_latch = !self.write_latch;
            }
            _ => self.write_ppu_data(data, bus),
        }
    }

    /// Bulk copy of one CPU page into OAM, starting at the current OAM address.
    pub fn write_oam_dma(&mut self, page: &[u8; 256]) {
        trace!("OAM DMA at oam_addr {:#04x}", self.oam_addr);
        for byte in page.iter() {
            self.oam[self.oam_addr as usize] = *byte;
            self.oam_addr = self.oam_addr.wrapping_add(1);
        }
    }

    fn read_ppu_data<B: PpuBus>(&mut self, bus: &mut B) -> u8 {
        let addr = self.vram_addr & 0x3FFF;
        let result = if addr >= 0x3F00 {
            let value = bus.ppu_read(addr);
            // The buffer still picks up the name-table byte underneath.
            self.read_buffer = bus.ppu_read(addr - 0x1000);
            value
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = bus.ppu_read(addr);
            buffered
        };

        self.vram_addr = self.vram_addr.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
        result
    }

    fn write_ppu_data<B: PpuBus>(&mut self, data: u8, bus: &mut B) {
        bus.ppu_write(self.vram_addr & 0x3FFF, data);
        self.vram_addr = self.vram_addr.wrapping_add(self.ctrl.vram_increment()) & 0x7FFF;
    }

    fn raise_nmi(&mut self) {
        trace!("NMI raised at scanline {} dot {}", self.scanline, self.dot);
        self.nmi_pending = true;
    }

    /// Advances one dot, then performs that dot's work.
    pub fn tick<B: PpuBus>(&mut self, bus: &mut B) {
        self.advance();

        if self.warm_up_dots > 0 {
            self.warm_up_dots -= 1;
        }
        if self.io_decay > 0 {
            self.io_decay -= 1;
            if self.io_decay == 0 {
                self.io_latch = 0;
            }
        }

        let visible = self.scanline < FRAME_HEIGHT as u16;
        let pre_render = self.scanline == PRE_RENDER_SCANLINE;

        if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            self.status.insert(StatusRegister::VBLANK_STARTED);
            self.frame += 1;
            if self.ctrl.contains(ControlRegister::GENERATE_NMI) {
                self.raise_nmi();
            }
        }

        if pre_render && self.dot == 1 {
            self.status.remove(
                StatusRegister::VBLANK_STARTED
                    | StatusRegister::SPRITE_ZERO_HIT
                    | StatusRegister::SPRITE_OVERFLOW,
            );
            self.power_up_noise = None;
            self.sprite_count = 0;
        }

        if (visible || pre_render) && self.rendering_enabled() {
            self.render_line_dot(bus, visible, pre_render);
        }

        if visible && (1..=256).contains(&self.dot) {
            self.emit_pixel(bus, (self.dot - 1) as usize, self.scanline as usize);
        }
    }

    fn advance(&mut self) {
        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE - 1
            && self.scanline == PRE_RENDER_SCANLINE
            && self.odd_frame
            && self.rendering_enabled()
        {
            // Odd frames drop the last pre-render dot.
            self.dot = DOTS_PER_SCANLINE;
        }
        if self.dot >= DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn render_line_dot<B: PpuBus>(&mut self, bus: &mut B, visible: bool, pre_render: bool) {
        let dot = self.dot;

        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.shift_background();
            match (dot - 1) & 0x07 {
                0 => {
                    self.load_background_shifters();
                    self.next_tile_id = bus.ppu_read(0x2000 | (self.vram_addr & 0x0FFF));
                }
                2 => {
                    let v = self.vram_addr;
                    let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                    let attr = bus.ppu_read(addr);
                    let shift = ((v >> 4) & 0x04) | (v & 0x02);
                    self.next_tile_attr = (attr >> shift) & 0x03;
                }
                4 => {
                    let addr = self.background_pattern_addr();
                    self.next_tile_lo = bus.ppu_read(addr);
                }
                6 => {
                    let addr = self.background_pattern_addr() + 8;
                    self.next_tile_hi = bus.ppu_read(addr);
                }
                7 => self.increment_coarse_x(),
                _ => {}
            }
        }

        if dot == 256 {
            self.increment_y();
        }

        if dot == 257 {
            self.load_background_shifters();
            self.copy_horizontal_bits();
            if visible {
                self.evaluate_sprites(bus);
            }
        }

        if pre_render && (280..=304).contains(&dot) {
            self.copy_vertical_bits();
        }
    }

    fn background_pattern_addr(&self) -> u16 {
        let fine_y = (self.vram_addr >> 12) & 0x07;
        self.ctrl.background_table() + (self.next_tile_id as u16) * 16 + fine_y
    }

    fn shift_background(&mut self) {
        self.bg_pattern_lo <<= 1;
        self.bg_pattern_hi <<= 1;
        self.bg_attr_lo <<= 1;
        self.bg_attr_hi <<= 1;
    }

    fn load_background_shifters(&mut self) {
        self.bg_pattern_lo = (self.bg_pattern_lo & 0xFF00) | self.next_tile_lo as u16;
        self.bg_pattern_hi = (self.bg_pattern_hi & 0xFF00) | self.next_tile_hi as u16;

        let attr_lo = if self.next_tile_attr & 0x01 != 0 { 0xFF } else { 0x00 };
        let attr_hi = if self.next_tile_attr & 0x02 != 0 { 0xFF } else { 0x00 };
        self.bg_attr_lo = (self.bg_attr_lo & 0xFF00) | attr_lo;
        self.bg_attr_hi = (self.bg_attr_hi & 0xFF00) | attr_hi;
    }

    fn increment_coarse_x(&mut self) {
        if self.vram_addr & 0x001F == 31 {
            self.vram_addr &= !0x001F;
            self.vram_addr ^= 0x0400;
        } else {
            self.vram_addr += 1;
        }
    }

    fn increment_y(&mut self) {
        if self.vram_addr & 0x7000 != 0x7000 {
            self.vram_addr += 0x1000;
            return;
        }

        self.vram_addr &= !0x7000;
        let mut coarse_y = (self.vram_addr & 0x03E0) >> 5;
        if coarse_y == 29 {
            // Row 29 is the last tile row; rows 30/31 hold attributes.
            coarse_y = 0;
            self.vram_addr ^= 0x0800;
        } else if coarse_y == 31 {
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.vram_addr = (self.vram_addr & !0x03E0) | (coarse_y << 5);
    }

    fn copy_horizontal_bits(&mut self) {
        self.vram_addr = (self.vram_addr & !0x041F) | (self.temp_vram_addr & 0x041F);
    }

    fn copy_vertical_bits(&mut self) {
        self.vram_addr = (self.vram_addr & !0x7BE0) | (self.temp_vram_addr & 0x7BE0);
    }

    fn evaluate_sprites<B: PpuBus>(&mut self, bus: &mut B) {
        let height = self.ctrl.sprite_height();
        let eval = sprites::evaluate(&self.oam, self.scanline, height, self.sprite_overflow);
        if eval.overflow {
            self.status.insert(StatusRegister::SPRITE_OVERFLOW);
        }

        self.sprites = eval.slots;
        self.sprite_count = eval.count;
        for i in 0..self.sprite_count {
            let slot = self.sprites[i];
            let mut row = self.scanline - slot.y as u16;
            if slot.flip_vertical() {
                row = height - 1 - row;
            }

            let (table, tile) = if height == 16 {
                (
                    (slot.tile as u16 & 0x01) * 0x1000,
                    (slot.tile as u16 & 0xFE) + row / 8,
                )
            } else {
                (self.ctrl.sprite_table(), slot.tile as u16)
            };
            let addr = table + tile * 16 + (row & 0x07);
            let mut lo = bus.ppu_read(addr);
            let mut hi = bus.ppu_read(addr + 8);
            if slot.flip_horizontal() {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }
            self.sprites[i].pattern_lo = lo;
            self.sprites[i].pattern_hi = hi;
        }
    }

    fn background_pixel(&self, x: usize) -> (u8, u8) {
        if !self.mask.show_background_at(x) {
            return (0, 0);
        }
        let bit = 0x8000u16 >> self.fine_x;
        let p0 = (self.bg_pattern_lo & bit != 0) as u8;
        let p1 = (self.bg_pattern_hi & bit != 0) as u8;
        let a0 = (self.bg_attr_lo & bit != 0) as u8;
        let a1 = (self.bg_attr_hi & bit != 0) as u8;
        ((p1 << 1) | p0, (a1 << 1) | a0)
    }

    fn sprite_pixel(&self, x: usize) -> Option<(u8, SpriteSlot)> {
        if !self.mask.show_sprites_at(x) {
            return None;
        }
        self.line_sprites()
            .iter()
            .map(|slot| (slot.pixel_at(x), *slot))
            .find(|(pixel, _)| *pixel != 0)
    }

    fn emit_pixel<B: PpuBus>(&mut self, bus: &mut B, x: usize, y: usize) {
        let (bg_pixel, bg_palette) = self.background_pixel(x);
        let sprite = self.sprite_pixel(x);

        if let Some((_, slot)) = sprite {
            if slot.index == 0 && bg_pixel != 0 && x != 255 {
                self.status.insert(StatusRegister::SPRITE_ZERO_HIT);
            }
        }

        let palette_entry = match sprite {
            Some((pixel, slot)) if bg_pixel == 0 || !slot.behind_background() => {
                0x10 | (slot.palette() << 2) | pixel
            }
            _ if bg_pixel != 0 => (bg_palette << 2) | bg_pixel,
            _ => 0,
        };

        let mut color = bus.ppu_read(0x3F00 | palette_entry as u16) & 0x3F;
        if self.mask.contains(MaskRegister::GRAYSCALE) {
            color &= 0x30;
        }
        self.frame_buffer[y * FRAME_WIDTH + x] = color;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cartridge::{Mirroring, CHR_BANK_SIZE, SAVE_RAM_BANK_SIZE};
    use crate::mapper::nrom::NromMapper;
    use crate::vram::{VideoBus, VideoMemory};

    struct TestBus {
        memory: VideoMemory,
        mapper: NromMapper,
    }

    impl TestBus {
        fn new(mirroring: Mirroring) -> Self {
            TestBus {
                memory: VideoMemory::new(),
                mapper: NromMapper::new(
                    vec![0; 0x4000],
                    vec![0; CHR_BANK_SIZE],
                    true,
                    vec![0; SAVE_RAM_BANK_SIZE],
                    mirroring,
                ),
            }
        }
    }

    impl PpuBus for TestBus {
        fn ppu_read(&mut self, addr: u16) -> u8 {
            VideoBus::new(&mut self.memory, &mut self.mapper).ppu_read(addr)
        }

        fn ppu_write(&mut self, addr: u16, data: u8) {
            VideoBus::new(&mut self.memory, &mut self.mapper).ppu_write(addr, data)
        }
    }

    fn setup(mirroring: Mirroring) -> (Ppu, TestBus) {
        (Ppu::new(&Config::deterministic()), TestBus::new(mirroring))
    }

    fn set_ppu_addr(ppu: &mut Ppu, bus: &mut TestBus, addr: u16) {
        ppu.write_register(PPU_ADDR, (addr >> 8) as u8, bus);
        ppu.write_register(PPU_ADDR, (addr & 0xFF) as u8, bus);
    }

    fn tick_n(ppu: &mut Ppu, bus: &mut TestBus, n: usize) {
        for _ in 0..n {
            ppu.tick(bus);
        }
    }

    /// Solid tile 1 in pattern table 0 (color 3 everywhere), tile 2 with only
    /// the leftmost column set (color 1).
    fn load_patterns(bus: &mut TestBus) {
        for row in 0..8 {
            bus.ppu_write(0x0010 + row, 0xFF);
            bus.ppu_write(0x0018 + row, 0xFF);
            bus.ppu_write(0x0020 + row, 0x80);
        }
    }

    #[test]
    fn test_ppuaddr_and_ppudata_round_trip() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        set_ppu_addr(&mut ppu, &mut bus, 0x2000);
        ppu.write_register(PPU_DATA, 0x12, &mut bus);

        set_ppu_addr(&mut ppu, &mut bus, 0x2000);
        assert_eq!(ppu.read_register(PPU_DATA, &mut bus), 0x00);
        assert_eq!(ppu.read_register(PPU_DATA, &mut bus), 0x12);
    }

    #[test]
    fn test_ppuctrl_bit2_changes_ppudata_increment() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        ppu.write_register(PPU_CTRL, 0x04, &mut bus);
        set_ppu_addr(&mut ppu, &mut bus, 0x2000);
        ppu.write_register(PPU_DATA, 0xAA, &mut bus);
        ppu.write_register(PPU_DATA, 0xBB, &mut bus);

        assert_eq!(bus.ppu_read(0x2000), 0xAA);
        assert_eq!(bus.ppu_read(0x2020), 0xBB);
        assert_eq!(bus.ppu_read(0x2001), 0x00);
        assert_eq!(ppu.vram_addr(), 0x2040);
    }

    #[test]
    fn test_ppustatus_read_clears_vblank_and_latch() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.status.insert(StatusRegister::VBLANK_STARTED);
        ppu.write_register(PPU_SCROLL, 0x01, &mut bus);
        assert!(ppu.write_latch());

        let status = ppu.read_register(PPU_STATUS, &mut bus);
        assert_eq!(status & 0x80, 0x80);
        assert!(!ppu.status().contains(StatusRegister::VBLANK_STARTED));
        assert!(!ppu.write_latch());
    }

    #[test]
    fn test_scroll_and_addr_share_the_write_latch() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        ppu.write_register(PPU_SCROLL, 0x7D, &mut bus);
        assert_eq!(ppu.fine_x(), 0x05);
        assert_eq!(ppu.temp_vram_addr() & 0x001F, 0x0F);
        // Second write of the pair lands in $2006's low byte.
        ppu.write_register(PPU_ADDR, 0x34, &mut bus);
        assert!(!ppu.write_latch());
        assert_eq!(ppu.vram_addr() & 0x00FF, 0x34);
    }

    #[test]
    fn test_scroll_second_write_sets_fine_and_coarse_y() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        ppu.write_register(PPU_SCROLL, 0x00, &mut bus);
        ppu.write_register(PPU_SCROLL, 0x5E, &mut bus);
        // 0x5E = coarse Y 11, fine Y 6
        assert_eq!(ppu.temp_vram_addr(), (6 << 12) | (11 << 5));
    }

    #[test]
    fn test_ppuctrl_sets_nametable_bits_of_temp_addr() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_CTRL, 0x03, &mut bus);
        assert_eq!(ppu.temp_vram_addr() & 0x0C00, 0x0C00);
    }

    #[test]
    fn test_register_mirrors_every_eight_bytes() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        ppu.write_register(0x3FFE, 0x21, &mut bus);
        ppu.write_register(0x200E, 0x05, &mut bus);
        ppu.write_register(0x3FFF, 0x77, &mut bus);
        assert_eq!(bus.ppu_read(0x2105), 0x77);
    }

    #[test]
    fn test_palette_special_mirror_3f10_to_3f00() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        set_ppu_addr(&mut ppu, &mut bus, 0x3F10);
        ppu.write_register(PPU_DATA, 0x17, &mut bus);

        set_ppu_addr(&mut ppu, &mut bus, 0x3F00);
        assert_eq!(ppu.read_register(PPU_DATA, &mut bus), 0x17);
    }

    #[test]
    fn test_ppudata_palette_read_is_immediate_and_updates_buffer() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        set_ppu_addr(&mut ppu, &mut bus, 0x2F00);
        ppu.write_register(PPU_DATA, 0x44, &mut bus);
        set_ppu_addr(&mut ppu, &mut bus, 0x3F00);
        ppu.write_register(PPU_DATA, 0x28, &mut bus);

        set_ppu_addr(&mut ppu, &mut bus, 0x3F00);
        assert_eq!(ppu.read_register(PPU_DATA, &mut bus), 0x28);

        // Buffer now holds the name-table byte under the palette ($2F00).
        set_ppu_addr(&mut ppu, &mut bus, 0x2000);
        assert_eq!(ppu.read_register(PPU_DATA, &mut bus), 0x44);
    }

    #[test]
    fn test_oam_data_port_and_dma() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        ppu.write_register(PPU_OAM_ADDR, 0x10, &mut bus);
        ppu.write_register(PPU_OAM_DATA, 0x99, &mut bus);
        assert_eq!(ppu.oam()[0x10], 0x99);

        let mut page = [0u8; 256];
        for (i, byte) in page.iter_mut().enumerate() {
            *byte = i as u8;
        }
        ppu.write_register(PPU_OAM_ADDR, 0x04, &mut bus);
        ppu.write_oam_dma(&page);
        assert_eq!(ppu.oam()[0x04], 0x00);
        assert_eq!(ppu.oam()[0x03], 0xFF);

        ppu.write_register(PPU_OAM_ADDR, 0x05, &mut bus);
        assert_eq!(ppu.read_register(PPU_OAM_DATA, &mut bus), 0x01);
    }

    #[test]
    fn test_vblank_sets_after_241_lines_and_one_dot() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);

        tick_n(&mut ppu, &mut bus, 241 * 341);
        assert!(!ppu.status().contains(StatusRegister::VBLANK_STARTED));
        ppu.tick(&mut bus);
        assert_eq!((ppu.scanline(), ppu.dot()), (241, 1));
        assert!(ppu.status().contains(StatusRegister::VBLANK_STARTED));
        assert_eq!(ppu.frame(), 1);

        ppu.write_register(PPU_SCROLL, 0x00, &mut bus);
        let status = ppu.read_register(PPU_STATUS, &mut bus);
        assert_eq!(status & 0x80, 0x80);
        assert!(!ppu.status().contains(StatusRegister::VBLANK_STARTED));
        assert!(!ppu.write_latch());
    }

    #[test]
    fn test_vblank_raises_nmi_only_when_enabled() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        tick_n(&mut ppu, &mut bus, 241 * 341 + 1);
        assert!(!ppu.take_nmi());

        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        tick_n(&mut ppu, &mut bus, 241 * 341 + 1);
        assert!(ppu.take_nmi());
        assert!(!ppu.take_nmi());
    }

    #[test]
    fn test_enabling_nmi_during_vblank_raises_it() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        tick_n(&mut ppu, &mut bus, 241 * 341 + 5);
        assert!(!ppu.take_nmi());

        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        assert!(ppu.take_nmi());
    }

    #[test]
    fn test_pre_render_line_clears_flags() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        tick_n(&mut ppu, &mut bus, 241 * 341 + 1);
        ppu.status.insert(StatusRegister::SPRITE_ZERO_HIT | StatusRegister::SPRITE_OVERFLOW);

        tick_n(&mut ppu, &mut bus, 20 * 341);
        assert_eq!((ppu.scanline(), ppu.dot()), (261, 1));
        assert!(ppu.status().is_empty());
    }

    #[test]
    fn test_frame_length_even_and_odd() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_MASK, 0x08, &mut bus);

        // Frame 0 (even) is full length.
        tick_n(&mut ppu, &mut bus, 262 * 341);
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));
        assert!(ppu.odd_frame());

        // Frame 1 (odd) drops a dot while rendering is on.
        tick_n(&mut ppu, &mut bus, 262 * 341 - 1);
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));
        assert!(!ppu.odd_frame());
    }

    #[test]
    fn test_odd_frame_is_full_length_with_rendering_off() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        tick_n(&mut ppu, &mut bus, 2 * 262 * 341);
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));
        assert_eq!(ppu.frame(), 2);
    }

    #[test]
    fn test_warm_up_ignores_control_writes() {
        let mut ppu = Ppu::new(&Config::default());
        let mut bus = TestBus::new(Mirroring::Horizontal);

        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        ppu.write_register(PPU_ADDR, 0x21, &mut bus);
        assert!(ppu.ctrl().is_empty());
        assert!(!ppu.write_latch());

        ppu.write_register(PPU_OAM_ADDR, 0x07, &mut bus);
        ppu.write_register(PPU_OAM_DATA, 0x42, &mut bus);
        assert_eq!(ppu.oam()[7], 0x42);

        tick_n(&mut ppu, &mut bus, WARM_UP_DOTS as usize);
        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        assert!(ppu.ctrl().contains(ControlRegister::GENERATE_NMI));
    }

    #[test]
    fn test_power_up_noise_is_seeded_and_ends_at_pre_render() {
        let config = Config::deterministic().with_power_up_seed(Some(0xC0FFEE));
        let mut bus = TestBus::new(Mirroring::Horizontal);

        let mut first = Ppu::new(&config);
        let mut second = Ppu::new(&config);
        let reads_a: Vec<u8> = (0..16)
            .map(|_| first.read_register(PPU_STATUS, &mut bus) & 0xA0)
            .collect();
        let reads_b: Vec<u8> = (0..16)
            .map(|_| second.read_register(PPU_STATUS, &mut bus) & 0xA0)
            .collect();
        assert_eq!(reads_a, reads_b);
        assert!(reads_a.iter().any(|value| *value != 0));

        tick_n(&mut first, &mut bus, 261 * 341 + 1);
        first.read_register(PPU_STATUS, &mut bus);
        for _ in 0..16 {
            assert_eq!(first.read_register(PPU_STATUS, &mut bus) & 0xA0, 0);
        }
    }

    #[test]
    fn test_write_only_register_reads_return_open_bus() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_MASK, 0x1E, &mut bus);
        assert_eq!(ppu.read_register(PPU_CTRL, &mut bus), 0x1E);
        assert_eq!(ppu.read_register(PPU_STATUS, &mut bus) & 0x1F, 0x1E);
    }

    #[test]
    fn test_open_bus_decays() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_OAM_ADDR, 0x5A, &mut bus);
        tick_n(&mut ppu, &mut bus, OPEN_BUS_DECAY_DOTS as usize);
        assert_eq!(ppu.read_register(PPU_MASK, &mut bus), 0x00);
    }

    #[test]
    fn test_coarse_x_wraps_into_next_nametable() {
        let (mut ppu, _) = setup(Mirroring::Horizontal);
        ppu.vram_addr = 0x001F;
        ppu.increment_coarse_x();
        assert_eq!(ppu.vram_addr, 0x0400);
    }

    #[test]
    fn test_increment_y_wraps_at_row_29() {
        let (mut ppu, _) = setup(Mirroring::Horizontal);
        ppu.vram_addr = 0x7000 | (29 << 5);
        ppu.increment_y();
        assert_eq!(ppu.vram_addr, 0x0800);

        ppu.vram_addr = 0x7000 | (31 << 5);
        ppu.increment_y();
        assert_eq!(ppu.vram_addr, 0x0000);
    }

    #[test]
    fn test_background_renders_tile_colors() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        load_patterns(&mut bus);
        for i in 0..32 {
            bus.ppu_write(0x2000 + i, 1);
        }
        bus.ppu_write(0x3F00, 0x0F);
        bus.ppu_write(0x3F03, 0x21);
        ppu.write_register(PPU_MASK, 0x0A, &mut bus);

        // Runs the pre-render line of the previous frame into frame 1.
        tick_n(&mut ppu, &mut bus, 262 * 341 + 2 * 341);
        let row = &ppu.frame_buffer()[0..FRAME_WIDTH];
        assert!(row.iter().all(|color| *color == 0x21));
        let second_row = &ppu.frame_buffer()[8 * FRAME_WIDTH..9 * FRAME_WIDTH];
        assert!(second_row.iter().all(|color| *color == 0x0F));
    }

    #[test]
    fn test_fine_x_scroll_shifts_background() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        load_patterns(&mut bus);
        bus.ppu_write(0x2001, 2);
        bus.ppu_write(0x3F01, 0x16);
        ppu.write_register(PPU_SCROLL, 0x03, &mut bus);
        ppu.write_register(PPU_SCROLL, 0x00, &mut bus);
        ppu.write_register(PPU_MASK, 0x0A, &mut bus);

        tick_n(&mut ppu, &mut bus, 262 * 341 + 2 * 341);
        // Tile 2's single column sits at x=8, scrolled three pixels left.
        assert_eq!(ppu.frame_buffer()[5], 0x16);
        assert_eq!(ppu.frame_buffer()[4], 0x00);
        assert_eq!(ppu.frame_buffer()[8], 0x00);
    }

    #[test]
    fn test_sprite_zero_hit_over_opaque_background() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        load_patterns(&mut bus);
        for i in 0..32 * 30 {
            bus.ppu_write(0x2000 + i, 1);
        }
        bus.ppu_write(0x3F11, 0x30);
        ppu.write_register(PPU_OAM_ADDR, 0, &mut bus);
        for byte in [20u8, 1, 0, 40] {
            ppu.write_register(PPU_OAM_DATA, byte, &mut bus);
        }
        ppu.write_register(PPU_MASK, 0x1E, &mut bus);

        tick_n(&mut ppu, &mut bus, 262 * 341 + 20 * 341);
        assert!(!ppu.status().contains(StatusRegister::SPRITE_ZERO_HIT));
        tick_n(&mut ppu, &mut bus, 2 * 341);
        assert!(ppu.status().contains(StatusRegister::SPRITE_ZERO_HIT));
    }

    #[test]
    fn test_sprite_priority_and_transparency() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        load_patterns(&mut bus);
        // Background tile 2 (only its left column opaque) across row 0.
        for i in 0..32 {
            bus.ppu_write(0x2000 + i, 2);
        }
        bus.ppu_write(0x3F01, 0x01);
        bus.ppu_write(0x3F13, 0x2C);
        ppu.write_register(PPU_OAM_ADDR, 0, &mut bus);
        // Sprite 0: behind background at x=16. Sprite 1: in front at x=32.
        for byte in [0u8, 1, 0x20, 16, 0, 1, 0x00, 32] {
            ppu.write_register(PPU_OAM_DATA, byte, &mut bus);
        }
        ppu.write_register(PPU_MASK, 0x1E, &mut bus);

        tick_n(&mut ppu, &mut bus, 262 * 341 + 3 * 341);
        let line = &ppu.frame_buffer()[FRAME_WIDTH..2 * FRAME_WIDTH];
        // Opaque background wins over the behind-priority sprite...
        assert_eq!(line[16], 0x01);
        // ...but the sprite shows through transparent background pixels.
        assert_eq!(line[17], 0x2C);
        // Front-priority sprite covers the background.
        assert_eq!(line[32], 0x2C);
    }

    #[test]
    fn test_sprite_overflow_flag_on_crowded_line() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        ppu.write_register(PPU_OAM_ADDR, 0, &mut bus);
        for i in 0..9u8 {
            for byte in [50u8, 0, 0, i * 10] {
                ppu.write_register(PPU_OAM_DATA, byte, &mut bus);
            }
        }
        for _ in 9..64 {
            for _ in 0..4 {
                ppu.write_register(PPU_OAM_DATA, 0xF8, &mut bus);
            }
        }
        ppu.write_register(PPU_MASK, 0x10, &mut bus);

        tick_n(&mut ppu, &mut bus, 50 * 341 + 257);
        assert!(ppu.status().contains(StatusRegister::SPRITE_OVERFLOW));
        assert_eq!(ppu.line_sprites().len(), 8);
    }

    #[test]
    fn test_grayscale_masks_color() {
        let (mut ppu, mut bus) = setup(Mirroring::Horizontal);
        bus.ppu_write(0x3F00, 0x2C);
        ppu.write_register(PPU_MASK, 0x01, &mut bus);
        tick_n(&mut ppu, &mut bus, 2);
        assert_eq!(ppu.frame_buffer()[1], 0x20);
    }

    #[test]
    fn test_reset_restarts_warm_up_and_clears_control() {
        let mut ppu = Ppu::new(&Config::default());
        let mut bus = TestBus::new(Mirroring::Horizontal);
        tick_n(&mut ppu, &mut bus, WARM_UP_DOTS as usize);
        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        ppu.write_register(PPU_OAM_ADDR, 0x01, &mut bus);
        ppu.write_register(PPU_OAM_DATA, 0x33, &mut bus);
        assert!(ppu.ctrl().contains(ControlRegister::GENERATE_NMI));

        ppu.reset();
        assert!(ppu.ctrl().is_empty());
        assert_eq!(ppu.oam()[1], 0x33);
        assert_eq!((ppu.scanline(), ppu.dot()), (0, 0));

        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        assert!(ppu.ctrl().is_empty());
        tick_n(&mut ppu, &mut bus, WARM_UP_DOTS as usize - 1);
        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        assert!(ppu.ctrl().is_empty());

        ppu.tick(&mut bus);
        ppu.write_register(PPU_CTRL, 0x80, &mut bus);
        assert!(ppu.ctrl().contains(ControlRegister::GENERATE_NMI));
    }
}
