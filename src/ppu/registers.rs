bitflags! {
  /// $2000 PPUCTRL
  pub struct ControlRegister: u8 {
    const NAMETABLE_X        = 0b00000001;
    const NAMETABLE_Y        = 0b00000010;
    const VRAM_INCREMENT_32  = 0b00000100;
    const SPRITE_TABLE       = 0b00001000;
    const BACKGROUND_TABLE   = 0b00010000;
    const SPRITE_SIZE_16     = 0b00100000;
    const MASTER_SLAVE       = 0b01000000;
    const GENERATE_NMI       = 0b10000000;
  }
}

bitflags! {
  /// $2001 PPUMASK
  pub struct MaskRegister: u8 {
    const GRAYSCALE          = 0b00000001;
    const SHOW_BACKGROUND_LEFT = 0b00000010;
    const SHOW_SPRITES_LEFT  = 0b00000100;
    const SHOW_BACKGROUND    = 0b00001000;
    const SHOW_SPRITES       = 0b00010000;
    const EMPHASIZE_RED      = 0b00100000;
    const EMPHASIZE_GREEN    = 0b01000000;
    const EMPHASIZE_BLUE     = 0b10000000;
  }
}

bitflags! {
  /// $2002 PPUSTATUS. The low five bits are never driven and read back as
  /// whatever the internal data bus last held.
  pub struct StatusRegister: u8 {
    const SPRITE_OVERFLOW    = 0b00100000;
    const SPRITE_ZERO_HIT    = 0b01000000;
    const VBLANK_STARTED     = 0b10000000;
  }
}

impl ControlRegister {
    pub fn vram_increment(&self) -> u16 {
        if self.contains(ControlRegister::VRAM_INCREMENT_32) {
            32
        } else {
            1
        }
    }

    pub fn background_table(&self) -> u16 {
        if self.contains(ControlRegister::BACKGROUND_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn sprite_table(&self) -> u16 {
        if self.contains(ControlRegister::SPRITE_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    pub fn sprite_height(&self) -> u16 {
        if self.contains(ControlRegister::SPRITE_SIZE_16) {
            16
        } else {
            8
        }
    }

    /// Name-table select bits positioned for the internal VRAM address.
    pub fn nametable_bits(&self) -> u16 {
        ((self.bits() & 0x03) as u16) << 10
    }
}

impl MaskRegister {
    pub fn rendering_enabled(&self) -> bool {
        self.intersects(MaskRegister::SHOW_BACKGROUND | MaskRegister::SHOW_SPRITES)
    }

    pub fn show_background_at(&self, x: usize) -> bool {
        self.contains(MaskRegister::SHOW_BACKGROUND)
            && (x >= 8 || self.contains(MaskRegister::SHOW_BACKGROUND_LEFT))
    }

    pub fn show_sprites_at(&self, x: usize) -> bool {
        self.contains(MaskRegister::SHOW_SPRITES)
            && (x >= 8 || self.contains(MaskRegister::SHOW_SPRITES_LEFT))
    }
}
