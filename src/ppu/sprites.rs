use crate::config::SpriteOverflow;

pub const OAM_SIZE: usize = 256;
pub const SPRITES_PER_LINE: usize = 8;

/// One entry of secondary OAM: the copied attribute record, the sprite's
/// index in primary OAM and its pattern bytes for the upcoming line
/// (already flipped horizontally when the attribute asks for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpriteSlot {
    pub index: u8,
    pub y: u8,
    pub tile: u8,
    pub attributes: u8,
    pub x: u8,
    pub pattern_lo: u8,
    pub pattern_hi: u8,
}

impl SpriteSlot {
    pub fn palette(&self) -> u8 {
        self.attributes & 0x03
    }

    pub fn behind_background(&self) -> bool {
        self.attributes & 0x20 != 0
    }

    pub fn flip_horizontal(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn flip_vertical(&self) -> bool {
        self.attributes & 0x80 != 0
    }

    /// 2-bit pixel at screen column `x`, 0 when outside the sprite.
    pub fn pixel_at(&self, x: usize) -> u8 {
        let offset = x as isize - self.x as isize;
        if !(0..8).contains(&offset) {
            return 0;
        }
        let bit = 7 - offset as u8;
        (((self.pattern_hi >> bit) & 1) << 1) | ((self.pattern_lo >> bit) & 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub slots: [SpriteSlot; SPRITES_PER_LINE],
    pub count: usize,
    pub overflow: bool,
}

fn in_range(y: u8, scanline: u16, height: u16) -> bool {
    let row = scanline as i32 - y as i32;
    row >= 0 && row < height as i32
}

fn copy_slot(oam: &[u8; OAM_SIZE], n: usize) -> SpriteSlot {
    SpriteSlot {
        index: n as u8,
        y: oam[n * 4],
        tile: oam[n * 4 + 1],
        attributes: oam[n * 4 + 2],
        x: oam[n * 4 + 3],
        pattern_lo: 0,
        pattern_hi: 0,
    }
}

/// Selects the sprites drawn on the line after `scanline`. Pattern bytes
/// are left for the caller to fetch.
pub fn evaluate(
    oam: &[u8; OAM_SIZE],
    scanline: u16,
    height: u16,
    mode: SpriteOverflow,
) -> Evaluation {
    let mut eval = Evaluation::default();
    let mut n = 0;

    while n < 64 && eval.count < SPRITES_PER_LINE {
        if in_range(oam[n * 4], scanline, height) {
            eval.slots[eval.count] = copy_slot(oam, n);
            eval.count += 1;
        }
        n += 1;
    }

    match mode {
        SpriteOverflow::Simplified => {
            eval.overflow = (n..64).any(|n| in_range(oam[n * 4], scanline, height));
        }
        SpriteOverflow::HardwareScan => {
            // With the buffer full, the byte offset advances along with the
            // sprite index, so tile/attribute/X bytes get compared as Y.
            let mut m = 0;
            while n < 64 {
                if in_range(oam[n * 4 + m], scanline, height) {
                    eval.overflow = true;
                    break;
                }
                n += 1;
                m = (m + 1) & 3;
            }
        }
    }

    eval
}
