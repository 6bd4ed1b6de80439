/// CPU cycles after power/reset during which the PPU ignores writes to its
/// control, mask, scroll and address ports.
pub const WARM_UP_CPU_CYCLES: u32 = 29_658;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteOverflow {
    /// First eight in-range sprites in OAM order, overflow on the ninth.
    Simplified,
    /// Reproduces the diagonal OAM scan that real hardware performs once the
    /// secondary buffer is full, including its false positives/negatives.
    HardwareScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub warm_up: bool,
    pub power_up_seed: Option<u64>,
    pub sprite_overflow: SpriteOverflow,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            warm_up: true,
            power_up_seed: None,
            sprite_overflow: SpriteOverflow::Simplified,
        }
    }
}

impl Config {
    /// No warm-up window and no power-up noise. Register writes take effect
    /// immediately, which is what unit tests and trace comparisons want.
    pub fn deterministic() -> Self {
        Config {
            warm_up: false,
            power_up_seed: None,
            sprite_overflow: SpriteOverflow::Simplified,
        }
    }

    pub fn with_warm_up(mut self, warm_up: bool) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn with_power_up_seed(mut self, seed: Option<u64>) -> Self {
        self.power_up_seed = seed;
        self
    }

    pub fn with_sprite_overflow(mut self, mode: SpriteOverflow) -> Self {
        self.sprite_overflow = mode;
        self
    }
}
