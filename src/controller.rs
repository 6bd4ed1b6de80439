/// A device on one of the two serial input ports. The bus forwards
/// $4016 writes to both ports and $4016/$4017 reads to port 1/2.
pub trait Controller {
    /// Strobe/latch write. Only bit 0 is meaningful on a standard pad.
    fn write(&mut self, data: u8);
    /// Next serial bit in bit 0.
    fn read(&mut self) -> u8;
}

bitflags! {
  /// Button bits in the order the pad shifts them out.
  pub struct JoypadButton: u8 {
    const A      = 0b00000001;
    const B      = 0b00000010;
    const SELECT = 0b00000100;
    const START  = 0b00001000;
    const UP     = 0b00010000;
    const DOWN   = 0b00100000;
    const LEFT   = 0b01000000;
    const RIGHT  = 0b10000000;
  }
}

/// Standard eight-button pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joypad {
    strobe: bool,
    index: u8,
    buttons: JoypadButton,
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            strobe: false,
            index: 0,
            buttons: JoypadButton::empty(),
        }
    }

    pub fn set_button_pressed_status(&mut self, button: JoypadButton, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    pub fn buttons(&self) -> JoypadButton {
        self.buttons
    }
}

impl Controller for Joypad {
    fn write(&mut self, data: u8) {
        self.strobe = data & 1 == 1;
        if self.strobe {
            self.index = 0;
        }
    }

    fn read(&mut self) -> u8 {
        // After eight reads an official pad keeps returning 1.
        if self.index > 7 {
            return 1;
        }
        let response = (self.buttons.bits() >> self.index) & 1;
        if !self.strobe {
            self.index += 1;
        }
        response
    }
}
