#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod machine;
pub mod mapper;
pub mod opcodes;
pub mod ppu;
pub mod vram;

pub use cartridge::{Cartridge, MapperKind, Mirroring};
pub use config::{Config, SpriteOverflow};
pub use controller::{Controller, Joypad, JoypadButton};
pub use cpu::{Interrupt, Registers, TraceState, CPU};
pub use error::{ConfigError, CpuError, MachineError};
pub use machine::Machine;
