use crate::cpu::Registers;
use thiserror::Error;

/// Fatal execution faults. The program counter in the snapshot points at the
/// byte that could not be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unknown opcode {opcode:#04x} ({registers})")]
    UnknownOpcode { opcode: u8, registers: Registers },
    #[error("opcode fetch from unmapped address {addr:#06x} ({registers})")]
    UnmappedFetch { addr: u16, registers: Registers },
}

impl CpuError {
    pub fn registers(&self) -> Registers {
        match self {
            CpuError::UnknownOpcode { registers, .. } => *registers,
            CpuError::UnmappedFetch { registers, .. } => *registers,
        }
    }
}

/// Programming and load-time contract violations. These surface before any
/// ticking happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("opcode {0:#04x} registered twice")]
    DuplicateOpcode(u8),
    #[error("{mnemonic} with {mode} addressing registered as both {first:#04x} and {second:#04x}")]
    DuplicateInstruction {
        mnemonic: &'static str,
        mode: &'static str,
        first: u8,
        second: u8,
    },
    #[error("cartridge supplies no program banks")]
    NoProgramBanks,
    #[error("mapper {kind} needs {expected} program banks at most, got {actual}")]
    TooManyProgramBanks {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{region} bank {index} is {actual} bytes, expected {expected}")]
    BankSize {
        region: &'static str,
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error(transparent)]
    Cpu(#[from] CpuError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
