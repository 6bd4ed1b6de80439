use crate::cpu::AddressingMode;
use crate::error::ConfigError;
use std::collections::HashMap;

/// Official 6502 instruction set, one variant per mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
  Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
  Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
  Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
  Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Instruction {
  pub fn name(&self) -> &'static str {
    use Instruction::*;
    match self {
      Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
      Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
      Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
      Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
      Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
      Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
      Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
      Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
      Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
      Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
      Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
      Tya => "TYA",
    }
  }

  /// Instructions that only read their operand. Indexed forms of these
  /// pay an extra cycle when the effective address leaves the base page.
  pub fn is_read(&self) -> bool {
    use Instruction::*;
    matches!(self, Adc | And | Cmp | Eor | Lda | Ldx | Ldy | Ora | Sbc)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
  pub code: u8,
  pub instruction: Instruction,
  pub mnemonic: &'static str,
  pub len: u8,
  pub cycles: u8,
  pub mode: AddressingMode,
  pub page_cross_penalty: bool,
}

impl OpCode {
  pub fn new(code: u8, instruction: Instruction, cycles: u8, mode: AddressingMode) -> Self {
    OpCode {
      code,
      instruction,
      mnemonic: instruction.name(),
      len: mode.len(),
      cycles,
      mode,
      page_cross_penalty: instruction.is_read() && mode.tracks_page_cross(),
    }
  }
}

/// The 151 documented opcodes.
pub fn official_opcodes() -> Vec<OpCode> {
  use AddressingMode::*;
  use Instruction::*;

  vec![
    OpCode::new(0x69, Adc, 2, Immediate),
    OpCode::new(0x65, Adc, 3, ZeroPage),
    OpCode::new(0x75, Adc, 4, ZeroPage_X),
    OpCode::new(0x6d, Adc, 4, Absolute),
    OpCode::new(0x7d, Adc, 4, Absolute_X),
    OpCode::new(0x79, Adc, 4, Absolute_Y),
    OpCode::new(0x61, Adc, 6, Indirect_X),
    OpCode::new(0x71, Adc, 5, Indirect_Y),

    OpCode::new(0x29, And, 2, Immediate),
    OpCode::new(0x25, And, 3, ZeroPage),
    OpCode::new(0x35, And, 4, ZeroPage_X),
    OpCode::new(0x2d, And, 4, Absolute),
    OpCode::new(0x3d, And, 4, Absolute_X),
    OpCode::new(0x39, And, 4, Absolute_Y),
    OpCode::new(0x21, And, 6, Indirect_X),
    OpCode::new(0x31, And, 5, Indirect_Y),

    OpCode::new(0x0a, Asl, 2, Accumulator),
    OpCode::new(0x06, Asl, 5, ZeroPage),
    OpCode::new(0x16, Asl, 6, ZeroPage_X),
    OpCode::new(0x0e, Asl, 6, Absolute),
    OpCode::new(0x1e, Asl, 7, Absolute_X),

    OpCode::new(0x90, Bcc, 2, Relative),
    OpCode::new(0xb0, Bcs, 2, Relative),
    OpCode::new(0xf0, Beq, 2, Relative),
    OpCode::new(0x30, Bmi, 2, Relative),
    OpCode::new(0xd0, Bne, 2, Relative),
    OpCode::new(0x10, Bpl, 2, Relative),
    OpCode::new(0x50, Bvc, 2, Relative),
    OpCode::new(0x70, Bvs, 2, Relative),

    OpCode::new(0x24, Bit, 3, ZeroPage),
    OpCode::new(0x2c, Bit, 4, Absolute),

    OpCode::new(0x00, Brk, 7, Implied),

    OpCode::new(0x18, Clc, 2, Implied),
    OpCode::new(0xd8, Cld, 2, Implied),
    OpCode::new(0x58, Cli, 2, Implied),
    OpCode::new(0xb8, Clv, 2, Implied),

    OpCode::new(0xc9, Cmp, 2, Immediate),
    OpCode::new(0xc5, Cmp, 3, ZeroPage),
    OpCode::new(0xd5, Cmp, 4, ZeroPage_X),
    OpCode::new(0xcd, Cmp, 4, Absolute),
    OpCode::new(0xdd, Cmp, 4, Absolute_X),
    OpCode::new(0xd9, Cmp, 4, Absolute_Y),
    OpCode::new(0xc1, Cmp, 6, Indirect_X),
    OpCode::new(0xd1, Cmp, 5, Indirect_Y),

    OpCode::new(0xe0, Cpx, 2, Immediate),
    OpCode::new(0xe4, Cpx, 3, ZeroPage),
    OpCode::new(0xec, Cpx, 4, Absolute),

    OpCode::new(0xc0, Cpy, 2, Immediate),
    OpCode::new(0xc4, Cpy, 3, ZeroPage),
    OpCode::new(0xcc, Cpy, 4, Absolute),

    OpCode::new(0xc6, Dec, 5, ZeroPage),
    OpCode::new(0xd6, Dec, 6, ZeroPage_X),
    OpCode::new(0xce, Dec, 6, Absolute),
    OpCode::new(0xde, Dec, 7, Absolute_X),

    OpCode::new(0xca, Dex, 2, Implied),
    OpCode::new(0x88, Dey, 2, Implied),

    OpCode::new(0x49, Eor, 2, Immediate),
    OpCode::new(0x45, Eor, 3, ZeroPage),
    OpCode::new(0x55, Eor, 4, ZeroPage_X),
    OpCode::new(0x4d, Eor, 4, Absolute),
    OpCode::new(0x5d, Eor, 4, Absolute_X),
    OpCode::new(0x59, Eor, 4, Absolute_Y),
    OpCode::new(0x41, Eor, 6, Indirect_X),
    OpCode::new(0x51, Eor, 5, Indirect_Y),

    OpCode::new(0xe6, Inc, 5, ZeroPage),
    OpCode::new(0xf6, Inc, 6, ZeroPage_X),
    OpCode::new(0xee, Inc, 6, Absolute),
    OpCode::new(0xfe, Inc, 7, Absolute_X),

    OpCode::new(0xe8, Inx, 2, Implied),
    OpCode::new(0xc8, Iny, 2, Implied),

    OpCode::new(0x4c, Jmp, 3, Absolute),
    OpCode::new(0x6c, Jmp, 5, Indirect),
    OpCode::new(0x20, Jsr, 6, Absolute),

    OpCode::new(0xa9, Lda, 2, Immediate),
    OpCode::new(0xa5, Lda, 3, ZeroPage),
    OpCode::new(0xb5, Lda, 4, ZeroPage_X),
    OpCode::new(0xad, Lda, 4, Absolute),
    OpCode::new(0xbd, Lda, 4, Absolute_X),
    OpCode::new(0xb9, Lda, 4, Absolute_Y),
    OpCode::new(0xa1, Lda, 6, Indirect_X),
    OpCode::new(0xb1, Lda, 5, Indirect_Y),

    OpCode::new(0xa2, Ldx, 2, Immediate),
    OpCode::new(0xa6, Ldx, 3, ZeroPage),
    OpCode::new(0xb6, Ldx, 4, ZeroPage_Y),
    OpCode::new(0xae, Ldx, 4, Absolute),
    OpCode::new(0xbe, Ldx, 4, Absolute_Y),

    OpCode::new(0xa0, Ldy, 2, Immediate),
    OpCode::new(0xa4, Ldy, 3, ZeroPage),
    OpCode::new(0xb4, Ldy, 4, ZeroPage_X),
    OpCode::new(0xac, Ldy, 4, Absolute),
    OpCode::new(0xbc, Ldy, 4, Absolute_X),

    OpCode::new(0x4a, Lsr, 2, Accumulator),
    OpCode::new(0x46, Lsr, 5, ZeroPage),
    OpCode::new(0x56, Lsr, 6, ZeroPage_X),
    OpCode::new(0x4e, Lsr, 6, Absolute),
    OpCode::new(0x5e, Lsr, 7, Absolute_X),

    OpCode::new(0xea, Nop, 2, Implied),

    OpCode::new(0x09, Ora, 2, Immediate),
    OpCode::new(0x05, Ora, 3, ZeroPage),
    OpCode::new(0x15, Ora, 4, ZeroPage_X),
    OpCode::new(0x0d, Ora, 4, Absolute),
    OpCode::new(0x1d, Ora, 4, Absolute_X),
    OpCode::new(0x19, Ora, 4, Absolute_Y),
    OpCode::new(0x01, Ora, 6, Indirect_X),
    OpCode::new(0x11, Ora, 5, Indirect_Y),

    OpCode::new(0x48, Pha, 3, Implied),
    OpCode::new(0x08, Php, 3, Implied),
    OpCode::new(0x68, Pla, 4, Implied),
    OpCode::new(0x28, Plp, 4, Implied),

    OpCode::new(0x2a, Rol, 2, Accumulator),
    OpCode::new(0x26, Rol, 5, ZeroPage),
    OpCode::new(0x36, Rol, 6, ZeroPage_X),
    OpCode::new(0x2e, Rol, 6, Absolute),
    OpCode::new(0x3e, Rol, 7, Absolute_X),

    OpCode::new(0x6a, Ror, 2, Accumulator),
    OpCode::new(0x66, Ror, 5, ZeroPage),
    OpCode::new(0x76, Ror, 6, ZeroPage_X),
    OpCode::new(0x6e, Ror, 6, Absolute),
    OpCode::new(0x7e, Ror, 7, Absolute_X),

    OpCode::new(0x40, Rti, 6, Implied),
    OpCode::new(0x60, Rts, 6, Implied),

    OpCode::new(0xe9, Sbc, 2, Immediate),
    OpCode::new(0xe5, Sbc, 3, ZeroPage),
    OpCode::new(0xf5, Sbc, 4, ZeroPage_X),
    OpCode::new(0xed, Sbc, 4, Absolute),
    OpCode::new(0xfd, Sbc, 4, Absolute_X),
    OpCode::new(0xf9, Sbc, 4, Absolute_Y),
    OpCode::new(0xe1, Sbc, 6, Indirect_X),
    OpCode::new(0xf1, Sbc, 5, Indirect_Y),

    OpCode::new(0x38, Sec, 2, Implied),
    OpCode::new(0xf8, Sed, 2, Implied),
    OpCode::new(0x78, Sei, 2, Implied),

    OpCode::new(0x85, Sta, 3, ZeroPage),
    OpCode::new(0x95, Sta, 4, ZeroPage_X),
    OpCode::new(0x8d, Sta, 4, Absolute),
    OpCode::new(0x9d, Sta, 5, Absolute_X),
    OpCode::new(0x99, Sta, 5, Absolute_Y),
    OpCode::new(0x81, Sta, 6, Indirect_X),
    OpCode::new(0x91, Sta, 6, Indirect_Y),

    OpCode::new(0x86, Stx, 3, ZeroPage),
    OpCode::new(0x96, Stx, 4, ZeroPage_Y),
    OpCode::new(0x8e, Stx, 4, Absolute),

    OpCode::new(0x84, Sty, 3, ZeroPage),
    OpCode::new(0x94, Sty, 4, ZeroPage_X),
    OpCode::new(0x8c, Sty, 4, Absolute),

    OpCode::new(0xaa, Tax, 2, Implied),
    OpCode::new(0xa8, Tay, 2, Implied),
    OpCode::new(0xba, Tsx, 2, Implied),
    OpCode::new(0x8a, Txa, 2, Implied),
    OpCode::new(0x9a, Txs, 2, Implied),
    OpCode::new(0x98, Tya, 2, Implied),
  ]
}

/// Checks that every opcode byte and every (mnemonic, mode) pair appears
/// once, then indexes the table by opcode byte.
pub fn build_opcode_table(opcodes: &[OpCode]) -> Result<HashMap<u8, OpCode>, ConfigError> {
  let mut by_code = HashMap::new();
  let mut by_pair: HashMap<(Instruction, AddressingMode), u8> = HashMap::new();

  for op in opcodes {
    if by_code.insert(op.code, *op).is_some() {
      return Err(ConfigError::DuplicateOpcode(op.code));
    }
    if let Some(first) = by_pair.insert((op.instruction, op.mode), op.code) {
      return Err(ConfigError::DuplicateInstruction {
        mnemonic: op.mnemonic,
        mode: op.mode.name(),
        first,
        second: op.code,
      });
    }
  }

  Ok(by_code)
}

lazy_static! {
  pub static ref CPU_OPS_CODES: Vec<OpCode> = official_opcodes();

  pub static ref OPCODES_MAP: HashMap<u8, OpCode> = match build_opcode_table(&CPU_OPS_CODES) {
    Ok(map) => map,
    Err(err) => panic!("invalid opcode table: {}", err),
  };
}
