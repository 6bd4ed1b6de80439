use crate::error::CpuError;
use crate::opcodes::{self, Instruction, OpCode};
use std::fmt;

bitflags! {
  pub struct CpuFlags: u8 {
    const CARRY             = 0b00000001;
    const ZERO              = 0b00000010;
    const INTERRUPT_DISABLE = 0b00000100;
    const DECIMAL_MODE      = 0b00001000;
    const BREAK             = 0b00010000;
    const BREAK2            = 0b00100000;
    const OVERFLOW          = 0b01000000;
    const NEGATIV           = 0b10000000;
  }
}

const STACK: u16 = 0x0100;
const STACK_RESET: u8 = 0xfd;
const STATUS_RESET: u8 = 0b0010_0100;
const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_BRK_VECTOR: u16 = 0xFFFE;

const INTERRUPT_CYCLES: u64 = 7;
const RESET_CYCLES: u64 = 7;
const OAM_DMA_CYCLES: u64 = 513;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPage_X,
    ZeroPage_Y,
    Relative,
    Absolute,
    Absolute_X,
    Absolute_Y,
    Indirect,
    Indirect_X,
    Indirect_Y,
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    pub fn len(&self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Absolute
            | AddressingMode::Absolute_X
            | AddressingMode::Absolute_Y
            | AddressingMode::Indirect => 3,
            _ => 2,
        }
    }

    pub fn tracks_page_cross(&self) -> bool {
        matches!(
            self,
            AddressingMode::Absolute_X | AddressingMode::Absolute_Y | AddressingMode::Indirect_Y
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AddressingMode::Implied => "implied",
            AddressingMode::Accumulator => "accumulator",
            AddressingMode::Immediate => "immediate",
            AddressingMode::ZeroPage => "zero page",
            AddressingMode::ZeroPage_X => "zero page,X",
            AddressingMode::ZeroPage_Y => "zero page,Y",
            AddressingMode::Relative => "relative",
            AddressingMode::Absolute => "absolute",
            AddressingMode::Absolute_X => "absolute,X",
            AddressingMode::Absolute_Y => "absolute,Y",
            AddressingMode::Indirect => "indirect",
            AddressingMode::Indirect_X => "(indirect,X)",
            AddressingMode::Indirect_Y => "(indirect),Y",
        }
    }
}

/// CPU view of the address space.
pub trait Mem {
    fn mem_read(&mut self, addr: u16) -> u8;

    fn mem_write(&mut self, addr: u16, data: u8);

    /// Side-effect free read used for opcode fetch and tracing. `None` when
    /// nothing that can hold code answers at `addr`.
    fn mem_fetch(&self, addr: u16) -> Option<u8>;

    /// Reports (once) that the last write started an OAM DMA transfer.
    fn take_dma_request(&mut self) -> bool {
        false
    }

    fn mem_read_u16(&mut self, pos: u16) -> u16 {
        let lo = self.mem_read(pos) as u16;
        let hi = self.mem_read(pos.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn mem_write_u16(&mut self, pos: u16, data: u16) {
        let hi = (data >> 8) as u8;
        let lo = (data & 0xff) as u8;
        self.mem_write(pos, lo);
        self.mem_write(pos.wrapping_add(1), hi);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Reset,
    Nmi,
    Irq,
}

/// Register file at one instant, carried by execution faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub pc: u16,
    pub sp: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            self.pc, self.a, self.x, self.y, self.p, self.sp
        )
    }
}

/// Snapshot of the instruction about to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceState {
    pub registers: Registers,
    pub opcode: Option<u8>,
    pub operand: [u8; 2],
    pub op: Option<OpCode>,
    pub cycles: u64,
}

impl TraceState {
    /// Assembly text for the traced instruction, `???` when it cannot decode.
    pub fn disassemble(&self) -> String {
        let op = match self.op {
            Some(op) => op,
            None => return "???".to_string(),
        };
        let lo = self.operand[0];
        let word = u16::from_le_bytes(self.operand);
        let operand = match op.mode {
            AddressingMode::Implied => String::new(),
            AddressingMode::Accumulator => " A".to_string(),
            AddressingMode::Immediate => format!(" #${:02X}", lo),
            AddressingMode::ZeroPage => format!(" ${:02X}", lo),
            AddressingMode::ZeroPage_X => format!(" ${:02X},X", lo),
            AddressingMode::ZeroPage_Y => format!(" ${:02X},Y", lo),
            AddressingMode::Relative => {
                let target = self
                    .registers
                    .pc
                    .wrapping_add(2)
                    .wrapping_add(lo as i8 as u16);
                format!(" ${:04X}", target)
            }
            AddressingMode::Absolute => format!(" ${:04X}", word),
            AddressingMode::Absolute_X => format!(" ${:04X},X", word),
            AddressingMode::Absolute_Y => format!(" ${:04X},Y", word),
            AddressingMode::Indirect => format!(" (${:04X})", word),
            AddressingMode::Indirect_X => format!(" (${:02X},X)", lo),
            AddressingMode::Indirect_Y => format!(" (${:02X}),Y", lo),
        };
        format!("{}{}", op.mnemonic, operand)
    }

    pub fn to_log_line(&self) -> String {
        let len = self.op.map_or(1, |op| op.len) as usize;
        let mut bytes = match self.opcode {
            Some(code) => format!("{:02X}", code),
            None => "??".to_string(),
        };
        for byte in self.operand.iter().take(len - 1) {
            bytes.push_str(&format!(" {:02X}", byte));
        }

        let regs = &self.registers;
        format!(
            "{:04X}  {:<8}  {:<14}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            regs.pc,
            bytes,
            self.disassemble(),
            regs.a,
            regs.x,
            regs.y,
            regs.p,
            regs.sp,
            self.cycles
        )
    }
}

/// What one call to [`CPU::run`] accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub cycles: u64,
    /// A reset was serviced and the run ended early.
    pub reset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    Accumulator,
    Address(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Advance,
    Redirected { extra_cycles: u64 },
}

pub struct CPU {
    pub register_a: u8,
    pub register_x: u8,
    pub register_y: u8,
    pub status: CpuFlags,
    pub program_counter: u16,
    pub stack_pointer: u8,
    cycles: u64,
    pending_reset: bool,
    pending_nmi: bool,
    pending_irq: bool,
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}

impl CPU {
    pub fn new() -> Self {
        CPU {
            register_a: 0,
            register_x: 0,
            register_y: 0,
            status: CpuFlags::from_bits_truncate(STATUS_RESET),
            program_counter: 0,
            stack_pointer: STACK_RESET,
            cycles: 0,
            pending_reset: false,
            pending_nmi: false,
            pending_irq: false,
        }
    }

    pub fn set_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::Reset => self.pending_reset = true,
            Interrupt::Nmi => self.pending_nmi = true,
            Interrupt::Irq => self.pending_irq = true,
        }
    }

    pub fn interrupt_pending(&self, kind: Interrupt) -> bool {
        match kind {
            Interrupt::Reset => self.pending_reset,
            Interrupt::Nmi => self.pending_nmi,
            Interrupt::Irq => self.pending_irq,
        }
    }

    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    pub fn registers(&self) -> Registers {
        Registers {
            pc: self.program_counter,
            sp: self.stack_pointer,
            a: self.register_a,
            x: self.register_x,
            y: self.register_y,
            p: self.status.bits(),
        }
    }

    pub fn trace_state<M: Mem>(&self, bus: &M) -> TraceState {
        let pc = self.program_counter;
        let opcode = bus.mem_fetch(pc);
        let op = opcode.and_then(|code| opcodes::OPCODES_MAP.get(&code).copied());
        let operand = [
            bus.mem_fetch(pc.wrapping_add(1)).unwrap_or(0),
            bus.mem_fetch(pc.wrapping_add(2)).unwrap_or(0),
        ];

        TraceState {
            registers: self.registers(),
            opcode,
            operand,
            op,
            cycles: self.cycles,
        }
    }

    /// Services pending interrupts and executes instructions until `budget`
    /// cycles have been spent. A serviced reset ends the run immediately.
    pub fn run<M: Mem>(&mut self, bus: &mut M, budget: u64) -> Result<RunOutcome, CpuError> {
        self.run_with_callback(bus, budget, |_, _| {})
    }

    pub fn run_with_trace<M, F>(
        &mut self,
        bus: &mut M,
        budget: u64,
        mut callback: F,
    ) -> Result<RunOutcome, CpuError>
    where
        M: Mem,
        F: FnMut(TraceState),
    {
        self.run_with_callback(bus, budget, |cpu, bus| callback(cpu.trace_state(bus)))
    }

    /// Like [`CPU::run`], calling `callback` right before each instruction.
    pub fn run_with_callback<M, F>(
        &mut self,
        bus: &mut M,
        budget: u64,
        mut callback: F,
    ) -> Result<RunOutcome, CpuError>
    where
        M: Mem,
        F: FnMut(&CPU, &M),
    {
        let mut spent = 0;

        while spent < budget {
            if self.pending_reset {
                self.service_reset(bus);
                return Ok(RunOutcome {
                    cycles: spent,
                    reset: true,
                });
            }

            let mut cost = 0;
            if self.pending_nmi {
                self.pending_nmi = false;
                self.service_interrupt(bus, NMI_VECTOR);
                cost += INTERRUPT_CYCLES;
            } else if self.pending_irq && !self.status.contains(CpuFlags::INTERRUPT_DISABLE) {
                self.pending_irq = false;
                self.service_interrupt(bus, IRQ_BRK_VECTOR);
                cost += INTERRUPT_CYCLES;
            }

            callback(&*self, &*bus);
            cost += self.execute_next(bus)?;
            self.cycles += cost;

            if bus.take_dma_request() {
                let stall = OAM_DMA_CYCLES + (self.cycles & 1);
                trace!("OAM DMA stalls CPU for {} cycles", stall);
                self.cycles += stall;
                cost += stall;
            }

            spent += cost;
        }

        Ok(RunOutcome {
            cycles: spent,
            reset: false,
        })
    }

    fn service_reset<M: Mem>(&mut self, bus: &mut M) {
        self.pending_reset = false;
        self.pending_nmi = false;
        self.pending_irq = false;
        self.stack_pointer = STACK_RESET;
        self.status = CpuFlags::from_bits_truncate(STATUS_RESET);
        self.program_counter = bus.mem_read_u16(RESET_VECTOR);
        self.cycles = RESET_CYCLES;
        info!("CPU reset, entry point {:#06x}", self.program_counter);
    }

    fn service_interrupt<M: Mem>(&mut self, bus: &mut M, vector: u16) {
        self.push_interrupt_state(bus, false);
        self.status.insert(CpuFlags::INTERRUPT_DISABLE);
        self.program_counter = bus.mem_read_u16(vector);
    }

    fn push_interrupt_state<M: Mem>(&mut self, bus: &mut M, break_flag: bool) {
        self.stack_push_u16(bus, self.program_counter);

        let mut status = self.status;
        status.set(CpuFlags::BREAK, break_flag);
        status.insert(CpuFlags::BREAK2);
        self.stack_push(bus, status.bits());
    }

    fn fault(&self, err: CpuError) -> CpuError {
        warn!("CPU halted: {}", err);
        err
    }

    fn execute_next<M: Mem>(&mut self, bus: &mut M) -> Result<u64, CpuError> {
        let opcode_pc = self.program_counter;
        let code = match bus.mem_fetch(opcode_pc) {
            Some(code) => code,
            None => {
                return Err(self.fault(CpuError::UnmappedFetch {
                    addr: opcode_pc,
                    registers: self.registers(),
                }))
            }
        };
        let op = match opcodes::OPCODES_MAP.get(&code) {
            Some(op) => *op,
            None => {
                return Err(self.fault(CpuError::UnknownOpcode {
                    opcode: code,
                    registers: self.registers(),
                }))
            }
        };

        self.program_counter = opcode_pc.wrapping_add(1);
        let (operand, page_crossed) = self.resolve_operand(bus, op.mode);

        let mut cost = op.cycles as u64;
        if op.page_cross_penalty && page_crossed {
            cost += 1;
        }

        match self.execute(bus, op.instruction, operand) {
            Flow::Advance => {
                self.program_counter = opcode_pc.wrapping_add(op.len as u16);
            }
            Flow::Redirected { extra_cycles } => cost += extra_cycles,
        }

        Ok(cost)
    }

    /// Effective address for `mode` with the program counter on the first
    /// operand byte, plus whether indexing left the base page.
    fn resolve_operand<M: Mem>(&mut self, bus: &mut M, mode: AddressingMode) -> (Operand, bool) {
        let pc = self.program_counter;
        match mode {
            AddressingMode::Implied => (Operand::None, false),
            AddressingMode::Accumulator => (Operand::Accumulator, false),
            AddressingMode::Immediate => (Operand::Address(pc), false),
            AddressingMode::ZeroPage => (Operand::Address(bus.mem_read(pc) as u16), false),
            AddressingMode::ZeroPage_X => {
                let pos = bus.mem_read(pc);
                (Operand::Address(pos.wrapping_add(self.register_x) as u16), false)
            }
            AddressingMode::ZeroPage_Y => {
                let pos = bus.mem_read(pc);
                (Operand::Address(pos.wrapping_add(self.register_y) as u16), false)
            }
            AddressingMode::Relative => {
                let jump = bus.mem_read(pc) as i8;
                let next = pc.wrapping_add(1);
                (Operand::Address(next.wrapping_add(jump as u16)), false)
            }
            AddressingMode::Absolute => (Operand::Address(bus.mem_read_u16(pc)), false),
            AddressingMode::Absolute_X => {
                let base = bus.mem_read_u16(pc);
                let addr = base.wrapping_add(self.register_x as u16);
                (Operand::Address(addr), page_differs(base, addr))
            }
            AddressingMode::Absolute_Y => {
                let base = bus.mem_read_u16(pc);
                let addr = base.wrapping_add(self.register_y as u16);
                (Operand::Address(addr), page_differs(base, addr))
            }
            AddressingMode::Indirect => {
                let ptr = bus.mem_read_u16(pc);
                // The high byte never carries into the next page.
                let lo = bus.mem_read(ptr);
                let hi = bus.mem_read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF));
                (Operand::Address((hi as u16) << 8 | lo as u16), false)
            }
            AddressingMode::Indirect_X => {
                let base = bus.mem_read(pc);
                let ptr = base.wrapping_add(self.register_x);
                let lo = bus.mem_read(ptr as u16);
                let hi = bus.mem_read(ptr.wrapping_add(1) as u16);
                (Operand::Address((hi as u16) << 8 | lo as u16), false)
            }
            AddressingMode::Indirect_Y => {
                let base = bus.mem_read(pc);
                let lo = bus.mem_read(base as u16);
                let hi = bus.mem_read(base.wrapping_add(1) as u16);
                let deref_base = (hi as u16) << 8 | lo as u16;
                let addr = deref_base.wrapping_add(self.register_y as u16);
                (Operand::Address(addr), page_differs(deref_base, addr))
            }
        }
    }

    fn execute<M: Mem>(&mut self, bus: &mut M, instruction: Instruction, operand: Operand) -> Flow {
        use Instruction::*;

        match instruction {
            Lda => {
                let value = self.read_operand(bus, operand);
                self.set_register_a(value);
            }
            Ldx => {
                self.register_x = self.read_operand(bus, operand);
                self.update_zero_and_negative_flags(self.register_x);
            }
            Ldy => {
                self.register_y = self.read_operand(bus, operand);
                self.update_zero_and_negative_flags(self.register_y);
            }
            Sta => self.write_operand(bus, operand, self.register_a),
            Stx => self.write_operand(bus, operand, self.register_x),
            Sty => self.write_operand(bus, operand, self.register_y),

            Tax => {
                self.register_x = self.register_a;
                self.update_zero_and_negative_flags(self.register_x);
            }
            Tay => {
                self.register_y = self.register_a;
                self.update_zero_and_negative_flags(self.register_y);
            }
            Tsx => {
                self.register_x = self.stack_pointer;
                self.update_zero_and_negative_flags(self.register_x);
            }
            Txa => self.set_register_a(self.register_x),
            Txs => self.stack_pointer = self.register_x,
            Tya => self.set_register_a(self.register_y),

            Adc => {
                let data = self.read_operand(bus, operand);
                self.add_to_register_a(data);
            }
            Sbc => {
                let data = self.read_operand(bus, operand);
                self.add_to_register_a(!data);
            }
            And => {
                let data = self.read_operand(bus, operand);
                self.set_register_a(self.register_a & data);
            }
            Eor => {
                let data = self.read_operand(bus, operand);
                self.set_register_a(self.register_a ^ data);
            }
            Ora => {
                let data = self.read_operand(bus, operand);
                self.set_register_a(self.register_a | data);
            }
            Cmp => self.compare(bus, operand, self.register_a),
            Cpx => self.compare(bus, operand, self.register_x),
            Cpy => self.compare(bus, operand, self.register_y),
            Bit => {
                let data = self.read_operand(bus, operand);
                self.status.set(CpuFlags::ZERO, self.register_a & data == 0);
                self.status.set(CpuFlags::NEGATIV, data & 0b1000_0000 != 0);
                self.status.set(CpuFlags::OVERFLOW, data & 0b0100_0000 != 0);
            }

            Asl => self.modify(bus, operand, |cpu, data| {
                cpu.status.set(CpuFlags::CARRY, data >> 7 == 1);
                data << 1
            }),
            Lsr => self.modify(bus, operand, |cpu, data| {
                cpu.status.set(CpuFlags::CARRY, data & 1 == 1);
                data >> 1
            }),
            Rol => self.modify(bus, operand, |cpu, data| {
                let old_carry = cpu.status.contains(CpuFlags::CARRY) as u8;
                cpu.status.set(CpuFlags::CARRY, data >> 7 == 1);
                (data << 1) | old_carry
            }),
            Ror => self.modify(bus, operand, |cpu, data| {
                let old_carry = cpu.status.contains(CpuFlags::CARRY) as u8;
                cpu.status.set(CpuFlags::CARRY, data & 1 == 1);
                (data >> 1) | (old_carry << 7)
            }),
            Inc => self.modify(bus, operand, |_, data| data.wrapping_add(1)),
            Dec => self.modify(bus, operand, |_, data| data.wrapping_sub(1)),
            Inx => {
                self.register_x = self.register_x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.register_x);
            }
            Iny => {
                self.register_y = self.register_y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.register_y);
            }
            Dex => {
                self.register_x = self.register_x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.register_x);
            }
            Dey => {
                self.register_y = self.register_y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.register_y);
            }

            Clc => self.status.remove(CpuFlags::CARRY),
            Cld => self.status.remove(CpuFlags::DECIMAL_MODE),
            Cli => self.status.remove(CpuFlags::INTERRUPT_DISABLE),
            Clv => self.status.remove(CpuFlags::OVERFLOW),
            Sec => self.status.insert(CpuFlags::CARRY),
            Sed => self.status.insert(CpuFlags::DECIMAL_MODE),
            Sei => self.status.insert(CpuFlags::INTERRUPT_DISABLE),

            Pha => self.stack_push(bus, self.register_a),
            Pla => {
                let data = self.stack_pop(bus);
                self.set_register_a(data);
            }
            Php => {
                let mut flags = self.status;
                flags.insert(CpuFlags::BREAK | CpuFlags::BREAK2);
                self.stack_push(bus, flags.bits());
            }
            Plp => {
                let data = self.stack_pop(bus);
                self.restore_status(data);
            }

            Bcc => return self.branch(operand, !self.status.contains(CpuFlags::CARRY)),
            Bcs => return self.branch(operand, self.status.contains(CpuFlags::CARRY)),
            Beq => return self.branch(operand, self.status.contains(CpuFlags::ZERO)),
            Bne => return self.branch(operand, !self.status.contains(CpuFlags::ZERO)),
            Bmi => return self.branch(operand, self.status.contains(CpuFlags::NEGATIV)),
            Bpl => return self.branch(operand, !self.status.contains(CpuFlags::NEGATIV)),
            Bvs => return self.branch(operand, self.status.contains(CpuFlags::OVERFLOW)),
            Bvc => return self.branch(operand, !self.status.contains(CpuFlags::OVERFLOW)),

            Jmp => {
                if let Operand::Address(addr) = operand {
                    self.program_counter = addr;
                }
                return Flow::Redirected { extra_cycles: 0 };
            }
            Jsr => {
                // Return address is the last byte of the JSR itself.
                self.stack_push_u16(bus, self.program_counter.wrapping_add(1));
                if let Operand::Address(addr) = operand {
                    self.program_counter = addr;
                }
                return Flow::Redirected { extra_cycles: 0 };
            }
            Rts => {
                self.program_counter = self.stack_pop_u16(bus).wrapping_add(1);
                return Flow::Redirected { extra_cycles: 0 };
            }
            Rti => {
                let data = self.stack_pop(bus);
                self.restore_status(data);
                self.program_counter = self.stack_pop_u16(bus);
                return Flow::Redirected { extra_cycles: 0 };
            }
            Brk => {
                // Skips the padding byte after the opcode.
                self.program_counter = self.program_counter.wrapping_add(1);
                self.push_interrupt_state(bus, true);
                self.status.insert(CpuFlags::INTERRUPT_DISABLE);
                self.program_counter = bus.mem_read_u16(IRQ_BRK_VECTOR);
                return Flow::Redirected { extra_cycles: 0 };
            }
            Nop => {}
        }

        Flow::Advance
    }

    fn read_operand<M: Mem>(&mut self, bus: &mut M, operand: Operand) -> u8 {
        match operand {
            Operand::Address(addr) => bus.mem_read(addr),
            Operand::Accumulator => self.register_a,
            Operand::None => 0,
        }
    }

    fn write_operand<M: Mem>(&mut self, bus: &mut M, operand: Operand, data: u8) {
        match operand {
            Operand::Address(addr) => bus.mem_write(addr, data),
            Operand::Accumulator => self.register_a = data,
            Operand::None => {}
        }
    }

    /// Read-modify-write on memory or the accumulator; Z/N follow the result.
    fn modify<M, F>(&mut self, bus: &mut M, operand: Operand, op: F)
    where
        M: Mem,
        F: FnOnce(&mut CPU, u8) -> u8,
    {
        let data = self.read_operand(bus, operand);
        let result = op(self, data);
        self.write_operand(bus, operand, result);
        self.update_zero_and_negative_flags(result);
    }

    fn branch(&mut self, operand: Operand, condition: bool) -> Flow {
        let target = match operand {
            Operand::Address(target) if condition => target,
            _ => return Flow::Advance,
        };

        // Program counter sits on the offset byte; the next instruction
        // starts one past it.
        let next = self.program_counter.wrapping_add(1);
        self.program_counter = target;
        Flow::Redirected {
            extra_cycles: 1 + page_differs(next, target) as u64,
        }
    }

    fn restore_status(&mut self, data: u8) {
        self.status = CpuFlags::from_bits_truncate(data);
        self.status.remove(CpuFlags::BREAK);
        self.status.insert(CpuFlags::BREAK2);
    }

    fn set_register_a(&mut self, value: u8) {
        self.register_a = value;
        self.update_zero_and_negative_flags(self.register_a);
    }

    /// Binary add with carry-in. SBC feeds the complemented operand.
    fn add_to_register_a(&mut self, data: u8) {
        let sum = self.register_a as u16
            + data as u16
            + self.status.contains(CpuFlags::CARRY) as u16;

        self.status.set(CpuFlags::CARRY, sum > 0xff);

        let result = sum as u8;
        self.status.set(
            CpuFlags::OVERFLOW,
            (data ^ result) & (result ^ self.register_a) & 0x80 != 0,
        );

        self.set_register_a(result);
    }

    fn compare<M: Mem>(&mut self, bus: &mut M, operand: Operand, compare_with: u8) {
        let data = self.read_operand(bus, operand);
        self.status.set(CpuFlags::CARRY, data <= compare_with);
        self.update_zero_and_negative_flags(compare_with.wrapping_sub(data));
    }

    fn update_zero_and_negative_flags(&mut self, result: u8) {
        self.status.set(CpuFlags::ZERO, result == 0);
        self.status.set(CpuFlags::NEGATIV, result & 0b1000_0000 != 0);
    }

    fn stack_push<M: Mem>(&mut self, bus: &mut M, data: u8) {
        bus.mem_write(STACK + self.stack_pointer as u16, data);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    fn stack_pop<M: Mem>(&mut self, bus: &mut M) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        bus.mem_read(STACK + self.stack_pointer as u16)
    }

    fn stack_push_u16<M: Mem>(&mut self, bus: &mut M, data: u16) {
        let hi = (data >> 8) as u8;
        let lo = (data & 0xff) as u8;
        self.stack_push(bus, hi);
        self.stack_push(bus, lo);
    }

    fn stack_pop_u16<M: Mem>(&mut self, bus: &mut M) -> u16 {
        let lo = self.stack_pop(bus) as u16;
        let hi = self.stack_pop(bus) as u16;

        hi << 8 | lo
    }
}

fn page_differs(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}
