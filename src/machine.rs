use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::config::Config;
use crate::controller::Controller;
use crate::cpu::{Interrupt, RunOutcome, TraceState, CPU};
use crate::error::MachineError;
use crate::opcodes;

/// PPU dots per CPU cycle (NTSC).
pub const DOTS_PER_CPU_CYCLE: u64 = 3;

/// Owns both engines and the bus they share, and interleaves them.
pub struct Machine {
    cpu: CPU,
    bus: Bus,
    battery: bool,
}

impl Machine {
    pub fn new(cartridge: Cartridge, config: Config) -> Result<Self, MachineError> {
        opcodes::build_opcode_table(&opcodes::official_opcodes())?;

        let battery = cartridge.has_battery();
        let mapper = cartridge.into_mapper()?;
        Ok(Machine {
            cpu: CPU::new(),
            bus: Bus::new(mapper, &config),
            battery,
        })
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn power_on(&mut self) -> Result<(), MachineError> {
        info!("power on");
        self.cpu.set_interrupt(Interrupt::Reset);
        self.cpu.run(&mut self.bus, 1)?;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), MachineError> {
        info!("reset");
        self.cpu.set_interrupt(Interrupt::Reset);
        self.step()?;
        Ok(())
    }

    /// Raises an external interrupt line; it is taken at the next
    /// instruction boundary. A Reset taken by `step` also resets the bus.
    pub fn set_interrupt(&mut self, kind: Interrupt) {
        self.cpu.set_interrupt(kind);
    }

    /// Runs one instruction (plus any interrupt entry or DMA stall) and
    /// the matching number of PPU dots. Returns the CPU cycles spent.
    pub fn step(&mut self) -> Result<u64, MachineError> {
        let outcome = self.cpu.run(&mut self.bus, 1)?;
        Ok(self.finish_step(outcome))
    }

    pub fn step_with_trace<F>(&mut self, callback: F) -> Result<u64, MachineError>
    where
        F: FnMut(TraceState),
    {
        let outcome = self.cpu.run_with_trace(&mut self.bus, 1, callback)?;
        Ok(self.finish_step(outcome))
    }

    fn finish_step(&mut self, outcome: RunOutcome) -> u64 {
        if outcome.reset {
            self.bus.reset();
        }
        self.advance_ppu(outcome.cycles);
        outcome.cycles
    }

    fn advance_ppu(&mut self, cpu_cycles: u64) {
        for _ in 0..cpu_cycles * DOTS_PER_CPU_CYCLE {
            self.bus.tick_ppu();
        }
        if self.bus.take_nmi() {
            self.cpu.set_interrupt(Interrupt::Nmi);
        }
    }

    /// Runs until the PPU's frame counter advances, which happens when the
    /// last visible line has been drawn.
    pub fn run_frame(&mut self) -> Result<(), MachineError> {
        let frame = self.bus.ppu().frame();
        while self.bus.ppu().frame() == frame {
            self.step()?;
        }
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        self.bus.ppu().frame()
    }

    /// 256x240 palette color indices ($00-$3F), row-major.
    pub fn frame_buffer(&self) -> &[u8] {
        self.bus.ppu().frame_buffer()
    }

    pub fn connect_controller(
        &mut self,
        port: usize,
        controller: Option<Box<dyn Controller>>,
    ) -> Option<Box<dyn Controller>> {
        self.bus.connect_controller(port, controller)
    }

    /// Save RAM contents for battery-backed cartridges, for the host to persist.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        if self.battery {
            Some(self.bus.mapper().save_ram())
        } else {
            None
        }
    }
}
