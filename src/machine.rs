/*!
  The machine state and the execution loop tying the pieces together: fetch,
  decode, condition check, operand resolution, dispatch to the operation
  table, and write-back. The loop owns every movement of the program counter;
  operation semantics never touch it (though a program may of course write
  register 15 through ordinary write-back, which is how jumps are done).
*/

use std::convert::TryFrom;
use std::fmt::Write as FmtWrite;
use std::fmt::{Display, Formatter};

use log::{debug, trace};
use prettytable::{format as TableFormat, Table};

use crate::bytecode::{decode_instruction, Opcode, Word};
use crate::error::MachineError;
use crate::memory::{Memory, MEMORY_WORDS};
use crate::ops::{self, Effect, OpFault};

pub const REGISTER_COUNT: usize = 16;

/// Register 15 is the program counter, counting words.
pub const PC: usize = 15;

/// How a run ended. The program counter leaving the memory image is normal
/// termination, exactly like `DONE`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Halt {
  Done,
  PcOutOfRange,
}

/**
  One machine: sixteen registers and a flat memory image. Each run owns an
  independent machine value; there is no shared state between machines, and a
  machine is discarded when its run ends.
*/
pub struct Machine {
  regs: [Word; REGISTER_COUNT],
  memory: Memory,
}

impl Machine {

  // region Construction and access

  pub fn new() -> Machine {
    Machine{
      regs: [0; REGISTER_COUNT],
      memory: Memory::new(),
    }
  }

  /// Copies a program image into memory at offset zero. Fails before any
  /// instruction executes if the image does not fit.
  pub fn load_image(&mut self, image: &[u8]) -> Result<(), MachineError> {
    self.memory.load_image(image)
  }

  pub fn registers(&self) -> &[Word; REGISTER_COUNT] {
    &self.regs
  }

  pub fn register(&self, index: usize) -> Word {
    self.regs[index]
  }

  pub fn set_register(&mut self, index: usize, value: Word) {
    self.regs[index] = value;
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  // endregion

  // region Execution loop

  /// Runs until a halt condition or a fatal error.
  pub fn run(&mut self) -> Result<Halt, MachineError> {
    debug!("starting execution at word {:#x}", self.regs[PC]);
    loop {
      match self.step()? {

        Some(halt) => {
          debug!("halted: {:?}", halt);
          return Ok(halt);
        }

        None => {
          #[cfg(feature = "trace_execution")] println!("{}", self);
        }

      }
    }
  }

  /// One trip through the state machine:
  /// `FETCH → DECODE → CONDITION_CHECK → (SKIP) | (RESOLVE → EXECUTE → WRITEBACK)`.
  fn step(&mut self) -> Result<Option<Halt>, MachineError> {
    let pc = self.regs[PC];
    if pc as usize >= MEMORY_WORDS {
      trace!("program counter {:#x} left the image", pc);
      return Ok(Some(Halt::PcOutOfRange));
    }

    let inst = decode_instruction(self.memory.load32(pc)?);
    self.regs[PC] = pc + 1;

    // Condition check. A skipped instruction consumes no immediates, resolves
    // nothing, and is never validated.
    if inst.ce {
      let condition = self.regs[inst.cond as usize];
      let skip = match inst.ci {
        true  => condition != 0,
        false => condition == 0
      };
      if skip {
        trace!("{:#010x}  {}  (skipped)", pc, inst);
        return Ok(None);
      }
    }

    let opcode = Opcode::try_from(inst.opcode)
      .map_err(|_| MachineError::UnknownOpcode{opcode: inst.opcode, pc})?;

    // Operand resolution. Register values are read before any immediate is
    // consumed, so an operand naming register 15 sees the program counter as
    // it stood right after the instruction fetch.
    let mut src0 = self.regs[inst.src0 as usize];
    let mut src1 = self.regs[inst.src1 as usize];
    if inst.i0 {
      src0 = self.fetch_immediate()?;
    }
    if inst.i1 {
      src1 = self.fetch_immediate()?;
    }

    trace!("{:#010x}  {}  src0={:#x} src1={:#x}", pc, inst, src0, src1);

    let computed = ops::execute(opcode, src0, src1).map_err(|fault| {
      match fault {
        OpFault::DivideByZero => MachineError::DivideByZero{pc}
      }
    })?;

    let mut dest0 = computed.dest0;
    let dest1 = computed.dest1;
    match computed.effect {
      Effect::None => {}
      Effect::Store{width, addr, value} => self.memory.store(width, addr, value)?,
      Effect::Load{width, addr} => dest0 = self.memory.load(width, addr)?,
      Effect::Halt => return Ok(Some(Halt::Done)),
    }

    // Write-back. Destination 0 commits first: on an aliased dual write the
    // secondary result wins.
    if inst.w0 {
      self.regs[inst.dest0 as usize] = dest0;
    }
    if inst.w1 {
      self.regs[inst.dest1 as usize] = dest1;
    }

    Ok(None)
  }

  /// Consumes the next word of the instruction stream as an immediate
  /// operand, advancing the program counter past it.
  fn fetch_immediate(&mut self) -> Result<Word, MachineError> {
    let value = self.memory.load32(self.regs[PC])?;
    self.regs[PC] += 1;
    Ok(value)
  }

  // endregion

  // region Reporting

  /// All sixteen registers, one per line as four hex byte pairs, most
  /// significant byte first.
  pub fn dump_registers(&self) -> String {
    let mut out = String::from("reg:\n");
    for value in self.regs.iter() {
      writeln!(
        out,
        "{:02x} {:02x} {:02x} {:02x}",
        value >> 24, (value >> 16) & 0xFF, (value >> 8) & 0xFF, value & 0xFF
      ).unwrap();
    }
    out
  }

  /// The entire memory image as hex byte pairs, four bytes per line.
  pub fn dump_memory(&self) -> String {
    let mut out = String::from("mem:\n");
    for (i, byte) in self.memory.as_bytes().iter().enumerate() {
      match (i + 1) % 4 {
        0 => writeln!(out, "{:02x}", byte).unwrap(),
        _ => write!(out, "{:02x} ", byte).unwrap()
      }
    }
    out
  }

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for (i, value) in self.regs.iter().enumerate() {
      match i == PC {

        true => {
          table.add_row(row![r->"pc =", format!("{:#010x}", value)]);
        }

        false => {
          table.add_row(row![r->format!("r{} =", i), format!("{:#010x}", value)]);
        }

      }
    }
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.make_register_table())
  }
}
