
use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

/**
  Opcodes of the machine. The variant names are the assembler mnemonics, and
  the numeric values are the 6 bit opcode field of the instruction word, so
  the order the opcodes are listed below is significant.

  Every operation produces a result pair: a primary result committed to
  destination 0 and a secondary result committed to destination 1, each under
  its own write-enable. For single-result operations the secondary slot is
  zero; for the wide operations (shifts, `MUL`) it is the high word; for `ADD`
  and `SUB` it is the carry/borrow.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq,  Debug,        Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Moves and bitwise operations, applied to both operands independently
  // (`MOV`/`NOT`) or combined (the rest).
  MOV,
  NOT,
  OR,
  NOR,
  AND,
  NAND,
  XOR,
  XNOR,

  // Arithmetic with carry/borrow in the secondary result.
  NEG,
  ADD,
  SUB,      // Opcode 10

  // Comparisons: all-ones for true, zero for false.
  LT,
  NLT,
  SLT,
  NSLT,

  // 64 bit shifts: primary = low word, secondary = high word.
  SL,
  SR,
  SSL,
  SSR,

  REP,
  MUL,
  DIV,      // Opcode 21

  // Memory traffic. Addresses are in the unit of the access width.
  STO8,
  STO16,
  STO32,
  LOD8,
  LOD16,
  LOD32,

  DONE,     // Opcode 28
}

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The number of source operands the textual form accepts for this opcode.
  /// Fewer may be given; the missing sources default to register 0.
  pub fn arity(&self) -> usize {
    match self {
      Opcode::DONE => 0,
      Opcode::NEG | Opcode::REP => 1,
      _ => 2
    }
  }
}

/**
  The field decomposition of one instruction word. `opcode` is the raw 6 bit
  field; converting it to an [`Opcode`] is fallible and happens in the
  execution loop after the condition check, so that a skipped instruction is
  never validated.

  `src0`/`src1` are register selectors unless the corresponding immediate flag
  `i0`/`i1` is set, in which case the operand value is the next word of the
  instruction stream. `dest0`/`dest1` receive the result pair under the
  write-enables `w0`/`w1`; destination 0 commits first, so when both enables
  name the same register the secondary result is the one that sticks.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Instruction {
  pub opcode: u8,

  // Condition enable, condition invert, condition register
  pub ce: bool,
  pub ci: bool,
  pub cond: u8,

  pub dest1: u8,
  pub dest0: u8,
  pub src1: u8,
  pub src0: u8,

  // Write-enables for dest1/dest0
  pub w1: bool,
  pub w0: bool,

  // Immediate flags for src1/src0
  pub i1: bool,
  pub i0: bool,
}

impl Display for Instruction {

  /// Renders assembler syntax. Immediate operand values live in the
  /// instruction stream, not the word, so they print as a bare `#`.
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if self.ce {
      match self.ci {
        true  => write!(f, "!r{} ", self.cond)?,
        false => write!(f, "?r{} ", self.cond)?
      }
    }

    match Opcode::try_from(self.opcode) {
      Ok(Opcode::DONE) => return write!(f, "{}", Opcode::DONE),
      Ok(opcode)       => write!(f, "{}", opcode)?,
      Err(_)           => write!(f, "op?({})", self.opcode)?
    }

    match (self.w0, self.w1) {
      (false, false) => write!(f, " _")?,
      (true,  false) => write!(f, " r{}", self.dest0)?,
      (false, true)  => write!(f, " _:r{}", self.dest1)?,
      (true,  true)  => write!(f, " r{}:r{}", self.dest0, self.dest1)?
    }

    match self.i0 {
      true  => write!(f, ", #")?,
      false => write!(f, ", r{}", self.src0)?
    }
    match self.i1 {
      true  => write!(f, ", #"),
      false => write!(f, ", r{}", self.src1)
    }
  }
}
