/*!
  An emulator for the Duet-32 instruction set, a small fixed-width ISA in which
  every instruction produces a *pair* of 32-bit results. Programs are flat binary
  images of little-endian 32-bit words executed from offset zero; register 15 is
  the program counter. The crate also ships an assembler for the textual form of
  the instruction set.

  The pieces:

    * [`bytecode`]: the instruction word format, its decoding and encoding,
      and the textual assembly form.
    * [`memory`]: the flat byte-addressable memory image.
    * [`ops`]: the operation table, a pure function from resolved operands to
      a result pair plus a memory effect.
    * [`machine`]: the machine state and the fetch/decode/execute/write-back
      loop.
*/
#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
#[macro_use] extern crate strum_macros;

pub mod bytecode;
pub mod error;
pub mod machine;
pub mod memory;
pub mod ops;
pub mod symboltable;

pub use crate::error::MachineError;
pub use crate::machine::{Halt, Machine, PC, REGISTER_COUNT};
pub use crate::memory::{Memory, Width, MEMORY_WORDS};
