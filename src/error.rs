//! The fatal error conditions of a machine run. None of these are recoverable:
//! each one terminates the execution loop and surfaces to the caller.

use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::memory::Width;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MachineError {
  /// The fetched word carries an opcode value outside the operation table.
  UnknownOpcode{
    opcode: u8,
    pc: u32
  },
  /// An access the memory image cannot hold. The address is in the caller's
  /// unit for the given width (bytes, halfwords, or words).
  MemoryFault{
    width: Width,
    addr: u32
  },
  /// `DIV` with a zero divisor.
  DivideByZero{
    pc: u32
  },
  /// A program image larger than the memory image it loads into.
  ImageTooLarge{
    len: usize,
    capacity: usize
  },
}

impl Display for MachineError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      MachineError::UnknownOpcode{opcode, pc} => {
        write!(f, "invalid opcode {} at word {:#x}", opcode, pc)
      }

      MachineError::MemoryFault{width, addr} => {
        write!(f, "out-of-range {} access at address {:#010x}", width, addr)
      }

      MachineError::DivideByZero{pc} => {
        write!(f, "division by zero at word {:#x}", pc)
      }

      MachineError::ImageTooLarge{len, capacity} => {
        write!(f, "program image is {} bytes but memory holds only {}", len, capacity)
      }

    }
  }
}

impl Error for MachineError {}
