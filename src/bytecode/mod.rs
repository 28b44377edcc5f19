/*!

  The Duet-32 instruction word format. Instructions are exactly one 32 bit
  little-endian word; an instruction that takes immediate operands is followed
  in the instruction stream by one extra word per immediate. The program
  counter addresses words, not bytes. The fields of an instruction word, most
  significant bits first:

    Opcode:              6 bits
    Condition enable:    1 bit
    Condition invert:    1 bit
    Condition register:  4 bits
    Destination 1:       4 bits
    Destination 0:       4 bits
    Source 1:            4 bits
    Source 0:            4 bits
    Write-enable 1:      1 bit
    Write-enable 0:      1 bit
    Immediate flag 1:    1 bit
    Immediate flag 0:    1 bit

  Decoding performs no validation: the opcode field travels raw, and rejecting
  a value outside the operation table is the execution loop's job, not the
  decoder's. Encoding is the exact inverse and exists for the assembler and
  for building programs in tests.

  One design decision that needed to be made is whether to store the decoded
  instruction as an enum with one variant per opcode. Every Duet-32 instruction
  carries the same twelve fields regardless of opcode, so variants would
  duplicate an identical payload 29 times over. Instead a single flat struct
  holds the fields and an enum inhabiting one byte names the operation.

*/

mod assembly;
mod binary;
mod instruction;

pub use assembly::{assemble, AssemblyError, AssemblyErrorKind};
pub use binary::{decode_instruction, encode_instruction, Word};
pub use instruction::{Instruction, Opcode};
