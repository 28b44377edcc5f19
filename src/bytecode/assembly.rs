/*!
  The human readable textual form of bytecode is called assembly. One
  instruction per line; `;` starts a comment; blank lines are ignored. The
  general shape of a line is

  ```text
  label:  ?r4  add  r2:r3, r0, #1
  ```

  with every piece optional except the mnemonic:

    * `label:` names the word offset of the instruction (or, on a line of its
      own, of the next instruction);
    * `?rN` / `!rN` attach a condition: execute only when `rN` is nonzero /
      zero;
    * the first operand names the destinations: `rA` (primary only),
      `rA:rB` (both), `_` (no write-back at all, e.g. for stores), `_:rB`;
    * the remaining operands are sources: a register `rN` (`pc` is register
      15), an immediate `#n` (decimal, `#0x...` hex, `#-n` two's complement),
      or a label reference `#name`. Omitted sources default to register 0.

  Mnemonics are the [`Opcode`] names, case-insensitive. A store takes no
  destination of its own, so it is spelled `sto32 _, rAddr, rValue`.

  Assembly is two passes. The first lays out word offsets (one word per
  instruction plus one per immediate) and collects labels into an interned
  symbol table; the second encodes each instruction and serializes the words
  little-endian.
*/

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{tag, tag_no_case},
  character::complete::{
    alpha1,
    alphanumeric1,
    char as one_char,
    digit1,
    hex_digit1,
    one_of,
    space0,
    space1
  },
  combinator::{all_consuming, map, map_res, opt, recognize},
  multi::many0,
  sequence::{pair, preceded, terminated, tuple},
  IResult
};
use string_cache::DefaultAtom;

use crate::bytecode::{encode_instruction, Instruction, Opcode, Word};
use crate::symboltable::SymbolTable;

// region Errors

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssemblyError {
  pub line: u32,
  pub kind: AssemblyErrorKind,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AssemblyErrorKind {
  /// The line does not parse as an instruction.
  Syntax,
  UnknownMnemonic(String),
  /// More sources than the operation accepts.
  WrongArity{
    opcode: Opcode,
    given: usize
  },
  DuplicateLabel(String),
  UndefinedLabel(String),
}

impl Display for AssemblyError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.kind {

      AssemblyErrorKind::Syntax => {
        write!(f, "line {}: unparseable instruction", self.line)
      }

      AssemblyErrorKind::UnknownMnemonic(name) => {
        write!(f, "line {}: {} is not an operation", self.line, name)
      }

      AssemblyErrorKind::WrongArity{opcode, given} => {
        write!(
          f,
          "line {}: {} takes at most {} sources but was given {}",
          self.line, opcode, opcode.arity(), given
        )
      }

      AssemblyErrorKind::DuplicateLabel(name) => {
        write!(f, "line {}: duplicate label {}", self.line, name)
      }

      AssemblyErrorKind::UndefinedLabel(name) => {
        write!(f, "line {}: undefined label {}", self.line, name)
      }

    }
  }
}

impl Error for AssemblyError {}

// endregion

// region Parsed program representation

/// A source operand as written: a register, a literal immediate, or a label
/// reference that becomes an immediate once resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Source {
  Register(u8),
  Value(Word),
  Label(DefaultAtom),
}

#[derive(Clone, Debug)]
struct Statement {
  opcode: Opcode,
  /// `(invert, register)` of the condition prefix, if any.
  cond: Option<(bool, u8)>,
  dest0: Option<u8>,
  dest1: Option<u8>,
  sources: Vec<Source>,
}

impl Statement {

  /// Encoded size: the instruction word plus one word per immediate.
  fn words(&self) -> Word {
    let immediates = self.sources
      .iter()
      .filter(|source| !matches!(source, Source::Register(_)))
      .count();
    1 + immediates as Word
  }

  fn encode(&self, symbols: &SymbolTable, line: u32) -> Result<Vec<Word>, AssemblyError> {
    let mut inst = Instruction{
      opcode: self.opcode.code(),
      ce: false, ci: false, cond: 0,
      dest1: 0, dest0: 0, src1: 0, src0: 0,
      w1: false, w0: false, i1: false, i0: false,
    };

    if let Some((invert, register)) = self.cond {
      inst.ce = true;
      inst.ci = invert;
      inst.cond = register;
    }
    if let Some(register) = self.dest0 {
      inst.w0 = true;
      inst.dest0 = register;
    }
    if let Some(register) = self.dest1 {
      inst.w1 = true;
      inst.dest1 = register;
    }

    let mut immediates: Vec<Word> = Vec::new();
    for (slot, source) in self.sources.iter().enumerate() {
      match source {

        Source::Register(register) => {
          match slot {
            0 => inst.src0 = *register,
            _ => inst.src1 = *register
          }
        }

        Source::Value(value) => {
          match slot {
            0 => inst.i0 = true,
            _ => inst.i1 = true
          }
          immediates.push(*value);
        }

        Source::Label(name) => {
          let address = symbols.address_of(name).ok_or_else(|| {
            AssemblyError{line, kind: AssemblyErrorKind::UndefinedLabel(name.to_string())}
          })?;
          match slot {
            0 => inst.i0 = true,
            _ => inst.i1 = true
          }
          immediates.push(address);
        }

      }
    }

    let mut words = vec![encode_instruction(&inst)];
    words.extend(immediates);
    Ok(words)
  }
}

struct Line {
  number: u32,
  label: Option<DefaultAtom>,
  statement: Option<Statement>,
}

// endregion

// region Line parsers

/// The syntactic shape of a statement before the mnemonic and operand counts
/// are checked.
struct RawStatement<'a> {
  cond: Option<(bool, u8)>,
  mnemonic: &'a str,
  operands: Option<((Option<u8>, Option<u8>), Vec<Source>)>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
  recognize(pair(
    alt((alpha1, tag("_"))),
    many0(alt((alphanumeric1, tag("_"))))
  ))(input)
}

fn register(input: &str) -> IResult<&str, u8> {
  alt((
    map(tag_no_case("pc"), |_| 15u8),
    map_res(
      preceded(one_of("rR"), digit1),
      |digits: &str| {
        match digits.parse::<u8>() {
          Ok(index) if index < 16 => Ok(index),
          _ => Err(())
        }
      }
    )
  ))(input)
}

fn number(input: &str) -> IResult<&str, Word> {
  let (input, sign) = opt(one_char('-'))(input)?;
  let (input, magnitude) = alt((
    map_res(
      preceded(tag_no_case("0x"), hex_digit1),
      |digits: &str| Word::from_str_radix(digits, 16)
    ),
    map_res(digit1, |digits: &str| digits.parse::<Word>())
  ))(input)?;
  let value = match sign {
    Some(_) => magnitude.wrapping_neg(),
    None    => magnitude
  };
  Ok((input, value))
}

fn source(input: &str) -> IResult<&str, Source> {
  alt((
    map(preceded(one_char('#'), number), Source::Value),
    map(
      preceded(one_char('#'), identifier),
      |name| Source::Label(DefaultAtom::from(name))
    ),
    map(register, Source::Register)
  ))(input)
}

/// One destination slot: a register or `_` for "do not write".
fn destination(input: &str) -> IResult<&str, Option<u8>> {
  alt((
    map(register, Some),
    map(one_char('_'), |_| None)
  ))(input)
}

fn destinations(input: &str) -> IResult<&str, (Option<u8>, Option<u8>)> {
  map(
    pair(destination, opt(preceded(one_char(':'), destination))),
    |(dest0, dest1)| (dest0, dest1.unwrap_or(None))
  )(input)
}

fn condition(input: &str) -> IResult<&str, (bool, u8)> {
  map(
    pair(one_of("?!"), register),
    |(sigil, register)| (sigil == '!', register)
  )(input)
}

fn raw_statement(input: &str) -> IResult<&str, RawStatement> {
  let (input, cond) = opt(terminated(condition, space1))(input)?;
  let (input, mnemonic) = identifier(input)?;
  let (input, operands) = opt(preceded(
    space1,
    pair(
      destinations,
      many0(preceded(tuple((space0, one_char(','), space0)), source))
    )
  ))(input)?;
  Ok((input, RawStatement{cond, mnemonic, operands}))
}

fn parse_line<'a>(input: &'a str)
  -> IResult<&'a str, (Option<&'a str>, Option<RawStatement<'a>>)>
{
  map(
    all_consuming(tuple((
      space0,
      opt(terminated(identifier, preceded(space0, one_char(':')))),
      space0,
      opt(raw_statement),
      space0
    ))),
    |(_, label, _, statement, _)| (label, statement)
  )(input)
}

// endregion

// region Passes

/// Checks the parsed shape against the operation table: the mnemonic must
/// name an opcode and the source count must not exceed its arity.
fn check_statement(raw: RawStatement, line: u32) -> Result<Statement, AssemblyError> {
  let opcode = Opcode::from_str(&raw.mnemonic.to_ascii_uppercase()).map_err(|_| {
    AssemblyError{line, kind: AssemblyErrorKind::UnknownMnemonic(raw.mnemonic.to_string())}
  })?;

  let ((dest0, dest1), sources) = match raw.operands {
    Some((destinations, sources)) => ((destinations.0, destinations.1), sources),
    None => ((None, None), Vec::new())
  };

  if sources.len() > opcode.arity()
    || (opcode.arity() == 0 && (dest0.is_some() || dest1.is_some()))
  {
    return Err(AssemblyError{
      line,
      kind: AssemblyErrorKind::WrongArity{opcode, given: sources.len()}
    });
  }

  Ok(Statement{opcode, cond: raw.cond, dest0, dest1, sources})
}

fn parse_program(text: &str) -> Result<Vec<Line>, AssemblyError> {
  let mut lines = Vec::new();

  for (index, raw) in text.lines().enumerate() {
    let number = (index + 1) as u32;
    let code = match raw.find(';') {
      Some(comment) => &raw[..comment],
      None => raw
    };
    if code.trim().is_empty() {
      continue;
    }

    let (_, (label, raw_statement)) = parse_line(code)
      .map_err(|_| AssemblyError{line: number, kind: AssemblyErrorKind::Syntax})?;

    let statement = match raw_statement {
      Some(raw) => Some(check_statement(raw, number)?),
      None => None
    };

    lines.push(Line{
      number,
      label: label.map(DefaultAtom::from),
      statement
    });
  }

  Ok(lines)
}

/// Assembles a program to a binary image ready for [`crate::Machine::load_image`].
pub fn assemble(text: &str) -> Result<Vec<u8>, AssemblyError> {
  let lines = parse_program(text)?;

  // Pass one: lay out word offsets and collect labels.
  let mut symbols = SymbolTable::new();
  let mut offset: Word = 0;
  for line in &lines {
    if let Some(name) = &line.label {
      symbols.define(name.clone(), offset).map_err(|_| {
        AssemblyError{line: line.number, kind: AssemblyErrorKind::DuplicateLabel(name.to_string())}
      })?;
    }
    if let Some(statement) = &line.statement {
      offset += statement.words();
    }
  }

  // Pass two: encode and serialize little-endian.
  let mut image: Vec<u8> = Vec::new();
  for line in &lines {
    if let Some(statement) = &line.statement {
      for word in statement.encode(&symbols, line.number)? {
        image.extend_from_slice(&word.to_le_bytes());
      }
    }
  }

  Ok(image)
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::decode_instruction;
  use crate::machine::{Halt, Machine};

  fn first_word(image: &[u8]) -> Word {
    let mut word = [0u8; 4];
    word.copy_from_slice(&image[..4]);
    Word::from_le_bytes(word)
  }

  fn run(source: &str) -> Machine {
    let image = assemble(source).expect("assembly failed");
    let mut machine = Machine::new();
    machine.load_image(&image).unwrap();
    assert_eq!(machine.run().unwrap(), Halt::Done);
    machine
  }

  fn kind_of(source: &str) -> AssemblyErrorKind {
    assemble(source).expect_err("expected an assembly error").kind
  }

  #[test]
  fn every_field_of_a_full_statement_encodes() {
    let image = assemble("?r4 sub r5:r6, r7, #1").unwrap();
    assert_eq!(image.len(), 8);

    let inst = decode_instruction(first_word(&image));
    assert_eq!(inst.opcode, Opcode::SUB.code());
    assert!(inst.ce);
    assert!(!inst.ci);
    assert_eq!(inst.cond, 4);
    assert_eq!(inst.dest0, 5);
    assert!(inst.w0);
    assert_eq!(inst.dest1, 6);
    assert!(inst.w1);
    assert_eq!(inst.src0, 7);
    assert!(!inst.i0);
    assert!(inst.i1);
    assert_eq!(&image[4..8], &1u32.to_le_bytes());
  }

  #[test]
  fn inverted_condition_and_underscore_destinations() {
    let image = assemble("!pc sto32 _, r1, r2").unwrap();
    let inst = decode_instruction(first_word(&image));
    assert!(inst.ce);
    assert!(inst.ci);
    assert_eq!(inst.cond, 15);
    assert!(!inst.w0);
    assert!(!inst.w1);
    assert_eq!(inst.src0, 1);
    assert_eq!(inst.src1, 2);
  }

  #[test]
  fn add_program_end_to_end() {
    let machine = run("
      mov r0:r1, #5, #7
      add r2:r3, r0, r1
      done
    ");
    assert_eq!(machine.register(2), 12);
    assert_eq!(machine.register(3), 0);
  }

  #[test]
  fn labels_resolve_forward() {
    let machine = run("
start:  mov pc, #skip      ; jump over the next instruction
        mov r0, #1
skip:   done
    ");
    assert_eq!(machine.register(0), 0, "the jumped-over move must not run");
  }

  #[test]
  fn mnemonics_and_registers_are_case_insensitive() {
    let machine = run("MOV R2, #3\nDoNe");
    assert_eq!(machine.register(2), 3);
  }

  #[test]
  fn hex_and_negative_immediates() {
    let machine = run("
      mov r0, #0xff
      mov r1, #-1
      done
    ");
    assert_eq!(machine.register(0), 255);
    assert_eq!(machine.register(1), 0xFFFF_FFFF);
  }

  #[test]
  fn store_and_load_through_assembly() {
    let machine = run("
      sto32 _, #64, #7
      lod32 r2, #64
      done
    ");
    assert_eq!(machine.register(2), 7);
  }

  #[test]
  fn conditional_countdown_loop() {
    // Count r0 down from 3, accumulating into r1.
    let machine = run("
        mov  r0, #3
loop:   add  r1, r1, r0
        sub  r0, r0, #1
?r0     mov  pc, #loop
        done
    ");
    assert_eq!(machine.register(1), 6);
    assert_eq!(machine.register(0), 0);
  }

  #[test]
  fn unknown_mnemonics_are_reported_with_their_line() {
    let error = assemble("mov r0, #1\nfrob r0").expect_err("expected an error");
    assert_eq!(error.line, 2);
    assert_eq!(error.kind, AssemblyErrorKind::UnknownMnemonic("frob".into()));
  }

  #[test]
  fn arity_violations_are_rejected() {
    assert_eq!(
      kind_of("neg r0, r1, r2"),
      AssemblyErrorKind::WrongArity{opcode: Opcode::NEG, given: 2}
    );
    assert_eq!(
      kind_of("done r0"),
      AssemblyErrorKind::WrongArity{opcode: Opcode::DONE, given: 0}
    );
  }

  #[test]
  fn label_errors_are_rejected() {
    assert_eq!(
      kind_of("x: done\nx: done"),
      AssemblyErrorKind::DuplicateLabel("x".into())
    );
    assert_eq!(
      kind_of("mov pc, #nowhere\ndone"),
      AssemblyErrorKind::UndefinedLabel("nowhere".into())
    );
  }

  #[test]
  fn garbage_is_a_syntax_error() {
    assert_eq!(kind_of("mov r0, ###"), AssemblyErrorKind::Syntax);
    assert_eq!(kind_of("mov r99, #1"), AssemblyErrorKind::Syntax);
  }

  #[test]
  fn comments_and_blank_lines_are_ignored() {
    let image = assemble("\n  ; a comment on its own\n\ndone ; trailing\n\n").unwrap();
    assert_eq!(image.len(), 4);
    let inst = decode_instruction(first_word(&image));
    assert_eq!(inst.opcode, Opcode::DONE.code());
  }
}
