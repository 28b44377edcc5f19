use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::bytecode::Word;

/**
  A symbol table for the assembler: a mapping between label names and the word
  offsets they mark in the program image. Label names are interned. A symbol
  table is really just a convenience wrapper around a BiMap, which gives us
  duplicate rejection in both directions and reverse lookup (offset to label)
  for diagnostics.
*/
pub struct SymbolTable {
  table: BiMap<DefaultAtom, Word>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable{
      table: BiMap::new()
    }
  }

  /// Defines a label. Fails if either the name or the offset is already
  /// taken, returning the rejected pair.
  pub fn define(&mut self, name: DefaultAtom, address: Word)
    -> Result<(), (DefaultAtom, Word)>
  {
    self.table.insert_no_overwrite(name, address)
  }

  pub fn address_of(&self, name: &DefaultAtom) -> Option<Word> {
    self.table.get_by_left(name).copied()
  }

  pub fn name_of(&self, address: Word) -> Option<DefaultAtom> {
    self.table.get_by_right(&address).cloned()
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}
