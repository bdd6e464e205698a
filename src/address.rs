//! A tagged storage location: a register, a word of memory, or a read-only literal. Resolving an
//! operand against the machine produces one of these, and the machine reads and writes through it.

use std::fmt::{Display, Formatter};

use crate::bytecode::{Register, SpecialRegister, Word};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Address {
  /// One of the general purpose registers.
  Register(Register),
  /// SP, PC, or O.
  Special(SpecialRegister),
  /// An index into memory.
  Memory(Word),
  /// A value with no storage behind it. Writing to it is an error.
  Literal(Word)
}

impl Address {

  pub fn is_writable(&self) -> bool {
    match self {
      Address::Literal(_) => false,
      _                   => true
    }
  }

}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Address::Register(r) => write!(f, "{}", r),
      Address::Special(s)  => write!(f, "{}", s),
      Address::Memory(a)   => write!(f, "[{:#06x}]", a),
      Address::Literal(v)  => write!(f, "literal {:#06x}", v)
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_literals_are_read_only(){
    assert!(Address::Register(Register::A).is_writable());
    assert!(Address::Special(SpecialRegister::ProgramCounter).is_writable());
    assert!(Address::Memory(0).is_writable());
    assert!(!Address::Literal(3).is_writable());
  }

  #[test]
  fn display(){
    assert_eq!(Address::Memory(0x10).to_string(), "[0x0010]");
    assert_eq!(Address::Special(SpecialRegister::Overflow).to_string(), "O");
    assert_eq!(Address::Literal(0x20).to_string(), "literal 0x0020");
  }
}
