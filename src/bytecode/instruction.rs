use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use super::Operand;

/**
  Basic opcodes, i.e. the low nibble of an instruction word. Opcode zero is not listed: it marks
  a non-basic instruction, whose opcode lives in the operand A field instead (see
  `NonBasicOperation`).

  The conditional operations are grouped at the end, so whether an operation writes its first
  operand is a trivial comparison.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Debug,          Hash
)]
#[repr(u8)]
pub enum Operation {
  #[strum(serialize = "set", to_string = "SET")] Set = 0x1, // a = b
  #[strum(serialize = "add", to_string = "ADD")] Add = 0x2, // a = a + b, carry in O
  #[strum(serialize = "sub", to_string = "SUB")] Sub = 0x3, // a = a - b, borrow in O
  #[strum(serialize = "mul", to_string = "MUL")] Mul = 0x4, // a = a * b, high word in O
  #[strum(serialize = "div", to_string = "DIV")] Div = 0x5, // a = a / b, fraction in O
  #[strum(serialize = "mod", to_string = "MOD")] Mod = 0x6, // a = a % b
  #[strum(serialize = "shl", to_string = "SHL")] Shl = 0x7, // a = a << b, overflow in O
  #[strum(serialize = "shr", to_string = "SHR")] Shr = 0x8, // a = a >> b, underflow in O
  #[strum(serialize = "and", to_string = "AND")] And = 0x9, // a = a & b
  #[strum(serialize = "bor", to_string = "BOR")] Bor = 0xa, // a = a | b
  #[strum(serialize = "xor", to_string = "XOR")] Xor = 0xb, // a = a ^ b

  // Conditionals //
  #[strum(serialize = "ife", to_string = "IFE")] Ife = 0xc, // run next if a == b
  #[strum(serialize = "ifn", to_string = "IFN")] Ifn = 0xd, // run next if a != b
  #[strum(serialize = "ifg", to_string = "IFG")] Ifg = 0xe, // run next if a > b
  #[strum(serialize = "ifb", to_string = "IFB")] Ifb = 0xf, // run next if (a & b) != 0
}

pub const MIN_CONDITIONAL_OPCODE: u8 = 0xc;

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn is_conditional(&self) -> bool {
    self.code() >= MIN_CONDITIONAL_OPCODE
  }

  /// Whether operand A must be a writable location.
  pub fn writes_a(&self) -> bool {
    !self.is_conditional()
  }
}

/**
  Non-basic opcodes, stored in the operand A field of an instruction whose basic opcode is zero.
  Their single operand is stored in the operand B field.

  `Hlt` is not part of the instruction set proper. The word `0x0000` stops the emulator, which
  also means running off the end of a program into zeroed memory halts.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Debug,          Hash
)]
#[repr(u8)]
pub enum NonBasicOperation {
  #[strum(serialize = "hlt", to_string = "HLT")] Hlt = 0x00,
  #[strum(serialize = "jsr", to_string = "JSR")] Jsr = 0x01, // push PC, PC = a
}

impl NonBasicOperation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn arity(&self) -> usize {
    match self {
      NonBasicOperation::Hlt => 0,
      NonBasicOperation::Jsr => 1
    }
  }
}

/// Holds the unencoded components of an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Instruction {
  /// [b:6][a:6][opcode:4]
  Binary {
    operation : Operation,
    a         : Operand,
    b         : Operand
  },
  /// [operand:6][opcode:6][0000]
  Unary {
    operation : NonBasicOperation,
    operand   : Operand
  },
  /// [000000][opcode:6][0000]
  Nullary(NonBasicOperation),
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {

      Instruction::Binary { operation, a, b } => {
        write!(f, "{} {}, {}", operation, a, b)
      }

      Instruction::Unary { operation, operand } => {
        write!(f, "{} {}", operation, operand)
      }

      Instruction::Nullary(operation) => {
        write!(f, "{}", operation)
      }

    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use std::convert::TryFrom;
  use std::str::FromStr;
  use crate::bytecode::{Register, StackOperation};

  #[test]
  fn opcode_numbering(){
    assert_eq!(Operation::Set.code(), 0x1);
    assert_eq!(Operation::Xor.code(), 0xb);
    assert_eq!(Operation::Ifb.code(), 0xf);
    assert_eq!(Operation::try_from(0x6).ok(), Some(Operation::Mod));
    assert!(Operation::try_from(0x0).is_err());
    assert_eq!(NonBasicOperation::Jsr.code(), 0x1);
  }

  #[test]
  fn conditionals_do_not_write(){
    assert!(Operation::Ife.is_conditional());
    assert!(Operation::Ifg.is_conditional());
    assert!(!Operation::Xor.is_conditional());
    assert!(Operation::Set.writes_a());
  }

  #[test]
  fn mnemonics(){
    assert_eq!(Operation::from_str("bor"), Ok(Operation::Bor));
    assert_eq!(NonBasicOperation::from_str("jsr"), Ok(NonBasicOperation::Jsr));
    assert_eq!(Operation::Shl.to_string(), "SHL");
  }

  #[test]
  fn display(){
    let set = Instruction::Binary {
      operation : Operation::Set,
      a         : Operand::Stack(StackOperation::Push),
      b         : Operand::Register(Register::X)
    };
    assert_eq!(set.to_string(), "SET PUSH, X");
    let jsr = Instruction::Unary { operation: NonBasicOperation::Jsr, operand: Operand::Literal(0x100) };
    assert_eq!(jsr.to_string(), "JSR 0x0100");
    assert_eq!(Instruction::Nullary(NonBasicOperation::Hlt).to_string(), "HLT");
  }
}
