/*!
  The operand class space. Every operand of an instruction is a 6 bit code describing where the
  value comes from and, for operands that can be written, where it goes:

    ```
    0x00-0x07   register                        A, B, C, X, Y, Z, I, J
    0x08-0x0f   [register]
    0x10-0x17   [next word + register]          (consumes a word)
    0x18        POP     [SP++]
    0x19        PEEK    [SP]
    0x1a        PUSH    [--SP]
    0x1b        SP
    0x1c        PC
    0x1d        O
    0x1e        [next word]                     (consumes a word)
    0x1f        next word, literal              (consumes a word)
    0x20-0x3f   literal 0x00-0x1f
    ```

  The assembler and the executor both go through the constants in this module, so the two
  cannot disagree on the numbering.
*/

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use super::Word;

pub const REGISTER_INDIRECT  : u8 = 0x08;
pub const REGISTER_OFFSET    : u8 = 0x10;
pub const INDIRECT_NEXT_WORD : u8 = 0x1e;
pub const NEXT_WORD          : u8 = 0x1f;
pub const INLINE_LITERAL     : u8 = 0x20;
pub const MAX_OPERAND_CODE   : u8 = 0x3f;

/// The largest literal that fits in the operand field itself.
pub const MAX_INLINE_LITERAL : Word = 0x1f;

/// The eight general purpose registers. The discriminant is the register's operand code.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Debug,          Hash
)]
#[repr(u8)]
pub enum Register {
  #[strum(serialize = "a", to_string = "A")] A,
  #[strum(serialize = "b", to_string = "B")] B,
  #[strum(serialize = "c", to_string = "C")] C,
  #[strum(serialize = "x", to_string = "X")] X,
  #[strum(serialize = "y", to_string = "Y")] Y,
  #[strum(serialize = "z", to_string = "Z")] Z,
  #[strum(serialize = "i", to_string = "I")] I,
  #[strum(serialize = "j", to_string = "J")] J,
}

pub const REGISTERS: [Register; 8] = [
  Register::A, Register::B, Register::C, Register::X,
  Register::Y, Register::Z, Register::I, Register::J
];

impl Register {
  /// Index into the register file.
  pub fn idx(&self) -> usize {
    Into::<u8>::into(*self) as usize
  }
}

/// Stack operations. The discriminant is the operand code.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Debug,          Hash
)]
#[repr(u8)]
pub enum StackOperation {
  #[strum(serialize = "pop",  to_string = "POP" )] Pop  = 0x18,
  #[strum(serialize = "peek", to_string = "PEEK")] Peek = 0x19,
  #[strum(serialize = "push", to_string = "PUSH")] Push = 0x1a,
}

/// The registers that are not general purpose. The discriminant is the operand code.
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq, PartialEq, Debug,          Hash
)]
#[repr(u8)]
pub enum SpecialRegister {
  #[strum(serialize = "sp", to_string = "SP")] StackPointer   = 0x1b,
  #[strum(serialize = "pc", to_string = "PC")] ProgramCounter = 0x1c,
  #[strum(serialize = "o",  to_string = "O" )] Overflow       = 0x1d,
}

/// The syntactic form of an operand, i.e. what the assembler sees.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
  /// `a`
  Register(Register),
  /// `[a]`
  Indirect(Register),
  /// `[0x1000 + a]`
  IndirectOffset(Word, Register),
  /// `pop`, `peek`, `push`
  Stack(StackOperation),
  /// `sp`, `pc`, `o`
  Special(SpecialRegister),
  /// `[0x1000]`
  IndirectLiteral(Word),
  /// `0x1000`. Small values are stored inline.
  Literal(Word),
}

impl Operand {

  /**
    Encodes the operand as its operand class code plus the word that must follow the
    instruction, if any.

    Literals up to `MAX_INLINE_LITERAL` are free; every other literal costs a word.
  */
  pub fn encode(&self) -> (u8, Option<Word>) {
    match self {
      Operand::Register(r)             => (Into::<u8>::into(*r), None),
      Operand::Indirect(r)             => (REGISTER_INDIRECT + Into::<u8>::into(*r), None),
      Operand::IndirectOffset(word, r) => (REGISTER_OFFSET + Into::<u8>::into(*r), Some(*word)),
      Operand::Stack(s)                => (Into::<u8>::into(*s), None),
      Operand::Special(s)              => (Into::<u8>::into(*s), None),
      Operand::IndirectLiteral(word)   => (INDIRECT_NEXT_WORD, Some(*word)),
      Operand::Literal(word) if *word <= MAX_INLINE_LITERAL
                                       => (INLINE_LITERAL + *word as u8, None),
      Operand::Literal(word)           => (NEXT_WORD, Some(*word)),
    }
  }

  /**
    Rebuilds an operand from its class code. `next_word` is only called for the codes that
    consume a trailing word. Returns `None` for codes outside the 6 bit space or when
    `next_word` runs dry.

    Note that a large literal and a small one are indistinguishable after this, so
    `Operand::Literal(3)` decoded from `0x1f` re-encodes inline.
  */
  pub fn decode<F>(code: u8, next_word: F) -> Option<Operand>
    where F: FnOnce() -> Option<Word>
  {
    let operand =
      match code {
        0x00..=0x07 => Operand::Register(register_for(code)?),
        0x08..=0x0f => Operand::Indirect(register_for(code - REGISTER_INDIRECT)?),
        0x10..=0x17 => Operand::IndirectOffset(next_word()?, register_for(code - REGISTER_OFFSET)?),
        0x18..=0x1a => Operand::Stack(StackOperation::try_from(code).ok()?),
        0x1b..=0x1d => Operand::Special(SpecialRegister::try_from(code).ok()?),
        INDIRECT_NEXT_WORD => Operand::IndirectLiteral(next_word()?),
        NEXT_WORD          => Operand::Literal(next_word()?),
        0x20..=0x3f => Operand::Literal((code - INLINE_LITERAL) as Word),
        _           => return None
      };
    Some(operand)
  }

  /// Looks up a bare name (`a`, `SP`, `Pop`, ...) case-insensitively.
  pub fn from_name(name: &str) -> Result<Operand, strum::ParseError> {
    let name = name.to_ascii_lowercase();
    if let Ok(r) = Register::from_str(&name) {
      return Ok(Operand::Register(r));
    }
    if let Ok(s) = SpecialRegister::from_str(&name) {
      return Ok(Operand::Special(s));
    }
    StackOperation::from_str(&name).map(Operand::Stack)
  }

}

fn register_for(index: u8) -> Option<Register> {
  Register::try_from(index).ok()
}

/// Whether an operand of the given class consumes the word following the instruction.
pub fn takes_next_word(code: u8) -> bool {
  match code {
    0x10..=0x17 | INDIRECT_NEXT_WORD | NEXT_WORD => true,
    _                                            => false
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Register(r)             => write!(f, "{}", r),
      Operand::Indirect(r)             => write!(f, "[{}]", r),
      Operand::IndirectOffset(word, r) => write!(f, "[{:#06x}+{}]", word, r),
      Operand::Stack(s)                => write!(f, "{}", s),
      Operand::Special(s)              => write!(f, "{}", s),
      Operand::IndirectLiteral(word)   => write!(f, "[{:#06x}]", word),
      Operand::Literal(word) if *word <= MAX_INLINE_LITERAL
                                       => write!(f, "{}", word),
      Operand::Literal(word)           => write!(f, "{:#06x}", word),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_forms(){
    assert_eq!(Operand::Register(Register::A).encode(), (0x00, None));
    assert_eq!(Operand::Register(Register::J).encode(), (0x07, None));
    assert_eq!(Operand::Indirect(Register::X).encode(), (0x0b, None));
    assert_eq!(Operand::IndirectOffset(0x1000, Register::I).encode(), (0x16, Some(0x1000)));
  }

  #[test]
  fn stack_and_special_forms(){
    assert_eq!(Operand::Stack(StackOperation::Pop).encode().0, 0x18);
    assert_eq!(Operand::Stack(StackOperation::Peek).encode().0, 0x19);
    assert_eq!(Operand::Stack(StackOperation::Push).encode().0, 0x1a);
    assert_eq!(Operand::Special(SpecialRegister::StackPointer).encode().0, 0x1b);
    assert_eq!(Operand::Special(SpecialRegister::ProgramCounter).encode().0, 0x1c);
    assert_eq!(Operand::Special(SpecialRegister::Overflow).encode().0, 0x1d);
    assert_eq!(Operand::IndirectLiteral(0x8000).encode(), (0x1e, Some(0x8000)));
  }

  #[test]
  fn small_literals_are_free(){
    for n in 0..=MAX_INLINE_LITERAL {
      assert_eq!(Operand::Literal(n).encode(), (0x20 + n as u8, None));
    }
  }

  #[test]
  fn large_literals_cost_a_word(){
    assert_eq!(Operand::Literal(0x20).encode(), (NEXT_WORD, Some(0x20)));
    assert_eq!(Operand::Literal(0xffff).encode(), (NEXT_WORD, Some(0xffff)));
  }

  #[test]
  fn extra_word_classes(){
    let extra: Vec<u8> = (0..=MAX_OPERAND_CODE).filter(|c| takes_next_word(*c)).collect();
    assert_eq!(extra, vec![0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x1e, 0x1f]);
  }

  #[test]
  fn decode_inverts_encode(){
    let operands = [
      Operand::Register(Register::C),
      Operand::Indirect(Register::Z),
      Operand::IndirectOffset(0x0200, Register::B),
      Operand::Stack(StackOperation::Push),
      Operand::Special(SpecialRegister::Overflow),
      Operand::IndirectLiteral(0x0042),
      Operand::Literal(17),
      Operand::Literal(0x1234),
    ];
    for operand in operands.iter() {
      let (code, extra) = operand.encode();
      assert_eq!(takes_next_word(code), extra.is_some());
      assert_eq!(Operand::decode(code, || extra), Some(*operand));
    }
  }

  #[test]
  fn decode_rejects_bad_codes(){
    assert_eq!(Operand::decode(0x40, || None), None);
    // Needs a trailing word but none is available.
    assert_eq!(Operand::decode(NEXT_WORD, || None), None);
  }

  #[test]
  fn names_are_case_insensitive(){
    assert_eq!(Operand::from_name("a"), Ok(Operand::Register(Register::A)));
    assert_eq!(Operand::from_name("J"), Ok(Operand::Register(Register::J)));
    assert_eq!(Operand::from_name("Sp"), Ok(Operand::Special(SpecialRegister::StackPointer)));
    assert_eq!(Operand::from_name("PEEK"), Ok(Operand::Stack(StackOperation::Peek)));
    assert!(Operand::from_name("ab").is_err());
    assert!(Operand::from_name("dat").is_err());
  }

  #[test]
  fn display_is_assembler_syntax(){
    assert_eq!(Operand::IndirectOffset(0x1000, Register::I).to_string(), "[0x1000+I]");
    assert_eq!(Operand::Literal(5).to_string(), "5");
    assert_eq!(Operand::Literal(0x30).to_string(), "0x0030");
    assert_eq!(Operand::Stack(StackOperation::Pop).to_string(), "POP");
  }
}
