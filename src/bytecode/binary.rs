/*!
  This module is responsible for the encoding and decoding of binary instructions.

  The executor does not go through `try_decode_instruction`; it works on the raw fields from
  `split_word` and resolves operand codes against the machine directly. Decoding to an
  `Instruction` is for disassembly and tracing.
*/
use std::convert::TryFrom;

use super::{Instruction, NonBasicOperation, Operand, Operation, Word};
use super::operand::takes_next_word;
use crate::error::DecodeError;

// If you change these you must also change `pack_word` and `split_word`.
pub const OPCODE_MASK      : Word = 0x000f;
pub const OPERAND_MASK     : Word = 0x003f;
pub const OPERAND_A_SHIFT  : u32  = 4;
pub const OPERAND_B_SHIFT  : u32  = 10;

/// The three fields of an instruction word, undecoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Fields {
  pub opcode : u8,
  pub a      : u8,
  pub b      : u8
}

impl Fields {
  pub fn is_non_basic(&self) -> bool {
    self.opcode == 0
  }

  /// Number of words following the instruction word that belong to this instruction.
  /// For a non-basic instruction the A field is an opcode, so only B counts.
  pub fn extra_words(&self) -> usize {
    let b = takes_next_word(self.b) as usize;
    match self.is_non_basic() {
      true  => b,
      false => takes_next_word(self.a) as usize + b
    }
  }
}

/// [b:6][a:6][opcode:4]
pub fn split_word(word: Word) -> Fields {
  Fields {
    opcode : (word & OPCODE_MASK) as u8,
    a      : ((word >> OPERAND_A_SHIFT) & OPERAND_MASK) as u8,
    b      : ((word >> OPERAND_B_SHIFT) & OPERAND_MASK) as u8,
  }
}

pub fn pack_word(opcode: u8, a: u8, b: u8) -> Word {
  (opcode as Word & OPCODE_MASK)
    | ((a as Word & OPERAND_MASK) << OPERAND_A_SHIFT)
    | ((b as Word & OPERAND_MASK) << OPERAND_B_SHIFT)
}

/// An encoded instruction: the instruction word followed by zero, one, or two trailing words.
/// Operand A's trailing word always precedes operand B's.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EncodedInstruction {
  Word(Word),
  DoubleWord(Word, Word),
  TripleWord(Word, Word, Word)
}

impl EncodedInstruction {
  fn new(word: Word, first: Option<Word>, second: Option<Word>) -> EncodedInstruction {
    match (first, second) {
      (Some(x), Some(y))          => EncodedInstruction::TripleWord(word, x, y),
      (Some(x), None)
      | (None, Some(x))           => EncodedInstruction::DoubleWord(word, x),
      (None, None)                => EncodedInstruction::Word(word)
    }
  }

  /// Appends the words in order.
  pub fn emit(&self, code: &mut Vec<Word>) {
    match *self {
      EncodedInstruction::Word(w)             => code.push(w),
      EncodedInstruction::DoubleWord(w, x)    => code.extend_from_slice(&[w, x]),
      EncodedInstruction::TripleWord(w, x, y) => code.extend_from_slice(&[w, x, y]),
    }
  }
}

pub fn encode_instruction(instruction: &Instruction) -> EncodedInstruction {
  match instruction {

    Instruction::Binary { operation, a, b } => {
      let (a_code, a_word) = a.encode();
      let (b_code, b_word) = b.encode();
      EncodedInstruction::new(pack_word(operation.code(), a_code, b_code), a_word, b_word)
    }

    Instruction::Unary { operation, operand } => {
      let (code, word) = operand.encode();
      EncodedInstruction::new(pack_word(0, operation.code(), code), word, None)
    }

    Instruction::Nullary(operation) => {
      EncodedInstruction::Word(pack_word(0, operation.code(), 0))
    }

  }
}

/**
  Decodes the instruction at the start of `words`, returning it together with the number of
  words it occupies. `address` is only used for error reporting.
*/
pub fn try_decode_instruction(words: &[Word], address: usize)
  -> Result<(Instruction, usize), DecodeError>
{
  let word = *words.first().ok_or(DecodeError::Truncated { address })?;
  let fields = split_word(word);
  let mut trailing = words[1..].iter().copied();
  let mut operand = |code: u8| {
    match code > super::operand::MAX_OPERAND_CODE {
      true  => Err(DecodeError::UnknownOperand(code)),
      false => Operand::decode(code, || trailing.next()).ok_or(DecodeError::Truncated { address })
    }
  };

  let instruction =
    match Operation::try_from(fields.opcode) {

      Ok(operation) => {
        let a = operand(fields.a)?;
        let b = operand(fields.b)?;
        Instruction::Binary { operation, a, b }
      }

      // Opcode zero
      Err(_) => {
        match NonBasicOperation::try_from(fields.a) {
          Ok(NonBasicOperation::Hlt) => Instruction::Nullary(NonBasicOperation::Hlt),
          Ok(operation)              => Instruction::Unary { operation, operand: operand(fields.b)? },
          Err(_)                     => return Err(DecodeError::UnknownNonBasicOperation(fields.a))
        }
      }

    };

  Ok((instruction, 1 + fields.extra_words()))
}

/// Decodes a whole word stream, stopping at the first undecodable word.
pub fn disassemble(code: &[Word]) -> Result<Vec<(usize, Instruction)>, DecodeError> {
  let mut listing = Vec::new();
  let mut address = 0usize;
  while address < code.len() {
    let (instruction, size) = try_decode_instruction(&code[address..], address)?;
    listing.push((address, instruction));
    address += size;
  }
  Ok(listing)
}
