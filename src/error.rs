//! Error types. Parse errors are reported per line by `bytecode::assembly` and are not fatal;
//! everything here is.

use std::io;

use thiserror::Error;

use crate::address::Address;
use crate::bytecode::Word;

/// Fatal conditions raised by the executor. None of these are recoverable: they mean the image
/// is malformed or was produced by something that disagrees with the operand encoding.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ExecError {
  #[error("program counter {pc:#06x} is outside memory of {capacity:#x} words")]
  ProgramCounterOutOfRange { pc: Word, capacity: usize },

  #[error("address {address:#06x} is outside memory of {capacity:#x} words")]
  AddressOutOfRange { address: Word, capacity: usize },

  #[error("cannot write to read-only operand {0}")]
  ReadOnlyOperand(Address),

  #[error("unknown operation {0:#x}")]
  UnknownOperation(u8),

  #[error("unknown non-basic operation {0:#x}")]
  UnknownNonBasicOperation(u8),

  #[error("unknown operand class {0:#x}")]
  UnknownOperand(u8),
}

/// Failure to turn words back into an `Instruction`.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
  #[error("instruction at {address:#06x} is missing its trailing words")]
  Truncated { address: usize },

  #[error("unknown non-basic operation {0:#x}")]
  UnknownNonBasicOperation(u8),

  #[error("unknown operand class {0:#x}")]
  UnknownOperand(u8),
}

#[derive(Debug, Error)]
pub enum ImageError {
  #[error("image I/O failed: {0}")]
  Io(#[from] io::Error),

  #[error("image is {0} bytes long, which is not a whole number of words")]
  OddLength(usize),

  #[error("image of {words:#x} words does not fit in memory of {capacity:#x} words")]
  TooLarge { words: usize, capacity: usize },
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
  #[error("memory size must be between 1 and 0x10000 words, got {0:#x}")]
  MemorySize(usize),
}

/// Everything the command line driver can fail with.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Io(#[from] io::Error),

  #[error(transparent)]
  Image(#[from] ImageError),

  #[error(transparent)]
  Exec(#[from] ExecError),

  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("assembly failed with {0} error(s)")]
  Assembly(usize),

  #[error("invalid value for --{option}: {value}")]
  Argument { option: &'static str, value: String },
}
