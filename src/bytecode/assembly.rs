/*!
  The human readable textual form of bytecode is called assembly. This module parses assembly,
  one line at a time, into `Instruction`s and encodes them into a flat word stream.

  The language is given by the following EBNF:
    ```
    <line>        ::= <label> | <instruction> | ε        (followed by an optional <comment>)
    <label>       ::= <identifier> ':'
    <instruction> ::= <basic> <operand> ',' <operand>
                    | 'jsr' <operand>
                    | 'hlt'
    <operand>     ::= '[' <indirect> ']' | <literal> | <register> | 'sp' | 'pc' | 'o'
                    | 'pop' | 'peek' | 'push'
    <indirect>    ::= <literal> '+' <register> | <literal> | <register>
    <literal>     ::= '-'? ( '0x' <hex>+ | '0b' <bin>+ | '0' <oct>+ | <dec>+ )      (at most 0x8000 after '-')
    <register>    ::= 'a' | 'b' | 'c' | 'x' | 'y' | 'z' | 'i' | 'j'
    <comment>     ::= ';' .*
    <identifier>  ::= <alpha> <alphanumeric>*
    ```

  Mnemonics and names are case insensitive. Labels are accepted and thrown away.

  A line that fails to parse is reported and contributes nothing to the output; assembly carries
  on with the next line. Callers should treat any error as a failed build.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use log::{debug, warn};
use nom::{
  branch::alt,
  character::complete::{
    alpha1,
    alphanumeric0,
    char as one_char,
    digit1,
    space0
  },
  combinator::{
    all_consuming,
    cut,
    map,
    map_res,
    opt,
    recognize,
    rest
  },
  error::{
    context,
    ErrorKind,
    ParseError,
    VerboseError,
    VerboseErrorKind
  },
  sequence::{
    delimited,
    pair,
    preceded,
    separated_pair,
    terminated
  },
  Err as NomErr,
  IResult
};

use super::{encode_instruction, Instruction, NonBasicOperation, Operand, Operation, Register, Word};
use crate::loader::{join_continued_lines, SourceLine};

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

const MAX_NEGATIVE_MAGNITUDE: Word = 0x8000;

/// A line that could not be parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyntaxError {
  /// One based line number.
  pub line      : usize,
  /// Byte offset into the line where parsing failed.
  pub offset    : usize,
  /// The production that was expected at `offset`.
  pub expected  : &'static str,
  /// The unparsed remainder of the line.
  pub remainder : String
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "Error on line {}, column {}: expected {} here: \"{}\"",
      self.line, self.offset + 1, self.expected, self.remainder
    )
  }
}

/// The result of assembling a source text.
#[derive(Clone, Debug, Default)]
pub struct Assembly {
  /// The flat word stream, i.e. the binary image.
  pub code    : Vec<Word>,
  /// One entry per rejected line.
  pub errors  : Vec<SyntaxError>,
  /// `address: words  source` for every emitting line, if requested.
  pub listing : String
}

impl Assembly {

  /// Assembles `text`, joining backslash-continued lines first.
  pub fn assemble(text: &str, to_listing: bool) -> Assembly {
    Assembly::assemble_lines(&join_continued_lines(text), to_listing)
  }

  pub fn assemble_lines(lines: &[SourceLine], to_listing: bool) -> Assembly {
    let mut assembly = Assembly::default();

    for line in lines {
      match parse_line(line.number, &line.text) {

        Ok(Some(instruction)) => {
          assembly.emit(&instruction, line, to_listing);
        }

        Ok(None) => {
          // Blank, comment, or label.
        }

        Err(error) => {
          warn!("{}", error);
          assembly.errors.push(error);
        }

      }
    }

    assembly
  }

  pub fn is_ok(&self) -> bool {
    self.errors.is_empty()
  }

  fn emit(&mut self, instruction: &Instruction, line: &SourceLine, to_listing: bool) {
    let address = self.code.len();
    encode_instruction(instruction).emit(&mut self.code);

    let words =
      self.code[address..]
          .iter()
          .map(|w| format!("{:04x}", w))
          .collect::<Vec<String>>()
          .join(" ");
    debug!("{:04x}: {:<14} {}", address, words, instruction);

    if to_listing {
      self.listing.push_str(
        format!("{:04x}: {:<14} {}\n", address, words, line.text.trim()).as_str()
      );
    }
  }
}

/// Parses a single line. Returns `Ok(None)` for lines that produce no code.
pub fn parse_line(number: usize, text: &str) -> Result<Option<Instruction>, SyntaxError> {
  match pline(text) {

    Ok((_, statement)) => Ok(statement),

    | Err(NomErr::Error(e))
    | Err(NomErr::Failure(e)) => {
      Err(syntax_error(number, text, &e))
    }

    Err(NomErr::Incomplete(_)) => {
      // Only complete parsers are used, so this shouldn't happen.
      Err(SyntaxError {
        line      : number,
        offset    : text.len(),
        expected  : "more input",
        remainder : String::new()
      })
    }

  }
}

/// Reports the innermost labelled production that failed.
fn syntax_error(number: usize, text: &str, error: &VerboseError<&str>) -> SyntaxError {
  let (input, expected) =
    error.errors
         .iter()
         .find_map(|(input, kind)| {
           match kind {
             VerboseErrorKind::Context(production) => Some((*input, *production)),
             _                                     => None
           }
         })
         .unwrap_or((text, "statement"));

  SyntaxError {
    line      : number,
    offset    : text.len() - input.len(),
    expected,
    remainder : input.to_string()
  }
}

enum Mnemonic {
  Basic(Operation),
  NonBasic(NonBasicOperation)
}

impl Mnemonic {
  fn from_name(name: &str) -> Result<Mnemonic, strum::ParseError> {
    let name = name.to_ascii_lowercase();
    match Operation::from_str(&name) {
      Ok(operation) => Ok(Mnemonic::Basic(operation)),
      Err(_)        => NonBasicOperation::from_str(&name).map(Mnemonic::NonBasic)
    }
  }
}

// region Grammar

/// <line> ::= (<label> | <instruction>)? <comment>?
fn pline(text: &str) -> PResult<Option<Instruction>> {
  preceded(
    space0,
    alt((
      map(pend, |_| None),
      map(terminated(plabel, pend), |_| None),
      map(terminated(pinstruction, pend), Some)
    ))
  )(text)
}

/// Whitespace and an optional comment, then nothing.
fn pend(text: &str) -> PResult<()> {
  map(
    preceded(space0, context("end of line", all_consuming(opt(pcomment)))),
    |_| ()
  )(text)
}

/// <comment> ::= ';' .*
fn pcomment(text: &str) -> PResult<&str> {
  preceded(one_char(';'), rest)(text)
}

/// <label> ::= <identifier> ':'
fn plabel(text: &str) -> PResult<&str> {
  context("label", terminated(pidentifier, preceded(space0, one_char(':'))))(text)
}

fn pinstruction(text: &str) -> PResult<Instruction> {
  let (text, mnemonic) = context("mnemonic", map_res(pidentifier, Mnemonic::from_name))(text)?;

  match mnemonic {

    Mnemonic::Basic(operation) => {
      map(
        cut(separated_pair(
          preceded(space0, poperand),
          preceded(space0, context("`,`", one_char(','))),
          preceded(space0, poperand)
        )),
        move |(a, b)| Instruction::Binary { operation, a, b }
      )(text)
    }

    Mnemonic::NonBasic(operation) if operation.arity() == 1 => {
      map(
        cut(preceded(space0, poperand)),
        move |operand| Instruction::Unary { operation, operand }
      )(text)
    }

    Mnemonic::NonBasic(operation) => {
      Ok((text, Instruction::Nullary(operation)))
    }

  }
}

/// <operand> ::= '[' <indirect> ']' | <literal> | <name>
fn poperand(text: &str) -> PResult<Operand> {
  context(
    "operand",
    alt((
      pindirect,
      map(pliteral, Operand::Literal),
      map_res(pidentifier, Operand::from_name)
    ))
  )(text)
}

/// <indirect> ::= <literal> '+' <register> | <literal> | <register>
fn pindirect(text: &str) -> PResult<Operand> {
  preceded(
    one_char('['),
    cut(terminated(
      delimited(
        space0,
        alt((
          map(
            separated_pair(pliteral, delimited(space0, one_char('+'), space0), cut(pregister)),
            |(offset, register)| Operand::IndirectOffset(offset, register)
          ),
          map(pliteral, Operand::IndirectLiteral),
          map(pregister, Operand::Indirect)
        )),
        space0
      ),
      context("`]`", one_char(']'))
    ))
  )(text)
}

fn pregister(text: &str) -> PResult<Register> {
  context(
    "register",
    map_res(pidentifier, |name: &str| Register::from_str(&name.to_ascii_lowercase()))
  )(text)
}

/// <literal> ::= '-'? <number>
fn pliteral(text: &str) -> PResult<Word> {
  context(
    "literal",
    alt((
      preceded(one_char('-'), cut(pnegative)),
      pnumber
    ))
  )(text)
}

/**
  The number after a `-`, negated modulo 65536. The magnitude is at most `MAX_NEGATIVE_MAGNITUDE`,
  so a negative literal always lands in `0x8000..=0xffff` and never encodes inline.
*/
fn pnegative(text: &str) -> PResult<Word> {
  let (remaining, magnitude) = pnumber(text)?;
  match magnitude <= MAX_NEGATIVE_MAGNITUDE {
    true  => Ok((remaining, magnitude.wrapping_neg())),
    false => Err(NomErr::Failure(VerboseError::from_error_kind(text, ErrorKind::Verify)))
  }
}

/**
  Anything starting with a digit is a number. Once we know that, digits that are wrong for the
  base, or a value that does not fit in a word, are a hard failure.
*/
fn pnumber(text: &str) -> PResult<Word> {
  let (remaining, token) = recognize(pair(digit1, alphanumeric0))(text)?;
  match parse_number(token) {
    Some(value) => Ok((remaining, value)),
    None        => Err(NomErr::Failure(VerboseError::from_error_kind(text, ErrorKind::Digit)))
  }
}

fn pidentifier(text: &str) -> PResult<&str> {
  recognize(pair(alpha1, alphanumeric0))(text)
}

// endregion

/// Reads `0x..` as hex, `0b..` as binary, `0..` as octal, and anything else as decimal.
fn parse_number(token: &str) -> Option<Word> {
  let (digits, radix) =
    if let Some(digits) = strip_radix_prefix(token, 'x') {
      (digits, 16)
    } else if let Some(digits) = strip_radix_prefix(token, 'b') {
      (digits, 2)
    } else if token.len() > 1 && token.starts_with('0') {
      (&token[1..], 8)
    } else {
      (token, 10)
    };

  Word::from_str_radix(digits, radix).ok()
}

fn strip_radix_prefix(token: &str, marker: char) -> Option<&str> {
  let mut chars = token.chars();
  match (chars.next(), chars.next()) {
    (Some('0'), Some(c)) if c.eq_ignore_ascii_case(&marker) => Some(chars.as_str()),
    _                                                       => None
  }
}
