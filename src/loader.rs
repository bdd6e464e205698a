//! Getting source text in and binary images in and out.
//!
//! An image is a bare sequence of words in native byte order, with no header: its length alone
//! determines how many words are loaded.

use std::io::{Read, Write};

use crate::bytecode::Word;
use crate::error::ImageError;

const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// A logical source line, after continuation lines have been joined.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLine {
  /// The (one based) physical line the logical line starts on.
  pub number : usize,
  pub text   : String
}

/**
  Splits `text` into lines, joining any line that ends in a backslash with the line after it.
  The backslash is replaced by a space.
*/
pub fn join_continued_lines(text: &str) -> Vec<SourceLine> {
  let mut lines: Vec<SourceLine> = Vec::new();
  let mut attach_last = false;

  for (i, line) in text.lines().enumerate() {
    match attach_last {
      true => {
        if let Some(last) = lines.last_mut() {
          last.text.push_str(line);
        }
      }
      false => {
        lines.push(SourceLine { number: i + 1, text: line.to_string() });
      }
    }

    attach_last = line.ends_with('\\');
    if attach_last {
      if let Some(last) = lines.last_mut() {
        last.text.pop();
        last.text.push(' ');
      }
    }
  }

  lines
}

pub fn write_image<W: Write>(code: &[Word], mut out: W) -> Result<(), ImageError> {
  let mut bytes = Vec::with_capacity(code.len() * WORD_BYTES);
  for word in code {
    bytes.extend_from_slice(&word.to_ne_bytes());
  }
  out.write_all(&bytes)?;
  out.flush()?;
  Ok(())
}

pub fn read_image<R: Read>(mut input: R) -> Result<Vec<Word>, ImageError> {
  let mut bytes = Vec::new();
  input.read_to_end(&mut bytes)?;

  if bytes.len() % WORD_BYTES != 0 {
    return Err(ImageError::OddLength(bytes.len()));
  }

  Ok(
    bytes.chunks_exact(WORD_BYTES)
         .map(|pair| Word::from_ne_bytes([pair[0], pair[1]]))
         .collect()
  )
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_lines(){
    let lines = join_continued_lines("set a, 1\n\nhlt");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], SourceLine { number: 3, text: "hlt".to_string() });
  }

  #[test]
  fn continuations(){
    let lines = join_continued_lines("set a,\\\n1\nadd \\\nb,\\\n2\nhlt\n");
    assert_eq!(
      lines,
      vec![
        SourceLine { number: 1, text: "set a, 1".to_string() },
        SourceLine { number: 3, text: "add  b, 2".to_string() },
        SourceLine { number: 6, text: "hlt".to_string() },
      ]
    );
  }

  #[test]
  fn dangling_continuation(){
    let lines = join_continued_lines("hlt\\");
    assert_eq!(lines, vec![SourceLine { number: 1, text: "hlt ".to_string() }]);
  }

  #[test]
  fn image_round_trip(){
    let code: Vec<Word> = vec![0x7c01, 0x0030, 0x8802, 0x0000];
    let mut bytes = Vec::new();
    write_image(&code, &mut bytes).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[0..2], &0x7c01u16.to_ne_bytes());
    assert_eq!(read_image(&bytes[..]).unwrap(), code);
  }

  #[test]
  fn odd_image(){
    match read_image(&[1u8, 2, 3][..]) {
      Err(ImageError::OddLength(3)) => {}
      other                         => panic!("unexpected: {:?}", other)
    }
  }

  #[test]
  fn empty_image(){
    assert_eq!(read_image(&[0u8; 0][..]).unwrap(), Vec::<Word>::new());
  }
}
