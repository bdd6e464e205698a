//! The state of the simulated CPU: registers, PC, SP, O, and word-addressed memory.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::address::Address;
use crate::bytecode::{Register, SpecialRegister, Word, REGISTERS};
use crate::error::{ConfigError, ExecError, ImageError};

pub const DEFAULT_MEMORY_SIZE : usize = 0x1000;
pub const MAX_MEMORY_SIZE     : usize = 0x10000;

/// Words per row of the memory dump.
const DUMP_ROW_WIDTH: usize = 8;

/// Construction-time parameters of a `Machine`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MachineConfig {
  memory_size: usize
}

impl MachineConfig {
  /// `memory_size` is in words and must be in `1..=MAX_MEMORY_SIZE`.
  pub fn new(memory_size: usize) -> Result<MachineConfig, ConfigError> {
    match memory_size {
      1..=MAX_MEMORY_SIZE => Ok(MachineConfig { memory_size }),
      _                   => Err(ConfigError::MemorySize(memory_size))
    }
  }

  pub fn memory_size(&self) -> usize {
    self.memory_size
  }
}

impl Default for MachineConfig {
  fn default() -> Self {
    MachineConfig { memory_size: DEFAULT_MEMORY_SIZE }
  }
}

pub struct Machine {
  // Registers //
  registers : [Word; 8],
  /// Program counter, the address of the next word to fetch.
  pub pc    : Word,
  /// Stack pointer. The stack grows down from the top of memory.
  pub sp    : Word,
  /// Overflow, written only by arithmetic and shifts.
  pub o     : Word,

  // Memory store //
  memory    : Vec<Word>
}

impl Machine {

  // region Low-level utility methods

  pub fn new(config: &MachineConfig) -> Machine {
    Machine {
      registers : [0; 8],
      pc        : 0,
      // A full 0x10000 word memory puts the top of the stack at 0, so the first push wraps.
      sp        : (config.memory_size() % MAX_MEMORY_SIZE) as Word,
      o         : 0,
      memory    : vec![0; config.memory_size()]
    }
  }

  /// Copies `image` into memory starting at address zero.
  pub fn load(&mut self, image: &[Word]) -> Result<(), ImageError> {
    if image.len() > self.memory.len() {
      return Err(ImageError::TooLarge { words: image.len(), capacity: self.memory.len() });
    }
    self.memory[..image.len()].copy_from_slice(image);
    Ok(())
  }

  pub fn capacity(&self) -> usize {
    self.memory.len()
  }

  pub fn memory(&self) -> &[Word] {
    &self.memory
  }

  pub fn register(&self, register: Register) -> Word {
    self.registers[register.idx()]
  }

  pub fn set_register(&mut self, register: Register, value: Word) {
    self.registers[register.idx()] = value;
  }

  pub fn special(&self, register: SpecialRegister) -> Word {
    match register {
      SpecialRegister::StackPointer   => self.sp,
      SpecialRegister::ProgramCounter => self.pc,
      SpecialRegister::Overflow       => self.o
    }
  }

  pub fn set_special(&mut self, register: SpecialRegister, value: Word) {
    match register {
      SpecialRegister::StackPointer   => self.sp = value,
      SpecialRegister::ProgramCounter => self.pc = value,
      SpecialRegister::Overflow       => self.o  = value
    }
  }

  pub fn read_memory(&self, address: Word) -> Result<Word, ExecError> {
    self.memory
        .get(address as usize)
        .copied()
        .ok_or(ExecError::AddressOutOfRange { address, capacity: self.capacity() })
  }

  pub fn write_memory(&mut self, address: Word, value: Word) -> Result<(), ExecError> {
    let capacity = self.capacity();
    match self.memory.get_mut(address as usize) {
      Some(cell) => {
        *cell = value;
        Ok(())
      }
      None => Err(ExecError::AddressOutOfRange { address, capacity })
    }
  }

  /// Returns the word at `memory[pc]` and advances `pc`.
  pub fn next_word(&mut self) -> Result<Word, ExecError> {
    if self.pc as usize >= self.capacity() {
      return Err(ExecError::ProgramCounterOutOfRange { pc: self.pc, capacity: self.capacity() });
    }
    let word = self.memory[self.pc as usize];
    self.pc = self.pc.wrapping_add(1);
    Ok(word)
  }

  // endregion

  // region Reading and writing through an `Address`

  pub fn read(&self, address: Address) -> Result<Word, ExecError> {
    match address {
      Address::Register(r) => Ok(self.register(r)),
      Address::Special(s)  => Ok(self.special(s)),
      Address::Memory(a)   => self.read_memory(a),
      Address::Literal(v)  => Ok(v)
    }
  }

  pub fn write(&mut self, address: Address, value: Word) -> Result<(), ExecError> {
    match address {
      Address::Register(r) => self.set_register(r, value),
      Address::Special(s)  => self.set_special(s, value),
      Address::Memory(a)   => self.write_memory(a, value)?,
      Address::Literal(_)  => return Err(ExecError::ReadOnlyOperand(address))
    };
    Ok(())
  }

  // endregion

  // region Display methods

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for register in REGISTERS.iter() {
      table.add_row(row![r->format!("{} =", register), format!("{:04x}", self.register(*register))]);
    }
    table.add_row(row![r->"PC =", format!("{:04x}", self.pc)]);
    table.add_row(row![r->"SP =", format!("{:04x}", self.sp)]);
    table.add_row(row![r->"O =",  format!("{:04x}", self.o)]);
    table
  }

  /// Rows of memory that hold anything, or that PC or SP points into.
  fn make_memory_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (row, words) in self.memory.chunks(DUMP_ROW_WIDTH).enumerate() {
      let start = row * DUMP_ROW_WIDTH;
      let range = start..start + words.len();
      let interesting =
        words.iter().any(|w| *w != 0)
          || range.contains(&(self.pc as usize))
          || range.contains(&(self.sp as usize));
      if !interesting {
        continue;
      }

      let contents =
        words.iter()
             .enumerate()
             .map(|(i, w)| {
               match start + i == self.pc as usize {
                 true  => format!("*{:04x}", w),
                 false => format!(" {:04x}", w)
               }
             })
             .collect::<Vec<String>>()
             .join("");
      table.add_row(row![r->format!("{:04x}:", start), contents]);
    }
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// The memory dump marks the word PC points at with a `*`.
impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let register_table = self.make_register_table();
    let memory_table   = self.make_memory_table();

    let mut combined_table = table!([register_table, memory_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn machine(memory_size: usize) -> Machine {
    Machine::new(&MachineConfig::new(memory_size).unwrap())
  }

  #[test]
  fn initial_state(){
    let m = Machine::new(&MachineConfig::default());
    assert_eq!(m.capacity(), DEFAULT_MEMORY_SIZE);
    assert_eq!(m.pc, 0);
    assert_eq!(m.sp, DEFAULT_MEMORY_SIZE as Word);
    assert_eq!(m.o, 0);
    for register in REGISTERS.iter() {
      assert_eq!(m.register(*register), 0);
    }
    assert!(m.memory().iter().all(|w| *w == 0));
  }

  #[test]
  fn full_memory_stack_starts_at_zero(){
    assert_eq!(machine(MAX_MEMORY_SIZE).sp, 0);
  }

  #[test]
  fn config_bounds(){
    assert_eq!(MachineConfig::new(0), Err(ConfigError::MemorySize(0)));
    assert_eq!(MachineConfig::new(MAX_MEMORY_SIZE + 1), Err(ConfigError::MemorySize(0x10001)));
    assert_eq!(MachineConfig::new(16).map(|c| c.memory_size()), Ok(16));
  }

  #[test]
  fn read_and_write_through_addresses(){
    let mut m = machine(16);
    m.write(Address::Register(Register::Y), 0x1234).unwrap();
    m.write(Address::Special(SpecialRegister::Overflow), 0xffff).unwrap();
    m.write(Address::Memory(15), 0xbeef).unwrap();
    assert_eq!(m.read(Address::Register(Register::Y)), Ok(0x1234));
    assert_eq!(m.o, 0xffff);
    assert_eq!(m.read(Address::Memory(15)), Ok(0xbeef));
    assert_eq!(m.read(Address::Literal(9)), Ok(9));
  }

  #[test]
  fn literals_are_read_only(){
    let mut m = machine(16);
    assert_eq!(
      m.write(Address::Literal(1), 2),
      Err(ExecError::ReadOnlyOperand(Address::Literal(1)))
    );
  }

  #[test]
  fn memory_bounds(){
    let mut m = machine(16);
    assert_eq!(m.read_memory(16), Err(ExecError::AddressOutOfRange { address: 16, capacity: 16 }));
    assert_eq!(m.write_memory(0xffff, 1), Err(ExecError::AddressOutOfRange { address: 0xffff, capacity: 16 }));
  }

  #[test]
  fn next_word_advances_pc(){
    let mut m = machine(2);
    m.load(&[0xaaaa, 0xbbbb]).unwrap();
    assert_eq!(m.next_word(), Ok(0xaaaa));
    assert_eq!(m.next_word(), Ok(0xbbbb));
    assert_eq!(m.pc, 2);
    assert_eq!(m.next_word(), Err(ExecError::ProgramCounterOutOfRange { pc: 2, capacity: 2 }));
  }

  #[test]
  fn image_must_fit(){
    let mut m = machine(2);
    match m.load(&[1, 2, 3]) {
      Err(ImageError::TooLarge { words: 3, capacity: 2 }) => {}
      other => panic!("unexpected: {:?}", other)
    }
  }

  #[test]
  fn dump_shows_registers_and_used_memory(){
    let mut m = machine(32);
    m.load(&[0x7c01, 0x0030]).unwrap();
    m.set_register(Register::J, 0xabcd);
    let dump = m.to_string();
    assert!(dump.contains("abcd"));
    assert!(dump.contains("*7c01"));
    // The stack pointer's row is shown, the empty rows in between are not.
    assert!(dump.contains("0000:"));
    assert!(!dump.contains("0008:"));
  }
}
