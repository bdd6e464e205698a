/*!
  The fetch/decode/execute loop.

  The executor never builds an `Instruction`. It splits the instruction word into its fields and
  resolves each operand code against the machine as it goes, which is where the side effects of
  `POP`, `PUSH` and the trailing words happen. Operand A is always resolved before operand B so
  that trailing words are consumed in the order the encoder wrote them.
*/

use std::convert::TryFrom;

use log::{debug, log_enabled, trace, Level};

use crate::address::Address;
use crate::bytecode::{
  split_word, try_decode_instruction, Fields, NonBasicOperation, Operation, Register,
  SpecialRegister, StackOperation, Word,
  INDIRECT_NEXT_WORD, INLINE_LITERAL, NEXT_WORD, REGISTER_INDIRECT, REGISTER_OFFSET
};
use crate::error::ExecError;
use crate::machine::Machine;

/// What a single call to `Executor::step` did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
  Executed,
  /// The instruction was passed over because the preceding test failed.
  Skipped,
  Halted
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
  pub executed : usize,
  pub skipped  : usize
}

pub struct Executor<'m> {
  machine : &'m mut Machine,
  /// Set by a failed `IF*`: the next instruction is skipped.
  skip    : bool
}

impl<'m> Executor<'m> {

  pub fn new(machine: &'m mut Machine) -> Executor<'m> {
    Executor { machine, skip: false }
  }

  pub fn machine(&self) -> &Machine {
    &*self.machine
  }

  /// Runs until the machine halts. A halt is not counted as an executed instruction.
  pub fn run(&mut self) -> Result<RunSummary, ExecError> {
    let mut summary = RunSummary::default();
    loop {
      match self.step()? {
        Step::Executed => summary.executed += 1,
        Step::Skipped  => summary.skipped  += 1,
        Step::Halted   => {
          debug!(
            "Halted at {:04x} after {} instructions ({} skipped).",
            self.machine.pc.wrapping_sub(1), summary.executed, summary.skipped
          );
          return Ok(summary);
        }
      }
    }
  }

  pub fn step(&mut self) -> Result<Step, ExecError> {
    let address = self.machine.pc;
    let word    = self.machine.next_word()?;
    let fields  = split_word(word);

    if log_enabled!(Level::Trace) {
      self.trace_instruction(address);
    }

    if self.skip {
      self.skip = false;
      self.machine.pc = self.machine.pc.wrapping_add(fields.extra_words() as Word);
      return Ok(Step::Skipped);
    }

    let step =
      match fields.is_non_basic() {
        true  => self.execute_non_basic(fields)?,
        false => self.execute_basic(fields)?
      };

    #[cfg(feature = "trace_computation")]
      {
        if step == Step::Executed && log_enabled!(Level::Trace) {
          trace!("\n{}", self.machine);
        }
      }

    Ok(step)
  }

  fn trace_instruction(&self, address: Word) {
    let memory = self.machine.memory();
    let status = match self.skip {
      true  => "skip",
      false => "exec"
    };
    match try_decode_instruction(&memory[address as usize..], address as usize) {
      Ok((instruction, _)) => trace!("{:04x}: {} {}", address, status, instruction),
      Err(error)           => trace!("{:04x}: {} {:04x} ({})", address, status, memory[address as usize], error)
    }
  }

  // region Operation dispatch

  fn execute_non_basic(&mut self, fields: Fields) -> Result<Step, ExecError> {
    match NonBasicOperation::try_from(fields.a) {

      Ok(NonBasicOperation::Hlt) => Ok(Step::Halted),

      Ok(NonBasicOperation::Jsr) => {
        // The target is resolved first, so the return address is past its trailing word.
        let target = self.resolve(fields.b)?;
        let target = self.machine.read(target)?;
        let pc     = self.machine.pc;
        self.machine.sp = self.machine.sp.wrapping_sub(1);
        self.machine.write_memory(self.machine.sp, pc)?;
        self.machine.pc = target;
        Ok(Step::Executed)
      }

      Err(_) => Err(ExecError::UnknownNonBasicOperation(fields.a))

    }
  }

  fn execute_basic(&mut self, fields: Fields) -> Result<Step, ExecError> {
    let operation =
      Operation::try_from(fields.opcode).map_err(|_| ExecError::UnknownOperation(fields.opcode))?;

    let a = self.resolve(fields.a)?;
    if operation.writes_a() && !a.is_writable() {
      return Err(ExecError::ReadOnlyOperand(a));
    }
    let b = self.resolve(fields.b)?;

    let x = self.machine.read(a)?;
    let y = self.machine.read(b)?;

    match operation {

      Operation::Set => self.machine.write(a, y)?,

      Operation::Add => {
        let sum = x as u32 + y as u32;
        self.store(a, sum as Word, (sum >> 16) as Word)?;
      }

      Operation::Sub => {
        let (difference, borrow) = x.overflowing_sub(y);
        let overflow = match borrow {
          true  => 0xffff,
          false => 0
        };
        self.store(a, difference, overflow)?;
      }

      Operation::Mul => {
        let product = x as u32 * y as u32;
        self.store(a, product as Word, (product >> 16) as Word)?;
      }

      Operation::Div => {
        match y {
          0 => self.store(a, 0, 0)?,
          _ => self.store(a, x / y, (((x as u32) << 16) / y as u32) as Word)?
        }
      }

      Operation::Mod => {
        match y {
          0 => self.machine.write(a, 0)?,
          _ => self.machine.write(a, x % y)?
        }
      }

      Operation::Shl => {
        let shifted = (x as u32).checked_shl(y as u32).unwrap_or(0);
        self.store(a, shifted as Word, (shifted >> 16) as Word)?;
      }

      Operation::Shr => {
        let shifted = ((x as u32) << 16).checked_shr(y as u32).unwrap_or(0);
        self.store(a, (shifted >> 16) as Word, shifted as Word)?;
      }

      Operation::And => self.machine.write(a, x & y)?,
      Operation::Bor => self.machine.write(a, x | y)?,
      Operation::Xor => self.machine.write(a, x ^ y)?,

      Operation::Ife => self.skip = x != y,
      Operation::Ifn => self.skip = x == y,
      Operation::Ifg => self.skip = !(x > y),
      Operation::Ifb => self.skip = (x & y) == 0,

    }

    Ok(Step::Executed)
  }

  /// Writes `O` before the result, so an instruction whose destination is `O` keeps the result.
  fn store(&mut self, a: Address, result: Word, overflow: Word) -> Result<(), ExecError> {
    self.machine.o = overflow;
    self.machine.write(a, result)
  }

  // endregion

  /// Turns an operand class code into the location it denotes, consuming trailing words and
  /// moving SP as the class requires.
  fn resolve(&mut self, code: u8) -> Result<Address, ExecError> {
    let machine = &mut *self.machine;
    let address =
      match code {

        0x00..=0x07 => Address::Register(register_for(code)?),

        0x08..=0x0f => {
          let register = register_for(code - REGISTER_INDIRECT)?;
          Address::Memory(machine.register(register))
        }

        0x10..=0x17 => {
          let register = register_for(code - REGISTER_OFFSET)?;
          let offset   = machine.next_word()?;
          Address::Memory(offset.wrapping_add(machine.register(register)))
        }

        0x18..=0x1a => {
          match StackOperation::try_from(code).map_err(|_| ExecError::UnknownOperand(code))? {
            StackOperation::Pop  => {
              let top = machine.sp;
              machine.sp = machine.sp.wrapping_add(1);
              Address::Memory(top)
            }
            StackOperation::Peek => Address::Memory(machine.sp),
            StackOperation::Push => {
              machine.sp = machine.sp.wrapping_sub(1);
              Address::Memory(machine.sp)
            }
          }
        }

        0x1b..=0x1d => {
          Address::Special(SpecialRegister::try_from(code).map_err(|_| ExecError::UnknownOperand(code))?)
        }

        INDIRECT_NEXT_WORD => Address::Memory(machine.next_word()?),

        NEXT_WORD => Address::Literal(machine.next_word()?),

        0x20..=0x3f => Address::Literal((code - INLINE_LITERAL) as Word),

        _ => return Err(ExecError::UnknownOperand(code))

      };
    Ok(address)
  }

}

fn register_for(code: u8) -> Result<Register, ExecError> {
  Register::try_from(code).map_err(|_| ExecError::UnknownOperand(code))
}
