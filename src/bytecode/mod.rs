/*!

  The machine uses a 16 bit word, which is also the unit of addressing: memory is an array of
  words, and address `n + 1` is the word after address `n`. Instructions are one word, followed
  by up to two trailing words for operands that need them. The instruction word is laid out as

    ```
    [b:6][a:6][opcode:4]
    ```

  with the least significant bits on the right. The two 6 bit operand fields are operand class
  codes (see `operand`). Opcode zero marks a non-basic instruction, for which the `a` field is
  a second opcode and `b` is the only operand.

  One design decision that needed to be made is how much of the instruction to keep in the
  `Instruction` enum. Operands are kept in their syntactic form (`Operand`), which is what both
  the assembler and the disassembler need, while the executor only ever sees the raw `Fields`
  of the instruction word so that it can resolve operand codes against the machine as it goes.

*/

mod assembly;
mod binary;
mod instruction;
mod operand;

pub use assembly::Assembly;
pub use binary::{encode_instruction, try_decode_instruction, disassemble, split_word, Fields};
#[cfg(test)]
pub use binary::pack_word;
pub use instruction::{Instruction, Operation, NonBasicOperation};
pub use operand::{Operand, Register, SpecialRegister, StackOperation, REGISTERS,
                  INDIRECT_NEXT_WORD, INLINE_LITERAL, NEXT_WORD, REGISTER_INDIRECT, REGISTER_OFFSET};

// If you change this you must also change `binary::pack_word` and `binary::split_word`.
pub type Word = u16;
