//! # mac Virtual Machine
//!
//! This crate contains base things of mac, a tiny stack machine with a bank
//! of registers. A program goes through these stages to be executed:
//!
//! 1. [`parser`] -- tokenizer. Splits program text into integers.
//! 2. [`loader`] -- fills a [`program::Program`] from a readable source.
//! 3. [`opcode`] -- decodes raw cells into typed instructions.
//! 4. [`vm`] -- virtual environment. Registers, operand stack and faults.
//! 5. [`runner`] -- executes instructions one by one.
//!
//! # Example
//! Opcode list can be found in [`OPCodeKind`] enum.
//!
//! ```
//! # use mac_base::{loader, runner::*, vm::*};
//! #
//! let source = "
//!     1 3       # psh 3
//!     1 4       # psh 4
//!     3         # add
//!     14 0      # gpt %a
//!     10 0      # log %a
//!     0         # hlt
//! ";
//! // comments are not part of the format
//! let source: String = source
//!     .lines()
//!     .map(|l| l.split('#').next().unwrap_or_default())
//!     .collect::<Vec<_>>()
//!     .join("\n");
//!
//! let program = loader::load(source.as_bytes()).unwrap();
//! let mut mac = MacRunner::new(program);
//!
//! let mut output = Vec::new();
//! let end = mac.finish(|sig| {
//!     if let MacSignal::Output(v) = sig {
//!         output.push(v);
//!     }
//! });
//!
//! assert_eq!(end, Ok(MacSignal::Halt));
//! assert_eq!(output, &[7]);
//! assert_eq!(mac.context.get_register(RegisterKind::A), 7);
//! ```
//!
//! # Specification
//!
//! A program is a flat list of words. Every instruction is an opcode word
//! directly followed by its operand words:
//!
//! | Code | Name  | Operands             | Effect                                     |
//! |------|-------|----------------------|--------------------------------------------|
//! | 0    | `HLT` |                      | stop                                       |
//! | 1    | `PSH` | value                | push value                                 |
//! | 2    | `POP` |                      | drop top                                   |
//! | 3    | `ADD` |                      | `second + top`                             |
//! | 4    | `MUL` |                      | `second * top`                             |
//! | 5    | `DIV` |                      | `second / top`                             |
//! | 6    | `SUB` |                      | `second - top`                             |
//! | 7    | `SLT` |                      | `second < top` as 1 or 0                   |
//! | 8    | `MOV` | `%src`, `%dst`       | `%dst <- %src`                             |
//! | 9    | `SET` | `%reg`, value        | `%reg <- value`                            |
//! | 10   | `LOG` | `%reg`               | print `%reg`                               |
//! | 11   | `IF`  | `%reg`, value, addr  | jump to addr if `%reg == value`            |
//! | 12   | `IFN` | `%reg`, value, addr  | jump to addr if `%reg != value`            |
//! | 13   | `GLD` | `%reg`               | push `%reg`                                |
//! | 14   | `GPT` | `%reg`               | `%reg <- top`, top is kept                 |
//! | 15   | `NOP` |                      | nothing                                    |
//!
//! ## Registers specification
//!
//! |     Name      |  Index  | Description                                     |
//! |---------------|---------|-------------------------------------------------|
//! | `%A`..`%J`    | `0..=7` | General purpose (`A B C D E F I J`).            |
//! | `%EX`         | `8`     | Left operand of the last arithmetic op.         |
//! | `%EXA`        | `9`     | Right operand of the last arithmetic op.        |
//! | `%IP`         | `10`    | *Readonly*. Instruction pointer.                |
//! | `%SP`         | `11`    | *Readonly*. Stack pointer, `-1` when empty.     |
//!
//! Any error while executing (stack overflow or underflow, bad register,
//! division by zero, unknown opcode, write to a readonly register) stops the
//! machine with a [`runner::RunError`] and leaves the state as it was before
//! the faulting instruction.

// doc imports
#[allow(unused_imports)]
use opcode::*;

pub mod loader;
pub mod opcode;
pub mod parser;
pub mod program;
pub mod runner;
pub mod vm;

/// Machine word: every program cell, register and stack slot.
pub type Word = i64;
