//! Opcode decoding.
//!
//! A raw opcode cell is first mapped to an [`OPCodeKind`], which knows how many
//! operand cells follow it. The kind and its operands are then decoded into a
//! typed [`OPCode`], with register operands already validated.

use core::fmt;

use mac_base_proc_upper::upper;
use thiserror::Error;

use crate::{
    program::Program,
    vm::{Fault, RegisterKind},
    Word,
};

/// Declares [`OPCodeKind`]: one variant per opcode, with its raw code and
/// operand count.
///
/// ```ignore
/// impl_opcodes! {
///     pub enum Foo {
///         /// doc, also returned by `incode_doc`
///         Bar(2) = 7, // code 7, followed by 2 operand cells
///     }
/// }
/// ```
macro_rules! impl_opcodes {
    ($(#[$m:meta])* $v:vis enum $name:ident { $($(#[doc = $vm:expr])* $var:ident ($argc:literal) = $code:literal),* $(,)? }) => {
        $(#[$m])*
        $v enum $name {$(
            $(#[doc = $vm])* $var = $code,
        )*}

        impl $name {
            /// Array of all variants.
            pub const VARIANTS: &[$name] = &[$(Self::$var, )*];

            /// Get mnemonic of variant.
            pub const fn name(self) -> &'static str {
                match self {$(
                    Self::$var => upper!($var),
                )*}
            }

            /// Get documentation for variant.
            ///
            /// *Note*: provided documentation is IN-CODE documentation, like that
            /// you type in `///`.
            pub const fn incode_doc(self) -> &'static str {
                match self {$(
                    Self::$var => concat!($($vm),*),
                )*}
            }

            /// Return count of operand cells.
            pub const fn args_count(self) -> usize {
                match self {$(
                    Self::$var => $argc,
                )*}
            }
        }
    };
}

impl_opcodes! {
    /// Represents opcode kind. Can be obtained from a raw cell using
    /// [`OPCodeKind::from_raw`] or from [`OPCode::opcode`].
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    #[repr(u8)]
    pub enum OPCodeKind {
        /// Stop execution
        Hlt(0) = 0,
        /// Push `value` to the stack
        Psh(1) = 1,
        /// Drop the top of the stack
        Pop(0) = 2,
        /// Replace the two topmost values with their sum
        Add(0) = 3,
        /// Replace the two topmost values with their product
        Mul(0) = 4,
        /// Replace the two topmost values with their quotient
        Div(0) = 5,
        /// Replace the two topmost values with their difference
        Sub(0) = 6,
        /// Replace the two topmost values with `second < top`
        Slt(0) = 7,
        /// Copy `%src` into `%dst`
        Mov(2) = 8,
        /// Store `value` into `%reg`
        Set(2) = 9,
        /// Print `%reg`
        Log(1) = 10,
        /// Jump to `target` if `%reg == value`
        If(3) = 11,
        /// Jump to `target` if `%reg != value`
        Ifn(3) = 12,
        /// Push `%reg` to the stack
        Gld(1) = 13,
        /// Copy the top of the stack into `%reg`
        Gpt(1) = 14,
        /// Do nothing
        Nop(0) = 15,
    }
}

impl OPCodeKind {
    /// Try get opcode kind by raw cell.
    #[inline(always)]
    pub fn from_raw(opcode: Word) -> Option<Self> {
        Self::VARIANTS
            .iter()
            .find(|p| p.as_raw() == opcode)
            .copied()
    }

    /// Returns raw opcode cell.
    #[inline(always)]
    pub fn as_raw(self) -> Word {
        self as u8 as Word
    }

    /// Convert opcode kind to full [`OPCode`] object. `args` may be longer than
    /// needed, extra cells are ignored.
    pub fn to_opcode(self, args: &[Word]) -> Result<OPCode, Fault> {
        let expected = self.args_count();
        let Some(args) = args.get(0..expected) else {
            return Err(Fault::TruncatedInstruction {
                expected,
                available: args.len(),
            });
        };
        let reg = |idx: usize| RegisterKind::decode(args[idx]);

        Ok(match self {
            Self::Hlt => OPCode::Hlt,
            Self::Psh => OPCode::Psh(args[0]),
            Self::Pop => OPCode::Pop,
            Self::Add => OPCode::Add,
            Self::Mul => OPCode::Mul,
            Self::Div => OPCode::Div,
            Self::Sub => OPCode::Sub,
            Self::Slt => OPCode::Slt,
            Self::Mov => OPCode::Mov {
                src: reg(0)?,
                dst: reg(1)?,
            },
            Self::Set => OPCode::Set {
                reg: reg(0)?,
                value: args[1],
            },
            Self::Log => OPCode::Log(reg(0)?),
            Self::If => OPCode::If {
                reg: reg(0)?,
                value: args[1],
                target: args[2],
            },
            Self::Ifn => OPCode::Ifn {
                reg: reg(0)?,
                value: args[1],
                target: args[2],
            },
            Self::Gld => OPCode::Gld(reg(0)?),
            Self::Gpt => OPCode::Gpt(reg(0)?),
            Self::Nop => OPCode::Nop,
        })
    }
}

/// Represents decoded instruction. Extended version of [`OPCodeKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OPCode {
    Hlt,
    Psh(Word),
    Pop,
    Add,
    Mul,
    Div,
    Sub,
    Slt,
    Mov { src: RegisterKind, dst: RegisterKind },
    Set { reg: RegisterKind, value: Word },
    Log(RegisterKind),
    If { reg: RegisterKind, value: Word, target: Word },
    Ifn { reg: RegisterKind, value: Word, target: Word },
    Gld(RegisterKind),
    Gpt(RegisterKind),
    Nop,
}

impl OPCode {
    /// Decodes the instruction starting at `cells[0]`.
    ///
    /// ```
    /// # use mac_base::{opcode::OPCode, vm::{Fault, RegisterKind}};
    /// assert_eq!(OPCode::decode(&[9, 1, 5, 0]), Ok(OPCode::Set { reg: RegisterKind::B, value: 5 }));
    /// assert_eq!(OPCode::decode(&[99]), Err(Fault::UnknownOpcode(99)));
    /// ```
    pub fn decode(cells: &[Word]) -> Result<Self, Fault> {
        let Some((&raw, args)) = cells.split_first() else {
            return Err(Fault::TruncatedInstruction {
                expected: 1,
                available: 0,
            });
        };
        OPCodeKind::from_raw(raw)
            .ok_or(Fault::UnknownOpcode(raw))?
            .to_opcode(args)
    }

    /// Gets opcode kind.
    #[inline(always)]
    pub fn opcode(&self) -> OPCodeKind {
        self.into()
    }

    /// Number of cells the instruction occupies, opcode included.
    #[inline(always)]
    pub fn width(&self) -> usize {
        1 + self.opcode().args_count()
    }
}

impl From<&OPCode> for OPCodeKind {
    fn from(v: &OPCode) -> Self {
        match v {
            OPCode::Hlt => Self::Hlt,
            OPCode::Psh(_) => Self::Psh,
            OPCode::Pop => Self::Pop,
            OPCode::Add => Self::Add,
            OPCode::Mul => Self::Mul,
            OPCode::Div => Self::Div,
            OPCode::Sub => Self::Sub,
            OPCode::Slt => Self::Slt,
            OPCode::Mov { .. } => Self::Mov,
            OPCode::Set { .. } => Self::Set,
            OPCode::Log(_) => Self::Log,
            OPCode::If { .. } => Self::If,
            OPCode::Ifn { .. } => Self::Ifn,
            OPCode::Gld(_) => Self::Gld,
            OPCode::Gpt(_) => Self::Gpt,
            OPCode::Nop => Self::Nop,
        }
    }
}

impl fmt::Display for OPCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.opcode().name();
        match self {
            OPCode::Psh(value) => write!(f, "{name} {value}"),
            OPCode::Mov { src, dst } => write!(f, "{name} {src}, {dst}"),
            OPCode::Set { reg, value } => write!(f, "{name} {reg}, {value}"),
            OPCode::Log(reg) | OPCode::Gld(reg) | OPCode::Gpt(reg) => write!(f, "{name} {reg}"),
            OPCode::If { reg, value, target } | OPCode::Ifn { reg, value, target } => {
                write!(f, "{name} {reg}, {value}, @{target}")
            }
            _ => f.write_str(name),
        }
    }
}

/// One line of a [`Listing`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingItem {
    Instr(OPCode),
    /// Cell that does not start a valid instruction.
    Word(Word),
}

/// Linear disassembly of a program. Walks the cells by instruction width;
/// cells that cannot be decoded are emitted one by one as raw words.
///
/// ```
/// # use mac_base::{opcode::{Listing, ListingItem, OPCode}, program::Program};
/// let program: Program = [1, 3, 99, 0].as_slice().into();
/// let lines: Vec<_> = Listing::new(&program).collect();
///
/// assert_eq!(lines, &[
///     (0, ListingItem::Instr(OPCode::Psh(3))),
///     (2, ListingItem::Word(99)),
///     (3, ListingItem::Instr(OPCode::Hlt)),
/// ]);
/// ```
pub struct Listing<'a> {
    cells: &'a [Word],
    offset: usize,
}

impl<'a> Listing<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            cells: program.as_slice(),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Listing<'a> {
    type Item = (usize, ListingItem);

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.offset;
        let cells = self.cells.get(at..).filter(|c| !c.is_empty())?;

        let item = match OPCode::decode(cells) {
            Ok(op) => {
                self.offset += op.width();
                ListingItem::Instr(op)
            }
            Err(_) => {
                self.offset += 1;
                ListingItem::Word(cells[0])
            }
        };
        Some((at, item))
    }
}

/// Instruction that failed [`check`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("bad instruction at {addr}: {fault}")]
pub struct CheckError {
    /// Address of the opcode cell.
    pub addr: usize,
    pub fault: Fault,
}

/// Decodes the whole program linearly without running it. Fails on the first
/// cell that does not start a valid instruction and on jump targets outside
/// `0..=len`. Returns the number of instructions.
///
/// ```
/// # use mac_base::{opcode::{check, CheckError}, program::Program, vm::Fault};
/// let program: Program = [9, 0, 5, 10, 0, 0].as_slice().into();
/// assert_eq!(check(&program), Ok(3));
///
/// let program: Program = [9, 0, 5, 99, 10, 0].as_slice().into();
/// assert_eq!(check(&program), Err(CheckError { addr: 3, fault: Fault::UnknownOpcode(99) }));
/// ```
pub fn check(program: &Program) -> Result<usize, CheckError> {
    let cells = program.as_slice();
    let mut addr = 0;
    let mut count = 0;

    while addr < cells.len() {
        let op = OPCode::decode(&cells[addr..]).map_err(|fault| CheckError { addr, fault })?;
        if let OPCode::If { target, .. } | OPCode::Ifn { target, .. } = op {
            if !(0..=cells.len() as Word).contains(&target) {
                return Err(CheckError {
                    addr,
                    fault: Fault::InvalidJump(target),
                });
            }
        }
        addr += op.width();
        count += 1;
    }

    Ok(count)
}

impl fmt::Display for ListingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingItem::Instr(op) => fmt::Display::fmt(op, f),
            ListingItem::Word(w) => write!(f, ".word {w}"),
        }
    }
}
