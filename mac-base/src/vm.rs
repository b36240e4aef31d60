//! Virtual Machine context implementation: register bank, operand stack
//! and the faults they can raise.

use core::fmt;

use mac_base_proc_upper::upper;
use thiserror::Error;

use crate::Word;

/// Default capacity of the operand stack, in cells.
pub const STACK_SIZE: usize = 256;

/// Execution-time fault. Raised before any state is changed, so the
/// machine still looks exactly like it did before the faulting instruction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("invalid register index {0}")]
    InvalidRegister(Word),
    #[error("register {} is not writable", .0.name())]
    ReadonlyRegister(RegisterKind),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown instruction {0}")]
    UnknownOpcode(Word),
    #[error("truncated instruction: expected {expected} operands, {available} available")]
    TruncatedInstruction { expected: usize, available: usize },
    #[error("jump target {0} is outside of the program")]
    InvalidJump(Word),
    #[error("step limit of {0} reached")]
    StepLimit(u64),
}

/// Implements RegisterKind.
///
/// Generates `from_register(Word) -> Option<Self>`, `to_register(self) -> Word`
/// and `name(self) -> &'static str` (upper-cased variant name).
macro_rules! impl_regkind {
    ($(#[$m:meta])* $v:vis enum $name:ident { $($(#[$mv:meta])* $var:ident = $code:literal),* $(,)? }) => {
        $( #[$m] )*
        $v enum $name {$(
            $( #[$mv] )*
            $var = $code,
        )*}

        impl $name {
            /// Array of all variants, in register order.
            pub const VARIANTS: &[$name] = &[$(Self::$var, )*];

            #[doc = "Gets "]
            #[doc = stringify!($name)]
            #[doc = " from raw register index"]
            pub const fn from_register(reg: Word) -> Option<Self> {
                match reg {
                    $( $code => Some(Self::$var), )*
                    _ => None,
                }
            }
            #[doc = "Converts "]
            #[doc = stringify!($name)]
            #[doc = " to raw register index"]
            pub const fn to_register(self) -> Word {
                self as u8 as Word
            }
            /// Register name as written in listings and dumps.
            pub const fn name(self) -> &'static str {
                match self {$(
                    Self::$var => upper!($var),
                )*}
            }
        }
    };
}

impl_regkind! {
    /// Kind of register. Can be obtained from a raw register operand
    /// using [`RegisterKind::from_register`].
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    #[repr(u8)]
    pub enum RegisterKind {
        A   = 0,
        B   = 1,
        C   = 2,
        D   = 3,
        E   = 4,
        F   = 5,
        I   = 6,
        J   = 7,
        /// Excess. Holds the left operand of the last arithmetic instruction.
        Ex  = 8,
        /// More excess. Holds the right operand of the last arithmetic instruction.
        Exa = 9,
        /// *Readonly*. Instruction pointer.
        Ip  = 10,
        /// *Readonly*. Stack pointer, `-1` when the stack is empty.
        Sp  = 11,
    }
}

/// Number of registers in the bank.
pub const REGISTER_COUNT: usize = RegisterKind::VARIANTS.len();

impl RegisterKind {
    /// Returns `true` if programs may not write this register.
    pub const fn is_readonly(self) -> bool {
        matches!(self, Self::Ip | Self::Sp)
    }

    /// Decodes a register operand, failing with [`Fault::InvalidRegister`].
    pub fn decode(reg: Word) -> Result<Self, Fault> {
        Self::from_register(reg).ok_or(Fault::InvalidRegister(reg))
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register bank. Indexed by [`RegisterKind`], so every access is in range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [Word; REGISTER_COUNT],
}

impl Registers {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    pub fn get(&self, kind: RegisterKind) -> Word {
        self.regs[kind as usize]
    }

    #[inline(always)]
    pub fn set(&mut self, kind: RegisterKind, v: Word) {
        self.regs[kind as usize] = v;
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Register Dump:")?;
        for (i, kind) in RegisterKind::VARIANTS.iter().enumerate() {
            write!(f, "{:>3} {:>6}", kind.name(), self.get(*kind))?;
            if (i + 1) % 4 == 0 {
                writeln!(f)?;
            } else {
                write!(f, "  ")?;
            }
        }
        Ok(())
    }
}

/// Fixed-capacity operand stack storage. The top index lives in
/// [`RegisterKind::Sp`], see [`VMContext`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack {
    cells: Vec<Word>,
}

impl Stack {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![0; capacity],
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(STACK_SIZE)
    }
}

/// Represents full Virtual Machine context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VMContext {
    pub registers: Registers,
    pub stack: Stack,
}

impl Default for VMContext {
    fn default() -> Self {
        Self::new(STACK_SIZE)
    }
}

impl VMContext {
    /// Allocate new context with an empty stack of `stack_size` cells.
    pub fn new(stack_size: usize) -> Self {
        let mut ctx = Self {
            registers: Registers::new(),
            stack: Stack::new(stack_size),
        };
        ctx.set_sp(-1);
        ctx
    }

    /// Gets value of register.
    #[inline(always)]
    pub fn get_register(&self, kind: RegisterKind) -> Word {
        self.registers.get(kind)
    }

    /// Sets register on behalf of a program. Control registers are refused.
    pub fn set_register(&mut self, kind: RegisterKind, v: Word) -> Result<(), Fault> {
        if kind.is_readonly() {
            return Err(Fault::ReadonlyRegister(kind));
        }
        self.registers.set(kind, v);
        Ok(())
    }

    #[inline(always)]
    pub fn ip(&self) -> Word {
        self.registers.get(RegisterKind::Ip)
    }
    #[inline(always)]
    pub(crate) fn set_ip(&mut self, ip: Word) {
        self.registers.set(RegisterKind::Ip, ip)
    }
    #[inline(always)]
    pub fn sp(&self) -> Word {
        self.registers.get(RegisterKind::Sp)
    }
    #[inline(always)]
    fn set_sp(&mut self, sp: Word) {
        self.registers.set(RegisterKind::Sp, sp)
    }

    /// Index of the cell `depth` below the top.
    fn slot(&self, depth: usize) -> Result<usize, Fault> {
        let idx = usize::try_from(self.sp())
            .ok()
            .and_then(|top| top.checked_sub(depth))
            .ok_or(Fault::StackUnderflow)?;
        if idx >= self.stack.capacity() {
            return Err(Fault::StackOverflow);
        }
        Ok(idx)
    }

    /// Reads the value `depth` cells below the top without popping it.
    pub fn peek(&self, depth: usize) -> Result<Word, Fault> {
        self.slot(depth).map(|idx| self.stack.cells[idx])
    }

    /// Current top of the stack.
    #[inline(always)]
    pub fn top(&self) -> Result<Word, Fault> {
        self.peek(0)
    }

    pub fn push(&mut self, v: Word) -> Result<(), Fault> {
        let next = self.sp() + 1;
        let idx = usize::try_from(next).map_err(|_| Fault::StackUnderflow)?;
        let cell = self.stack.cells.get_mut(idx).ok_or(Fault::StackOverflow)?;
        *cell = v;
        self.set_sp(next);
        Ok(())
    }

    /// Pops the top value. The cell keeps its content but becomes unreachable.
    pub fn pop(&mut self) -> Result<Word, Fault> {
        let v = self.top()?;
        self.set_sp(self.sp() - 1);
        Ok(v)
    }

    /// Replaces the two topmost values with `v`.
    pub fn replace_top_two(&mut self, v: Word) -> Result<(), Fault> {
        let idx = self.slot(1)?;
        self.stack.cells[idx] = v;
        self.set_sp(idx as Word);
        Ok(())
    }

    /// Reachable stack contents, bottom to top.
    pub fn stack_values(&self) -> &[Word] {
        let len = usize::try_from(self.sp() + 1).unwrap_or(0);
        &self.stack.cells[..len.min(self.stack.capacity())]
    }

    /// Human readable dump of registers and stack.
    pub fn dump(&self) -> String {
        let mut out = self.registers.to_string();
        out.push_str("Stack Dump:\n");
        let values = self.stack_values();
        if values.is_empty() {
            out.push_str("<empty>\n");
        }
        for (i, v) in values.iter().enumerate() {
            out.push_str(&format!("{v:>6}"));
            out.push(if (i + 1) % 8 == 0 || i + 1 == values.len() { '\n' } else { ' ' });
        }
        out
    }
}
