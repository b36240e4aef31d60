//! Simple mac runner
//!
//! Fetches, decodes and executes one instruction per [`MacRunner::run`] call.
//! Everything the program does that is visible from the outside comes back
//! as a [`MacSignal`], so callers decide where output and diagnostics go.

use core::fmt;

use thiserror::Error;

use crate::{
    opcode::{OPCode, OPCodeKind},
    program::Program,
    vm::{Fault, RegisterKind, VMContext, STACK_SIZE},
    Word,
};

/// Machine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacConfig {
    /// Operand stack capacity, in cells.
    pub stack_size: usize,
    /// Maximum number of executed instructions, unlimited if `None`.
    pub max_steps: Option<u64>,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            stack_size: STACK_SIZE,
            max_steps: None,
        }
    }
}

/// Type of returned signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacSignal {
    /// All ok, nothing to report
    Continue,
    /// Program output, produced by `LOG`
    Output(Word),
    /// Like [`MacSignal::Continue`], but with a diagnostic note
    Note(Note),
    /// `HLT` executed
    Halt,
    /// Instruction pointer ran off the end of the program
    EOF,
}

/// Diagnostic emitted while executing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Note {
    /// Result of an arithmetic instruction.
    Arithmetic {
        op: OPCodeKind,
        lhs: Word,
        rhs: Word,
        result: Word,
    },
    /// `NOP` executed.
    Nothing,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Arithmetic {
                op,
                lhs,
                rhs,
                result,
            } => {
                let sign = match op {
                    OPCodeKind::Add => "+",
                    OPCodeKind::Sub => "-",
                    OPCodeKind::Mul => "*",
                    OPCodeKind::Div => "/",
                    other => other.name(),
                };
                write!(f, "{lhs} {sign} {rhs} = {result}")
            }
            Note::Nothing => write!(f, "Do Nothing"),
        }
    }
}

/// Fault together with the place it happened at.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("runtime-error at ip {ip}{}: {fault}", opcode_suffix(.opcode))]
pub struct RunError {
    /// Instruction pointer of the faulting instruction.
    pub ip: Word,
    /// Raw opcode cell at `ip`, if there was one.
    pub opcode: Option<Word>,
    pub fault: Fault,
}

fn opcode_suffix(opcode: &Option<Word>) -> String {
    match opcode.map(|raw| (raw, OPCodeKind::from_raw(raw))) {
        Some((_, Some(kind))) => format!(" ({})", kind.name()),
        Some((raw, None)) => format!(" (opcode {raw})"),
        None => String::new(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MachineState {
    Running,
    Halted,
    Faulted,
}

/// Where the instruction pointer goes after an instruction.
enum Flow {
    /// Past the instruction and its operands.
    Next,
    /// To an explicit target.
    Jump(Word),
    /// Nowhere, the machine halts.
    Stop,
}

/// mac simple runner
///
/// # Example
/// ```
/// # use mac_base::{loader, runner::{MacRunner, MacSignal}};
/// // PSH 3, PSH 4, ADD, HLT
/// let program = loader::load("1 3 1 4 3 0".as_bytes()).unwrap();
///
/// let mut mac = MacRunner::new(program);
/// assert_eq!(mac.run(), Ok(MacSignal::Continue));
/// assert_eq!(mac.run(), Ok(MacSignal::Continue));
/// assert!(matches!(mac.run(), Ok(MacSignal::Note(_))));
/// assert_eq!(mac.run(), Ok(MacSignal::Halt));
/// assert_eq!(mac.context.stack_values(), &[7]);
/// ```
#[derive(Debug)]
pub struct MacRunner {
    pub program: Program,
    pub context: VMContext,
    config: MacConfig,
    steps: u64,
    state: MachineState,
    fault: Option<RunError>,
}

impl MacRunner {
    /// Creates new runner with default configuration.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, MacConfig::default())
    }

    pub fn with_config(program: Program, config: MacConfig) -> Self {
        Self {
            program,
            context: VMContext::new(config.stack_size),
            config,
            steps: 0,
            state: MachineState::Running,
            fault: None,
        }
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns `true` once the machine halted, ran off the program or faulted.
    pub fn is_stopped(&self) -> bool {
        self.state != MachineState::Running
    }

    /// Execute one instruction and move the instruction pointer.
    ///
    /// After the machine stopped every call repeats the final outcome: the
    /// same `Halt`/`EOF` signal or the same error.
    ///
    /// # Example usage
    /// ```
    /// # use mac_base::{runner::*, program::Program, vm::Fault};
    /// // PSH 10, PSH 0, DIV
    /// let program: Program = [1, 10, 1, 0, 5].as_slice().into();
    /// let mut mac = MacRunner::new(program);
    /// let err = loop {
    ///     match mac.run() {
    ///         Ok(MacSignal::Continue) => {}
    ///         Ok(sig) => panic!("unexpected {sig:?}"),
    ///         Err(e) => break e,
    ///     }
    /// };
    /// assert_eq!(err.ip, 4);
    /// assert_eq!(err.fault, Fault::DivisionByZero);
    /// assert_eq!(mac.context.stack_values(), &[10, 0]);
    /// ```
    pub fn run(&mut self) -> Result<MacSignal, RunError> {
        match self.state {
            MachineState::Running => {}
            MachineState::Halted => {
                return Ok(self.final_signal());
            }
            MachineState::Faulted => {
                if let Some(e) = &self.fault {
                    return Err(e.clone());
                }
            }
        }

        let ip = self.context.ip();
        let Some(cells) = usize::try_from(ip)
            .ok()
            .and_then(|at| self.program.as_slice().get(at..))
            .filter(|cells| !cells.is_empty())
        else {
            self.state = MachineState::Halted;
            return Ok(MacSignal::EOF);
        };
        let raw = cells[0];
        let decoded = OPCode::decode(cells);

        let outcome = self.limit_steps().and_then(|()| {
            let opcode = decoded?;
            self.eval(opcode).map(|r| (opcode, r))
        });
        let (opcode, (flow, signal)) = match outcome {
            Ok(v) => v,
            Err(fault) => {
                let e = RunError {
                    ip,
                    opcode: Some(raw),
                    fault,
                };
                self.state = MachineState::Faulted;
                self.fault = Some(e.clone());
                return Err(e);
            }
        };

        self.steps += 1;
        match flow {
            Flow::Next => self.context.set_ip(ip + opcode.width() as Word),
            Flow::Jump(target) => self.context.set_ip(target),
            Flow::Stop => self.state = MachineState::Halted,
        }

        Ok(signal)
    }

    /// Runs until the machine halts or runs off the program, handing every
    /// intermediate signal to `on_signal`. Returns the final signal.
    ///
    /// A fault comes back as `Err` after the signals before it were handed out.
    pub fn finish(
        &mut self,
        mut on_signal: impl FnMut(MacSignal),
    ) -> Result<MacSignal, RunError> {
        loop {
            match self.run()? {
                sig @ (MacSignal::Halt | MacSignal::EOF) => return Ok(sig),
                sig => on_signal(sig),
            }
        }
    }

    fn final_signal(&self) -> MacSignal {
        let ip = usize::try_from(self.context.ip()).unwrap_or(usize::MAX);
        if ip < self.program.len() {
            MacSignal::Halt
        } else {
            MacSignal::EOF
        }
    }

    fn limit_steps(&self) -> Result<(), Fault> {
        match self.config.max_steps {
            Some(max) if self.steps >= max => Err(Fault::StepLimit(max)),
            _ => Ok(()),
        }
    }

    fn jump(target: Word, len: usize) -> Result<Flow, Fault> {
        // landing exactly on the end is a normal exit
        if !(0..=len as Word).contains(&target) {
            return Err(Fault::InvalidJump(target));
        }
        Ok(Flow::Jump(target))
    }

    /// Executes a decoded instruction. Every check happens before the first
    /// write, so a fault leaves the context untouched.
    fn eval(&mut self, opcode: OPCode) -> Result<(Flow, MacSignal), Fault> {
        let len = self.program.len();
        let ctx = &mut self.context;
        let mut signal = MacSignal::Continue;

        let flow = match opcode {
            OPCode::Hlt => {
                signal = MacSignal::Halt;
                Flow::Stop
            }
            OPCode::Psh(value) => {
                ctx.push(value)?;
                Flow::Next
            }
            OPCode::Pop => {
                ctx.pop()?;
                Flow::Next
            }

            OPCode::Add | OPCode::Sub | OPCode::Mul | OPCode::Div => {
                let (rhs, lhs) = (ctx.peek(0)?, ctx.peek(1)?);
                let kind = opcode.opcode();
                let result = match kind {
                    OPCodeKind::Div if rhs == 0 => return Err(Fault::DivisionByZero),

                    OPCodeKind::Add => lhs.wrapping_add(rhs),
                    OPCodeKind::Sub => lhs.wrapping_sub(rhs),
                    OPCodeKind::Mul => lhs.wrapping_mul(rhs),
                    OPCodeKind::Div => lhs.wrapping_div(rhs),

                    _ => unreachable!(),
                };
                ctx.replace_top_two(result)?;
                ctx.registers.set(RegisterKind::Ex, lhs);
                ctx.registers.set(RegisterKind::Exa, rhs);
                signal = MacSignal::Note(Note::Arithmetic {
                    op: kind,
                    lhs,
                    rhs,
                    result,
                });
                Flow::Next
            }
            OPCode::Slt => {
                let (rhs, lhs) = (ctx.peek(0)?, ctx.peek(1)?);
                ctx.replace_top_two((lhs < rhs) as Word)?;
                Flow::Next
            }

            OPCode::Mov { src, dst } => {
                ctx.set_register(dst, ctx.get_register(src))?;
                Flow::Next
            }
            OPCode::Set { reg, value } => {
                ctx.set_register(reg, value)?;
                Flow::Next
            }
            OPCode::Log(reg) => {
                signal = MacSignal::Output(ctx.get_register(reg));
                Flow::Next
            }

            OPCode::If { reg, value, target } | OPCode::Ifn { reg, value, target } => {
                let equal = ctx.get_register(reg) == value;
                let taken = match opcode {
                    OPCode::If { .. } => equal,
                    _ => !equal,
                };
                if taken {
                    Self::jump(target, len)?
                } else {
                    Flow::Next
                }
            }

            OPCode::Gld(reg) => {
                ctx.push(ctx.get_register(reg))?;
                Flow::Next
            }
            OPCode::Gpt(reg) => {
                ctx.set_register(reg, ctx.top()?)?;
                Flow::Next
            }
            OPCode::Nop => {
                signal = MacSignal::Note(Note::Nothing);
                Flow::Next
            }
        };

        Ok((flow, signal))
    }
}
