use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use mac_base::{
    loader::{self, LoadError},
    opcode::{self, Listing},
    runner::{MacConfig, MacRunner, MacSignal},
    vm::STACK_SIZE,
};

#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    /// Program file: whitespace separated decimal integers
    file: Option<PathBuf>,

    /// Do not print diagnostics, only program output
    #[arg(short, long)]
    quiet: bool,

    /// Echo every value as it is loaded
    #[arg(short, long)]
    echo: bool,

    /// Only decode-check the program, do not execute it
    #[arg(short, long)]
    no_exec: bool,

    /// Print a listing of the loaded program
    #[arg(short, long)]
    disassemble: bool,

    /// Dump registers and stack after execution
    #[arg(long)]
    dump: bool,

    /// Operand stack size, in cells
    #[arg(long, default_value_t = STACK_SIZE)]
    stack_size: usize,

    /// Stop with an error after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
}

fn main() -> ExitCode {
    let Args {
        file,
        quiet,
        echo,
        no_exec,
        disassemble,
        dump,
        stack_size,
        max_steps,
    } = Args::parse();

    let Some(file) = file else {
        eprintln!("error: no input files");
        return ExitCode::FAILURE;
    };

    let program = match loader::load_file(&file, |w| {
        if echo {
            eprintln!("{w}");
        }
    }) {
        Ok(v) => v,
        Err(LoadError::SourceUnavailable(e)) => {
            eprintln!("error: could not read file `{}`: {e}", file.display());
            return ExitCode::FAILURE;
        }
        Err(e @ LoadError::MalformedProgram(_)) => {
            eprintln!("error: {}: {e}", file.display());
            return ExitCode::FAILURE;
        }
    };

    if disassemble {
        let mut stdout = io::stdout().lock();
        for (addr, item) in Listing::new(&program) {
            _ = writeln!(stdout, "{addr:04}  {item}");
        }
    }

    if no_exec {
        return match opcode::check(&program) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {}: {e}", file.display());
                ExitCode::FAILURE
            }
        };
    }

    let mut mac = MacRunner::with_config(
        program,
        MacConfig {
            stack_size,
            max_steps,
        },
    );

    let ok = loop {
        match mac.run() {
            Ok(MacSignal::Continue) => continue,
            Ok(MacSignal::Output(v)) => {
                _ = writeln!(io::stdout(), "{v}");
            }
            Ok(MacSignal::Note(note)) => {
                if !quiet {
                    eprintln!("{note}");
                }
            }
            Ok(MacSignal::Halt) => {
                if !quiet {
                    eprintln!("Finished Execution");
                }
                break true;
            }
            Ok(MacSignal::EOF) => break true,
            Err(e) => {
                eprintln!("{e}");
                eprint!("{}", mac.context.dump());
                break false;
            }
        }
    };

    if dump && ok {
        eprint!("{}", mac.context.dump());
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
