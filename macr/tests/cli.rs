use std::{
    fs,
    path::PathBuf,
    process::{Command, Output},
};

fn macr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_macr"))
        .args(args)
        .output()
        .expect("failed to spawn macr")
}

fn program(name: &str, text: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("macr-cli-{}-{name}.mac", std::process::id()));
    fs::write(&path, text).expect("failed to write program");
    path
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn no_input_files() {
    let out = macr(&[]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("error: no input files"));
}

#[test]
fn missing_file() {
    let path = std::env::temp_dir().join("macr-cli-does-not-exist.mac");
    let _ = fs::remove_file(&path);
    let out = macr(&[path.to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("error: could not read file"));
}

#[test]
fn runs_to_halt() {
    let path = program("add", "1 3\n1 4\n3\n14 0\n10 0\n0\n");
    let out = macr(&[path.to_str().unwrap()]);

    assert!(out.status.success());
    assert_eq!(stdout(&out), "7\n");
    let err = stderr(&out);
    assert!(err.contains("3 + 4 = 7"));
    assert!(err.ends_with("Finished Execution\n"));
}

#[test]
fn quiet_keeps_program_output() {
    let path = program("quiet", "9 0 5 10 0 15 0");
    let out = macr(&["--quiet", path.to_str().unwrap()]);

    assert!(out.status.success());
    assert_eq!(stdout(&out), "5\n");
    assert_eq!(stderr(&out), "");
}

#[test]
fn echo_prints_loaded_values() {
    let path = program("echo", "1 2\n0");
    let out = macr(&["-q", "--echo", path.to_str().unwrap()]);

    assert!(out.status.success());
    assert_eq!(stderr(&out), "1\n2\n0\n");
}

#[test]
fn malformed_program() {
    let path = program("malformed", "1 2 oops 3");
    let out = macr(&[path.to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("malformed token `oops`"));
    assert_eq!(stdout(&out), "");
}

#[test]
fn fault_reports_state() {
    let path = program("div", "1 10 1 0 5 0");
    let out = macr(&[path.to_str().unwrap()]);

    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("runtime-error at ip 4 (DIV): division by zero"));
    assert!(err.contains("Register Dump:"));
    assert!(err.contains("Stack Dump:\n    10      0\n"));
}

#[test]
fn disassemble_without_running() {
    let path = program("listing", "9 0 5 10 0 0");
    let out = macr(&["--no-exec", "--disassemble", path.to_str().unwrap()]);

    assert!(out.status.success());
    assert_eq!(stdout(&out), "0000  SET A, 5\n0003  LOG A\n0005  HLT\n");
    assert_eq!(stderr(&out), "");
}

#[test]
fn no_exec_rejects_bad_instruction() {
    let path = program("bad-op", "9 0 5 99 10 0");
    let out = macr(&["--no-exec", "--disassemble", path.to_str().unwrap()]);

    assert!(!out.status.success());
    // the listing is still printed
    assert_eq!(stdout(&out), "0000  SET A, 5\n0003  .word 99\n0004  LOG A\n");
    assert!(stderr(&out).contains("bad instruction at 3: unknown instruction 99"));
}

#[test]
fn invalid_utf8_is_malformed() {
    let path = std::env::temp_dir().join(format!("macr-cli-{}-utf8.mac", std::process::id()));
    fs::write(&path, b"1 \xff 0").expect("failed to write program");
    let out = macr(&[path.to_str().unwrap()]);

    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("malformed token"), "{err}");
    assert!(!err.contains("could not read file"), "{err}");
}

#[test]
fn step_limit() {
    let path = program("spin", "11 0 0 0");
    let out = macr(&["--max-steps", "50", path.to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("step limit of 50 reached"));
}

#[test]
fn small_stack_overflows() {
    let path = program("overflow", "1 1 1 2 1 3");
    let out = macr(&["--stack-size", "2", path.to_str().unwrap()]);

    assert!(!out.status.success());
    assert!(stderr(&out).contains("stack overflow"));
}
