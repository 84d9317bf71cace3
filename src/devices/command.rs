//! External command execution.
//!
//! Device management only ever looks at a command's exit status, but the
//! full output is kept so failures can be logged. [`CommandRunner`] is the
//! seam that lets the lifecycle manager run against a scripted fake.

use log::debug;
use std::process::Command;

/// Outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Runs a program to completion and reports how it exited.
pub trait CommandRunner {
    fn run(&mut self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the host through `std::process::Command`.
///
/// Blocks until the child exits; there is no timeout.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&mut self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        debug!("Running: {} {}", program, args.join(" "));
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// A fake runner that records every command line and fails the ones it was
/// told to fail.
///
/// Used by the lifecycle tests; nothing is executed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    /// Every command line run so far, space-joined
    pub calls: Vec<String>,
    failing: Vec<String>,
    fail_everything: bool,
    missing: Vec<String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the exact command line `command` exit with status 1.
    pub fn fail_on(mut self, command: &str) -> Self {
        self.failing.push(command.to_string());
        self
    }

    /// Make `program` fail to start, as if it were not installed.
    pub fn without_program(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Make every command exit with status 1.
    pub fn failing_everything() -> Self {
        Self {
            fail_everything: true,
            ..Self::default()
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&mut self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        if self.missing.iter().any(|m| m == program) {
            self.calls.push(line);
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", program),
            ));
        }
        let fails = self.fail_everything || self.failing.iter().any(|f| *f == line);
        self.calls.push(line);
        Ok(CommandOutput::with_exit_code(if fails { 1 } else { 0 }))
    }
}
