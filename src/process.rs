use std::process::Command;

use anyhow::Context;

/// Captured outcome of a single subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined for error messages and marker searches.
    pub fn combined(&self) -> String {
        let mut parts = Vec::new();
        if !self.stdout.trim().is_empty() {
            parts.push(self.stdout.trim_end().to_string());
        }
        if !self.stderr.trim().is_empty() {
            parts.push(self.stderr.trim_end().to_string());
        }
        parts.join("\n")
    }
}

/// Seam between the orchestration logic and the external tools it drives.
/// A non-zero exit is a normal `Ok` result; `Err` means the command could
/// not be spawned at all.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> anyhow::Result<ProcessResult>;
}

pub fn command_line(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}

/// Real runner: spawns the command with the run's exported environment
/// and captures its output.
pub struct ShellRunner {
    env: Vec<(String, String)>,
}

impl ShellRunner {
    pub fn new(env: Vec<(String, String)>) -> Self {
        Self { env }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[String]) -> anyhow::Result<ProcessResult> {
        let output = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .output()
            .with_context(|| format!("running {}", command_line(program, args)))?;

        Ok(ProcessResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
