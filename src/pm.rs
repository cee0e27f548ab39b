use std::fmt;

use thiserror::Error;
use which::which;

use crate::config::Config;
use crate::git;
use crate::output::Output;
use crate::process::{CommandRunner, command_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unsupported package manager \"{0}\"")]
    UnsupportedManager(String),
    #[error("package manager \"{0}\" not found")]
    ManagerNotFound(String),
    #[error("error installing dependencies\n{output}")]
    InstallFailed { output: String },
}

impl PackageManager {
    pub fn from_name(name: &str) -> Result<Self, InstallError> {
        match name {
            "npm" => Ok(Self::Npm),
            "pnpm" => Ok(Self::Pnpm),
            "yarn" => Ok(Self::Yarn),
            other => Err(InstallError::UnsupportedManager(other.to_string())),
        }
    }

    /// Resolve the configured manager and probe for its executable.
    pub fn detect(config: &Config) -> Result<Self, InstallError> {
        let manager = Self::from_name(&config.package_manager)?;
        which(manager.binary())
            .map_err(|_| InstallError::ManagerNotFound(config.package_manager.clone()))?;
        Ok(manager)
    }

    pub fn binary(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
        }
    }

    pub fn lockfile(&self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::Pnpm => "pnpm-lock.yaml",
            Self::Yarn => "yarn.lock",
        }
    }

    pub fn install_args(&self, debug: bool) -> Vec<String> {
        match self {
            Self::Pnpm => vec![
                "install".to_string(),
                format!("--loglevel={}", if debug { "debug" } else { "warn" }),
                "--frozen-lockfile".to_string(),
            ],
            Self::Yarn => vec!["install".to_string(), "--frozen-lockfile".to_string()],
            Self::Npm => vec![
                "ci".to_string(),
                "--no-audit".to_string(),
                "--no-fund".to_string(),
            ],
        }
    }

    /// Install arguments for the lockfile-repair retry.
    pub fn fix_args(&self, debug: bool) -> Vec<String> {
        match self {
            Self::Pnpm => {
                let mut args = self.install_args(debug);
                args.push("--fix-lockfile".to_string());
                args
            }
            Self::Yarn => vec![
                "install".to_string(),
                "--update-checksums".to_string(),
                "--check-files".to_string(),
            ],
            Self::Npm => vec![
                "install".to_string(),
                "--no-audit".to_string(),
                "--no-fund".to_string(),
            ],
        }
    }

    /// Substring each manager prints when the lockfile no longer matches
    /// package.json.
    pub fn outdated_lockfile_marker(&self) -> &'static str {
        match self {
            Self::Pnpm => "ERR_PNPM_OUTDATED_LOCKFILE",
            Self::Yarn => "Your lockfile needs to be updated",
            Self::Npm => "in sync",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Install dependencies with a frozen lockfile. A failure carrying the
/// manager's outdated-lockfile marker is retried once with the repair
/// flags; the regenerated lockfile is committed when git was set up.
pub fn install_dependencies(
    manager: PackageManager,
    config: &Config,
    out: &Output,
    runner: &dyn CommandRunner,
    git_ready: bool,
) -> anyhow::Result<()> {
    out.log("Install dependencies");
    let args = manager.install_args(config.debug);
    out.debug(&format!("$ {}", command_line(manager.binary(), &args)));

    let result = runner.run(manager.binary(), &args)?;
    if result.success() {
        out.success("Dependencies installed");
        return Ok(());
    }

    let output = result.combined();
    if config.autofix_lockfile && output.contains(manager.outdated_lockfile_marker()) {
        out.debug("Updating lockfile");
        let fix_args = manager.fix_args(config.debug);
        out.debug(&format!("$ {}", command_line(manager.binary(), &fix_args)));

        let fixed = runner.run(manager.binary(), &fix_args)?;
        if !fixed.success() {
            return Err(InstallError::InstallFailed {
                output: fixed.combined(),
            }
            .into());
        }

        if git_ready {
            git::commit_and_push(
                runner,
                &[manager.lockfile().to_string()],
                "chore: update lockfile [skip ci]",
            )?;
        }

        out.success("Dependencies installed");
        return Ok(());
    }

    Err(InstallError::InstallFailed { output }.into())
}
