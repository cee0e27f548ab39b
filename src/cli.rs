use std::path::Path;

use clap::Parser;

use crate::config::Config;
use crate::git;
use crate::output::Output;
use crate::pm::{self, PackageManager};
use crate::process::ShellRunner;
use crate::registry;
use crate::scripts;

#[derive(Debug, Parser)]
#[command(
    name = "node-ci",
    version,
    about = "Install, run scripts, and commit changes for Node.js CI runs"
)]
pub struct Cli {
    /// JSON object overriding the default configuration
    input: Option<String>,
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    let config = Config::resolve(cli.input.as_deref());
    let out = Output::new(&config);

    if config.debug {
        out.debug(&format!("Input: {:#}", config.redacted_json()));
    }

    match try_run(&config, &out) {
        Ok(()) => 0,
        Err(err) => out.die(&format!("{err:#}")),
    }
}

fn try_run(config: &Config, out: &Output) -> anyhow::Result<()> {
    let runner = ShellRunner::new(config.subprocess_env());

    registry::setup(config, out, &runner)?;

    let manager = PackageManager::detect(config)?;
    let available = scripts::available_scripts(Path::new("."))?;
    out.debug(&format!("Available scripts: {}", available.join(", ")));

    // Identity must be in place before any path that commits.
    let git_ready = config.requires_git();
    if git_ready {
        git::setup_identity(out, &runner)?;
    }

    pm::install_dependencies(manager, config, out, &runner, git_ready)?;

    scripts::run_scripts(manager, config, out, &runner, &available)?;

    git::finalize(config, out, &runner)
}
