use anyhow::bail;

use crate::config::Config;
use crate::output::Output;
use crate::process::{CommandRunner, ProcessResult, command_line};

const BOT_NAME: &str = "github-actions[bot]";
const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

fn git(runner: &dyn CommandRunner, args: &[String]) -> anyhow::Result<ProcessResult> {
    let result = runner.run("git", args)?;
    if !result.success() {
        bail!("{} failed\n{}", command_line("git", args), result.combined());
    }
    Ok(result)
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

/// Configure the bot identity used for any commit this run makes. Must
/// happen before the lockfile-fix or auto-commit paths can push.
pub fn setup_identity(out: &Output, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    out.log("Setup git");
    git(runner, &argv(&["config", "--global", "user.email", BOT_EMAIL]))?;
    git(runner, &argv(&["config", "--global", "user.name", BOT_NAME]))?;
    git(runner, &argv(&["config", "advice.ignoredHook", "false"]))?;
    Ok(())
}

pub fn status_porcelain(runner: &dyn CommandRunner) -> anyhow::Result<String> {
    Ok(git(runner, &argv(&["status", "--porcelain"]))?.stdout)
}

pub fn commit_and_push(
    runner: &dyn CommandRunner,
    paths: &[String],
    message: &str,
) -> anyhow::Result<()> {
    let mut add = argv(&["add"]);
    add.extend(paths.iter().cloned());
    git(runner, &add)?;
    git(runner, &argv(&["commit", "-m", message]))?;
    git(runner, &argv(&["push"]))?;
    Ok(())
}

/// End-of-run working tree handling: bail on a dirty tree when configured
/// to, otherwise commit whatever the scripts changed.
pub fn finalize(config: &Config, out: &Output, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    if config.bail_on_dirty.enabled() {
        let status = status_porcelain(runner)?;
        if !status.trim().is_empty() {
            let message = config
                .bail_on_dirty
                .value()
                .unwrap_or("Working tree is dirty");
            bail!("{message}\n{}", status.trim_end());
        }
        return Ok(());
    }

    if config.auto_commit.enabled() && !config.prevent_commits {
        let status = status_porcelain(runner)?;
        if status.trim().is_empty() {
            return Ok(());
        }
        out.log("Committing changes");
        let paths: Vec<String> = match config.auto_commit.value() {
            Some(list) => list.split_whitespace().map(str::to_string).collect(),
            None => vec![".".to_string()],
        };
        commit_and_push(runner, &paths, "chore: update files modified by CI [skip ci]")?;
    }

    Ok(())
}
