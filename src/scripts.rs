use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::config::Config;
use crate::output::Output;
use crate::pm::PackageManager;
use crate::process::{CommandRunner, ProcessResult, command_line};

// Fallback when AUTOFIX_LINT is enabled without naming a script.
const DEFAULT_LINT_FIX: &str = "lint:fix";

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Script names declared in the package.json of `dir`. A missing file
/// means no scripts, not an error.
pub fn available_scripts(dir: &Path) -> anyhow::Result<Vec<String>> {
    let path = dir.join("package.json");
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let package: PackageJson = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(package.scripts.keys().cloned().collect())
}

pub fn run_scripts(
    manager: PackageManager,
    config: &Config,
    out: &Output,
    runner: &dyn CommandRunner,
    available: &[String],
) -> anyhow::Result<()> {
    for script in config.scripts.split(',') {
        let script = script.trim();
        if script.is_empty() {
            continue;
        }
        run_script(script, manager, config, out, runner, available)?;
    }
    Ok(())
}

/// Run one package script. Undeclared scripts are skipped; a failing
/// `lint` falls back to the configured autofix script once.
pub fn run_script(
    name: &str,
    manager: PackageManager,
    config: &Config,
    out: &Output,
    runner: &dyn CommandRunner,
    available: &[String],
) -> anyhow::Result<()> {
    if !available.iter().any(|script| script == name) {
        out.debug(&format!("Skipping \"{name}\", no such script"));
        return Ok(());
    }

    let fix_lint = name == "lint" && config.autofix_lint.enabled();
    let flags = script_flags(config, fix_lint);

    out.info(&format!("Running {name} script"));
    let result = run_pm_script(manager, &flags, name, out, runner)?;
    if result.success() {
        return Ok(());
    }

    if fix_lint {
        let fix_script = config.autofix_lint.value().unwrap_or(DEFAULT_LINT_FIX);
        out.info(&format!("Running {fix_script} script"));
        let fixed = run_pm_script(manager, &flags, fix_script, out, runner)?;
        if !fixed.success() {
            bail!("script \"{fix_script}\" failed\n{}", fixed.combined());
        }
        return Ok(());
    }

    bail!("script \"{name}\" failed\n{}", result.combined());
}

fn script_flags(config: &Config, fix_lint: bool) -> Vec<String> {
    let mut flags = Vec::new();
    if !config.bail_on_missing {
        flags.push("--if-present".to_string());
    }
    if config.debug {
        flags.push("--loglevel=debug".to_string());
    }
    if config.no_bail && !fix_lint {
        flags.push("--no-bail".to_string());
    }
    flags
}

fn run_pm_script(
    manager: PackageManager,
    flags: &[String],
    name: &str,
    out: &Output,
    runner: &dyn CommandRunner,
) -> anyhow::Result<ProcessResult> {
    let mut args = vec!["run".to_string()];
    args.extend(flags.iter().cloned());
    args.push(name.to_string());

    out.debug(&format!("$ {}", command_line(manager.binary(), &args)));
    let result = runner.run(manager.binary(), &args)?;
    if !result.stdout.trim().is_empty() {
        out.log(result.stdout.trim_end());
    }
    if !result.stderr.trim().is_empty() {
        out.debug(result.stderr.trim_end());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::config::{Config, Toggle};
    use crate::output::Output;
    use crate::pm::PackageManager;
    use crate::process::mock::{MockRunner, failed, ok};

    use super::{available_scripts, run_script, script_flags};

    fn config() -> Config {
        Config::resolve_from(None, &HashMap::new())
    }

    fn out() -> Output {
        Output::with_secrets(false, Vec::new())
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn reads_scripts_from_package_json() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"name":"demo","scripts":{"build":"tsc","test":"vitest"}}"#,
        )
        .unwrap();

        let scripts = available_scripts(dir.path()).expect("package.json should parse");
        assert_eq!(scripts, vec!["build".to_string(), "test".to_string()]);
    }

    #[test]
    fn missing_package_json_means_no_scripts() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let scripts = available_scripts(dir.path()).expect("missing file is not an error");
        assert!(scripts.is_empty());
    }

    #[test]
    fn undeclared_script_is_skipped_without_running_anything() {
        let config = config();
        let runner = MockRunner::new();

        run_script(
            "docs",
            PackageManager::Pnpm,
            &config,
            &out(),
            &runner,
            &strings(&["build", "test"]),
        )
        .expect("missing script should be skipped");

        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn lint_failure_falls_back_to_autofix_once() {
        let config = config();
        let runner = MockRunner::new()
            .on("pnpm run --if-present lint", failed("1 problem", ""))
            .on("pnpm run --if-present lint:fix", ok());

        run_script(
            "lint",
            PackageManager::Pnpm,
            &config,
            &out(),
            &runner,
            &strings(&["lint"]),
        )
        .expect("lint autofix should recover");

        assert_eq!(
            runner.recorded(),
            vec![
                "pnpm run --if-present lint".to_string(),
                "pnpm run --if-present lint:fix".to_string(),
            ]
        );
    }

    #[test]
    fn lint_failure_without_autofix_propagates() {
        let mut config = config();
        config.autofix_lint = Toggle::Off;

        let runner = MockRunner::new().on("pnpm run --if-present lint", failed("1 problem", ""));

        let err = run_script(
            "lint",
            PackageManager::Pnpm,
            &config,
            &out(),
            &runner,
            &strings(&["lint"]),
        )
        .expect_err("lint should fail without autofix");
        assert!(err.to_string().contains("lint"));
        assert_eq!(runner.recorded().len(), 1);
    }

    #[test]
    fn other_script_failure_propagates() {
        let config = config();
        let runner = MockRunner::new().on("pnpm run --if-present test", failed("", "2 failed"));

        let err = run_script(
            "test",
            PackageManager::Pnpm,
            &config,
            &out(),
            &runner,
            &strings(&["test"]),
        )
        .expect_err("test failure should abort the run");
        assert!(err.to_string().contains("2 failed"));
    }

    #[test]
    fn no_bail_flag_is_withheld_for_lint_autofix() {
        let mut config = config();
        config.no_bail = true;

        assert!(script_flags(&config, true).iter().all(|flag| flag != "--no-bail"));
        assert!(script_flags(&config, false).contains(&"--no-bail".to_string()));
    }

    #[test]
    fn bail_on_missing_drops_if_present() {
        let mut config = config();
        config.bail_on_missing = true;

        assert!(script_flags(&config, false).is_empty());

        config.bail_on_missing = false;
        config.debug = true;
        assert_eq!(
            script_flags(&config, false),
            vec!["--if-present".to_string(), "--loglevel=debug".to_string()]
        );
    }
}
