use anyhow::bail;

use crate::config::Config;
use crate::output::Output;
use crate::process::CommandRunner;

/// Point npm at the configured registry and verify the token with
/// `npm whoami`. A no-op when neither a registry nor a token is set.
pub fn setup(config: &Config, out: &Output, runner: &dyn CommandRunner) -> anyhow::Result<()> {
    if config.npm_token.is_none() && config.npm_registry.is_none() {
        return Ok(());
    }

    out.log("Setup npm");
    let registry = config.registry_url();

    if let Some(url) = &config.npm_registry {
        npm_config_set(runner, "registry", url)?;
        if let Some(scope) = &config.npm_registry_scope {
            npm_config_set(runner, &format!("{}:registry", scoped(scope)), url)?;
        }
    }

    if let Some(token) = &config.npm_token {
        let key = format!("//{}/:_authToken", registry_host(&registry));
        npm_config_set(runner, &key, token)?;

        let result = runner.run(
            "npm",
            &[
                "whoami".to_string(),
                "--registry".to_string(),
                registry.clone(),
            ],
        )?;
        if !result.success() {
            out.debug(&result.combined());
            bail!("Failed to authenticate with NPM registry");
        }
        out.log(&format!(
            "Authenticated with NPM registry as {}",
            result.stdout.trim()
        ));
    }

    Ok(())
}

fn npm_config_set(runner: &dyn CommandRunner, key: &str, value: &str) -> anyhow::Result<()> {
    let result = runner.run(
        "npm",
        &[
            "config".to_string(),
            "set".to_string(),
            key.to_string(),
            value.to_string(),
        ],
    )?;
    if !result.success() {
        bail!("npm config set {key} failed\n{}", result.combined());
    }
    Ok(())
}

fn scoped(scope: &str) -> String {
    if scope.starts_with('@') {
        scope.to_string()
    } else {
        format!("@{scope}")
    }
}

/// Registry URL without protocol or trailing slash, as used in the
/// `//host/:_authToken` npm config key.
fn registry_host(url: &str) -> &str {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    host.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::config::Config;
    use crate::output::Output;
    use crate::process::mock::{MockRunner, failed, output};

    use super::{registry_host, scoped, setup};

    fn out() -> Output {
        Output::with_secrets(false, Vec::new())
    }

    #[test]
    fn strips_protocol_and_trailing_slash() {
        assert_eq!(registry_host("https://registry.npmjs.org/"), "registry.npmjs.org");
        assert_eq!(registry_host("http://npm.example.com"), "npm.example.com");
        assert_eq!(registry_host("npm.example.com/"), "npm.example.com");
    }

    #[test]
    fn scope_gains_at_sign_when_missing() {
        assert_eq!(scoped("myorg"), "@myorg");
        assert_eq!(scoped("@myorg"), "@myorg");
    }

    #[test]
    fn skips_entirely_without_credentials() {
        let config = Config::resolve_from(None, &HashMap::new());
        let runner = MockRunner::new();

        setup(&config, &out(), &runner).expect("nothing to do");
        assert!(runner.recorded().is_empty());
    }

    #[test]
    fn configures_registry_scope_and_token() {
        let env: HashMap<String, String> = [
            ("NPM_REGISTRY", "https://npm.example.com/"),
            ("NPM_REGISTRY_SCOPE", "@myorg"),
            ("NPM_TOKEN", "tok-1"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = Config::resolve_from(None, &env);

        let runner = MockRunner::new().on("npm whoami", output("ci-bot\n"));
        setup(&config, &out(), &runner).expect("auth should succeed");

        assert_eq!(
            runner.recorded(),
            vec![
                "npm config set registry https://npm.example.com/".to_string(),
                "npm config set @myorg:registry https://npm.example.com/".to_string(),
                "npm config set //npm.example.com/:_authToken tok-1".to_string(),
                "npm whoami --registry https://npm.example.com/".to_string(),
            ]
        );
    }

    #[test]
    fn failed_whoami_is_fatal() {
        let env: HashMap<String, String> = [("NPM_TOKEN", "tok-1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::resolve_from(None, &env);

        let runner = MockRunner::new().on("npm whoami", failed("", "ENEEDAUTH"));
        let err = setup(&config, &out(), &runner).expect_err("bad token should fail");
        assert!(err.to_string().contains("Failed to authenticate"));
    }

    #[test]
    fn token_alone_uses_default_registry_host() {
        let env: HashMap<String, String> = [("NPM_TOKEN", "tok-1")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::resolve_from(None, &env);

        let runner = MockRunner::new().on("npm whoami", output("ci-bot\n"));
        setup(&config, &out(), &runner).expect("auth should succeed");

        assert!(runner.recorded().contains(
            &"npm config set //registry.npmjs.org/:_authToken tok-1".to_string()
        ));
    }
}
