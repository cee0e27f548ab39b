use std::collections::HashMap;

use serde_json::{Map, Value};

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Tri-state option: disabled, enabled with default behavior, or enabled
/// with a caller-supplied value (script name, bail message, path list).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Off,
    On,
    Value(String),
}

impl Toggle {
    pub fn enabled(&self) -> bool {
        !matches!(self, Toggle::Off)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Toggle::Value(value) => Some(value),
            _ => None,
        }
    }

    fn from_value(value: &Value) -> Option<Toggle> {
        match value {
            Value::Bool(true) => Some(Toggle::On),
            Value::Bool(false) => Some(Toggle::Off),
            Value::String(s) if !s.is_empty() => Some(Toggle::Value(s.clone())),
            _ => None,
        }
    }
}

/// Resolved run configuration. Built once from defaults, the JSON override
/// argument, and the environment; read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub package_manager: String,
    pub scripts: String,
    pub no_bail: bool,
    pub bail_on_missing: bool,
    pub autofix_lockfile: bool,
    pub autofix_lint: Toggle,
    pub bail_on_dirty: Toggle,
    pub auto_commit: Toggle,
    pub debug: bool,
    pub prevent_commits: bool,
    pub github_token: Option<String>,
    pub npm_registry: Option<String>,
    pub npm_token: Option<String>,
    pub npm_registry_scope: Option<String>,
    pub pnpm_version: String,
}

impl Config {
    pub fn resolve(raw: Option<&str>) -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::resolve_from(raw, &env)
    }

    pub fn resolve_from(raw: Option<&str>, env: &HashMap<String, String>) -> Self {
        let mut config = Self::defaults(env);

        // Malformed JSON means no overrides; unknown keys pass through
        // untouched.
        let overrides = raw
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
            .unwrap_or_default();
        config.apply(&overrides);

        // CI runners request verbose output through the environment.
        if env_var(env, "RUNNER_DEBUG").is_some_and(|v| v == "1")
            || env_var(env, "DEBUG").is_some_and(|v| v == "true")
        {
            config.debug = true;
        }

        config
    }

    fn defaults(env: &HashMap<String, String>) -> Self {
        Self {
            package_manager: "pnpm".to_string(),
            scripts: "build,test,lint,docs".to_string(),
            no_bail: false,
            bail_on_missing: false,
            autofix_lockfile: true,
            autofix_lint: Toggle::Value("lint:fix".to_string()),
            bail_on_dirty: Toggle::Off,
            auto_commit: Toggle::On,
            debug: false,
            prevent_commits: false,
            github_token: env_var(env, "GITHUB_TOKEN"),
            npm_registry: env_var(env, "NPM_REGISTRY"),
            npm_token: env_var(env, "NPM_TOKEN").or_else(|| env_var(env, "NPM_AUTH_TOKEN")),
            npm_registry_scope: env_var(env, "NPM_REGISTRY_SCOPE"),
            pnpm_version: env_var(env, "PNPM_VERSION").unwrap_or_else(|| "9".to_string()),
        }
    }

    fn apply(&mut self, overrides: &Map<String, Value>) {
        for (key, value) in overrides {
            // Empty-string overrides are ignored, keeping the default.
            if matches!(value, Value::String(s) if s.is_empty()) {
                continue;
            }
            let value = coerce(value);
            match key.as_str() {
                "PACKAGE_MANAGER" => set_string(&mut self.package_manager, &value),
                "SCRIPTS" => set_string(&mut self.scripts, &value),
                "NO_BAIL" => set_bool(&mut self.no_bail, &value),
                "BAIL_ON_MISSING" => set_bool(&mut self.bail_on_missing, &value),
                "AUTOFIX_LOCKFILE" => set_bool(&mut self.autofix_lockfile, &value),
                "AUTOFIX_LINT" => set_toggle(&mut self.autofix_lint, &value),
                "BAIL_ON_DIRTY" => set_toggle(&mut self.bail_on_dirty, &value),
                "AUTO_COMMIT" => set_toggle(&mut self.auto_commit, &value),
                "DEBUG" => set_bool(&mut self.debug, &value),
                "PREVENT_COMMITS" => set_bool(&mut self.prevent_commits, &value),
                "GITHUB_TOKEN" => set_option(&mut self.github_token, &value),
                "NPM_REGISTRY" => set_option(&mut self.npm_registry, &value),
                "NPM_TOKEN" => set_option(&mut self.npm_token, &value),
                "NPM_REGISTRY_SCOPE" => set_option(&mut self.npm_registry_scope, &value),
                "PNPM_VERSION" => set_string(&mut self.pnpm_version, &value),
                _ => {}
            }
        }
    }

    pub fn registry_url(&self) -> String {
        self.npm_registry
            .clone()
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string())
    }

    /// Git setup and commits are only wanted when some enabled option can
    /// end up writing to the repository.
    pub fn requires_git(&self) -> bool {
        if self.prevent_commits {
            return false;
        }
        self.autofix_lockfile
            || self.autofix_lint.enabled()
            || self.bail_on_dirty.enabled()
            || self.auto_commit.enabled()
    }

    /// Values the logger must never print verbatim.
    pub fn secrets(&self) -> Vec<(&'static str, String)> {
        let mut secrets = Vec::new();
        for (name, value) in [
            ("NPM_TOKEN", &self.npm_token),
            ("GITHUB_TOKEN", &self.github_token),
            ("NPM_REGISTRY", &self.npm_registry),
            ("NPM_REGISTRY_SCOPE", &self.npm_registry_scope),
        ] {
            if let Some(value) = value {
                if !value.is_empty() {
                    secrets.push((name, value.clone()));
                }
            }
        }
        secrets
    }

    /// Environment exported to every spawned command.
    pub fn subprocess_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(token) = &self.npm_token {
            env.push(("NPM_TOKEN".to_string(), token.clone()));
            env.push(("NODE_AUTH_TOKEN".to_string(), token.clone()));
        }
        env.push(("NPM_REGISTRY".to_string(), self.registry_url()));
        if let Some(token) = &self.github_token {
            env.push(("GITHUB_TOKEN".to_string(), token.clone()));
        }
        env
    }

    /// Debug dump of the resolved configuration with secret-bearing keys
    /// left out entirely.
    pub fn redacted_json(&self) -> Value {
        serde_json::json!({
            "PACKAGE_MANAGER": self.package_manager,
            "SCRIPTS": self.scripts,
            "NO_BAIL": self.no_bail,
            "BAIL_ON_MISSING": self.bail_on_missing,
            "AUTOFIX_LOCKFILE": self.autofix_lockfile,
            "AUTOFIX_LINT": toggle_json(&self.autofix_lint),
            "BAIL_ON_DIRTY": toggle_json(&self.bail_on_dirty),
            "AUTO_COMMIT": toggle_json(&self.auto_commit),
            "DEBUG": self.debug,
            "PREVENT_COMMITS": self.prevent_commits,
            "PNPM_VERSION": self.pnpm_version,
        })
    }
}

fn env_var(env: &HashMap<String, String>, name: &str) -> Option<String> {
    env.get(name).filter(|value| !value.is_empty()).cloned()
}

/// Inputs arrive as strings from workflow files; boolean-looking strings
/// become native booleans before field assignment.
fn coerce(value: &Value) -> Value {
    match value {
        Value::String(s) if s == "true" => Value::Bool(true),
        Value::String(s) if s == "false" => Value::Bool(false),
        other => other.clone(),
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn set_string(slot: &mut String, value: &Value) {
    if let Some(s) = as_string(value) {
        *slot = s;
    }
}

fn set_option(slot: &mut Option<String>, value: &Value) {
    if let Some(s) = as_string(value) {
        *slot = Some(s);
    }
}

fn set_bool(slot: &mut bool, value: &Value) {
    if let Value::Bool(b) = value {
        *slot = *b;
    }
}

fn set_toggle(slot: &mut Toggle, value: &Value) {
    if let Some(toggle) = Toggle::from_value(value) {
        *slot = toggle;
    }
}

fn toggle_json(toggle: &Toggle) -> Value {
    match toggle {
        Toggle::Off => Value::Bool(false),
        Toggle::On => Value::Bool(true),
        Toggle::Value(value) => Value::String(value.clone()),
    }
}
