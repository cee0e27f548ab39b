use console::style;

use crate::config::Config;

const MASK: &str = "***";

/// Leveled console writer. Every message is passed through secret
/// redaction before it reaches stdout, so callers can log captured
/// subprocess output without worrying about token leakage.
#[derive(Debug, Clone)]
pub struct Output {
    debug: bool,
    secrets: Vec<(String, String)>,
}

impl Output {
    pub fn new(config: &Config) -> Self {
        Self {
            debug: config.debug,
            secrets: config
                .secrets()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn with_secrets(debug: bool, secrets: Vec<(String, String)>) -> Self {
        Self { debug, secrets }
    }

    pub(crate) fn redact(&self, msg: &str) -> String {
        let mut msg = msg.to_string();
        for (name, value) in &self.secrets {
            if value.is_empty() {
                continue;
            }
            let replacement = if self.debug {
                // Under debug, name which secret was removed.
                format!("{{{{{name}}}}}")
            } else {
                MASK.to_string()
            };
            msg = msg.replace(value.as_str(), &replacement);
        }
        msg
    }

    fn write(&self, prefix: &str, msg: &str) {
        println!("{prefix} {}", self.redact(msg));
    }

    pub fn log(&self, msg: &str) {
        self.write(&style("[LOG]").white().to_string(), msg);
    }

    pub fn info(&self, msg: &str) {
        self.write(&style("[INFO]").blue().to_string(), msg);
    }

    pub fn success(&self, msg: &str) {
        self.write(&style("[SUCCESS]").green().to_string(), msg);
    }

    pub fn debug(&self, msg: &str) {
        if self.debug {
            self.write(&style("[DEBUG]").yellow().to_string(), msg);
        }
    }

    pub fn error(&self, msg: &str) {
        self.write(&style("[ERROR]").red().to_string(), msg);
    }

    /// Print the message and terminate the run with exit code 1.
    pub fn die(&self, msg: &str) -> ! {
        self.write(&style("[DIE]").red().to_string(), msg);
        std::process::exit(1);
    }
}
