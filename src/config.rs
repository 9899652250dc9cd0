//! Supervisor options.

use serde::Deserialize;

/// Command started when the caller does not supply one.
pub const DEFAULT_COMMAND: &str = "webdriver-manager start";

/// How to start the Selenium server. The spawned command line is
/// `path + command`, handed to the platform shell verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Prefix prepended to the command, e.g. `./node_modules/.bin/`.
    pub path: String,
    /// The start command itself.
    pub command: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            path: String::new(),
            command: DEFAULT_COMMAND.to_string(),
        }
    }
}

impl Options {
    /// Full command line handed to the shell.
    pub fn command_line(&self) -> String {
        format!("{}{}", self.path, self.command)
    }

    /// Load options from `config/supervisor.toml`, falling back to
    /// defaults when the file is missing or malformed.
    pub fn load() -> anyhow::Result<Self> {
        let s = std::fs::read_to_string("config/supervisor.toml").unwrap_or_default();
        let opts: Self = toml::from_str(&s).unwrap_or_default();
        Ok(opts)
    }
}
