//! Optional TOML configuration.
//!
//! Looked up as `rill.toml` next to the script being run, or as
//! `~/.config/rill/config.toml` for the interactive prompt. Command-line
//! flags override whatever the file sets.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which backend executes the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Compile to bytecode and run it on the stack machine.
    #[default]
    Vm,
    /// Evaluate the expression tree directly.
    Walk,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub repl: ReplSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ReplSection {
    /// Where prompt history is kept; `~` expands to the home directory.
    pub history_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RunSection {
    pub backend: Option<Backend>,
}

impl Config {
    /// Load a config file; a missing file is an empty config, a malformed
    /// one is an error the caller treats as a data error.
    pub fn load(path: &Path) -> Result<Config, String> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config file '{}': {error}", path.display()))?;
        toml::from_str(&text)
            .map_err(|error| format!("Invalid config file '{}': {error}", path.display()))
    }

    /// The config that applies when running `script`: a `rill.toml` next
    /// to it, if any.
    pub fn for_script(script: &Path) -> Result<Config, String> {
        let dir = script.parent().unwrap_or_else(|| Path::new("."));
        Config::load(&dir.join("rill.toml"))
    }

    /// The config that applies to the interactive prompt.
    pub fn for_prompt() -> Result<Config, String> {
        match home::home_dir() {
            Some(dir) => Config::load(&dir.join(".config").join("rill").join("config.toml")),
            None => Ok(Config::default()),
        }
    }

    /// The prompt history path, with `~` expanded; defaults to
    /// `~/.rill_history`.
    pub fn history_file(&self) -> PathBuf {
        let configured = self.repl.history_file.as_deref().unwrap_or("~/.rill_history");
        expand_home(configured)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dir) = home::home_dir() {
            return dir.join(rest);
        }
    }
    PathBuf::from(path)
}
