//! Scoped configuration files and their precedence.
//!
//! Scopes are folded in order: the global file first, then the repository
//! root file. A missing file contributes nothing; any file that exists but
//! cannot be used is an error naming its path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::config::merge::{merge_configs, merge_flags, normalize};
use crate::config::value::{Config, ConfigValue, ARGS_KEY, DISABLE_ARGS_KEY};
use crate::errors::{Result, RockercError};

pub const CONFIG_FILE_NAME: &str = "rockerc.yaml";
pub const GLOBAL_CONFIG_FILE_NAME: &str = ".rockerc.yaml";

/// One configuration file in the precedence chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigScope {
    pub label: String,
    pub path: PathBuf,
}

impl ConfigScope {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    /// `ROCKERC_GLOBAL_CONFIG`, else `~/.rockerc.yaml`. `None` without a home directory.
    pub fn global() -> Option<Self> {
        if let Ok(p) = std::env::var("ROCKERC_GLOBAL_CONFIG") {
            if !p.trim().is_empty() {
                return Some(Self::new("global", p));
            }
        }
        home::home_dir().map(|h| Self::new("global", h.join(GLOBAL_CONFIG_FILE_NAME)))
    }

    pub fn repo_root(root: &Path) -> Self {
        Self::new("local", root.join(CONFIG_FILE_NAME))
    }
}

/// `args` as written in one scope, kept for the extension report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeArgs {
    pub label: String,
    pub path: PathBuf,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: Config,
    pub provenance: Vec<ScopeArgs>,
    /// Extensions dropped by `disable_args`, in merge order.
    pub removed: Vec<String>,
    /// Files that existed and contributed.
    pub sources: Vec<PathBuf>,
}

impl LoadedConfig {
    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }
}

pub fn default_scopes(root: &Path) -> Vec<ConfigScope> {
    let mut scopes = Vec::with_capacity(2);
    if let Some(g) = ConfigScope::global() {
        scopes.push(g);
    }
    scopes.push(ConfigScope::repo_root(root));
    scopes
}

/// Parse one file's text into a normalized mapping.
pub fn parse_config_str(content: &str, path: &Path) -> Result<Config> {
    let doc: Value = serde_yaml::from_str(content)
        .map_err(|e| RockercError::config(path, format!("invalid YAML: {e}")))?;
    let mapping = match doc {
        Value::Null => return Ok(Config::new()),
        Value::Mapping(m) => m,
        _ => {
            return Err(RockercError::config(
                path,
                "top level must be a mapping of keys to values",
            ))
        }
    };

    let mut config = Config::new();
    for (k, v) in &mapping {
        let key = match k {
            Value::String(s) => s.clone(),
            other => match serde_yaml::to_string(other) {
                Ok(s) => s.trim().to_string(),
                Err(_) => return Err(RockercError::config(path, "unsupported key type")),
            },
        };
        match ConfigValue::from_yaml(&key, v) {
            Ok(Some(value)) => {
                config.insert(key, value);
            }
            Ok(None) => {}
            Err(msg) => return Err(RockercError::config(path, msg)),
        }
    }

    if let Some(ConfigValue::List(args)) = config.get(ARGS_KEY) {
        validate_args_format(args, path)?;
    }
    Ok(normalize(config))
}

/// Reject `args` entries that a YAML indentation mistake folded into one string.
pub fn validate_args_format(args: &[String], path: &Path) -> Result<()> {
    let Some(bad) = args.iter().find(|a| a.contains(" - ")) else {
        return Ok(());
    };
    let parts: Vec<&str> = bad.split(" - ").map(str::trim).collect();
    let mut msg = format!(
        "malformed 'args' entry '{bad}': several extensions ended up in one list item\n\n\
         ❌ Incorrect:\nargs:\n  - {bad}\n\n✅ Correct:\nargs:\n"
    );
    for p in parts.iter().filter(|p| !p.is_empty()) {
        msg.push_str("  - ");
        msg.push_str(p);
        msg.push('\n');
    }
    Err(RockercError::config(path, msg))
}

/// Read a scope file. `Ok(None)` when the file does not exist.
pub fn load_scope_file(path: &Path) -> Result<Option<Config>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RockercError::config(path, format!("cannot read file: {e}"))),
    };
    parse_config_str(&content, path).map(Some)
}

/// Fold all scopes in order, then apply `disable_args`.
pub fn load_layered(scopes: &[ConfigScope]) -> Result<LoadedConfig> {
    let mut loaded = LoadedConfig::default();
    for scope in scopes {
        let Some(cfg) = load_scope_file(&scope.path)? else {
            tracing::debug!(scope = %scope.label, path = %scope.path.display(), "no config file");
            continue;
        };
        tracing::debug!(scope = %scope.label, path = %scope.path.display(), keys = cfg.len(), "loaded config");
        loaded.provenance.push(ScopeArgs {
            label: scope.label.clone(),
            path: scope.path.clone(),
            args: crate::config::value::config_args(&cfg),
        });
        loaded.sources.push(scope.path.clone());
        loaded.config = merge_configs(&loaded.config, &cfg);
    }

    if let Some(ConfigValue::List(disabled)) = loaded.config.shift_remove(DISABLE_ARGS_KEY) {
        if let Some(ConfigValue::List(args)) = loaded.config.get_mut(ARGS_KEY) {
            let removed: Vec<String> = args
                .iter()
                .filter(|a| disabled.contains(a))
                .cloned()
                .collect();
            args.retain(|a| !disabled.contains(a));
            loaded.removed = merge_flags(&removed, &[]);
        }
        if !loaded.removed.is_empty() {
            tracing::info!(removed = ?loaded.removed, "extensions disabled by disable_args");
        }
    }
    Ok(loaded)
}
