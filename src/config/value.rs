//! Configuration mapping model.

use indexmap::IndexMap;
use serde_yaml::Value;

pub const IMAGE_KEY: &str = "image";
pub const ARGS_KEY: &str = "args";
pub const DISABLE_ARGS_KEY: &str = "disable_args";
pub const VOLUME_KEY: &str = "volume";
pub const ENV_KEY: &str = "env";
pub const PORT_KEY: &str = "port";
pub const DEVICE_KEY: &str = "device";
pub const CAP_ADD_KEY: &str = "cap-add";
pub const DETACH_KEY: &str = "detach";
pub const NAME_KEY: &str = "name";
/// Dockerfile to build; the built tag replaces `image`.
pub const DOCKERFILE_KEY: &str = "dockerfile";

/// A single configuration value after YAML coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

/// Insertion-ordered configuration mapping.
pub type Config = IndexMap<String, ConfigValue>;

/// How a list-valued key merges across scopes.
#[derive(Clone, Copy)]
pub enum ListKind {
    /// Deduplicated by an identity key; later entries replace earlier ones.
    Keyed(fn(&str) -> String),
    /// Deduplicated by exact value; first occurrence wins.
    Flags,
}

pub fn list_kind(key: &str) -> Option<ListKind> {
    use crate::config::merge::{device_identity, env_identity, port_identity, volume_identity};
    match key {
        VOLUME_KEY => Some(ListKind::Keyed(volume_identity)),
        ENV_KEY => Some(ListKind::Keyed(env_identity)),
        PORT_KEY => Some(ListKind::Keyed(port_identity)),
        DEVICE_KEY => Some(ListKind::Keyed(device_identity)),
        ARGS_KEY | CAP_ADD_KEY | DISABLE_ARGS_KEY => Some(ListKind::Flags),
        _ => None,
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ConfigValue {
    /// Coerce a YAML value under `key`. `Ok(None)` means the key should be treated as absent.
    pub fn from_yaml(key: &str, v: &Value) -> Result<Option<Self>, String> {
        let is_list_key = list_kind(key).is_some();
        match v {
            Value::Null => Ok(None),
            Value::Bool(b) if !is_list_key => Ok(Some(ConfigValue::Bool(*b))),
            Value::Sequence(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match scalar_to_string(item) {
                        Some(s) => out.push(s),
                        None => {
                            return Err(format!(
                                "key '{key}' must be a list of strings (found a nested value)"
                            ))
                        }
                    }
                }
                Ok(Some(ConfigValue::List(out)))
            }
            Value::Mapping(_) => Err(format!(
                "key '{key}' must be a string, boolean or list of strings, not a mapping"
            )),
            other => match scalar_to_string(other) {
                Some(s) if is_list_key => Ok(Some(ConfigValue::List(vec![s]))),
                Some(s) => Ok(Some(ConfigValue::Str(s))),
                None => Err(format!("key '{key}' has an unsupported value type")),
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ConfigValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// Extension names from `args`, in configuration order.
pub fn config_args(config: &Config) -> Vec<String> {
    config
        .get(ARGS_KEY)
        .and_then(ConfigValue::as_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

pub fn config_image(config: &Config) -> Option<&str> {
    config
        .get(IMAGE_KEY)
        .and_then(ConfigValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
