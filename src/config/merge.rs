//! Identity-keyed list merging.
//!
//! Keyed lists (volume, env, port, device): later entry wins and takes the
//! position of the entry it replaces. Flag lists (args, cap-add): first
//! occurrence wins. An explicitly empty override list clears the key.

use crate::config::value::{list_kind, Config, ConfigValue, ListKind, VOLUME_KEY};
use crate::util::strip_outer_quotes;

fn trim_path(p: &str) -> String {
    let p = strip_outer_quotes(p.trim());
    let trimmed = p.trim_end_matches('/');
    if trimmed.is_empty() && p.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Mount target of a volume spec.
///
/// Accepts `source:target[:mode]`, a bare `/target`, and the long form
/// `type=bind,source=/a,target=/b` (also `dst=` / `destination=`, alone or
/// with other fields).
pub fn volume_identity(entry: &str) -> String {
    let entry = entry.trim();
    if entry.contains('=') {
        for part in entry.split(',') {
            if let Some((k, v)) = part.split_once('=') {
                if matches!(k.trim(), "target" | "dst" | "destination") {
                    return trim_path(v);
                }
            }
        }
    }
    let parts: Vec<&str> = entry.split(':').collect();
    match parts.as_slice() {
        [single] => trim_path(single),
        [_, target, ..] => trim_path(target),
        [] => String::new(),
    }
}

/// Variable name of an env entry (`NAME=value` or bare `NAME`).
pub fn env_identity(entry: &str) -> String {
    let entry = entry.trim();
    entry
        .split_once('=')
        .map(|(k, _)| k)
        .unwrap_or(entry)
        .trim()
        .to_string()
}

/// Container side of a port mapping, with the protocol made explicit.
pub fn port_identity(entry: &str) -> String {
    let container = entry.trim().rsplit(':').next().unwrap_or("").trim();
    if container.contains('/') {
        container.to_ascii_lowercase()
    } else {
        format!("{container}/tcp")
    }
}

/// In-container device path (`host[:container[:perms]]`).
pub fn device_identity(entry: &str) -> String {
    let parts: Vec<&str> = entry.trim().split(':').collect();
    match parts.as_slice() {
        [host] => trim_path(host),
        [_, container, ..] => trim_path(container),
        [] => String::new(),
    }
}

/// Merge two keyed lists; `over` wins on identity collisions.
pub fn merge_keyed(base: &[String], over: &[String], identity: fn(&str) -> String) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(base.len() + over.len());
    let mut out: Vec<String> = Vec::with_capacity(base.len() + over.len());
    for entry in base.iter().chain(over.iter()) {
        let key = identity(entry);
        match keys.iter().position(|k| *k == key) {
            Some(idx) => out[idx] = entry.clone(),
            None => {
                keys.push(key);
                out.push(entry.clone());
            }
        }
    }
    out
}

/// Merge two flag lists; exact duplicates after the first are dropped.
pub fn merge_flags(base: &[String], over: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + over.len());
    for entry in base.iter().chain(over.iter()) {
        if !out.contains(entry) {
            out.push(entry.clone());
        }
    }
    out
}

fn merge_list(kind: ListKind, base: &[String], over: &[String]) -> Vec<String> {
    match kind {
        ListKind::Keyed(identity) => merge_keyed(base, over, identity),
        ListKind::Flags => merge_flags(base, over),
    }
}

/// Layer `over` on top of `base`.
///
/// Scalars are replaced outright. List keys merge by their kind, except that a
/// present-but-empty list in `over` clears the key to an empty list.
pub fn merge_configs(base: &Config, over: &Config) -> Config {
    let mut out = base.clone();
    for (key, value) in over {
        let merged = match (list_kind(key), out.get(key), value) {
            (Some(_), _, ConfigValue::List(o)) if o.is_empty() => ConfigValue::List(Vec::new()),
            (Some(kind), Some(ConfigValue::List(b)), ConfigValue::List(o)) => {
                ConfigValue::List(merge_list(kind, b, o))
            }
            (Some(kind), _, ConfigValue::List(o)) => ConfigValue::List(merge_list(kind, &[], o)),
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Deduplicate every list key of a single scope by its merge rule.
pub fn normalize(config: Config) -> Config {
    config
        .into_iter()
        .map(|(key, value)| {
            let value = match (list_kind(&key), value) {
                (Some(kind), ConfigValue::List(items)) => {
                    ConfigValue::List(merge_list(kind, &items, &[]))
                }
                (_, v) => v,
            };
            (key, value)
        })
        .collect()
}

/// Return a copy of `config` without volume entries whose target is `target`.
/// `None` when no entry matched.
pub fn remove_volume_by_target(config: &Config, target: &str) -> Option<Config> {
    let wanted = volume_identity(target);
    let volumes = config.get(VOLUME_KEY).and_then(ConfigValue::as_list)?;
    let kept: Vec<String> = volumes
        .iter()
        .filter(|v| volume_identity(v) != wanted)
        .cloned()
        .collect();
    if kept.len() == volumes.len() {
        return None;
    }
    let mut out = config.clone();
    out.insert(VOLUME_KEY.to_string(), ConfigValue::List(kept));
    Some(out)
}
