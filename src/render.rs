#![allow(clippy::module_name_repetitions)]
//! Rendering a configuration mapping plus pass-through arguments into the
//! launch tool's command line.
//!
//! Order: extensions, other keys, extra flags, `-- <image>`, then either the
//! explicit command or the keep-alive command for detached containers.

use crate::config::{
    Config, ConfigValue, ARGS_KEY, DETACH_KEY, DISABLE_ARGS_KEY, DOCKERFILE_KEY, IMAGE_KEY,
};
use crate::util::{shell_join, shell_like_split_args};

/// Long-running command injected so a detached container stays up.
pub const KEEP_ALIVE: [&str; 3] = ["tail", "-f", "/dev/null"];

/// Options whose argument is the following token.
const VALUE_OPTIONS: &[&str] = &[
    "--name",
    "--image-name",
    "--env",
    "-e",
    "--volume",
    "-v",
    "--label",
    "-l",
    "--port",
    "-p",
    "--device",
    "--network",
    "--mount",
    "--workdir",
    "-w",
    "--cap-add",
    "--cap-drop",
    "--hostname",
    "--entrypoint",
    "--runtime",
    "--gpus",
    "--security-opt",
    "--ulimit",
    "--add-host",
    "--tmpfs",
    "--sysctl",
    "--shm-size",
    "--oyr-run-arg",
    "--group-add",
    "--mode",
    "--env-file",
    "--user-override-name",
    "--user-override-shell",
    "--expose",
    "--devices",
    "--ipc",
    "--extension-blacklist",
    "--git-config-path",
];

fn takes_value(flag: &str) -> bool {
    VALUE_OPTIONS.contains(&flag)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgToken {
    /// An option such as `--x11` or `--env=A=b`.
    Flag(String),
    /// The argument of the preceding value-taking option.
    Value(String),
    /// A word of the container command.
    Command(String),
}

/// Pass-through arguments for the launch tool, classified once at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArgs {
    tokens: Vec<ArgToken>,
}

impl ExtraArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenize a command-line fragment with quote awareness.
    pub fn parse(raw: &str) -> Self {
        Self::from_words(shell_like_split_args(raw))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = Vec::new();
        let mut words = words.into_iter().map(Into::into);
        while let Some(word) = words.next() {
            if word == "--" {
                tokens.extend(words.by_ref().map(ArgToken::Command));
                break;
            }
            if word.starts_with('-') && word.len() > 1 {
                let wants_value = !word.contains('=') && takes_value(&word);
                tokens.push(ArgToken::Flag(word));
                if wants_value {
                    if let Some(value) = words.next() {
                        tokens.push(ArgToken::Value(value));
                    }
                }
                continue;
            }
            tokens.push(ArgToken::Command(word));
            tokens.extend(words.by_ref().map(ArgToken::Command));
            break;
        }
        Self { tokens }
    }

    #[must_use]
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.tokens.push(ArgToken::Flag(flag.into()));
        self
    }

    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tokens.push(ArgToken::Flag(name.into()));
        self.tokens.push(ArgToken::Value(value.into()));
        self
    }

    #[must_use]
    pub fn command<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens
            .extend(words.into_iter().map(|w| ArgToken::Command(w.into())));
        self
    }

    pub fn tokens(&self) -> &[ArgToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_detached(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, ArgToken::Flag(f) if f == "--detach" || f == "-d"))
    }

    pub fn has_command(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, ArgToken::Command(_)))
    }

    /// True when `name` was given, either as `name value` or `name=value`.
    pub fn has_option(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| match t {
            ArgToken::Flag(f) => {
                f == name || f.strip_prefix(name).is_some_and(|rest| rest.starts_with('='))
            }
            _ => false,
        })
    }

    /// Values supplied for any of `names`, in order.
    pub fn option_values(&self, names: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        let mut pending = false;
        for t in &self.tokens {
            match t {
                ArgToken::Flag(f) => {
                    pending = false;
                    if names.contains(&f.as_str()) {
                        pending = true;
                    } else if let Some((name, value)) = f.split_once('=') {
                        if names.contains(&name) {
                            out.push(value.to_string());
                        }
                    }
                }
                ArgToken::Value(v) if pending => {
                    out.push(v.clone());
                    pending = false;
                }
                _ => pending = false,
            }
        }
        out
    }

    /// Flags and their values, in order.
    pub fn option_words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            ArgToken::Flag(s) | ArgToken::Value(s) => Some(s.as_str()),
            ArgToken::Command(_) => None,
        })
    }

    pub fn command_words(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            ArgToken::Command(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

fn config_detached(config: &Config) -> bool {
    matches!(config.get(DETACH_KEY), Some(ConfigValue::Bool(true)))
}

/// Render the launch tool's arguments (without the program name).
pub fn render_tokens(config: &Config, extra: &ExtraArgs) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    if let Some(ConfigValue::List(exts)) = config.get(ARGS_KEY) {
        out.extend(exts.iter().map(|e| format!("--{e}")));
    }

    for (key, value) in config {
        if matches!(
            key.as_str(),
            IMAGE_KEY | ARGS_KEY | DISABLE_ARGS_KEY | DOCKERFILE_KEY
        ) {
            continue;
        }
        let flag = format!("--{key}");
        match value {
            ConfigValue::Str(s) => {
                out.push(flag);
                out.push(s.clone());
            }
            ConfigValue::List(items) => {
                for item in items {
                    out.push(flag.clone());
                    out.push(item.clone());
                }
            }
            ConfigValue::Bool(true) => out.push(flag),
            ConfigValue::Bool(false) => {}
        }
    }

    out.extend(extra.option_words().map(str::to_string));

    let image = crate::config::config_image(config);
    if let Some(image) = image {
        out.push("--".to_string());
        out.push(image.to_string());
    }

    if extra.has_command() {
        out.extend(extra.command_words().map(str::to_string));
    } else if image.is_some() && (extra.is_detached() || config_detached(config)) {
        out.extend(KEEP_ALIVE.iter().map(|w| (*w).to_string()));
    }
    out
}

/// Single-string form of [`render_tokens`], parsing `extra_cli` as pass-through arguments.
pub fn yaml_dict_to_args(config: &Config, extra_cli: &str) -> String {
    shell_join(&render_tokens(config, &ExtraArgs::parse(extra_cli)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(pairs: &[(&str, ConfigValue)]) -> Config {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_classifies_option_values() {
        let extra = ExtraArgs::parse("--env COMMAND=bash --x11 -v /a:/b --label=k=v");
        assert_eq!(
            extra.tokens(),
            &[
                ArgToken::Flag("--env".into()),
                ArgToken::Value("COMMAND=bash".into()),
                ArgToken::Flag("--x11".into()),
                ArgToken::Flag("-v".into()),
                ArgToken::Value("/a:/b".into()),
                ArgToken::Flag("--label=k=v".into()),
            ]
        );
        assert!(!extra.has_command());
    }

    #[test]
    fn test_parse_double_dash_and_positional_start_command() {
        let extra = ExtraArgs::parse("--detach -- bash -lc 'echo hi'");
        assert!(extra.is_detached());
        assert_eq!(
            extra.command_words().collect::<Vec<_>>(),
            vec!["bash", "-lc", "echo hi"]
        );
        let extra = ExtraArgs::parse("--x11 python -m http.server");
        assert_eq!(
            extra.command_words().collect::<Vec<_>>(),
            vec!["python", "-m", "http.server"]
        );
    }

    #[test]
    fn test_has_option_and_values() {
        let extra = ExtraArgs::new()
            .option("--name", "a")
            .flag("--volume=/h:/c")
            .option("-v", "/x:/y");
        assert!(extra.has_option("--name"));
        assert!(extra.has_option("--volume"));
        assert!(!extra.has_option("--image-name"));
        assert_eq!(
            extra.option_values(&["--volume", "-v"]),
            vec!["/h:/c".to_string(), "/x:/y".to_string()]
        );
    }

    #[test]
    fn test_render_order() {
        let c = cfg(&[
            ("image", ConfigValue::Str("ubuntu:22.04".into())),
            ("args", ConfigValue::List(vec!["x11".into(), "user".into()])),
            ("volume", ConfigValue::List(vec!["/a:/a".into()])),
            ("pull", ConfigValue::Bool(true)),
            ("nocache", ConfigValue::Bool(false)),
            ("port", ConfigValue::List(vec![])),
        ]);
        let out = render_tokens(&c, &ExtraArgs::parse("--git"));
        assert_eq!(
            out,
            vec![
                "--x11", "--user", "--volume", "/a:/a", "--pull", "--git", "--", "ubuntu:22.04"
            ]
        );
    }

    #[test]
    fn test_config_detach_triggers_keep_alive() {
        let c = cfg(&[
            ("image", ConfigValue::Str("ubuntu:22.04".into())),
            ("detach", ConfigValue::Bool(true)),
        ]);
        let s = yaml_dict_to_args(&c, "");
        assert!(s.ends_with("-- ubuntu:22.04 tail -f /dev/null"), "{s}");
    }

    #[test]
    fn test_dockerfile_key_is_not_a_launch_flag() {
        let c = cfg(&[
            ("image", ConfigValue::Str("built:latest".into())),
            ("dockerfile", ConfigValue::Str("Dockerfile".into())),
        ]);
        assert_eq!(yaml_dict_to_args(&c, ""), "-- built:latest");
    }

    #[test]
    fn test_no_image_no_keep_alive() {
        let c = cfg(&[("args", ConfigValue::List(vec!["x11".into()]))]);
        assert_eq!(yaml_dict_to_args(&c, "--detach"), "--x11 --detach");
    }
}
