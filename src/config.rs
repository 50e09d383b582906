#![allow(clippy::module_name_repetitions)]
//! Layered `rockerc.yaml` configuration.
//!
//! `value` defines the mapping model, `merge` the list-merging rules, and
//! `loader` the file scopes and their precedence.

pub mod loader;
pub mod merge;
pub mod value;

pub use loader::{
    default_scopes, load_layered, load_scope_file, parse_config_str, validate_args_format,
    ConfigScope, LoadedConfig, ScopeArgs,
};
pub use merge::{
    device_identity, env_identity, merge_configs, merge_flags, merge_keyed, normalize,
    port_identity, remove_volume_by_target, volume_identity,
};
pub use value::{
    config_args, config_image, list_kind, Config, ConfigValue, ListKind, ARGS_KEY, CAP_ADD_KEY,
    DETACH_KEY, DEVICE_KEY, DISABLE_ARGS_KEY, DOCKERFILE_KEY, ENV_KEY, IMAGE_KEY, NAME_KEY, PORT_KEY,
    VOLUME_KEY,
};
