#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;

use rockerc::config::{Config, ConfigValue};
use rockerc::docker::{ContainerInspector, ContainerRuntime, ImageBuilder, LaunchOutput};
use rockerc::errors::{Result, RockercError};

/// Scripted container runtime that records every mutation.
pub struct MockRuntime {
    exists: Cell<bool>,
    /// Answers for `is_running`; the last one repeats.
    running: RefCell<VecDeque<bool>>,
    stored: RefCell<Option<Vec<String>>>,
    start_ok: Cell<bool>,
    build_ok: Cell<bool>,
    /// Stderr for failing launches, consumed in order; an empty queue means success.
    launch_failures: RefCell<VecDeque<String>>,
    polls: Cell<usize>,
    pub calls: RefCell<Vec<String>>,
    pub launches: RefCell<Vec<Vec<String>>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self {
            exists: Cell::new(false),
            running: RefCell::new(VecDeque::new()),
            stored: RefCell::new(None),
            start_ok: Cell::new(true),
            build_ok: Cell::new(true),
            launch_failures: RefCell::new(VecDeque::new()),
            polls: Cell::new(0),
            calls: RefCell::new(Vec::new()),
            launches: RefCell::new(Vec::new()),
        }
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// An existing container with the given state and recorded extensions.
    pub fn existing(running: bool, stored: Option<&[&str]>) -> Self {
        let m = Self::default();
        m.exists.set(true);
        m.running.borrow_mut().push_back(running);
        *m.stored.borrow_mut() = stored.map(|s| s.iter().map(|x| x.to_string()).collect());
        m
    }

    pub fn with_running_sequence(self, seq: &[bool]) -> Self {
        *self.running.borrow_mut() = seq.iter().copied().collect();
        self
    }

    pub fn with_start_failure(self) -> Self {
        self.start_ok.set(false);
        self
    }

    pub fn with_build_failure(self) -> Self {
        self.build_ok.set(false);
        self
    }

    pub fn with_launch_failures(self, stderrs: &[&str]) -> Self {
        *self.launch_failures.borrow_mut() = stderrs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn launches(&self) -> Vec<Vec<String>> {
        self.launches.borrow().clone()
    }

    pub fn polls(&self) -> usize {
        self.polls.get()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn set_running(&self, on: bool) {
        let mut r = self.running.borrow_mut();
        r.clear();
        r.push_back(on);
    }
}

impl ContainerInspector for MockRuntime {
    fn exists(&self, _name: &str) -> bool {
        self.exists.get()
    }

    fn is_running(&self, _name: &str) -> bool {
        self.polls.set(self.polls.get() + 1);
        let mut r = self.running.borrow_mut();
        if r.len() > 1 {
            r.pop_front().unwrap_or(false)
        } else {
            r.front().copied().unwrap_or(false)
        }
    }

    fn stored_extensions(&self, _name: &str) -> Option<Vec<String>> {
        self.stored.borrow().clone()
    }
}

impl ImageBuilder for MockRuntime {
    fn build_image(
        &self,
        dockerfile: &Path,
        _context: &Path,
        tag: &str,
        no_cache: bool,
    ) -> Result<String> {
        self.record(format!(
            "build {tag} {}{}",
            dockerfile.display(),
            if no_cache { " no-cache" } else { "" }
        ));
        if !self.build_ok.get() {
            return Err(RockercError::ContainerCommand {
                command: format!("docker build -t {tag}"),
                code: 1,
                stderr: "build failed".to_string(),
            });
        }
        Ok(tag.to_string())
    }
}

impl ContainerRuntime for MockRuntime {
    fn start(&self, name: &str) -> bool {
        self.record(format!("start {name}"));
        if self.start_ok.get() {
            self.set_running(true);
        }
        self.start_ok.get()
    }

    fn stop(&self, name: &str) -> bool {
        self.record(format!("stop {name}"));
        self.set_running(false);
        true
    }

    fn remove(&self, name: &str) -> bool {
        self.record(format!("remove {name}"));
        self.exists.set(false);
        true
    }

    fn launch(&self, command: &[String]) -> Result<LaunchOutput> {
        self.record("launch");
        self.launches.borrow_mut().push(command.to_vec());
        if let Some(stderr) = self.launch_failures.borrow_mut().pop_front() {
            return Ok(LaunchOutput { code: 125, stderr });
        }
        self.exists.set(true);
        self.set_running(true);
        Ok(LaunchOutput {
            code: 0,
            stderr: String::new(),
        })
    }

    fn interactive_shell(&self, name: &str, workdir: Option<&str>) -> Result<i32> {
        self.record(format!("shell {name} {}", workdir.unwrap_or("-")));
        Ok(0)
    }

    fn exec(&self, name: &str, _workdir: Option<&str>, command: &[String]) -> Result<i32> {
        self.record(format!("exec {name} {}", command.join(" ")));
        Ok(7)
    }
}

pub fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

/// Build a config from `(key, value)` pairs; values are YAML snippets.
pub fn config(pairs: &[(&str, &str)]) -> Config {
    let mut c = Config::new();
    for (k, v) in pairs {
        let yaml: serde_yaml::Value = serde_yaml::from_str(v).expect("yaml value");
        if let Some(value) = ConfigValue::from_yaml(k, &yaml).expect("coerce") {
            c.insert(k.to_string(), value);
        }
    }
    c
}

pub fn volumes(c: &Config) -> Vec<String> {
    c.get("volume")
        .and_then(ConfigValue::as_list)
        .map(|l| l.to_vec())
        .unwrap_or_default()
}
