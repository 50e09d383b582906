//! Runtime wrapper that answers queries for real and only announces mutations.

use std::cell::RefCell;
use std::path::Path;

use crate::docker::runtime::{ContainerInspector, ContainerRuntime, ImageBuilder, LaunchOutput};
use crate::errors::Result;
use crate::util::shell_join;

pub struct DryRunRuntime<'a, R: ContainerRuntime + ?Sized> {
    inner: &'a R,
    actions: RefCell<Vec<String>>,
}

impl<'a, R: ContainerRuntime + ?Sized> DryRunRuntime<'a, R> {
    pub fn new(inner: &'a R) -> Self {
        Self {
            inner,
            actions: RefCell::new(Vec::new()),
        }
    }

    /// Mutations that would have been performed, in order.
    pub fn actions(&self) -> Vec<String> {
        self.actions.borrow().clone()
    }

    fn announce(&self, action: String) {
        eprintln!("dry-run: would {action}");
        self.actions.borrow_mut().push(action);
    }
}

impl<R: ContainerRuntime + ?Sized> ContainerInspector for DryRunRuntime<'_, R> {
    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn is_running(&self, name: &str) -> bool {
        self.inner.is_running(name)
    }

    fn stored_extensions(&self, name: &str) -> Option<Vec<String>> {
        self.inner.stored_extensions(name)
    }
}

impl<R: ContainerRuntime + ?Sized> ImageBuilder for DryRunRuntime<'_, R> {
    fn build_image(
        &self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
        no_cache: bool,
    ) -> Result<String> {
        self.announce(format!(
            "docker build{} -t {tag} -f {} {}",
            if no_cache { " --no-cache" } else { "" },
            dockerfile.display(),
            context.display()
        ));
        Ok(tag.to_string())
    }
}

impl<R: ContainerRuntime + ?Sized> ContainerRuntime for DryRunRuntime<'_, R> {
    fn start(&self, name: &str) -> bool {
        self.announce(format!("docker start {name}"));
        true
    }

    fn stop(&self, name: &str) -> bool {
        self.announce(format!("docker stop {name}"));
        true
    }

    fn remove(&self, name: &str) -> bool {
        self.announce(format!("docker rm {name}"));
        true
    }

    fn launch(&self, command: &[String]) -> Result<LaunchOutput> {
        self.announce(format!("run {}", shell_join(command)));
        Ok(LaunchOutput {
            code: 0,
            stderr: String::new(),
        })
    }

    fn interactive_shell(&self, name: &str, workdir: Option<&str>) -> Result<i32> {
        self.announce(format!(
            "attach a shell to {name}{}",
            workdir.map(|w| format!(" in {w}")).unwrap_or_default()
        ));
        Ok(0)
    }

    fn exec(&self, name: &str, _workdir: Option<&str>, command: &[String]) -> Result<i32> {
        self.announce(format!("docker exec {name} {}", shell_join(command)));
        Ok(0)
    }
}
