mod common;

use std::cell::RefCell;
use std::time::{Duration, Instant};

use rockerc::docker::ContainerInspector;
use rockerc::errors::{Result, RockercError};
use rockerc::execute::{execute_plan, wait_for_container, ExecuteOptions, IdeLauncher};
use rockerc::plan::LaunchPlan;

use common::{strings, MockRuntime};

fn plan(cmd: &[&str]) -> LaunchPlan {
    LaunchPlan {
        container_name: "proj".to_string(),
        container_hex: hex::encode("proj"),
        rocker_cmd: strings(cmd),
        created: !cmd.is_empty(),
        vscode: false,
        mount_target: Some("/workspaces/proj".to_string()),
    }
}

fn fast() -> ExecuteOptions {
    ExecuteOptions {
        timeout: Duration::from_millis(200),
        interval: Duration::from_millis(10),
        ..ExecuteOptions::default()
    }
}

#[test]
fn test_wait_polls_until_running() {
    let rt = MockRuntime::new().with_running_sequence(&[false, false, true]);
    assert!(wait_for_container(
        &rt,
        "proj",
        Duration::from_secs(1),
        Duration::from_millis(100)
    ));
    assert!(rt.polls() >= 3);
}

#[test]
fn test_existing_but_stopped_is_not_ready() {
    let rt = MockRuntime::existing(false, None);
    let started = Instant::now();
    assert!(!wait_for_container(
        &rt,
        "proj",
        Duration::from_millis(100),
        Duration::from_millis(50)
    ));
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_launch_failure_carries_code_and_stderr() {
    let rt = MockRuntime::new().with_launch_failures(&["no such image"]);
    let err = execute_plan(&rt, None, &plan(&["rocker", "--", "x"]), &fast()).unwrap_err();
    match err {
        RockercError::LaunchFailed {
            command,
            code,
            stderr,
        } => {
            assert_eq!(command, "rocker -- x");
            assert_eq!(code, 125);
            assert_eq!(stderr, "no such image");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_never_running_is_not_running_error() {
    let rt = MockRuntime::existing(false, None);
    let err = execute_plan(&rt, None, &plan(&[]), &fast()).unwrap_err();
    assert!(matches!(err, RockercError::NotRunning { .. }), "{err:?}");
}

#[test]
fn test_attach_shell_in_mount_or_exec_command() {
    let rt = MockRuntime::existing(true, None);
    let code = execute_plan(&rt, None, &plan(&[]), &fast()).expect("shell");
    assert_eq!(code, 0);
    assert_eq!(rt.calls(), vec!["shell proj /workspaces/proj".to_string()]);

    let rt = MockRuntime::existing(true, None);
    let opts = ExecuteOptions {
        command: strings(&["make", "test"]),
        ..fast()
    };
    let code = execute_plan(&rt, None, &plan(&[]), &opts).expect("exec");
    assert_eq!(code, 7);
    assert_eq!(rt.calls(), vec!["exec proj make test".to_string()]);
}

/// Records each open with the container state seen at that moment.
struct RecordingIde<'a> {
    runtime: &'a MockRuntime,
    fail: bool,
    opened: RefCell<Vec<(String, bool, usize)>>,
}

impl<'a> RecordingIde<'a> {
    fn new(runtime: &'a MockRuntime, fail: bool) -> Self {
        Self {
            runtime,
            fail,
            opened: RefCell::new(Vec::new()),
        }
    }
}

impl IdeLauncher for RecordingIde<'_> {
    fn open(&self, plan: &LaunchPlan) -> Result<()> {
        self.opened.borrow_mut().push((
            plan.container_name.clone(),
            self.runtime.is_running(&plan.container_name),
            self.runtime.calls().len(),
        ));
        if self.fail {
            return Err(RockercError::ToolNotFound {
                tool: "code".to_string(),
            });
        }
        Ok(())
    }
}

fn vscode_plan() -> LaunchPlan {
    LaunchPlan {
        vscode: true,
        ..plan(&[])
    }
}

#[test]
fn test_editor_opens_once_after_running_and_before_attach() {
    let rt = MockRuntime::new().with_running_sequence(&[false, false, true]);
    let ide = RecordingIde::new(&rt, false);
    let launcher: &dyn IdeLauncher = &ide;
    let code = execute_plan(&rt, Some(launcher), &vscode_plan(), &fast()).expect("attach");
    assert_eq!(code, 0);
    assert_eq!(
        ide.opened.borrow().clone(),
        vec![("proj".to_string(), true, 0)]
    );
    assert_eq!(rt.calls(), vec!["shell proj /workspaces/proj".to_string()]);
}

#[test]
fn test_editor_failure_still_attaches() {
    let rt = MockRuntime::existing(true, None);
    let ide = RecordingIde::new(&rt, true);
    let launcher: &dyn IdeLauncher = &ide;
    let code = execute_plan(&rt, Some(launcher), &vscode_plan(), &fast()).expect("attach");
    assert_eq!(code, 0);
    assert_eq!(ide.opened.borrow().len(), 1);
    assert_eq!(rt.calls(), vec!["shell proj /workspaces/proj".to_string()]);
}

#[test]
fn test_editor_not_opened_without_vscode() {
    let rt = MockRuntime::existing(true, None);
    let ide = RecordingIde::new(&rt, false);
    let launcher: &dyn IdeLauncher = &ide;
    execute_plan(&rt, Some(launcher), &plan(&[]), &fast()).expect("attach");
    assert!(ide.opened.borrow().is_empty());
}
