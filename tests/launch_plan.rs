mod common;

use rockerc::plan::{prepare_launch_plan, LaunchRequest};
use rockerc::render::ExtraArgs;

use common::{config, MockRuntime};

fn request() -> LaunchRequest {
    LaunchRequest::new(
        config(&[("image", "ubuntu:22.04"), ("args", "[x11, user]")]),
        "proj",
        "/src/proj",
    )
}

#[test]
fn test_new_container_gets_name_detach_marker_and_mount() {
    let rt = MockRuntime::new();
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.created);
    assert_eq!(plan.rocker_cmd[0], "rocker");
    let cmd = plan.rocker_cmd.join(" ");
    assert!(cmd.contains("--x11 --user"), "{cmd}");
    assert!(cmd.contains("--detach"), "{cmd}");
    assert!(cmd.contains("--name proj --image-name proj"), "{cmd}");
    assert!(cmd.contains("--env ROCKERC_EXTENSIONS=user,x11"), "{cmd}");
    assert!(cmd.contains("--volume /src/proj:/workspaces/proj:Z"), "{cmd}");
    assert!(cmd.ends_with("-- ubuntu:22.04 tail -f /dev/null"), "{cmd}");
    assert_eq!(plan.mount_target.as_deref(), Some("/workspaces/proj"));
    assert_eq!(plan.container_hex, hex::encode("proj"));
    assert!(rt.calls().is_empty(), "no mutations expected: {:?}", rt.calls());
}

#[test]
fn test_supplied_name_and_detach_are_not_duplicated() {
    let rt = MockRuntime::new();
    let req = request().extra(ExtraArgs::parse("-d --name=custom"));
    let plan = prepare_launch_plan(&rt, &req);
    let cmd = plan.rocker_cmd.join(" ");
    assert_eq!(cmd.matches("--name").count(), 1, "{cmd}");
    assert!(!cmd.contains("--detach"), "{cmd}");
    assert!(cmd.contains("--image-name proj"), "{cmd}");
}

#[test]
fn test_configured_name_and_detach_are_not_duplicated() {
    let rt = MockRuntime::new();
    let cfg = config(&[
        ("image", "ubuntu:22.04"),
        ("detach", "true"),
        ("name", "proj"),
        ("image-name", "proj-img"),
    ]);
    let plan = prepare_launch_plan(&rt, &LaunchRequest::new(cfg, "proj", "/src/proj"));
    let cmd = plan.rocker_cmd.join(" ");
    assert_eq!(cmd.matches("--detach").count(), 1, "{cmd}");
    assert_eq!(cmd.matches("--name ").count(), 1, "{cmd}");
    assert_eq!(cmd.matches("--image-name").count(), 1, "{cmd}");
    assert!(cmd.contains("--image-name proj-img"), "{cmd}");
    assert!(cmd.ends_with("-- ubuntu:22.04 tail -f /dev/null"), "{cmd}");
}

#[test]
fn test_configured_volume_with_workspace_target_wins() {
    let rt = MockRuntime::new();
    let cfg = config(&[
        ("image", "ubuntu:22.04"),
        ("volume", "[\"/elsewhere:/workspaces/proj\"]"),
    ]);
    let plan = prepare_launch_plan(&rt, &LaunchRequest::new(cfg, "proj", "/src/proj"));
    let cmd = plan.rocker_cmd.join(" ");
    assert!(cmd.contains("--volume /elsewhere:/workspaces/proj"), "{cmd}");
    assert!(!cmd.contains("/src/proj:"), "{cmd}");
}

#[test]
fn test_running_container_with_same_extensions_is_reused() {
    let rt = MockRuntime::existing(true, Some(&["user", "x11"]));
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.rocker_cmd.is_empty());
    assert!(!plan.created);
    assert!(rt.calls().is_empty(), "{:?}", rt.calls());
}

#[test]
fn test_stopped_container_is_started() {
    let rt = MockRuntime::existing(false, Some(&["x11", "user"]));
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.reuses_container());
    assert_eq!(rt.calls(), vec!["start proj".to_string()]);
}

#[test]
fn test_start_failure_recreates() {
    let rt = MockRuntime::existing(false, Some(&["x11", "user"])).with_start_failure();
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.created);
    assert_eq!(
        rt.calls(),
        vec![
            "start proj".to_string(),
            "stop proj".to_string(),
            "remove proj".to_string()
        ]
    );
}

#[test]
fn test_changed_extensions_rebuild() {
    let rt = MockRuntime::existing(true, Some(&["x11"]));
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.created);
    assert_eq!(
        rt.calls(),
        vec!["stop proj".to_string(), "remove proj".to_string()]
    );
}

#[test]
fn test_missing_marker_counts_as_changed() {
    let rt = MockRuntime::existing(true, None);
    let plan = prepare_launch_plan(&rt, &request());
    assert!(plan.created);
}

#[test]
fn test_force_stops_and_removes_before_launch() {
    let rt = MockRuntime::existing(true, Some(&["user", "x11"]));
    let plan = prepare_launch_plan(&rt, &request().force(true));
    assert!(plan.created);
    assert_eq!(
        rt.calls(),
        vec!["stop proj".to_string(), "remove proj".to_string()]
    );
}

#[test]
fn test_extra_volume_is_mounted_at_its_target() {
    let rt = MockRuntime::new();
    let req = request().extra_volume("/home/u/renv/o/r", "/home/u/renv/o/r");
    let plan = prepare_launch_plan(&rt, &req);
    let cmd = plan.rocker_cmd.join(" ");
    assert!(
        cmd.contains("--volume /home/u/renv/o/r:/home/u/renv/o/r:Z"),
        "{cmd}"
    );
}
