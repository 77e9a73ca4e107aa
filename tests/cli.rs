use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn cli_summary_reports_pinch_and_session_transitions() {
    let mut cmd = Command::cargo_bin("xr-widgets").expect("binary exists");
    cmd.arg("--summary-only").arg("--frames").arg("240");
    cmd.assert()
        .success()
        .stdout(contains(
            "Widgets ready: hand model, pinch pointer, ar button [START AR]",
        ))
        .stdout(contains("Simulating 240 frames of hand tracking"))
        .stdout(contains("pinch engaged at frame"))
        .stdout(contains("pinch released at frame"))
        .stdout(contains("ar button pressed; label is now STOP AR"))
        .stdout(contains("ar button pressed; label is now START AR"))
        .stdout(contains("Final widget states:"))
        .stdout(contains(" - hand visible=true joints=4"))
        .stdout(contains("cursor=0.88"))
        .stdout(contains(" - ar button label=START AR active=false overlay=false"));
}

#[test]
fn cli_exports_the_pointer_mesh_as_obj() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("pointer.obj");
    let mut cmd = Command::cargo_bin("xr-widgets").expect("binary exists");
    cmd.arg("--export-obj").arg(&path);
    cmd.assert()
        .success()
        .stdout(contains("Exported pointer mesh to"))
        .stdout(contains("210 vertices, 416 triangles"));

    let contents = std::fs::read_to_string(&path).expect("obj file");
    let vertices = contents.lines().filter(|line| line.starts_with("v ")).count();
    let faces = contents.lines().filter(|line| line.starts_with("f ")).count();
    assert_eq!(vertices, 210);
    assert_eq!(faces, 416);
}

#[test]
fn cli_rejects_unknown_arguments() {
    let mut cmd = Command::cargo_bin("xr-widgets").expect("binary exists");
    cmd.arg("--bogus");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));
}
