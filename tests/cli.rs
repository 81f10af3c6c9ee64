use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn scene_file(xml: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp scene");
    tmp.write_all(xml.as_bytes()).expect("write scene");
    tmp
}

fn frame_driver() -> Command {
    Command::cargo_bin("frame-driver").expect("binary exists")
}

#[test]
fn list_prints_every_lesson() {
    frame_driver()
        .arg("--list")
        .assert()
        .success()
        .stdout(contains("basic-scene"))
        .stdout(contains("animation-tween"))
        .stdout(contains("donuts"));
}

#[test]
fn static_lesson_draws_a_single_frame() {
    frame_driver()
        .args(["basic-scene", "--headless"])
        .assert()
        .success()
        .stdout(contains("Loaded lesson basic-scene with 1 objects"))
        .stdout(contains("Ran 1 frame(s)"))
        .stdout(contains("Final object states:"))
        .stdout(contains(" - Cube pos=(0.00, 0.00, 0.00)"));
}

#[test]
fn clock_lesson_rotates_half_a_turn_per_second() {
    frame_driver()
        .args(["animation-clock", "--headless", "--frames", "60"])
        .assert()
        .success()
        .stdout(contains("Ran 60 frame(s) (elapsed 1.00s)"))
        .stdout(contains("rot=(0.00, 3.14, 0.00)"));
}

#[test]
fn scene_files_load_and_run() {
    let scene = scene_file(
        r#"<scene>
  <geometry>
    <id>cube</id>
    <type>box</type>
  </geometry>
  <object>
    <name>Crate</name>
    <geometry>cube</geometry>
    <position>1 2 3</position>
  </object>
</scene>
"#,
    );
    frame_driver()
        .arg("--headless")
        .arg("--scene")
        .arg(scene.path())
        .assert()
        .success()
        .stdout(contains("with 1 objects"))
        .stdout(contains(" - Crate pos=(1.00, 2.00, 3.00)"));
}

#[test]
fn partial_triangles_are_rejected() {
    let scene = scene_file(
        "<scene><geometry><id>t</id><type>triangles</type><positions>0 0 0 1 1 1</positions></geometry></scene>",
    );
    frame_driver()
        .arg("--headless")
        .arg("--scene")
        .arg(scene.path())
        .assert()
        .failure()
        .stderr(contains("multiple of 9"));
}

#[test]
fn unknown_lesson_fails() {
    frame_driver()
        .args(["no-such-lesson", "--headless"])
        .assert()
        .failure()
        .stderr(contains("basic-scene"));
}

#[test]
fn unknown_flag_prints_usage() {
    frame_driver()
        .args(["basic-scene", "--bogus"])
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));
}
