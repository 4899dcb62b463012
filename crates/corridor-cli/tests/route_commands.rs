use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use rusqlite::Connection;
use tempfile::{tempdir, TempDir};

fn fixture_sql() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../docs/fixtures/campus.sql")
        .canonicalize()
        .expect("fixture sql present")
}

fn prepare_db() -> (PathBuf, TempDir) {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("campus.db");
    let sql = fs::read_to_string(fixture_sql()).expect("read fixture sql");
    let connection = Connection::open(&path).expect("create fixture db");
    connection.execute_batch(&sql).expect("apply fixture sql");
    (path, temp_dir)
}

fn prepare_command() -> (Command, TempDir) {
    let (path, temp_dir) = prepare_db();
    let mut cmd = cargo_bin_cmd!("corridor-cli");
    cmd.env("RUST_LOG", "error").env_remove("CORRIDOR_DB").arg("--db").arg(path);
    (cmd, temp_dir)
}

#[test]
fn route_between_rooms_prints_summary() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args([
        "route",
        "--from",
        "Art Studio",
        "--to",
        "Chemistry Lab",
        "--at",
        "10:00",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Route from Art Studio to Chemistry Lab (strategy: graph):",
        ))
        .stdout(predicate::str::contains("Time: 0 minutes 26 seconds"))
        .stdout(predicate::str::contains("Arrival: 10:00"))
        .stdout(predicate::str::contains("Distance: 29.0 m"))
        .stdout(predicate::str::contains(
            "Path: Node 2 -> Stairwell A Ground -> Stairwell A First",
        ))
        .stdout(predicate::str::contains("Floor 0: 5 points, 1 break"))
        .stdout(predicate::str::contains("Floor 1: 4 points, 0 breaks"));
}

#[test]
fn congestion_window_applies_at_departure_time() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["route", "--from", "1", "--to", "3", "--at", "10:31"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Time: 0 minutes 25 seconds"));

    let (mut cmd, _temp) = prepare_command();
    cmd.args([
        "route",
        "--from",
        "1",
        "--to",
        "3",
        "--at",
        "10:31",
        "--no-congestion",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Time: 0 minutes 14 seconds"));
}

#[test]
fn step_free_route_uses_lift() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args([
        "route",
        "--from",
        "Main Entrance",
        "--to",
        "Science Corridor",
        "--step-free",
        "--at",
        "09:00",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Lift Lobby Ground -> Lift Lobby First"))
        .stdout(predicate::str::contains("Stairwell A First").not())
        .stdout(predicate::str::contains("Distance: 44.0 m"));
}

#[test]
fn ignore_one_way_shortens_route() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args([
        "route",
        "--from",
        "Lift Lobby Ground",
        "--to",
        "Library",
        "--ignore-one-way",
        "--at",
        "09:00",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Path: Lift Lobby Ground -> Library Corner"));
}

#[test]
fn json_output_includes_route_and_arrival() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args([
        "--format",
        "json",
        "route",
        "--from",
        "Art Studio",
        "--to",
        "Music Room",
        "--at",
        "12:00:30",
    ]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["strategy"], "direct");
    assert_eq!(json["distance_metres"], 3.0);
    assert_eq!(json["departure"], "12:00:30");
    assert_eq!(json["arrival"], "12:00");
    assert_eq!(json["polylines"]["ground"]["points"][1]["y"], 0.0);
}

#[test]
fn same_start_and_target_is_not_an_error() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["route", "--from", "G1", "--to", "reception"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("same location"));
}

#[test]
fn unreachable_target_fails() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["route", "--from", "Reception", "--to", "Bike Shed", "--at", "09:00"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no route reaches Bike Shed"));
}

#[test]
fn resolve_prints_location() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["resolve", "g3"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Art Studio (G3)"))
        .stdout(predicate::str::contains("kind: room on corridor"))
        .stdout(predicate::str::contains("coordinates: (4.000, -2.000)"));
}

#[test]
fn resolve_suggests_close_names() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["resolve", "Libary"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("location not found: Libary"))
        .stderr(predicate::str::contains("Did you mean"));
}

#[test]
fn ambiguous_query_is_reported() {
    let (mut cmd, _temp) = prepare_command();
    cmd.args(["resolve", "Lab"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("too vague"));
}

#[test]
fn database_path_can_come_from_environment() {
    let (path, _temp) = prepare_db();
    let mut cmd = cargo_bin_cmd!("corridor-cli");
    cmd.env("RUST_LOG", "error")
        .env("CORRIDOR_DB", &path)
        .args(["--format", "json", "resolve", "Car Park"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["kind"], "node");
    assert_eq!(json["anchor"]["node"], 10);
}

#[test]
fn missing_database_is_reported() {
    let mut cmd = cargo_bin_cmd!("corridor-cli");
    cmd.env("RUST_LOG", "error")
        .env_remove("CORRIDOR_DB")
        .args(["--db", "/nonexistent/campus.db", "resolve", "G1"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("graph store not found"));
}
