mod support;

use predicates::str::contains;
use serde_json::Value;

use support::{taskflow_cmd, TestStore};

#[test]
fn taskflow_help_works() {
    taskflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("live task lists"));
}

#[test]
fn subcommand_help_works() {
    for cmd in ["ui", "add", "list", "toggle", "rm", "stats", "init"] {
        taskflow_cmd().arg(cmd).arg("--help").assert().success();
    }
}

#[test]
fn add_then_list_newest_first() {
    let store = TestStore::new();
    let first = store.add("Buy milk");
    let second = store.add("Pay rent");

    let data = store.json(&["list"]);
    assert_eq!(data["total"], 2);
    let ids: Vec<&str> = data["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .filter_map(|task| task["id"].as_str())
        .collect();
    assert_eq!(ids, [second.as_str(), first.as_str()]);
    assert_eq!(data["tasks"][0]["priority"], "medium");
    assert_eq!(data["tasks"][0]["completed"], false);
}

#[test]
fn add_with_options_round_trips_through_the_store() {
    let store = TestStore::new();
    let data = store.json(&[
        "add",
        "  File taxes ",
        "--category",
        "admin",
        "--due",
        "2027-04-15",
        "--priority",
        "high",
    ]);
    assert_eq!(data["task"]["text"], "File taxes");
    assert_eq!(data["task"]["category"], "admin");
    assert_eq!(data["task"]["due_date"], "2027-04-15");
    assert_eq!(data["task"]["priority"], "high");
}

#[test]
fn empty_task_is_a_user_error() {
    let store = TestStore::new();
    store
        .cmd()
        .args(["add", "   "])
        .assert()
        .code(2)
        .stderr(contains("Task cannot be empty"));

    let data = store.json(&["list"]);
    assert_eq!(data["total"], 0);
}

#[test]
fn toggle_filter_and_stats() {
    let store = TestStore::new();
    let done = store.add("Walk dog");
    store.add("Water plants");

    let toggled = store.json(&["toggle", done.as_str()]);
    assert_eq!(toggled["completed"], true);

    let completed = store.json(&["list", "--filter", "completed"]);
    assert_eq!(completed["total"], 1);
    assert_eq!(completed["tasks"][0]["id"], done.as_str());
    assert_eq!(completed["counts"]["all"], 2);

    let stats = store.json(&["stats"]);
    assert_eq!(stats["all"], 2);
    assert_eq!(stats["active"], 1);
    assert_eq!(stats["completed"], 1);
}

#[test]
fn search_is_prefix_and_case_sensitive() {
    let store = TestStore::new();
    store.add("Apple");
    store.add("apricot");
    store.add("Banana");

    let data = store.json(&["list", "--search", "Ap"]);
    assert_eq!(data["search"], "Ap");
    let texts: Vec<&str> = data["tasks"]
        .as_array()
        .expect("tasks")
        .iter()
        .filter_map(|task| task["text"].as_str())
        .collect();
    assert_eq!(texts, ["Apple"]);
}

#[test]
fn rm_deletes_and_unknown_ids_are_not_found() {
    let store = TestStore::new();
    let id = store.add("Temporary");

    let removed = store.json(&["rm", id.as_str()]);
    assert_eq!(removed["id"], id.as_str());
    assert_eq!(store.json(&["list"])["total"], 0);

    store
        .cmd()
        .args(["toggle", id.as_str()])
        .assert()
        .code(3)
        .stderr(contains("Task not found"));
}

#[test]
fn json_errors_use_the_envelope() {
    let store = TestStore::new();
    let output = store
        .cmd()
        .args(["--json", "rm", "missing"])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("json error");
    assert_eq!(value["schema_version"], "taskflow.v1");
    assert_eq!(value["command"], "rm");
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["kind"], "not_found");
    assert_eq!(value["error"]["details"]["id"], "missing");
}

#[test]
fn invalid_filter_and_config_are_user_errors() {
    let store = TestStore::new();
    store
        .cmd()
        .args(["list", "--filter", "someday"])
        .assert()
        .code(2);

    std::fs::write(store.path().join("bad.toml"), "[ui]\npoll_ms = 0\n").expect("write");
    store
        .cmd()
        .args(["--config", "bad.toml", "list"])
        .assert()
        .code(2)
        .stderr(contains("ui.poll_ms"));
}

#[test]
fn init_writes_a_loadable_config_once() {
    let store = TestStore::new();
    let data = store.json(&["init"]);
    assert_eq!(data["created"], true);
    let path = store.path().join(".taskflow.toml");
    assert!(path.exists());

    store.add("After init");
    assert_eq!(store.json(&["list"])["total"], 1);

    let again = store.json(&["init"]);
    assert_eq!(again["created"], false);
}

#[test]
fn memory_backend_is_refused_by_scripting_commands() {
    let store = TestStore::new();
    std::fs::write(
        store.path().join(".taskflow.toml"),
        "[store]\nbackend = \"memory\"\n",
    )
    .expect("write");
    store
        .cmd()
        .arg("list")
        .assert()
        .code(2)
        .stderr(contains("store.backend"));
}
