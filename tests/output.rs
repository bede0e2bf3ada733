use serde_json::{json, Value};
use taskflow::error::Error;
use taskflow::output::{
    format_human, infer_command_name, render_error_json, render_success_json, HumanOutput,
};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn format_human_includes_sections() {
    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Filter", "Active");
    human.push_detail("[ ][medium] 01J0 Buy milk");
    human.push_warning("skipped 1 unreadable task");
    human.push_next_step("taskflow add \"<task>\"");

    let rendered = format_human(&human);
    assert!(rendered.contains("Tasks"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- Filter: Active"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- [ ][medium] 01J0 Buy milk"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("Next steps:"));
}

#[test]
fn format_human_omits_empty_sections() {
    let human = HumanOutput::new("Deleted task 01J0");
    assert_eq!(format_human(&human), "Deleted task 01J0");
}

#[test]
fn success_envelope_wraps_data() {
    let rendered = render_success_json("stats", &json!({"all": 3}), None).expect("render");
    let value: Value = serde_json::from_str(&rendered).expect("json");
    assert_eq!(value["schema_version"], "taskflow.v1");
    assert_eq!(value["command"], "stats");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["all"], 3);
    assert!(value.get("warnings").is_none());
}

#[test]
fn error_envelope_carries_code_and_hint() {
    let err = Error::NotFound("01J0".to_string());
    let rendered = render_error_json("toggle", &err).expect("render");
    let value: Value = serde_json::from_str(&rendered).expect("json");
    assert_eq!(value["status"], "error");
    assert_eq!(value["error"]["code"], 3);
    assert_eq!(value["error"]["message"], "Task not found: 01J0");
    assert_eq!(value["next_steps"][0], "taskflow list");
}

#[test]
fn command_name_skips_global_options() {
    assert_eq!(infer_command_name(args(&["--json", "list"])), "list");
    assert_eq!(
        infer_command_name(args(&["--store-dir", "/tmp/data", "add", "x"])),
        "add"
    );
    assert_eq!(infer_command_name(args(&["--config", "a.toml"])), "taskflow");
    assert_eq!(infer_command_name(args(&[])), "taskflow");
}
