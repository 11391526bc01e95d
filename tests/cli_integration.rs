use std::io::Write;
use std::process::{Command, Output};

const COMPOUND: &str = "q=p1+AND+p2+OR+NOT+p3\
    &filter[p1][name]=value&filter[p1][condition]=eq&filter[p1][value]=5\
    &filter[p2][name]=value&filter[p2][condition]=eq&filter[p2][value]=2\
    &filter[p3][name]=value&filter[p3][condition]=eq&filter[p3][value]=4";

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn run_qfilter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qfilter"))
        .args(args)
        .env_remove("QFILTER_CONFIG")
        .output()
        .expect("run qfilter")
}

fn stdout(output: &Output) -> String {
    if !output.status.success() {
        panic!("qfilter failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn parse_prints_canonical_string() {
    let output = run_qfilter(&["parse", COMPOUND]);
    assert_eq!(
        stdout(&output),
        "(([value eq '5'] && [value eq '2']) || ![value eq '4'])"
    );
}

#[test]
fn parse_without_filter_is_identity() {
    let output = run_qfilter(&["parse", "page[size]=10"]);
    assert_eq!(stdout(&output), "TRUE");
}

#[test]
fn parse_prints_json_tree() {
    let output = run_qfilter(&["parse", "--format", "json", COMPOUND]);
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["or"][0]["and"][1]["value"], "2");
    assert_eq!(value["or"][1]["not"]["condition"], "eq");
}

#[test]
fn parse_rejects_bad_syntax() {
    let output = run_qfilter(&["parse", "q=AND+p2&filter[p2][name]=a&filter[p2][condition]=eq&filter[p2][value]=1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("syntax error"), "stderr: {stderr}");
}

#[test]
fn parse_applies_config_rules() {
    let config = write_temp(
        ".yaml",
        "transform:\n  strict: true\n  fields:\n    value:\n      column: t.value\n      conditions: [eq]\n",
    );
    let path = config.path().to_str().unwrap();

    let output = run_qfilter(&["parse", "--config", path, COMPOUND]);
    assert_eq!(
        stdout(&output),
        "(([t.value eq '5'] && [t.value eq '2']) || ![t.value eq '4'])"
    );

    let output = run_qfilter(&[
        "parse",
        "--config",
        path,
        "q=p1&filter[p1][name]=other&filter[p1][condition]=eq&filter[p1][value]=1",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown filter name"));
}

#[test]
fn parse_strict_flag_without_rules_rejects_everything() {
    let output = run_qfilter(&["parse", "--strict", COMPOUND]);
    assert!(!output.status.success());
}

#[test]
fn parse_evaluates_record() {
    let record = write_temp(".json", r#"{"value": 4, "other": "x"}"#);
    let path = record.path().to_str().unwrap();

    // (value == 5 && value == 2) || !(value == 4)  ->  false for value 4
    let output = run_qfilter(&["parse", "--record", path, COMPOUND]);
    assert_eq!(stdout(&output), "false");

    let output = run_qfilter(&[
        "parse",
        "--record",
        path,
        "q=p1&filter[p1][name]=value&filter[p1][condition]=gte&filter[p1][value]=3.5",
    ]);
    assert_eq!(stdout(&output), "true");
}

#[test]
fn encode_then_parse_round_trips() {
    let expr = write_temp(
        ".yaml",
        "any:\n  - all:\n      - { name: age, condition: gte, value: 18 }\n      - not: { name: city, condition: starts_with, value: Ber }\n  - { name: vip, condition: eq, value: true }\n",
    );

    let output = run_qfilter(&["encode", "--expr", expr.path().to_str().unwrap()]);
    let query = stdout(&output);
    assert!(query.contains("q=p1+AND+NOT+p2+OR+p3"), "query: {query}");

    let output = run_qfilter(&["parse", &query]);
    assert_eq!(
        stdout(&output),
        "(([age gte '18'] && ![city starts_with 'Ber']) || [vip eq 'true'])"
    );
}

#[test]
fn encode_lists_params() {
    let expr = write_temp(".json", r#"{"name": "age", "condition": "lt", "value": 30}"#);
    let output = run_qfilter(&["encode", "--params", "--expr", expr.path().to_str().unwrap()]);
    assert_eq!(
        stdout(&output),
        "filter[p1][condition]=lt\nfilter[p1][name]=age\nfilter[p1][value]=30\nq=p1"
    );
}
