//! CLI integration via the JSON interface.

mod test_helpers;
use test_helpers::{ckpt_json, ckpt_json_in, ckpt_status_in, ckpt_stdout, demo, workspace_root};

const NOW: &str = "2024-01-01T14:00:00Z";

// ── reconcile ───────────────────────────────────────────────────

#[test]
fn reconcile_demo_batch() {
    let v = ckpt_json(&["reconcile", "demos/reports.json", "--json", "--now", NOW], 0);
    let groups = v["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);

    assert_eq!(groups[0]["city_name"], "القدس");
    assert_eq!(groups[0]["entry"]["status"], "سالك");
    assert_eq!(groups[0]["exit"]["status"], "سالك");

    let hawara = &groups[1];
    assert_eq!(hawara["checkpoint_name"], "حوارة");
    assert_eq!(hawara["entry"]["status"], "مغلق");
    assert_eq!(hawara["entry"]["color_band"], "red");
    assert_eq!(hawara["exit"]["status"], "أزمة");
    assert_eq!(hawara["exit"]["color_band"], "orange");

    let zaatara = &groups[2];
    assert_eq!(zaatara["entry"]["status"], "حاجز/تفتيش");
    assert!(zaatara.get("exit").is_none());

    assert_eq!(v["stats"]["received"], 6);
    assert_eq!(v["stats"]["accepted"], 5);
    assert_eq!(v["stats"]["dropped_unnamed"], 1);
    assert_eq!(v["stats"]["untimed"], 1);
    assert!(v["commit"].is_null());
}

#[test]
fn reconcile_table_output() {
    let out = ckpt_stdout(&["reconcile", "demos/clean.json", "--now", NOW]);
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("CITY"));
    assert!(lines[2].contains("مغلق [red] 13:00"));
    assert!(lines[2].contains("أزمة [orange] 11:00"));
}

#[test]
fn reconcile_with_drop_policy() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.json");
    std::fs::write(&policy, r#"{"unknown_direction": "drop"}"#).unwrap();

    let v = ckpt_json(
        &[
            "reconcile",
            "demos/reports.json",
            "--policy",
            policy.to_str().unwrap(),
            "--json",
        ],
        0,
    );
    assert_eq!(v["groups"].as_array().unwrap().len(), 2);
    assert_eq!(v["stats"]["dropped_unroutable"], 1);
}

#[test]
fn reconcile_rejects_bad_batch() {
    let (code, stderr) = ckpt_status_in(&workspace_root(), &["reconcile", "demos/bad.json"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid report batch"), "{stderr}");
}

// ── snapshot state ──────────────────────────────────────────────

#[test]
fn state_carries_over_between_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();

    let first = ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);
    assert_eq!(first["commit"]["cycle"], 1);
    assert_eq!(first["commit"]["written"], true);

    let again = ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);
    assert_eq!(again["commit"]["cycle"], 1);
    assert_eq!(again["commit"]["written"], false);

    let next = ckpt_json(&["reconcile", "demos/followup.json", "--state", state, "--json"], 0);
    assert_eq!(next["commit"]["cycle"], 2);
    let hawara = &next["groups"][0];
    assert_eq!(hawara["entry"]["status"], "سالك");
    assert_eq!(hawara["exit"]["status"], "أزمة", "older report must not replace retained exit");
    assert_eq!(next["stats"]["retained_slots"], 1);

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("state.json")).unwrap())
            .unwrap();
    assert_eq!(stored["cycle"], 2);
    assert!(stored["digest"].as_str().unwrap().starts_with("sha256:"));
    assert!(!dir.path().join("state.json.lock").exists());
}

#[test]
fn empty_batch_keeps_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();
    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "[]").unwrap();

    ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);
    let v = ckpt_json(
        &["reconcile", empty.to_str().unwrap(), "--state", state, "--json"],
        0,
    );
    assert_eq!(v["groups"][0]["entry"]["status"], "مغلق");
    assert_eq!(v["commit"]["written"], false);
}

#[test]
fn show_renders_cards() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();
    ckpt_json(&["reconcile", "demos/followup.json", "--state", state, "--json"], 0);

    let cards = ckpt_json(&["show", state, "--json", "--now", NOW], 0);
    let entry = &cards[0]["entry"];
    assert_eq!(entry["status"], "سالك");
    assert_eq!(entry["color"], "green");
    assert_eq!(entry["clock"], "15:00");
    assert_eq!(entry["ago"], "منذ ساعة");
}

#[test]
fn show_missing_state_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let (code, stderr) = ckpt_status_in(&workspace_root(), &["show", missing.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no snapshot"), "{stderr}");
}

#[test]
fn lookup_answers_question() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();
    ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);
    ckpt_json(&["reconcile", "demos/followup.json", "--state", state, "--json"], 0);

    let out = ckpt_stdout(&["lookup", state, "شو وضع حاجز حوارة؟", "--now", NOW]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec!["حاجز حوارة سالك للدخول منذ ساعة", "حاجز حوارة أزمة للخروج منذ 5 ساعات"]
    );

    let (code, _) = ckpt_status_in(&workspace_root(), &["lookup", state, "قلنديا"]);
    assert_eq!(code, 1);
}

fn demo_state(dir: &std::path::Path) -> String {
    let state = dir.join("state.json");
    let state = state.to_str().unwrap().to_string();
    ckpt_json(&["reconcile", "demos/reports.json", "--state", state.as_str(), "--json"], 0);
    state
}

fn names(v: &serde_json::Value) -> Vec<&str> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|g| g["checkpoint_name"].as_str().unwrap())
        .collect()
}

#[test]
fn lookup_filters_by_fields() {
    let dir = tempfile::tempdir().unwrap();
    let state = demo_state(dir.path());
    let state = state.as_str();

    let closed = ckpt_json(&["lookup", state, "--status", "مغلق", "--json"], 0);
    assert_eq!(names(&closed), vec!["حوارة"]);

    let nablus = ckpt_json(&["lookup", state, "--city", "نابلس", "--json"], 0);
    assert_eq!(names(&nablus), vec!["حوارة", "زعترة"]);

    let (code, stderr) = ckpt_status_in(
        &workspace_root(),
        &["lookup", state, "--status", "مغلق", "--direction", "خروج"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("no checkpoint matches"), "{stderr}");

    let (code, stderr) = ckpt_status_in(&workspace_root(), &["lookup", state, "--direction", "شمال"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unrecognized direction"), "{stderr}");
}

#[test]
fn lookup_age_window_and_top() {
    let dir = tempfile::tempdir().unwrap();
    let state = demo_state(dir.path());
    let state = state.as_str();

    let recent = ckpt_json(&["lookup", state, "--ago", "200", "--now", NOW, "--json"], 0);
    assert_eq!(names(&recent), vec!["حوارة"]);

    let wider = ckpt_json(&["lookup", state, "--ago", "300", "--now", NOW, "--json"], 0);
    assert_eq!(names(&wider), vec!["حوارة", "قلنديا"]);

    let first = ckpt_json(&["lookup", state, "--top", "1", "--json"], 0);
    assert_eq!(names(&first), vec!["حوارة"]);

    let (code, _) = ckpt_status_in(&workspace_root(), &["lookup", state, "--top", "0"]);
    assert_eq!(code, 2);
}

#[test]
fn lookup_near_position() {
    let dir = tempfile::tempdir().unwrap();
    let state = demo_state(dir.path());
    let state = state.as_str();
    let catalog = demo("locations.json");
    let catalog = catalog.as_str();

    let hits = ckpt_json(
        &["lookup", state, "--near", "32.150,35.255", "--catalog", catalog, "--json"],
        0,
    );
    assert_eq!(names(&hits), vec!["حوارة", "زعترة"]);
    assert_eq!(hits[0]["distance_km"], 0.38);
    assert_eq!(hits[0]["entry"]["status"], "مغلق");
    assert_eq!(hits[1]["entry"]["status"], "حاجز/تفتيش");

    let nearest = ckpt_json(
        &["lookup", state, "--near", "31.87,35.22", "--closest", "--catalog", catalog, "--json"],
        0,
    );
    assert_eq!(nearest["checkpoint_name"], "قلنديا");
    assert_eq!(nearest["distance_km"], 0.77);
    assert_eq!(nearest["exit"]["status"], "سالك");

    let (code, stderr) =
        ckpt_status_in(&workspace_root(), &["lookup", state, "--near", "31.87,35.22", "--closest"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no checkpoint in the catalog has coordinates"), "{stderr}");

    let (code, stderr) = ckpt_status_in(
        &workspace_root(),
        &["lookup", state, "--near", "31.87,35.22", "--status", "مغلق"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("cannot be combined"), "{stderr}");
}

#[test]
fn prune_removes_stale_slots() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();
    ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);

    let removed = ckpt_json(
        &["prune", state, "--max-age-hours", "4", "--now", NOW, "--json"],
        0,
    );
    let removed = removed.as_array().unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0]["slot"], "exit");

    let cards = ckpt_json(&["show", state, "--json", "--now", NOW], 0);
    assert!(cards[0].get("exit").is_none());
    assert_eq!(cards[0]["entry"]["status"], "مغلق");
}

#[test]
fn prune_with_enormous_age_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    let state = state.to_str().unwrap();
    ckpt_json(&["reconcile", "demos/clean.json", "--state", state, "--json"], 0);

    let removed = ckpt_json(
        &["prune", state, "--max-age-hours", "3000000000", "--now", NOW, "--json"],
        0,
    );
    assert!(removed.as_array().unwrap().is_empty());

    let (code, stderr) = ckpt_status_in(
        &workspace_root(),
        &["prune", state, "--max-age-hours", "18446744073709551615"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("out of range"), "{stderr}");
}

#[test]
fn stale_after_hours_prunes_during_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.json");
    std::fs::write(&policy, r#"{"stale_after_hours": 4}"#).unwrap();

    let v = ckpt_json(
        &[
            "reconcile",
            "demos/clean.json",
            "--policy",
            policy.to_str().unwrap(),
            "--now",
            NOW,
            "--json",
        ],
        0,
    );
    assert_eq!(v["pruned"], 1);
    assert!(v["groups"][0].get("exit").is_none());
}

// ── parse ───────────────────────────────────────────────────────

#[test]
fn parse_messages_then_reconcile() {
    let reports = ckpt_json(&["parse", "demos/messages.json"], 0);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0]["checkpoint_name"], "حوارة");
    assert_eq!(reports[0]["city_name"], "نابلس");
    assert_eq!(reports[0]["status"], "إغلاق");
    assert_eq!(reports[0]["direction"], "دخول");
    assert_eq!(reports[2]["direction"], "غير محدد");

    let dir = tempfile::tempdir().unwrap();
    let batch = dir.path().join("batch.json");
    std::fs::write(&batch, serde_json::to_string(reports).unwrap()).unwrap();

    let v = ckpt_json(&["reconcile", batch.to_str().unwrap(), "--json"], 0);
    let groups = v["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 3);
    let hawara = groups
        .iter()
        .find(|g| g["checkpoint_name"] == "حوارة")
        .unwrap();
    assert_eq!(hawara["entry"]["color_band"], "red");
    assert!(hawara.get("exit").is_none());
}

#[test]
fn parse_with_custom_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = dir.path().join("catalog.json");
    std::fs::write(&catalog, r#"{"قلنديا": "رام الله"}"#).unwrap();
    let messages = demo("messages.json");
    let reports = ckpt_json(
        &["parse", messages.as_str(), "--catalog", catalog.to_str().unwrap()],
        0,
    );
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["city_name"], "رام الله");
}

// ── check ───────────────────────────────────────────────────────

#[test]
fn check_clean_batch_passes_strict() {
    let v = ckpt_json(&["check", "demos/clean.json", "--strict", "--json"], 0);
    assert_eq!(v["pass"], true);
    assert_eq!(v["reports"], 2);
}

#[test]
fn check_demo_batch_warns() {
    let v = ckpt_json(&["check", "demos/reports.json", "--json"], 0);
    assert_eq!(v["pass"], true);
    let codes: Vec<&str> = v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["W001", "W003", "W004"]);

    let strict = ckpt_json(&["check", "demos/reports.json", "--strict", "--json"], 1);
    assert_eq!(strict["pass"], false);
}

#[test]
fn check_non_array_fails() {
    let v = ckpt_json(&["check", "demos/bad.json", "--json"], 1);
    assert_eq!(v["errors"][0]["code"], "E002");
}

// ── policy / init ───────────────────────────────────────────────

#[test]
fn policy_prints_defaults() {
    let v = ckpt_json(&["policy"], 0);
    assert_eq!(v["unknown_direction"], "fill_empty_slot");
    assert_eq!(v["display_offset_minutes"], 120);
    assert_eq!(v["color_rules"][0]["band"], "red");
}

#[test]
fn init_writes_workspace_policy_once() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _) = ckpt_status_in(dir.path(), &["init"]);
    assert_eq!(code, 0);
    assert!(dir.path().join(".checkpoint/policy.json").exists());

    let (code, stderr) = ckpt_status_in(dir.path(), &["init"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already exists"), "{stderr}");

    std::fs::write(
        dir.path().join(".checkpoint/policy.json"),
        r#"{"display_offset_minutes": 180}"#,
    )
    .unwrap();
    let v = ckpt_json_in(dir.path(), &["policy"], 0);
    assert_eq!(v["display_offset_minutes"], 180);
}

#[test]
fn invalid_workspace_policy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".checkpoint")).unwrap();
    std::fs::write(
        dir.path().join(".checkpoint/policy.json"),
        r#"{"direction_aliases": {"entry": ["x"], "exit": ["x"], "both": []}}"#,
    )
    .unwrap();
    let (code, stderr) = ckpt_status_in(dir.path(), &["policy"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("rejected policy"), "{stderr}");
}
