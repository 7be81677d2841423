use anyhow::{bail, Context, Result};
use jsonschema::Validator;
use serde_json::Value;

use crate::errors::{CheckIssue, CheckReport};
use crate::policy::ReconcilePolicy;
use crate::report::RawReport;
use crate::types::{ColorBand, Direction};

const SCHEMA_BATCH: &str = include_str!("../schema/report-batch.schema.json");

/// Compile the embedded report-batch schema.
pub fn validator() -> Result<Validator> {
    let schema: Value =
        serde_json::from_str(SCHEMA_BATCH).context("embedded schema is invalid JSON")?;
    Validator::new(&schema).map_err(|e| anyhow::anyhow!("schema compilation failed: {e}"))
}

/// Validate a report batch against the schema.
pub fn validate(data: &Value) -> Result<()> {
    let v = validator()?;
    if v.is_valid(data) {
        return Ok(());
    }
    let msgs: Vec<String> = v
        .iter_errors(data)
        .map(|error| {
            let path = error.instance_path.to_string();
            let loc = if path.is_empty() { "(root)".into() } else { path };
            format!("  {loc}: {error}")
        })
        .collect();
    bail!("validation failed:\n{}", msgs.join("\n"));
}

/// Full lint of a report batch (for `ckpt check`).
///
/// Errors mean the batch cannot be read at all. Warnings flag reports the
/// reconciler will drop or can only partially use.
pub fn check(data: &Value, file: &str, strict: bool, policy: &ReconcilePolicy) -> CheckReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(items) = data.as_array() else {
        errors.push(CheckIssue::new(
            "E002",
            "shape",
            "report batch must be a JSON array".into(),
            Some("$(root)".into()),
        ));
        return CheckReport {
            file: file.to_string(),
            reports: 0,
            pass: false,
            errors,
            warnings,
        };
    };

    if let Ok(v) = validator() {
        for error in v.iter_errors(data) {
            let path = error.instance_path.to_string();
            errors.push(CheckIssue::new(
                "E001",
                "schema",
                error.to_string(),
                Some(if path.is_empty() {
                    "$(root)".to_string()
                } else {
                    format!("${path}")
                }),
            ));
        }
    }

    for (i, item) in items.iter().enumerate() {
        let path = Some(format!("$[{i}]"));
        let report: RawReport = match serde_json::from_value(item.clone()) {
            Ok(r) => r,
            Err(e) => {
                errors.push(CheckIssue::new(
                    "E003",
                    "report",
                    format!("unreadable report: {e}"),
                    path,
                ));
                continue;
            }
        };
        lint_report(&report, path, policy, &mut warnings);
    }

    let pass = errors.is_empty() && (!strict || warnings.is_empty());
    CheckReport {
        file: file.to_string(),
        reports: items.len(),
        pass,
        errors,
        warnings,
    }
}

fn lint_report(
    report: &RawReport,
    path: Option<String>,
    policy: &ReconcilePolicy,
    warnings: &mut Vec<CheckIssue>,
) {
    if policy.is_placeholder(&report.checkpoint_name) || policy.is_placeholder(&report.city_name)
    {
        warnings.push(CheckIssue::new(
            "W001",
            "name",
            "missing or placeholder city/checkpoint name; report will be dropped".into(),
            path,
        ));
        return;
    }

    if policy.is_placeholder(&report.status) {
        warnings.push(CheckIssue::new(
            "W006",
            "status",
            "missing or placeholder status; report will be dropped".into(),
            path,
        ));
        return;
    }

    match &report.reported_at {
        None => warnings.push(CheckIssue::new(
            "W003",
            "timestamp",
            "no timestamp; report loses to any timed report".into(),
            path.clone(),
        )),
        Some(raw) if raw.parse().is_none() => warnings.push(CheckIssue::new(
            "W002",
            "timestamp",
            format!("unparsable timestamp {raw:?}; treated as absent"),
            path.clone(),
        )),
        Some(_) => {}
    }

    if policy.direction_of(&report.direction) == Direction::Unknown {
        warnings.push(CheckIssue::new(
            "W004",
            "direction",
            format!("unrecognized direction '{}'", report.direction),
            path.clone(),
        ));
    }

    if policy.color_of(&report.status) == ColorBand::Gray {
        warnings.push(CheckIssue::new(
            "W005",
            "status",
            format!("status '{}' matches no color rule", report.status),
            path,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(issues: &[CheckIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.code.as_str()).collect()
    }

    #[test]
    fn clean_batch_passes_strict() {
        let data = json!([{
            "checkpoint_name": "حوارة",
            "city_name": "نابلس",
            "direction": "دخول",
            "status": "مغلق",
            "reported_at": "2024-01-01T11:00:00Z"
        }]);
        let report = check(&data, "batch.json", true, &ReconcilePolicy::default());
        assert!(report.pass, "{:?}", report.warnings);
        assert_eq!(report.reports, 1);
        validate(&data).unwrap();
    }

    #[test]
    fn non_array_is_an_error() {
        let report = check(&json!({"a": 1}), "x.json", false, &ReconcilePolicy::default());
        assert!(!report.pass);
        assert_eq!(codes(&report.errors), vec!["E002"]);
    }

    #[test]
    fn wrong_field_type_is_schema_error() {
        let data = json!([{ "checkpoint_name": 5, "city_name": "نابلس" }]);
        let report = check(&data, "x.json", false, &ReconcilePolicy::default());
        assert!(!report.pass);
        assert!(codes(&report.errors).contains(&"E001"));
        assert!(validate(&data).is_err());
    }

    #[test]
    fn warnings_flag_partial_reports() {
        let data = json!([
            { "checkpoint_name": "غير محدد", "city_name": "نابلس" },
            {
                "checkpoint_name": "حوارة",
                "city_name": "نابلس",
                "direction": "شمال",
                "status": "استفسار",
                "reported_at": "soon"
            },
            { "checkpoint_name": "زعترة", "city_name": "نابلس", "direction": "خروج", "status": "سالك" },
            { "checkpoint_name": "زعترة", "city_name": "نابلس", "direction": "خروج", "status": "N/A" }
        ]);
        let report = check(&data, "x.json", false, &ReconcilePolicy::default());
        assert!(report.pass);
        assert_eq!(
            codes(&report.warnings),
            vec!["W001", "W002", "W004", "W005", "W003", "W006"]
        );

        let strict = check(&data, "x.json", true, &ReconcilePolicy::default());
        assert!(!strict.pass);
    }
}
