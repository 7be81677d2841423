use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;
use crate::types::{ColorBand, Direction, UnknownDirectionPolicy};

/// Workspace-level policy file, looked up relative to the working directory.
pub const WORKSPACE_POLICY_PATH: &str = ".checkpoint/policy.json";

const DEFAULT_PLACEHOLDERS: &[&str] = &["غير محدد", "غير محددة", "N/A"];

const ENTRY_ALIASES: &[&str] = &[
    "دخول", "داخل", "الداخل", "للداخل", "الدخول", "للدخول", "ل الداخل", "entry", "in",
];

const EXIT_ALIASES: &[&str] = &[
    "خروج", "خارج", "الخارج", "للخارج", "الخروج", "للخروج", "ل الخارج", "exit", "out",
];

const BOTH_ALIASES: &[&str] = &[
    "الاتجاهين",
    "بالاتجاهين",
    "اتجاهين",
    "باتجاهين",
    "الجهتين",
    "كلا الاتجاهين",
    "دخول وخروج",
    "both",
];

/// Reconciliation policy: every table the reconciler consults.
///
/// Deserializes with per-field defaults, so a policy file only needs the
/// fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    /// Name and status values that mean "not specified".
    pub placeholders: Vec<String>,
    pub direction_aliases: DirectionAliases,
    /// Ordered; the first rule with a matching pattern decides the band.
    pub color_rules: Vec<ColorRule>,
    pub unknown_direction: UnknownDirectionPolicy,
    /// Retained entries older than this are pruned before committing state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_after_hours: Option<u64>,
    /// Offset applied to clock labels only.
    pub display_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionAliases {
    pub entry: Vec<String>,
    pub exit: Vec<String>,
    pub both: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub band: ColorBand,
    pub patterns: Vec<String>,
}

impl ColorRule {
    fn new(band: ColorBand, patterns: &[&str]) -> Self {
        Self {
            band,
            patterns: to_strings(patterns),
        }
    }
}

impl Default for DirectionAliases {
    fn default() -> Self {
        Self {
            entry: to_strings(ENTRY_ALIASES),
            exit: to_strings(EXIT_ALIASES),
            both: to_strings(BOTH_ALIASES),
        }
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            placeholders: to_strings(DEFAULT_PLACEHOLDERS),
            direction_aliases: DirectionAliases::default(),
            color_rules: default_color_rules(),
            unknown_direction: UnknownDirectionPolicy::default(),
            stale_after_hours: None,
            display_offset_minutes: 120,
        }
    }
}

fn default_color_rules() -> Vec<ColorRule> {
    vec![
        ColorRule::new(
            ColorBand::Red,
            &["مغلق", "مغلقة", "مسكر", "مسكرة", "إغلاق", "اغلاق", "مكهرب"],
        ),
        ColorRule::new(
            ColorBand::Orange,
            &["أزمة", "ازمة", "مزدحم", "ازدحام", "كثافة سير", "واقف", "خانقة"],
        ),
        ColorRule::new(ColorBand::Yellow, &["تفتيش", "بفتش", "حاجز", "جيش", "حادث"]),
        ColorRule::new(
            ColorBand::Green,
            &["مفتوح", "مفتوحة", "سالك", "سالكة", "بحري", "فاتح", "فتح", "نضيف"],
        ),
    ]
}

impl ReconcilePolicy {
    /// True when a name is empty or one of the placeholder values.
    pub fn is_placeholder(&self, name: &str) -> bool {
        let name = normalize_text(name);
        name.is_empty() || self.placeholders.iter().any(|p| normalize_text(p) == name)
    }

    /// Exact alias lookup; anything not listed is `Unknown`.
    pub fn direction_of(&self, text: &str) -> Direction {
        let text = normalize_text(text);
        if text.is_empty() {
            return Direction::Unknown;
        }
        let aliases = &self.direction_aliases;
        let listed = |list: &[String]| list.iter().any(|a| normalize_text(a) == text);
        if listed(&aliases.entry) {
            Direction::Entry
        } else if listed(&aliases.exit) {
            Direction::Exit
        } else if listed(&aliases.both) {
            Direction::Both
        } else {
            Direction::Unknown
        }
    }

    /// Ordered substring classification; no match is `Gray`.
    pub fn color_of(&self, status: &str) -> ColorBand {
        let status = normalize_text(status);
        if status.is_empty() {
            return ColorBand::Gray;
        }
        self.color_rules
            .iter()
            .find(|rule| {
                rule.patterns
                    .iter()
                    .map(|p| normalize_text(p))
                    .any(|p| !p.is_empty() && status.contains(&p))
            })
            .map(|rule| rule.band)
            .unwrap_or(ColorBand::Gray)
    }

    /// Reject tables that would misroute or misclassify.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for rule in &self.color_rules {
            if rule.patterns.iter().any(|p| normalize_text(p).is_empty()) {
                return Err(PolicyError::EmptyPattern(rule.band));
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let aliases = &self.direction_aliases;
        for alias in aliases.entry.iter().chain(&aliases.exit).chain(&aliases.both) {
            let norm = normalize_text(alias);
            if norm.is_empty() {
                return Err(PolicyError::EmptyAlias);
            }
            if !seen.insert(norm.clone()) {
                return Err(PolicyError::AmbiguousAlias(norm));
            }
        }
        Ok(())
    }
}

/// Trim, collapse inner whitespace, drop tatweel and lowercase.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| *c != '\u{0640}')
        .collect::<String>()
        .to_lowercase()
}

/// Load and validate a policy file.
pub fn load_policy(path: &Path) -> Result<ReconcilePolicy> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read policy {}", path.display()))?;
    let policy: ReconcilePolicy = serde_json::from_str(&content)
        .with_context(|| format!("{}: invalid policy JSON", path.display()))?;
    policy
        .validate()
        .with_context(|| format!("{}: rejected policy", path.display()))?;
    Ok(policy)
}

/// Load `.checkpoint/policy.json` from the working directory if present.
pub fn load_workspace_policy() -> Result<Option<ReconcilePolicy>> {
    let path = Path::new(WORKSPACE_POLICY_PATH);
    if !path.exists() {
        return Ok(None);
    }
    load_policy(path).map(Some)
}

/// Explicit file, else workspace file, else built-in defaults.
pub fn resolve_policy(explicit: Option<&Path>) -> Result<ReconcilePolicy> {
    if let Some(path) = explicit {
        return load_policy(path);
    }
    match load_workspace_policy()? {
        Some(policy) => {
            tracing::debug!(path = WORKSPACE_POLICY_PATH, "using workspace policy");
            Ok(policy)
        }
        None => Ok(ReconcilePolicy::default()),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
