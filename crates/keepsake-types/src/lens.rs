//! Lens expressions: simple content filters applied to retrieval output.
//!
//! A lens expression combines tokens with `+`, e.g.
//! `relational:sam+project:keepsake+-emotional`. Each token is
//! `[-]kind[:target]`. Unknown kinds are dropped rather than rejected so
//! a stale client never turns a wake call into an error.

use crate::config::WakeTuning;
use crate::observation::{Observation, ObservationKind};
use serde::{Deserialize, Serialize};

/// The lens vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LensKind {
    /// People: relational records, or records mentioning a person.
    Relational,
    /// Work: project records, or records mentioning a project token.
    Project,
    /// System state: identity, system, correction, and probe records.
    Operational,
    /// Feeling: emotional records, or records with strong emotion totals.
    Emotional,
    /// Origin: records from a given source platform.
    Platform,
}

impl LensKind {
    /// Parse a lens kind token, case-insensitively. Unknown kinds yield None.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "relational" => Some(LensKind::Relational),
            "project" => Some(LensKind::Project),
            "operational" => Some(LensKind::Operational),
            "emotional" => Some(LensKind::Emotional),
            "platform" => Some(LensKind::Platform),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LensKind::Relational => "relational",
            LensKind::Project => "project",
            LensKind::Operational => "operational",
            LensKind::Emotional => "emotional",
            LensKind::Platform => "platform",
        }
    }
}

impl std::fmt::Display for LensKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed lens token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lens {
    /// Which filter family to apply.
    pub kind: LensKind,
    /// Optional argument, e.g. a person or platform name.
    pub target: Option<String>,
    /// Negated lenses keep the records the raw predicate rejects.
    pub negated: bool,
}

impl Lens {
    /// Parse one `[-]kind[:target]` token. Unknown kinds yield None.
    pub fn parse_token(token: &str) -> Option<Self> {
        let (negated, rest) = match token.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let (kind_raw, target) = match rest.split_once(':') {
            Some((kind_raw, target)) if !target.trim().is_empty() => {
                (kind_raw, Some(target.trim().to_string()))
            }
            Some((kind_raw, _)) => (kind_raw, None),
            None => (rest, None),
        };
        LensKind::parse(kind_raw).map(|kind| Lens {
            kind,
            target,
            negated,
        })
    }

    /// The `kind[:target]` label used in provenance tags, negation stripped.
    pub fn label(&self) -> String {
        match &self.target {
            Some(target) => format!("{}:{}", self.kind, target),
            None => self.kind.to_string(),
        }
    }

    /// Whether the raw predicate holds for a record, ignoring negation.
    pub fn satisfied_by(&self, obs: &Observation, tuning: &WakeTuning) -> bool {
        match self.kind {
            LensKind::Relational => {
                if obs.kind == ObservationKind::Relational {
                    return true;
                }
                match &self.target {
                    Some(target) => {
                        let needle = target.to_lowercase();
                        obs.content.to_lowercase().contains(&needle)
                            || obs.perspective.to_lowercase() == needle
                            || obs.author.to_lowercase() == needle
                    }
                    None => false,
                }
            }
            LensKind::Project => {
                obs.kind == ObservationKind::Project
                    || self
                        .target
                        .as_deref()
                        .is_some_and(|target| obs.content.contains(target))
            }
            LensKind::Operational => obs.kind.is_operational(),
            LensKind::Emotional => {
                obs.kind == ObservationKind::Emotional
                    || obs.emotions.sum() >= tuning.emotional_sum_threshold
            }
            LensKind::Platform => match &self.target {
                Some(target) => obs
                    .source_platform
                    .as_deref()
                    .is_some_and(|platform| platform.to_lowercase() == target.to_lowercase()),
                None => true,
            },
        }
    }

    /// Whether a record passes this lens, negation applied.
    pub fn passes(&self, obs: &Observation, tuning: &WakeTuning) -> bool {
        self.satisfied_by(obs, tuning) != self.negated
    }
}

impl std::fmt::Display for Lens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negated {
            write!(f, "-")?;
        }
        write!(f, "{}", self.label())
    }
}

/// Parse a full lens expression into at most `max` lenses.
///
/// Tokens split on `+` and whitespace; empty and unknown tokens are
/// dropped silently.
pub fn parse_lenses(expr: &str, max: usize) -> Vec<Lens> {
    expr.split(|c: char| c == '+' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(Lens::parse_token)
        .take(max)
        .collect()
}

/// Whether a record passes every lens in the list.
pub fn passes_all(obs: &Observation, lenses: &[Lens], tuning: &WakeTuning) -> bool {
    lenses.iter().all(|lens| lens.passes(obs, tuning))
}
