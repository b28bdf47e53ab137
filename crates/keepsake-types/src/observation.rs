//! Observation records: the single unit of memory Keepsake stores and retrieves.

use crate::error::{KeepsakeError, KeepsakeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of the salience and emotion scales.
pub const SCALE_MAX: i64 = 100;

/// Maximum byte length accepted for identifier strings.
pub const MAX_ID_BYTES: usize = 128;

fn validate_identifier(raw: &str, what: &str) -> KeepsakeResult<()> {
    if raw.trim().is_empty() {
        return Err(KeepsakeError::Validation(format!("{what} must not be empty")));
    }
    if raw.len() > MAX_ID_BYTES {
        return Err(KeepsakeError::Validation(format!(
            "{what} exceeds {MAX_ID_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Unique identifier for an observation record.
///
/// Opaque to callers; the system mints UUID strings but accepts any
/// stable token that round-trips through storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObservationId(pub String);

impl ObservationId {
    /// Mint a new random ObservationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate an externally supplied identifier.
    pub fn parse(raw: &str) -> KeepsakeResult<Self> {
        validate_identifier(raw, "observation id")?;
        Ok(Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ObservationId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ObservationId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Identifier of the agent an observation belongs to.
///
/// Every query is scoped by this key; records never cross agents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Validate an externally supplied agent identifier.
    pub fn parse(raw: &str) -> KeepsakeResult<Self> {
        validate_identifier(raw, "agent id")?;
        Ok(Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AgentId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for AgentId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Category tag of an observation.
///
/// The vocabulary is open: the named variants get special treatment in
/// retrieval and lens matching, anything else rides along as `Other`.
/// Serialized as a bare string in both storage and the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    /// Work and project context.
    Project,
    /// People and relationships.
    Relational,
    /// Feelings and emotional texture.
    Emotional,
    /// Self-model of the agent.
    Identity,
    /// A correction of earlier belief; always surfaces at wake.
    Correction,
    /// Operational system state.
    System,
    /// Probe records written by health checks.
    SystemTest,
    /// Any kind outside the named vocabulary.
    Other(String),
}

impl ObservationKind {
    /// The canonical string form stored and served for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ObservationKind::Project => "project",
            ObservationKind::Relational => "relational",
            ObservationKind::Emotional => "emotional",
            ObservationKind::Identity => "identity",
            ObservationKind::Correction => "correction",
            ObservationKind::System => "system",
            ObservationKind::SystemTest => "system_test",
            ObservationKind::Other(raw) => raw,
        }
    }

    /// Kinds the operational lens selects.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            ObservationKind::Identity
                | ObservationKind::System
                | ObservationKind::Correction
                | ObservationKind::SystemTest
        )
    }
}

impl From<&str> for ObservationKind {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "project" => ObservationKind::Project,
            "relational" => ObservationKind::Relational,
            "emotional" => ObservationKind::Emotional,
            "identity" => ObservationKind::Identity,
            "correction" => ObservationKind::Correction,
            "system" => ObservationKind::System,
            "system_test" => ObservationKind::SystemTest,
            _ => ObservationKind::Other(raw.to_string()),
        }
    }
}

impl Default for ObservationKind {
    fn default() -> Self {
        ObservationKind::System
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ObservationKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ObservationKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ObservationKind::from(raw.as_str()))
    }
}

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationStatus {
    /// The record participates in retrieval.
    Active,
    /// The record was replaced by a newer one and is excluded from retrieval.
    Superseded,
}

impl ObservationStatus {
    /// The string form stored in the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationStatus::Active => "active",
            ObservationStatus::Superseded => "superseded",
        }
    }

    /// Normalize a stored status value. Missing or unknown values read as active.
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw {
            Some("superseded") => ObservationStatus::Superseded,
            _ => ObservationStatus::Active,
        }
    }
}

impl Default for ObservationStatus {
    fn default() -> Self {
        ObservationStatus::Active
    }
}

/// Emotional weighting of an observation on four channels.
///
/// Each channel is an integer in [0, 100]. Omitted channels read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionVector {
    /// Closeness and trust.
    #[serde(default)]
    pub intimacy: i64,
    /// Tension and disagreement.
    #[serde(default)]
    pub conflict: i64,
    /// Delight and warmth.
    #[serde(default)]
    pub joy: i64,
    /// Worry and threat.
    #[serde(default)]
    pub fear: i64,
}

impl EmotionVector {
    /// Total intensity across all four channels.
    pub fn sum(&self) -> i64 {
        self.intimacy + self.conflict + self.joy + self.fear
    }

    /// Check every channel is within [0, 100].
    pub fn validate(&self) -> KeepsakeResult<()> {
        for (name, value) in [
            ("intimacy", self.intimacy),
            ("conflict", self.conflict),
            ("joy", self.joy),
            ("fear", self.fear),
        ] {
            if !(0..=SCALE_MAX).contains(&value) {
                return Err(KeepsakeError::Validation(format!(
                    "emotion {name} must be in 0..={SCALE_MAX}, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A single observation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unique ID.
    pub id: ObservationId,
    /// Which agent this record belongs to.
    pub agent_id: AgentId,
    /// Who recorded it.
    pub author: String,
    /// Whose point of view the content is written from.
    #[serde(default)]
    pub perspective: String,
    /// Category tag.
    pub kind: ObservationKind,
    /// Free-text body.
    pub content: String,
    /// Importance in [0, 100].
    pub salience: i64,
    /// Emotional weighting.
    #[serde(default)]
    pub emotions: EmotionVector,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
    /// When retrieval last surfaced this record, if ever.
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
    /// Soft-deletion timestamp; set means invisible to every read path.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ObservationStatus,
    /// The record that replaced this one, when superseded.
    #[serde(default)]
    pub superseded_by: Option<ObservationId>,
    /// Pinned records never decay.
    #[serde(default)]
    pub pinned: bool,
    /// Platform the observation arrived from.
    #[serde(default)]
    pub source_platform: Option<String>,
    /// Opaque reference into the source platform.
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl Observation {
    /// Whether the record participates in retrieval.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none() && self.status == ObservationStatus::Active
    }
}

/// Payload for creating an observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObservation {
    /// Which agent the record belongs to.
    pub agent_id: AgentId,
    /// Who is recording it.
    pub author: String,
    /// Whose point of view the content is written from.
    #[serde(default)]
    pub perspective: String,
    /// Category tag; defaults to `system` when omitted.
    #[serde(default)]
    pub kind: ObservationKind,
    /// Free-text body.
    pub content: String,
    /// Importance in [0, 100]; defaults to zero.
    #[serde(default)]
    pub salience: i64,
    /// Emotional weighting; omitted channels read as zero.
    #[serde(default)]
    pub emotions: EmotionVector,
    /// Pin the record against decay.
    #[serde(default)]
    pub pinned: bool,
    /// Platform the observation arrived from.
    #[serde(default)]
    pub source_platform: Option<String>,
    /// Opaque reference into the source platform.
    #[serde(default)]
    pub source_ref: Option<String>,
}

impl NewObservation {
    /// Check required fields and numeric ranges.
    pub fn validate(&self) -> KeepsakeResult<()> {
        AgentId::parse(self.agent_id.as_str())?;
        if self.author.trim().is_empty() {
            return Err(KeepsakeError::Validation("author must not be empty".into()));
        }
        if self.content.trim().is_empty() {
            return Err(KeepsakeError::Validation("content must not be empty".into()));
        }
        if !(0..=SCALE_MAX).contains(&self.salience) {
            return Err(KeepsakeError::Validation(format!(
                "salience must be in 0..={SCALE_MAX}, got {}",
                self.salience
            )));
        }
        self.emotions.validate()
    }

    /// Build the stored record, minting an id and stamping both write times.
    pub fn into_observation(self, now: DateTime<Utc>) -> Observation {
        Observation {
            id: ObservationId::new(),
            agent_id: self.agent_id,
            author: self.author,
            perspective: self.perspective,
            kind: self.kind,
            content: self.content,
            salience: self.salience,
            emotions: self.emotions,
            created_at: now,
            updated_at: now,
            last_accessed: None,
            deleted_at: None,
            status: ObservationStatus::Active,
            superseded_by: None,
            pinned: self.pinned,
            source_platform: self.source_platform,
            source_ref: self.source_ref,
        }
    }
}

/// Partial update for an observation. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationPatch {
    /// Replace the author.
    pub author: Option<String>,
    /// Replace the perspective.
    pub perspective: Option<String>,
    /// Replace the category tag.
    pub kind: Option<ObservationKind>,
    /// Replace the free-text body.
    pub content: Option<String>,
    /// Replace the salience before the edit bump is applied.
    pub salience: Option<i64>,
    /// Replace the whole emotion vector.
    pub emotions: Option<EmotionVector>,
    /// Replace the source platform.
    pub source_platform: Option<String>,
    /// Replace the source reference.
    pub source_ref: Option<String>,
}

impl ObservationPatch {
    /// True when the patch carries no changes at all.
    pub fn is_empty(&self) -> bool {
        self.author.is_none()
            && self.perspective.is_none()
            && self.kind.is_none()
            && self.content.is_none()
            && self.salience.is_none()
            && self.emotions.is_none()
            && self.source_platform.is_none()
            && self.source_ref.is_none()
    }

    /// Check the provided fields for validity.
    pub fn validate(&self) -> KeepsakeResult<()> {
        if let Some(content) = &self.content {
            if content.trim().is_empty() {
                return Err(KeepsakeError::Validation("content must not be empty".into()));
            }
        }
        if let Some(author) = &self.author {
            if author.trim().is_empty() {
                return Err(KeepsakeError::Validation("author must not be empty".into()));
            }
        }
        if let Some(salience) = self.salience {
            if !(0..=SCALE_MAX).contains(&salience) {
                return Err(KeepsakeError::Validation(format!(
                    "salience must be in 0..={SCALE_MAX}, got {salience}"
                )));
            }
        }
        if let Some(emotions) = &self.emotions {
            emotions.validate()?;
        }
        Ok(())
    }
}
