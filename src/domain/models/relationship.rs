//! Behavioral-authority model: the per-user relationship context and its
//! persisted row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relationship tier. `Trusted`, `Normal` and `Restricted` are legacy tiers;
/// current rows use `Owner` or `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    /// The operator the assistant belongs to.
    Owner,
    /// Legacy elevated tier.
    Trusted,
    /// Legacy ordinary tier.
    Normal,
    /// Legacy limited tier.
    Restricted,
    /// Anyone else.
    Public,
}

impl RelationshipType {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Trusted => "trusted",
            Self::Normal => "normal",
            Self::Restricted => "restricted",
            Self::Public => "public",
        }
    }

    /// Parse a tier name, ignoring case and surrounding whitespace.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Some(Self::Owner),
            "trusted" => Some(Self::Trusted),
            "normal" => Some(Self::Normal),
            "restricted" => Some(Self::Restricted),
            "public" => Some(Self::Public),
            _ => None,
        }
    }

    /// Voice profile that goes with this tier.
    pub const fn voice_profile(&self) -> VoiceProfile {
        match self {
            Self::Owner => VoiceProfile::OwnerLuxury,
            _ => VoiceProfile::PublicElegant,
        }
    }
}

/// How the assistant engages with the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Normal engagement.
    #[default]
    Default,
    /// Operator console engagement.
    Operator,
    /// Forces neutral posture regardless of tier.
    Guarded,
}

impl InteractionMode {
    /// Parse a mode name, ignoring case and surrounding whitespace.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "operator" => Some(Self::Operator),
            "guarded" => Some(Self::Guarded),
            _ => None,
        }
    }
}

/// Preferred tone of replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TonePreference {
    /// No particular tone.
    #[default]
    Neutral,
    /// Short and to the point.
    Direct,
    /// Friendly.
    Warm,
    /// Formal register.
    Formal,
}

/// Voice the reply is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoiceProfile {
    /// Voice reserved for the owner.
    OwnerLuxury,
    /// Voice for everyone else.
    #[default]
    PublicElegant,
}

impl VoiceProfile {
    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerLuxury => "owner_luxury",
            Self::PublicElegant => "public_elegant",
        }
    }
}

/// Highest-priority layer that determined a resolved context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// A locked user fact.
    LockedFact,
    /// Settings supplied with the request.
    Explicit,
    /// The persisted relationship row.
    Db,
    /// The safe default for a new, anonymous or unreachable user.
    DbDefault,
}

impl ContextSource {
    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LockedFact => "locked_fact",
            Self::Explicit => "explicit",
            Self::Db => "db",
            Self::DbDefault => "db_default",
        }
    }
}

/// Clamp a raw trust value into `[0, 100]`, flooring fractions.
pub fn clamp_trust_level(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    // Bounded to [0, 100] before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = raw.floor().clamp(0.0, 100.0) as u8;
    clamped
}

/// Resolved behavioral posture for one user. Recomputed on every resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipContext {
    /// Resolved tier.
    pub relationship_type: RelationshipType,
    /// Always within `[0, 100]`.
    pub trust_level: u8,
    /// Resolved interaction mode.
    pub interaction_mode: InteractionMode,
    /// Resolved tone.
    pub tone_preference: TonePreference,
    /// Resolved voice.
    pub voice_profile: VoiceProfile,
    /// When the context was resolved.
    pub computed_at: DateTime<Utc>,
    /// Highest-priority layer that applied.
    pub source: ContextSource,
}

impl RelationshipContext {
    /// Safe public posture used for new users and degraded resolution.
    pub const fn safe_default(computed_at: DateTime<Utc>) -> Self {
        Self {
            relationship_type: RelationshipType::Public,
            trust_level: 0,
            interaction_mode: InteractionMode::Default,
            tone_preference: TonePreference::Neutral,
            voice_profile: VoiceProfile::PublicElegant,
            computed_at,
            source: ContextSource::DbDefault,
        }
    }

    /// Context taken directly from a persisted row.
    pub fn from_record(record: &RelationshipRecord, computed_at: DateTime<Utc>) -> Self {
        Self {
            relationship_type: record.relationship_type,
            trust_level: record.trust_level.min(100),
            interaction_mode: record.interaction_mode,
            tone_preference: record.tone_preference,
            voice_profile: record.voice_profile,
            computed_at,
            source: ContextSource::Db,
        }
    }

    /// Whether the tier is `Owner`.
    pub fn is_owner(&self) -> bool {
        self.relationship_type == RelationshipType::Owner
    }
}

/// Persisted relationship row, owned by the repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// User the row belongs to.
    pub user_id: String,
    /// Stored tier.
    pub relationship_type: RelationshipType,
    /// Stored trust in `[0, 100]`.
    pub trust_level: u8,
    /// Stored interaction mode.
    pub interaction_mode: InteractionMode,
    /// Stored tone.
    pub tone_preference: TonePreference,
    /// Stored voice.
    pub voice_profile: VoiceProfile,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row last changed.
    pub updated_at: DateTime<Utc>,
}

impl RelationshipRecord {
    /// Row created for a user seen for the first time.
    pub fn public_default(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            relationship_type: RelationshipType::Public,
            trust_level: 0,
            interaction_mode: InteractionMode::Default,
            tone_preference: TonePreference::Neutral,
            voice_profile: VoiceProfile::PublicElegant,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update to a relationship row. `trust_level` is clamped on apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipPatch {
    /// New tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
    /// New trust, clamped into `[0, 100]` on apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<f64>,
    /// New interaction mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_mode: Option<InteractionMode>,
    /// New tone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_preference: Option<TonePreference>,
    /// New voice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_profile: Option<VoiceProfile>,
}

impl RelationshipPatch {
    /// Set the trust level.
    #[must_use]
    pub const fn with_trust_level(mut self, trust_level: f64) -> Self {
        self.trust_level = Some(trust_level);
        self
    }

    /// Set the tier.
    #[must_use]
    pub const fn with_relationship_type(mut self, relationship_type: RelationshipType) -> Self {
        self.relationship_type = Some(relationship_type);
        self
    }

    /// Set the interaction mode.
    #[must_use]
    pub const fn with_interaction_mode(mut self, mode: InteractionMode) -> Self {
        self.interaction_mode = Some(mode);
        self
    }

    /// Apply the patch to a row, clamping trust and bumping `updated_at`.
    pub fn apply_to(&self, record: &mut RelationshipRecord, now: DateTime<Utc>) {
        if let Some(relationship_type) = self.relationship_type {
            record.relationship_type = relationship_type;
        }
        if let Some(trust_level) = self.trust_level {
            record.trust_level = clamp_trust_level(trust_level);
        }
        if let Some(mode) = self.interaction_mode {
            record.interaction_mode = mode;
        }
        if let Some(tone) = self.tone_preference {
            record.tone_preference = tone;
        }
        if let Some(voice) = self.voice_profile {
            record.voice_profile = voice;
        }
        record.updated_at = now;
    }
}
