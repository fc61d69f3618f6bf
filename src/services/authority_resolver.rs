//! Per-user behavioral-authority resolution.
//!
//! The persisted row is the base. Layers are then applied from lowest to
//! highest priority, each overwriting only the fields it owns:
//!
//! | Order | Layer              | Owns                                          | Source        |
//! |-------|--------------------|-----------------------------------------------|---------------|
//! | 0     | persisted row      | every field                                   | `db`/`db_default` |
//! | 1     | history heuristics | trust, and on promotion type/mode/tone/voice  | unchanged     |
//! | 2     | explicit settings  | whatever the caller set                       | `explicit`    |
//! | 3     | locked facts       | relationship type, voice profile              | `locked_fact` |
//! | 4     | guarded mode       | voice profile, tone                           | unchanged     |
//!
//! A repository failure short-circuits to the safe public default; the
//! resolver never invents an owner-tier context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::errors::RepositoryResult;
use crate::domain::models::{
    clamp_trust_level, ContextSource, HeuristicsConfig, InteractionMode, RelationshipContext,
    RelationshipPatch, RelationshipRecord, RelationshipType, TonePreference, UserFact,
    VoiceProfile,
};
use crate::domain::ports::RelationshipRepository;
use crate::services::policy_engine::is_anonymous;

/// Fact key whose locked value pins the relationship tier.
pub const RELATIONSHIP_TYPE_FACT: &str = "relationship_type";

/// One-off overrides supplied by the caller for a single resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplicitSettings {
    /// Tier to use for this resolution.
    #[serde(default)]
    pub relationship_type: Option<RelationshipType>,
    /// Trust to use, clamped into `[0, 100]`.
    #[serde(default)]
    pub trust_level: Option<f64>,
    /// Interaction mode to use.
    #[serde(default)]
    pub interaction_mode: Option<InteractionMode>,
    /// Tone to use.
    #[serde(default)]
    pub tone_preference: Option<TonePreference>,
    /// Voice to use.
    #[serde(default)]
    pub voice_profile: Option<VoiceProfile>,
}

impl ExplicitSettings {
    /// Whether no override is set.
    pub const fn is_empty(&self) -> bool {
        self.relationship_type.is_none()
            && self.trust_level.is_none()
            && self.interaction_mode.is_none()
            && self.tone_preference.is_none()
            && self.voice_profile.is_none()
    }
}

/// Interaction history counters used by the heuristic layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySignals {
    /// Successful sessions with this user.
    pub session_successes: u32,
    /// Times the user acted from the owner console.
    pub console_owner_signals: u32,
}

/// Options for a single resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Explicit overrides.
    pub explicit: Option<ExplicitSettings>,
    /// History for the heuristics layer.
    pub history: Option<HistorySignals>,
    /// Evaluation instant; defaults to now.
    pub now: Option<DateTime<Utc>>,
}

impl ResolveOptions {
    /// Supply explicit overrides.
    #[must_use]
    pub fn with_explicit(mut self, explicit: ExplicitSettings) -> Self {
        self.explicit = Some(explicit);
        self
    }

    /// Supply history.
    #[must_use]
    pub const fn with_history(mut self, history: HistorySignals) -> Self {
        self.history = Some(history);
        self
    }

    /// Resolve as of `now`.
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// Everything a layer may read.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionInputs<'a> {
    /// User facts, any authority.
    pub facts: &'a [UserFact],
    /// Explicit overrides.
    pub explicit: Option<&'a ExplicitSettings>,
    /// Interaction history.
    pub history: Option<HistorySignals>,
    /// Heuristics thresholds.
    pub heuristics: &'a HeuristicsConfig,
    /// Evaluation instant.
    pub now: DateTime<Utc>,
}

/// A precedence layer: returns the updated context, or `None` for no-op.
pub type AuthorityLayer = fn(&RelationshipContext, &ResolutionInputs<'_>) -> Option<RelationshipContext>;

/// Layers in application order (lowest priority first).
pub const LAYERS: [(&str, AuthorityLayer); 4] = [
    ("history_heuristics", apply_history_heuristics),
    ("explicit_settings", apply_explicit_settings),
    ("locked_facts", apply_locked_facts),
    ("guarded_mode", apply_guarded_mode),
];

/// The most recent unexpired locked `relationship_type` fact whose value
/// parses. Locks with unrecognised values are skipped with a warning.
pub fn locked_relationship_type(
    facts: &[UserFact],
    now: DateTime<Utc>,
) -> Option<RelationshipType> {
    facts
        .iter()
        .filter(|f| f.fact_key == RELATIONSHIP_TYPE_FACT && f.is_active_lock(now))
        .filter_map(|f| {
            let parsed = f.value_str().and_then(RelationshipType::parse_str);
            if parsed.is_none() {
                warn!(
                    user_id = %f.vi_user_id,
                    fact_id = %f.fact_id,
                    value = %f.value,
                    "ignoring locked relationship_type with unrecognised value"
                );
            }
            parsed.map(|t| (f.updated_at, t))
        })
        .max_by_key(|(updated_at, _)| *updated_at)
        .map(|(_, relationship_type)| relationship_type)
}

/// Layer 1: additive trust from history; promotion only on console-owner signals.
pub fn apply_history_heuristics(
    ctx: &RelationshipContext,
    inputs: &ResolutionInputs<'_>,
) -> Option<RelationshipContext> {
    if !inputs.heuristics.enabled {
        return None;
    }
    let history = inputs.history?;
    if locked_relationship_type(inputs.facts, inputs.now).is_some()
        || inputs.explicit.is_some_and(|e| !e.is_empty())
    {
        return None;
    }
    if history.session_successes == 0 && history.console_owner_signals == 0 {
        return None;
    }

    let mut next = ctx.clone();
    let bonus = f64::from(history.session_successes) * inputs.heuristics.trust_per_session_success
        + f64::from(history.console_owner_signals) * inputs.heuristics.trust_per_console_owner;
    next.trust_level = clamp_trust_level(f64::from(ctx.trust_level) + bonus);

    let promote = history.console_owner_signals >= inputs.heuristics.owner_promotion_threshold
        && ctx.interaction_mode != InteractionMode::Guarded;
    if promote {
        next.relationship_type = RelationshipType::Owner;
        next.voice_profile = VoiceProfile::OwnerLuxury;
        next.interaction_mode = InteractionMode::Operator;
        next.tone_preference = TonePreference::Direct;
    }

    Some(next)
}

/// Layer 2: caller-supplied overrides for this resolution only.
pub fn apply_explicit_settings(
    ctx: &RelationshipContext,
    inputs: &ResolutionInputs<'_>,
) -> Option<RelationshipContext> {
    let explicit = inputs.explicit.filter(|e| !e.is_empty())?;
    let mut next = ctx.clone();

    if let Some(relationship_type) = explicit.relationship_type {
        next.relationship_type = relationship_type;
        next.voice_profile = relationship_type.voice_profile();
    }
    if let Some(trust_level) = explicit.trust_level {
        next.trust_level = clamp_trust_level(trust_level);
    }
    if let Some(mode) = explicit.interaction_mode {
        next.interaction_mode = mode;
    }
    if let Some(tone) = explicit.tone_preference {
        next.tone_preference = tone;
    }
    if let Some(voice) = explicit.voice_profile {
        next.voice_profile = voice;
    }
    next.source = ContextSource::Explicit;

    Some(next)
}

/// Layer 3: a locked `relationship_type` fact pins tier and voice.
pub fn apply_locked_facts(
    ctx: &RelationshipContext,
    inputs: &ResolutionInputs<'_>,
) -> Option<RelationshipContext> {
    let relationship_type = locked_relationship_type(inputs.facts, inputs.now)?;
    let mut next = ctx.clone();
    next.relationship_type = relationship_type;
    next.voice_profile = relationship_type.voice_profile();
    next.source = ContextSource::LockedFact;
    Some(next)
}

/// Layer 4: guarded mode forces neutral posture without touching the tier.
pub fn apply_guarded_mode(
    ctx: &RelationshipContext,
    _inputs: &ResolutionInputs<'_>,
) -> Option<RelationshipContext> {
    if ctx.interaction_mode != InteractionMode::Guarded {
        return None;
    }
    let mut next = ctx.clone();
    next.voice_profile = VoiceProfile::PublicElegant;
    next.tone_preference = TonePreference::Neutral;
    Some(next)
}

/// Resolved context plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved context.
    pub context: RelationshipContext,
    /// Layers that changed the context, in application order.
    pub applied_layers: Vec<&'static str>,
    /// The persisted row could not be read; `context` is the safe default.
    pub degraded: bool,
}

/// Computes a user's [`RelationshipContext`] from layered sources.
pub struct AuthorityResolver {
    repository: Arc<dyn RelationshipRepository>,
    heuristics: HeuristicsConfig,
}

impl AuthorityResolver {
    /// Create a resolver over `repository`.
    pub fn new(repository: Arc<dyn RelationshipRepository>, heuristics: HeuristicsConfig) -> Self {
        Self {
            repository,
            heuristics,
        }
    }

    /// Resolve the context for a user.
    pub async fn resolve(
        &self,
        user_id: &str,
        facts: &[UserFact],
        options: &ResolveOptions,
    ) -> RelationshipContext {
        self.resolve_detailed(user_id, facts, options).await.context
    }

    /// Resolve, also reporting which layers applied and whether storage failed.
    pub async fn resolve_detailed(
        &self,
        user_id: &str,
        facts: &[UserFact],
        options: &ResolveOptions,
    ) -> Resolution {
        let now = options.now.unwrap_or_else(Utc::now);

        let Some(base) = self.load_base(user_id, now).await else {
            return Resolution {
                context: RelationshipContext::safe_default(now),
                applied_layers: Vec::new(),
                degraded: true,
            };
        };

        let inputs = ResolutionInputs {
            facts,
            explicit: options.explicit.as_ref(),
            history: options.history,
            heuristics: &self.heuristics,
            now,
        };

        let mut context = base;
        let mut applied_layers = Vec::new();
        for (name, layer) in LAYERS {
            if let Some(next) = layer(&context, &inputs) {
                context = next;
                applied_layers.push(name);
            }
        }

        debug!(
            user_id = user_id,
            relationship_type = context.relationship_type.as_str(),
            trust_level = context.trust_level,
            source = context.source.as_str(),
            layers = ?applied_layers,
            "relationship context resolved"
        );

        Resolution {
            context,
            applied_layers,
            degraded: false,
        }
    }

    /// Base context from the persisted row. `None` means storage failed.
    async fn load_base(&self, user_id: &str, now: DateTime<Utc>) -> Option<RelationshipContext> {
        if is_anonymous(user_id) {
            return Some(RelationshipContext::safe_default(now));
        }

        match self.repository.get(user_id).await {
            Ok(Some(record)) => Some(RelationshipContext::from_record(&record, now)),
            Ok(None) => {
                let record = RelationshipRecord::public_default(user_id, now);
                if let Err(e) = self.repository.create(record).await {
                    warn!(user_id = user_id, error = %e, "failed to persist default relationship row");
                }
                Some(RelationshipContext::safe_default(now))
            }
            Err(e) => {
                warn!(
                    user_id = user_id,
                    error = %e,
                    "relationship repository unavailable; using safe default context"
                );
                None
            }
        }
    }

    /// Persist a patch to the user's row, creating the default row first if needed.
    /// Trust is clamped to [0, 100].
    pub async fn update(
        &self,
        user_id: &str,
        patch: &RelationshipPatch,
    ) -> RepositoryResult<RelationshipRecord> {
        if self.repository.get(user_id).await?.is_none() {
            self.repository
                .create(RelationshipRecord::public_default(user_id, Utc::now()))
                .await?;
        }
        self.repository.update(user_id, patch).await
    }

    /// Delete the user's row; the next resolution recreates the default.
    pub async fn reset(&self, user_id: &str) -> RepositoryResult<bool> {
        self.repository.delete(user_id).await
    }
}
