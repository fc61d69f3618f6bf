//! Domain models for the Vigil decision core.

pub mod audit;
pub mod config;
pub mod constraint;
pub mod execution;
pub mod intent;
pub mod plan;
pub mod relationship;
pub mod user_fact;

pub use audit::{AuditRecord, AuditSeverity, Decision};
pub use config::{
    AuditConfig, AuthorityConfig, Config, ExecutorConfig, HeuristicsConfig, LoggingConfig,
    PlannerConfig, PolicyConfig,
};
pub use constraint::{CandidateLabel, ConstraintAnalysis, ConstraintIssue, IssueType, PlanCandidate};
pub use execution::{
    Execution, ExecutionResult, ReflectionDelta, ToolCallResult, ToolCallStatus,
    VerificationOutcome, VerificationStatus, VerificationSummary,
};
pub use intent::{Intent, IntentCategory};
pub use plan::{Complexity, Plan, PlanStep, SchemaViolation, StepType, StepVerification};
pub use relationship::{
    clamp_trust_level, ContextSource, InteractionMode, RelationshipContext, RelationshipPatch,
    RelationshipRecord, RelationshipType, TonePreference, VoiceProfile,
};
pub use user_fact::{sort_by_authority, FactAuthority, UserFact};
