//! End-to-end decision pipeline tests
//!
//! Resolve, plan, execute and recover for whole user turns.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::{
    test_pipeline, test_pipeline_with_memory, FailingFactSource, FailingRelationshipRepository,
    ScriptedMemoryGateway, ScriptedToolInvoker,
};
use vigil::adapters::memory::StaticToolRegistry;
use vigil::application::{DecisionPipeline, DecisionRequest, PipelinePorts};
use vigil::domain::models::{
    CandidateLabel, Config, Decision, Intent, IntentCategory, RelationshipType, StepType,
    UserFact,
};
use vigil::domain::ports::ToolOutput;
use vigil::services::authority_resolver::RELATIONSHIP_TYPE_FACT;
use vigil::services::planner::{ToolHint, NEVER_GUESS};

fn search_request(user: &str) -> DecisionRequest {
    DecisionRequest::new(
        user,
        Intent::new(IntentCategory::Query, "Latest Rust release").with_tooling(true),
    )
    .with_session("session-42")
    .with_tool_hint(ToolHint::new("web_search", json!({"q": "rust release"})))
}

#[tokio::test]
async fn test_tooling_turn_end_to_end() {
    common::setup_test_logging();

    let harness = test_pipeline(
        &Config::default(),
        ScriptedToolInvoker::new().with_output(
            "web_search",
            ToolOutput::ok(json!({"results": [{"title": "Rust 1.90 released"}]})),
        ),
    );

    let outcome = harness.pipeline.handle(search_request("alice")).await;

    assert!(!outcome.degraded);
    assert_eq!(outcome.relationship.relationship_type, RelationshipType::Public);
    assert_eq!(outcome.candidates.len(), 3);
    assert_eq!(outcome.candidates[0].label, CandidateLabel::Primary);
    assert!(outcome.plan.has_step_type(StepType::ToolCall));

    assert!(outcome.execution.success);
    assert_eq!(outcome.reflection_delta.attempts, 1);
    assert!(outcome.execution.output.contains("Rust 1.90 released"));
    assert_eq!(outcome.execution.verification_summary.verified, 1);

    let records = harness.sink.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].policy, "tool:web_search");
    assert_eq!(records[0].decision, Decision::Allow);
    assert_eq!(harness.pipeline.policy().get_audit_log().await, records);

    assert_eq!(harness.relationships.len().await, 1);
    let calls = harness.invoker.calls();
    assert_eq!(calls[0].context.session_id.as_deref(), Some("session-42"));
}

#[tokio::test]
async fn test_locked_facts_shape_relationship_and_plan() {
    let harness = test_pipeline(&Config::default(), ScriptedToolInvoker::new());
    harness
        .facts
        .upsert(UserFact::locked("owner-1", RELATIONSHIP_TYPE_FACT, json!("owner")))
        .await
        .unwrap();
    harness
        .facts
        .upsert(UserFact::locked("owner-1", NEVER_GUESS, json!(true)))
        .await
        .unwrap();

    let request = DecisionRequest::new(
        "owner-1",
        Intent::new(IntentCategory::Query, "What did I name my boat?"),
    );
    let outcome = harness.pipeline.handle(request).await;

    assert_eq!(outcome.relationship.relationship_type, RelationshipType::Owner);
    assert_eq!(outcome.plan.steps.len(), 1);
    assert!(outcome.execution.success);
    assert!(outcome.execution.output.starts_with("I won't guess"));
    assert!(harness.invoker.calls().is_empty());
}

#[tokio::test]
async fn test_failed_verification_falls_back() {
    let config = Config::default();
    let harness = test_pipeline(
        &config,
        ScriptedToolInvoker::new().with_output("run_command", ToolOutput::ok(json!({"exitCode": 127}))),
    );
    let request = DecisionRequest::new(
        "alice",
        Intent::new(IntentCategory::Command, "Run the build").with_tooling(true),
    )
    .with_tool_hint(ToolHint::new("run_command", json!({"cmd": "make"})));

    let outcome = harness.pipeline.handle(request).await;

    assert!(outcome.execution.success);
    assert_eq!(outcome.execution.output, config.executor.fallback_response);
    assert_eq!(outcome.reflection_delta.attempts, 2);
    assert!(outcome.reflection_delta.recovered);
    assert!(outcome.reflection_delta.original_errors[0].contains("exit code"));
}

#[tokio::test]
async fn test_tool_timeout_from_config_falls_back() {
    let mut config = Config::default();
    config.executor.tool_timeout_ms = Some(25);
    let harness = test_pipeline(
        &config,
        ScriptedToolInvoker::new().with_delay(
            "web_search",
            Duration::from_millis(500),
            ToolOutput::ok(json!({"results": []})),
        ),
    );

    let outcome = harness.pipeline.handle(search_request("alice")).await;

    assert!(outcome.reflection_delta.fallback_plan_applied);
    assert!(outcome.reflection_delta.original_errors[0].contains("timed out"));
    assert_eq!(outcome.execution.output, config.executor.fallback_response);
}

#[tokio::test]
async fn test_blocked_tool_from_config_is_never_invoked() {
    let mut config = Config::default();
    config.policy.blocked_tools = vec!["web_search".to_string()];
    let harness = test_pipeline(&config, ScriptedToolInvoker::new());

    let outcome = harness.pipeline.handle(search_request("alice")).await;

    assert!(harness.invoker.calls().is_empty());
    let records = harness.sink.records().await;
    assert!(records
        .iter()
        .any(|r| r.policy == "tool:web_search" && r.decision == Decision::Deny));
    assert_eq!(outcome.reflection_delta.attempts, 1);
}

#[tokio::test]
async fn test_storage_outage_degrades_without_failing_turn() {
    let invoker = Arc::new(ScriptedToolInvoker::new().with_output(
        "web_search",
        ToolOutput::ok(json!({"results": [{"title": "ok"}]})),
    ));
    let pipeline = DecisionPipeline::from_config(
        &Config::default(),
        PipelinePorts {
            tool_registry: Arc::new(StaticToolRegistry::from_names(["web_search"])),
            tool_invoker: invoker,
            relationships: Arc::new(FailingRelationshipRepository),
            facts: Arc::new(FailingFactSource),
            audit_sink: None,
            memory: None,
        },
    );

    let outcome = pipeline.handle(search_request("alice")).await;

    assert!(outcome.degraded);
    assert_eq!(outcome.relationship.relationship_type, RelationshipType::Public);
    assert!(outcome.execution.success);
}

#[tokio::test]
async fn test_memory_step_without_gateway_is_soft_failure() {
    let harness = test_pipeline(&Config::default(), ScriptedToolInvoker::new());
    let request = DecisionRequest::new(
        "alice",
        Intent::new(IntentCategory::Conversation, "Remind me what we discussed").with_memory(true),
    )
    .with_memory_scope("recent");

    let outcome = harness.pipeline.handle(request).await;

    let memory_step = outcome
        .plan
        .steps
        .iter()
        .find(|s| s.step_type == StepType::MemoryAccess)
        .expect("memory step planned");
    assert_eq!(memory_step.param_str("scope"), Some("recent"));
    assert!(outcome.execution.success);
    assert_eq!(outcome.reflection_delta.attempts, 1);
    assert!(outcome
        .execution
        .errors
        .iter()
        .any(|e| e.contains("memory access is not wired")));
}

fn recall_request(user: &str) -> DecisionRequest {
    DecisionRequest::new(
        user,
        Intent::new(IntentCategory::Conversation, "Remind me what we discussed").with_memory(true),
    )
    .with_memory_scope("recent")
}

#[tokio::test]
async fn test_wired_memory_gateway_serves_memory_step() {
    let memory = Arc::new(ScriptedMemoryGateway::returning(
        json!({"memories": ["We talked about sailing"]}),
    ));
    let harness =
        test_pipeline_with_memory(&Config::default(), ScriptedToolInvoker::new(), memory.clone());

    let outcome = harness.pipeline.handle(recall_request("alice")).await;

    assert!(outcome.execution.success);
    assert!(outcome.execution.errors.is_empty());
    assert_eq!(outcome.reflection_delta.attempts, 1);

    let memory_result = outcome
        .execution
        .steps_executed
        .iter()
        .find(|r| r.step_type == StepType::MemoryAccess)
        .expect("memory step executed");
    assert!(memory_result.success);
    assert_eq!(
        memory_result.result,
        Some(json!({"memories": ["We talked about sailing"]}))
    );

    let accessed = memory.accessed();
    assert_eq!(accessed.len(), 1);
    assert_eq!(accessed[0].0, "alice");
    assert_eq!(accessed[0].1.param_str("scope"), Some("recent"));
}

#[tokio::test]
async fn test_memory_gateway_error_fails_plan_and_falls_back() {
    let config = Config::default();
    let memory = Arc::new(ScriptedMemoryGateway::failing("vector store offline"));
    let harness = test_pipeline_with_memory(&config, ScriptedToolInvoker::new(), memory.clone());

    let outcome = harness.pipeline.handle(recall_request("alice")).await;

    assert_eq!(outcome.reflection_delta.attempts, 2);
    assert!(outcome.reflection_delta.fallback_plan_applied);
    assert!(outcome.reflection_delta.recovered);
    assert!(outcome.reflection_delta.original_errors[0].contains("memory access failed"));
    assert!(outcome.reflection_delta.original_errors[0].contains("vector store offline"));
    assert_eq!(outcome.execution.output, config.executor.fallback_response);
    assert_eq!(memory.accessed().len(), 1, "fallback plan does not touch memory");
}

#[tokio::test]
async fn test_handle_all_keeps_request_order() {
    let harness = test_pipeline(
        &Config::default(),
        ScriptedToolInvoker::new().with_output(
            "web_search",
            ToolOutput::ok(json!({"results": [{"title": "hit"}]})),
        ),
    );
    let users = ["u-1", "u-2", "u-3"];

    let outcomes = harness
        .pipeline
        .handle_all(users.iter().map(|u| search_request(u)).collect())
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| o.execution.success));
    assert_eq!(harness.relationships.len().await, 3);
    assert_eq!(harness.invoker.calls().len(), 3);
    let called: Vec<String> = harness
        .invoker
        .calls()
        .into_iter()
        .map(|c| c.context.user_id)
        .collect();
    for user in users {
        assert!(called.iter().any(|u| u == user));
    }
}
