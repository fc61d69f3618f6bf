//! Common test utilities for integration tests
//!
//! Provides scripted collaborators and a pipeline builder shared across
//! integration test files. Not every test binary uses every helper.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use vigil::adapters::memory::{
    InMemoryAuditSink, InMemoryFactStore, InMemoryRelationshipRepository, StaticToolRegistry,
};
use vigil::application::{DecisionPipeline, PipelinePorts};
use vigil::domain::errors::{FactStoreError, RepositoryError, RepositoryResult};
use vigil::domain::models::{Config, PlanStep, RelationshipPatch, RelationshipRecord, UserFact};
use vigil::domain::ports::{
    MemoryGateway, RelationshipRepository, ToolExecutionContext, ToolInvoker, ToolOutput,
    UserFactSource,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// What a scripted tool does when invoked.
#[derive(Debug, Clone)]
pub enum ToolScript {
    Respond(ToolOutput),
    Fail(String),
    Delay(Duration, ToolOutput),
}

/// A recorded invocation.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool_name: String,
    pub params: Value,
    pub context: ToolExecutionContext,
}

/// Tool invoker that replays scripted responses and records every call.
///
/// Unscripted tools raise an error.
#[derive(Default)]
pub struct ScriptedToolInvoker {
    scripts: HashMap<String, ToolScript>,
    calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedToolInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, tool: &str, output: ToolOutput) -> Self {
        self.scripts.insert(tool.to_string(), ToolScript::Respond(output));
        self
    }

    pub fn with_error(mut self, tool: &str, message: &str) -> Self {
        self.scripts
            .insert(tool.to_string(), ToolScript::Fail(message.to_string()));
        self
    }

    pub fn with_delay(mut self, tool: &str, delay: Duration, output: ToolOutput) -> Self {
        self.scripts
            .insert(tool.to_string(), ToolScript::Delay(delay, output));
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl ToolInvoker for ScriptedToolInvoker {
    async fn execute(
        &self,
        tool_name: &str,
        params: &Value,
        context: &ToolExecutionContext,
    ) -> Result<ToolOutput> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(ToolCall {
                tool_name: tool_name.to_string(),
                params: params.clone(),
                context: context.clone(),
            });

        match self.scripts.get(tool_name) {
            Some(ToolScript::Respond(output)) => Ok(output.clone()),
            Some(ToolScript::Fail(message)) => Err(anyhow!(message.clone())),
            Some(ToolScript::Delay(delay, output)) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
            None => Err(anyhow!("tool '{tool_name}' is not scripted")),
        }
    }
}

/// Memory gateway that returns one scripted answer and records the steps it saw.
pub struct ScriptedMemoryGateway {
    answer: std::result::Result<Value, String>,
    steps: Mutex<Vec<(String, PlanStep)>>,
}

impl ScriptedMemoryGateway {
    pub fn returning(value: Value) -> Self {
        Self {
            answer: Ok(value),
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// (user id, step) pairs in call order.
    pub fn accessed(&self) -> Vec<(String, PlanStep)> {
        self.steps.lock().expect("steps lock poisoned").clone()
    }
}

#[async_trait]
impl MemoryGateway for ScriptedMemoryGateway {
    async fn access(&self, user_id: &str, step: &PlanStep) -> Result<Value> {
        self.steps
            .lock()
            .expect("steps lock poisoned")
            .push((user_id.to_string(), step.clone()));
        self.answer.clone().map_err(|message| anyhow!(message))
    }
}

/// Relationship repository whose every call fails.
pub struct FailingRelationshipRepository;

#[async_trait]
impl RelationshipRepository for FailingRelationshipRepository {
    async fn get(&self, _user_id: &str) -> RepositoryResult<Option<RelationshipRecord>> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn create(&self, _record: RelationshipRecord) -> RepositoryResult<RelationshipRecord> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn update(
        &self,
        _user_id: &str,
        _patch: &RelationshipPatch,
    ) -> RepositoryResult<RelationshipRecord> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _user_id: &str) -> RepositoryResult<bool> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

/// Fact source whose every call fails.
pub struct FailingFactSource;

#[async_trait]
impl UserFactSource for FailingFactSource {
    async fn list_locked_facts(&self, _user_id: &str) -> Result<Vec<UserFact>, FactStoreError> {
        Err(FactStoreError::Unavailable("timeout".to_string()))
    }

    async fn list_facts_ordered(&self, _user_id: &str) -> Result<Vec<UserFact>, FactStoreError> {
        Err(FactStoreError::Unavailable("timeout".to_string()))
    }
}

/// Pipeline over in-memory adapters plus handles to inspect them.
pub struct TestPipeline {
    pub pipeline: DecisionPipeline,
    pub invoker: Arc<ScriptedToolInvoker>,
    pub relationships: Arc<InMemoryRelationshipRepository>,
    pub facts: Arc<InMemoryFactStore>,
    pub sink: Arc<InMemoryAuditSink>,
}

pub fn test_pipeline(config: &Config, invoker: ScriptedToolInvoker) -> TestPipeline {
    build_test_pipeline(config, invoker, None)
}

/// Same as [`test_pipeline`] with a memory gateway wired in.
pub fn test_pipeline_with_memory(
    config: &Config,
    invoker: ScriptedToolInvoker,
    memory: Arc<ScriptedMemoryGateway>,
) -> TestPipeline {
    build_test_pipeline(config, invoker, Some(memory))
}

fn build_test_pipeline(
    config: &Config,
    invoker: ScriptedToolInvoker,
    memory: Option<Arc<ScriptedMemoryGateway>>,
) -> TestPipeline {
    let invoker = Arc::new(invoker);
    let relationships = Arc::new(InMemoryRelationshipRepository::new());
    let facts = Arc::new(InMemoryFactStore::new());
    let sink = Arc::new(InMemoryAuditSink::new());

    let pipeline = DecisionPipeline::from_config(
        config,
        PipelinePorts {
            tool_registry: Arc::new(StaticToolRegistry::from_names([
                "web_search",
                "run_command",
                "http_request",
            ])),
            tool_invoker: invoker.clone(),
            relationships: relationships.clone(),
            facts: facts.clone(),
            audit_sink: Some(sink.clone()),
            memory: memory.map(|m| m as Arc<dyn MemoryGateway>),
        },
    );

    TestPipeline {
        pipeline,
        invoker,
        relationships,
        facts,
        sink,
    }
}
