//! Tool collaborator seam and the name-keyed registry implementing it.

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::validation::validate_arguments;
use crate::error::ParleyError;
use crate::types::ToolSchema;

/// Executes tool calls on behalf of a turn.
///
/// Every failure comes back as an `Err`; the turn folds it into history as
/// that call's result.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Schemas advertised to the model.
    fn schemas(&self) -> Vec<ToolSchema>;

    async fn execute(
        &self,
        tool_name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, ParleyError>;
}

/// Tools keyed by name, in registration order.
///
/// Arguments are checked against the tool's schema before it runs, so tool
/// bodies only ever see argument objects of the advertised shape.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing any tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) -> &mut Self {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|t| ToolSchema::function(t.name(), t.description(), t.parameters().schema.clone()))
            .collect()
    }

    async fn execute(
        &self,
        tool_name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, ParleyError> {
        let tool = self
            .get(tool_name)
            .ok_or_else(|| ParleyError::tool(tool_name, "unknown tool"))?;

        validate_arguments(args.raw(), &tool.parameters().schema)
            .map_err(|violation| ParleyError::tool(tool_name, violation.to_string()))?;

        let outcome = match tool.timeout() {
            Some(limit) => tokio::time::timeout(limit, tool.execute(args, ctx))
                .await
                .unwrap_or_else(|_| Err(ParleyError::Timeout(limit.as_millis() as u64))),
            None => tool.execute(args, ctx).await,
        };
        outcome.map_err(|err| match err {
            err @ ParleyError::ToolExecution { .. } => err,
            other => ParleyError::tool(tool_name, other.to_string()),
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
