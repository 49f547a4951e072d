//! The `Tool` trait and `AgentTool`, a tool built from a closure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::arguments::ToolArguments;
use super::types::AgentToolParameters;
use crate::error::ParleyError;

/// Identity of the call being executed, plus free-form metadata.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Turn-scoped call identifier (`call_1`, `call_2`, ...).
    pub call_id: String,
    /// Name the model used to invoke the tool.
    pub tool_name: String,
    /// Caller-supplied extras; `Null` unless set.
    pub metadata: serde_json::Value,
}

impl ToolExecutionContext {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Core tool trait. Implement to expose a named callable to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &str;

    /// One-line description advertised with the schema.
    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters(&self) -> &AgentToolParameters;

    /// Deadline for one execution; exceeding it is an ordinary tool failure.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Execute the tool with validated arguments.
    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, ParleyError>;
}

type HandlerFn = dyn Fn(
        ToolArguments,
        ToolExecutionContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ParleyError>> + Send>>
    + Send
    + Sync;

/// A tool whose behavior is a boxed async closure.
pub struct AgentTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    timeout: Option<Duration>,
    handler: Arc<HandlerFn>,
}

impl AgentTool {
    /// Create a tool from a closure over raw arguments.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, ParleyError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            timeout: None,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }

    /// Create a tool whose arguments are decoded into `A` before the closure runs.
    ///
    /// A decode failure is reported as [`ParleyError::InvalidArgument`] and the
    /// closure is not called.
    pub fn typed<A, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, ParleyError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        Self::new(name, description, parameters, move |args, ctx| {
            let handler = Arc::clone(&handler);
            async move {
                let decoded: A = args.deserialize()?;
                handler(decoded, ctx).await
            }
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value, ParleyError> {
        (self.handler)(args.clone(), ctx.clone()).await
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("timeout", &self.timeout)
            .finish()
    }
}
