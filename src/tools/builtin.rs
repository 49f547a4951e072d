//! Small read-only tools offered by the CLI.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::registry::ToolRegistry;
use super::tool::{AgentTool, ToolExecutionContext};
use super::types::AgentToolParameters;
use crate::error::ParleyError;

const READ_FILE_MAX_BYTES: usize = 65_536;
const READ_FILE_TIMEOUT: Duration = Duration::from_secs(10);

/// `current_time`: local date and time, RFC 3339.
pub fn current_time_tool() -> AgentTool {
    AgentTool::new(
        "current_time",
        "Return the current local date and time",
        AgentToolParameters::empty(),
        |_args, _ctx| async move {
            let now = chrono::Local::now();
            Ok(json!({ "now": now.to_rfc3339(), "weekday": now.format("%A").to_string() }))
        },
    )
}

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

/// `read_file`: UTF-8 (lossy) contents of a file, truncated at 64 KiB.
pub fn read_file_tool() -> AgentTool {
    AgentTool::typed(
        "read_file",
        "Read a text file from the local filesystem",
        AgentToolParameters::object()
            .string("path", "Path of the file to read", true)
            .build(),
        |args: ReadFileArgs, _ctx: ToolExecutionContext| async move {
            let bytes = tokio::fs::read(&args.path)
                .await
                .map_err(|e| ParleyError::tool("read_file", format!("{}: {e}", args.path)))?;
            let truncated = bytes.len() > READ_FILE_MAX_BYTES;
            let text = String::from_utf8_lossy(&bytes[..bytes.len().min(READ_FILE_MAX_BYTES)]);
            Ok(json!({ "path": args.path, "content": text, "truncated": truncated }))
        },
    )
    .with_timeout(READ_FILE_TIMEOUT)
}

/// Registry holding every built-in tool.
pub fn builtin_registry() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(current_time_tool())
        .with_tool(read_file_tool())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolArguments, ToolExecutor};
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_file_returns_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let result = builtin_registry()
            .execute(
                "read_file",
                &ToolArguments::new(json!({ "path": path.to_string_lossy() })),
                &ToolExecutionContext::new("call_1", "read_file"),
            )
            .await
            .unwrap();

        assert_eq!(result["content"], "hello");
        assert_eq!(result["truncated"], false);
    }

    #[tokio::test]
    async fn read_file_missing_path_is_tool_error() {
        let err = builtin_registry()
            .execute(
                "read_file",
                &ToolArguments::new(json!({ "path": "/definitely/not/here" })),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn current_time_reports_rfc3339() {
        let result = builtin_registry()
            .execute(
                "current_time",
                &ToolArguments::new(json!({})),
                &ToolExecutionContext::default(),
            )
            .await
            .unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(result["now"].as_str().unwrap()).is_ok());
    }
}
