use super::stream_phase::RoundOutput;
use super::{debug_enabled, result_text, TurnRun};
use crate::error::ParleyError;
use crate::tools::{ToolArguments, ToolExecutionContext};
use crate::turn::events::TurnEvent;
use crate::turn::types::TurnState;
use crate::types::{ChatMessage, ToolCallStatus, ToolTrace};

pub(super) enum ToolPhaseOutcome {
    /// Every call settled; start the next round.
    Continue,
    Canceled,
    Failed(ParleyError),
}

impl TurnRun {
    /// Execute the round's tool calls one at a time, in declaration order.
    pub(super) async fn run_tool_phase(&mut self, round: RoundOutput) -> ToolPhaseOutcome {
        let Some(executor) = self.request.tools.clone() else {
            let tool_name = round
                .tool_calls
                .first()
                .map(|call| call.function.name.clone())
                .unwrap_or_default();
            return ToolPhaseOutcome::Failed(ParleyError::ToolCapability { tool_name });
        };

        let calls = round.tool_calls.clone();
        self.history.push(ChatMessage::from(round));
        self.set_state(TurnState::ExecutingTools);

        let max = self.max_tool_calls();
        for call in calls {
            if self.cancel.is_cancelled() {
                return ToolPhaseOutcome::Canceled;
            }
            if self.tool_calls_used >= max {
                return ToolPhaseOutcome::Failed(ParleyError::ToolBudgetExceeded { max });
            }
            self.tool_calls_used += 1;

            let call_id = format!("call_{}", self.tool_calls_used);
            let tool_name = call.function.name;
            let args = ToolArguments::new(call.function.arguments);

            self.events.emit(TurnEvent::ToolCallStarted {
                call_id: call_id.clone(),
                tool_name: tool_name.clone(),
                args: args.raw().clone(),
            });
            let trace_id = self.queue.record_tool_started(
                Some(&self.answering_at),
                ToolTrace::running(&call_id, &tool_name, args.to_map()),
            );

            let ctx = ToolExecutionContext::new(&call_id, &tool_name);
            let (result, status) = match executor.execute(&tool_name, &args, &ctx).await {
                Ok(value) => (value, ToolCallStatus::Done),
                Err(err) => {
                    tracing::debug!(tool = %tool_name, call_id = %call_id, error = %err, "tool call failed");
                    (serde_json::Value::String(err.to_string()), ToolCallStatus::Error)
                }
            };
            if debug_enabled() {
                tracing::debug!(tool = %tool_name, call_id = %call_id, %status, "tool call settled");
            }

            self.queue
                .record_tool_finished(&trace_id, result.clone(), status);
            self.history
                .push(ChatMessage::tool_result(&tool_name, result_text(&result)));
            self.events.emit(TurnEvent::ToolCallFinished {
                call_id,
                tool_name,
                args: args.raw().clone(),
                result,
                is_error: status == ToolCallStatus::Error,
            });
        }

        if self.cancel.is_cancelled() {
            return ToolPhaseOutcome::Canceled;
        }
        ToolPhaseOutcome::Continue
    }
}
