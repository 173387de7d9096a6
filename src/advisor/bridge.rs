//! Tool invocation bridge.
//!
//! Executes the tool calls carried by one LLM response and feeds each result
//! back into the exchange history as a `role: "tool"` message. The bridge
//! enforces the per-exchange tool-call budget and never produces analysis or
//! judgment of its own. Catalog failures arrive here already rendered as
//! in-band `Error: ...` strings, so nothing this module does can abort an
//! exchange.

use serde_json::Value;
use tracing::{debug, warn};

use super::tools::ToolRegistry;
use crate::providers::base::ToolCallRequest;

/// Exchange-scoped executor for role-requested tool calls.
pub struct ToolBridge<'a> {
    registry: &'a ToolRegistry,
    max_calls: u32,
    calls_used: u32,
}

impl<'a> ToolBridge<'a> {
    pub fn new(registry: &'a ToolRegistry, max_calls: u32) -> Self {
        Self { registry, max_calls, calls_used: 0 }
    }

    /// Tool invocations executed so far in this exchange.
    pub fn calls_used(&self) -> u32 {
        self.calls_used
    }

    /// True once the per-exchange budget is spent; the exchange should end.
    pub fn budget_exhausted(&self) -> bool {
        self.calls_used >= self.max_calls
    }

    /// Execute one response's tool calls, appending a tool-result message per
    /// call. Calls past the budget still receive a result message (the
    /// protocol requires every call to be answered) but carry an in-band
    /// budget note instead of data.
    ///
    /// The caller appends the assistant message holding the tool calls
    /// before invoking this; the bridge only appends results.
    pub async fn respond(&mut self, calls: &[ToolCallRequest], messages: &mut Vec<Value>) {
        for call in calls {
            if self.budget_exhausted() {
                warn!(
                    "tool-call budget ({}) exhausted; declining '{}'",
                    self.max_calls, call.name
                );
                messages.push(tool_result_message(
                    &call.id,
                    "Error: tool-call budget exhausted for this exchange",
                ));
                continue;
            }

            self.calls_used += 1;
            debug!(
                "executing tool '{}' ({}/{})",
                call.name, self.calls_used, self.max_calls
            );
            let result = self.registry.execute(&call.name, call.arguments.clone()).await;
            messages.push(tool_result_message(&call.id, &result));
        }
    }
}

/// A `role: "tool"` exchange message.
fn tool_result_message(tool_call_id: &str, content: &str) -> Value {
    serde_json::json!({
        "role": "tool",
        "tool_call_id": tool_call_id,
        "content": content,
    })
}
