//! Async dispatcher (§4.G).
//!
//! An `is_async` tool call returns a pending-call receipt immediately and
//! runs the handler on a background task tracked by `ShutdownCoordinator`
//! so shutdown can wait for in-flight work to drain. The caller polls
//! `tools/call` again with `mcp_function_call_uuid` to retrieve the
//! result; a `Notify` per call lets an in-process poll return as soon as
//! the task finishes instead of blindly sleeping out the poll interval.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use conduit_core::error::{ConduitError, Result};
use conduit_core::types::{CallStatus, McpFunctionCall};
use conduit_resilience::shutdown::ShutdownCoordinator;
use serde_json::Value;
use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;

use crate::content::ToolContent;
use crate::dispatch::DispatchEngine;

/// Poll budget before falling back to "still running": poll every
/// 500ms for up to 3s.
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLL_BUDGET: Duration = Duration::from_secs(3);

pub struct AsyncDispatcher {
    engine: Arc<DispatchEngine>,
    shutdown: Arc<ShutdownCoordinator>,
    notifiers: StdMutex<HashMap<String, Arc<Notify>>>,
}

impl AsyncDispatcher {
    pub fn new(engine: Arc<DispatchEngine>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            engine,
            shutdown,
            notifiers: StdMutex::new(HashMap::new()),
        }
    }

    fn notifier_for(&self, call_uuid: &str) -> Arc<Notify> {
        self.notifiers
            .lock()
            .expect("notifier map poisoned")
            .entry(call_uuid.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    fn drop_notifier(&self, call_uuid: &str) {
        self.notifiers.lock().expect("notifier map poisoned").remove(call_uuid);
    }

    /// `tools/call` entrypoint for an `is_async` tool (§4.G steps 1-4).
    ///
    /// When `mcp_function_call_uuid` is absent, creates a new call record,
    /// spawns the handler invocation in the background, and returns a
    /// pending receipt immediately. When present, looks the record up: if
    /// still running, waits up to `POLL_BUDGET` for completion before
    /// returning another pending receipt; if finished, returns its result.
    pub async fn dispatch(
        &self,
        partition_key: &str,
        name: &str,
        arguments: Value,
        existing_call_uuid: Option<&str>,
    ) -> Result<Value> {
        if partition_key == "default" {
            return Err(ConduitError::InvalidArgument(
                "async tools cannot be dispatched against the default partition".to_string(),
            ));
        }

        if let Some(call_uuid) = existing_call_uuid {
            return self.poll(partition_key, call_uuid).await;
        }

        let record = McpFunctionCall {
            call_uuid: Uuid::new_v4().to_string(),
            name: name.to_string(),
            mcp_type: conduit_core::types::McpType::Tool,
            arguments: arguments.clone(),
            status: CallStatus::Initial,
            has_content: false,
            content: None,
            notes: None,
            time_spent_ms: None,
            updated_by: "system".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let record = self.engine.metadata.create_call(partition_key, record).await?;
        let call_uuid = record.call_uuid.clone();

        self.spawn(partition_key.to_string(), name.to_string(), arguments, call_uuid.clone());

        Ok(pending_value(&call_uuid, "in_process", None))
    }

    fn spawn(&self, partition_key: String, name: String, arguments: Value, call_uuid: String) {
        let engine = self.engine.clone();
        let shutdown = self.shutdown.clone();
        let notify = self.notifier_for(&call_uuid);

        tokio::spawn(async move {
            shutdown.task_started().await;
            let outcome = engine
                .call_tool(&partition_key, &name, arguments, Some(&call_uuid))
                .await;
            if let Err(e) = outcome {
                warn!(call_uuid, error = %e, "async tool invocation failed");
            }
            notify.notify_waiters();
            shutdown.task_completed().await;
        });
    }

    async fn poll(&self, partition_key: &str, call_uuid: &str) -> Result<Value> {
        let notify = self.notifier_for(call_uuid);

        let deadline = tokio::time::Instant::now() + POLL_BUDGET;
        let mut first_tick = true;
        loop {
            let record = self
                .engine
                .metadata
                .get_call(partition_key, call_uuid)
                .await?
                .ok_or_else(|| ConduitError::Internal(format!("call record {call_uuid} not found")))?;

            if first_tick {
                first_tick = false;
                if record.status == CallStatus::Initial {
                    let _ = self
                        .engine
                        .metadata
                        .update_call(
                            partition_key,
                            call_uuid,
                            conduit_core::types::CallUpdate {
                                status: Some(CallStatus::InProcess),
                                ..Default::default()
                            },
                        )
                        .await;
                }
            }

            match record.status {
                CallStatus::Completed => {
                    self.drop_notifier(call_uuid);
                    let full = self
                        .engine
                        .get_call_content(partition_key, call_uuid)
                        .await?
                        .expect("record just observed to exist");
                    let raw: Value = match &full.content {
                        Some(text) => serde_json::from_str(text).unwrap_or(Value::String(text.clone())),
                        None => Value::Null,
                    };
                    return Ok(raw);
                }
                CallStatus::Failed => {
                    self.drop_notifier(call_uuid);
                    return Ok(pending_value(call_uuid, "failed", record.notes.as_deref()));
                }
                CallStatus::Initial | CallStatus::InProcess => {
                    if tokio::time::Instant::now() >= deadline {
                        return Ok(pending_value(call_uuid, "in_process", None));
                    }
                    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                    let _ = tokio::time::timeout(remaining.min(POLL_INTERVAL), notify.notified()).await;
                }
            }
        }
    }
}

fn pending_value(call_uuid: &str, status: &str, notes: Option<&str>) -> Value {
    let content = ToolContent::pending_call(call_uuid, status, notes);
    serde_json::to_value(content).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_value_is_embedded_resource() {
        let v = pending_value("abc", "in_process", None);
        assert_eq!(v["type"], "embedded_resource");
        assert_eq!(v["resource"]["uri"], "mcp://function-call/abc");
    }
}
