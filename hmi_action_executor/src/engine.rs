//! Action tree interpreter
//!
//! [`ActionEngine::execute`] walks an [`ActionTree`] from its root. Node
//! failures are logged and recorded in the [`RunReport`]; they never stop
//! sibling nodes and never surface as an error of `execute` itself.
//!
//! # Cancellation
//!
//! [`ActionEngine::abort`] is observed before every node, between children
//! of serial groups and condition branches, and by pending waits (which
//! resolve immediately). Children of a parallel group that were already
//! started run to their next cancellation point.

use crate::compare;
use crate::document::{
    ActionKind, ActionNode, ActionTree, ChildRef, ConditionAction, DataType, ExecutionMode,
    SetAction, ValueSource, WaitAction,
};
use crate::error::ActionError;
use crate::provider::{Navigator, TagValueProvider};
use futures_util::future::{BoxFuture, FutureExt, join_all};
use hmi_common::value::{TagType, TagValue};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Failed node and its error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    /// Node id
    pub id: String,
    /// Error text
    pub message: String,
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Nodes that completed, in completion order
    pub executed: Vec<String>,
    /// `TOGGLE`, `SCRIPT` and unknown nodes, reached but not executed
    pub noops: Vec<String>,
    /// Disabled nodes
    pub skipped: Vec<String>,
    /// Nodes that failed
    pub failures: Vec<NodeFailure>,
    /// Whether the run was aborted
    pub cancelled: bool,
}

impl RunReport {
    /// No failures and not cancelled.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Whether node `id` completed.
    pub fn ran(&self, id: &str) -> bool {
        self.executed.iter().any(|e| e == id)
    }
}

/// Interpreter for action trees.
pub struct ActionEngine {
    provider: Arc<dyn TagValueProvider>,
    navigator: Arc<dyn Navigator>,
    cancel: watch::Sender<bool>,
}

impl ActionEngine {
    /// Engine acting through `provider` and `navigator`.
    pub fn new(provider: Arc<dyn TagValueProvider>, navigator: Arc<dyn Navigator>) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            provider,
            navigator,
            cancel,
        }
    }

    /// Stop the current run at the next cancellation point.
    pub fn abort(&self) {
        self.cancel.send_replace(true);
    }

    /// Clear a previous abort so the engine can run again.
    pub fn reset(&self) {
        self.cancel.send_replace(false);
    }

    /// Whether an abort is pending.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Run `tree` from its root.
    pub async fn execute(&self, tree: &ActionTree) -> RunReport {
        let report = Mutex::new(RunReport::default());
        info!(root = %tree.root_id(), nodes = tree.len(), "▶️ Running action tree");

        self.run_node(tree, tree.root_id(), &report).await;

        let mut report = report.into_inner();
        report.cancelled = self.is_cancelled();
        info!(
            executed = report.executed.len(),
            noops = report.noops.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "⏹️ Action tree finished"
        );
        report
    }

    fn run_node<'a>(
        &'a self,
        tree: &'a ActionTree,
        id: &'a str,
        report: &'a Mutex<RunReport>,
    ) -> BoxFuture<'a, ()> {
        async move {
            if self.is_cancelled() {
                return;
            }
            let Some(node) = tree.get(id) else {
                let error = ActionError::MissingNode { id: id.to_string() };
                record_failure(report, id, &error);
                return;
            };
            if !node.enabled {
                debug!(node = %id, "Node disabled, skipped");
                report.lock().skipped.push(id.to_string());
                return;
            }

            debug!(node = %id, kind = node.kind.label(), name = %node.name, "Executing node");
            match self.run_kind(tree, node, report).await {
                Ok(true) => report.lock().executed.push(id.to_string()),
                Ok(false) => report.lock().noops.push(id.to_string()),
                Err(error) => record_failure(report, id, &error),
            }
        }
        .boxed()
    }

    /// Returns `Ok(false)` for kinds that are reached but not executed.
    async fn run_kind(
        &self,
        tree: &ActionTree,
        node: &ActionNode,
        report: &Mutex<RunReport>,
    ) -> Result<bool, ActionError> {
        match &node.kind {
            ActionKind::Group(group) => {
                match group.execution_mode {
                    ExecutionMode::Serial => self.run_serial(tree, &group.children, report).await,
                    ExecutionMode::Parallel => {
                        join_all(
                            group
                                .children
                                .iter()
                                .map(|child| self.run_node(tree, &child.id, report)),
                        )
                        .await;
                    }
                }
                Ok(true)
            }
            ActionKind::Set(set) => self.run_set(set).await.map(|()| true),
            ActionKind::Wait(wait) => {
                self.run_wait(wait).await;
                Ok(true)
            }
            ActionKind::Condition(condition) => {
                self.run_condition(tree, node, condition, report).await;
                Ok(true)
            }
            ActionKind::Navigate(nav) => {
                self.navigator.navigate(&nav.target_path, nav.target_type);
                Ok(true)
            }
            ActionKind::Toggle(_) | ActionKind::Script(_) | ActionKind::Unknown => {
                warn!(node = %node.id, kind = node.kind.label(), "Action kind is not executed");
                Ok(false)
            }
        }
    }

    async fn run_serial(
        &self,
        tree: &ActionTree,
        children: &[ChildRef],
        report: &Mutex<RunReport>,
    ) {
        for child in children {
            if self.is_cancelled() {
                break;
            }
            self.run_node(tree, &child.id, report).await;
        }
    }

    async fn run_set(&self, set: &SetAction) -> Result<(), ActionError> {
        let value = match set.value_source {
            ValueSource::Static => set.value.clone(),
            ValueSource::Tag => {
                let source = set.value.to_string();
                self.provider
                    .get(&source)
                    .ok_or(ActionError::SourceUnavailable { tag: source })?
            }
        };
        let value = convert(value, set.data_type)?;

        let results = join_all(
            set.target_ids
                .iter()
                .map(|tag| self.provider.set(tag, value.clone())),
        )
        .await;

        let mut first_error = None;
        for (tag, result) in set.target_ids.iter().zip(results) {
            if let Err(source) = result {
                warn!(%tag, error = %source, "Tag write failed");
                first_error.get_or_insert(ActionError::Write {
                    tag: tag.clone(),
                    source,
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn run_wait(&self, wait: &WaitAction) {
        let mut cancelled = self.cancel.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(wait.delay()) => {}
            _ = cancelled.wait_for(|c| *c) => {}
        }
    }

    async fn run_condition(
        &self,
        tree: &ActionTree,
        node: &ActionNode,
        condition: &ConditionAction,
        report: &Mutex<RunReport>,
    ) {
        if condition.operator.parse::<compare::Operator>().is_err() {
            warn!(
                node = %node.id,
                operator = %condition.operator,
                "Unknown operator, condition is false"
            );
        }

        let current = self.provider.get(&condition.target_id);
        let shown = current
            .as_ref()
            .map_or_else(|| compare::UNDEFINED.to_string(), ToString::to_string);
        let holds = compare::evaluate(
            current.as_ref(),
            &condition.operator,
            condition.reference_value.as_ref(),
        );
        debug!(
            node = %node.id,
            tag = %condition.target_id,
            value = %shown,
            holds,
            "Condition evaluated"
        );

        let branch = if holds {
            &condition.then_branch
        } else {
            &condition.else_branch
        };
        self.run_serial(tree, branch, report).await;
    }
}

fn record_failure(report: &Mutex<RunReport>, id: &str, error: &ActionError) {
    warn!(node = %id, %error, "Node failed");
    report.lock().failures.push(NodeFailure {
        id: id.to_string(),
        message: error.to_string(),
    });
}

/// Apply a `SET` data type to a value.
fn convert(value: TagValue, data_type: Option<DataType>) -> Result<TagValue, ActionError> {
    Ok(match data_type {
        None => value,
        Some(DataType::String) => value.coerce(TagType::String)?,
        Some(DataType::Boolean) => value.coerce(TagType::Bool)?,
        Some(DataType::Number) => {
            let number = value.coerce(TagType::Float64)?;
            match number {
                TagValue::Float64(n) if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 => {
                    TagValue::Int64(n as i64)
                }
                other => other,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_number() {
        assert_eq!(
            convert(TagValue::from("42"), Some(DataType::Number)).unwrap(),
            TagValue::Int64(42)
        );
        assert_eq!(
            convert(TagValue::from("0.5"), Some(DataType::Number)).unwrap(),
            TagValue::Float64(0.5)
        );
        assert!(convert(TagValue::from("n/a"), Some(DataType::Number)).is_err());
    }

    #[test]
    fn test_convert_other_types() {
        assert_eq!(
            convert(TagValue::Int64(0), Some(DataType::Boolean)).unwrap(),
            TagValue::Bool(false)
        );
        assert_eq!(
            convert(TagValue::Bool(true), Some(DataType::String)).unwrap(),
            TagValue::from("true")
        );
        assert_eq!(convert(TagValue::Int32(5), None).unwrap(), TagValue::Int32(5));
    }

    #[test]
    fn test_report_helpers() {
        let mut report = RunReport::default();
        assert!(report.is_success());
        report.executed.push("a".into());
        assert!(report.ran("a"));
        report.cancelled = true;
        assert!(!report.is_success());
    }
}
