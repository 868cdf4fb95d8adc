//! Action documents and the validated action tree
//!
//! A document is a flat list of nodes plus a root id. Groups and conditions
//! refer to other nodes by id, so one node may be shared by several parents.
//!
//! ```json
//! {
//!   "root": "start",
//!   "nodes": [
//!     { "id": "start", "type": "GROUP", "name": "Start",
//!       "executionMode": "serial",
//!       "children": [{ "id": "check", "type": "ACTION" }] },
//!     { "id": "check", "type": "CONDITION", "name": "Check",
//!       "targetId": "1:temp", "operator": ">", "referenceValue": 80,
//!       "then": [{ "id": "stop", "type": "ACTION" }] },
//!     { "id": "stop", "type": "SET", "name": "Stop",
//!       "targetIds": ["2:run"], "value": false }
//!   ]
//! }
//! ```

use crate::error::{DocumentError, DocumentResult};
use hmi_common::value::TagValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Raw action document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDocument {
    /// Id of the node to run
    pub root: String,
    /// All nodes, in any order
    pub nodes: Vec<ActionNode>,
}

/// One node with its common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionNode {
    /// Unique node id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Disabled nodes are skipped
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Kind-specific fields
    #[serde(flatten)]
    pub kind: ActionKind,
}

fn enabled_by_default() -> bool {
    true
}

impl ActionNode {
    /// Ids of the nodes this node can run.
    pub fn child_ids(&self) -> Vec<&str> {
        match &self.kind {
            ActionKind::Group(group) => group.children.iter().map(|c| c.id.as_str()).collect(),
            ActionKind::Condition(cond) => cond
                .then_branch
                .iter()
                .chain(cond.else_branch.iter())
                .map(|c| c.id.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Node kinds, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ActionKind {
    /// Container of child nodes
    Group(GroupAction),
    /// Write a value to tags
    Set(SetAction),
    /// Pause
    Wait(WaitAction),
    /// Branch on a tag value
    Condition(ConditionAction),
    /// Request a screen change
    Navigate(NavigateAction),
    /// Flip boolean tags (not executed)
    Toggle(ToggleAction),
    /// Scripted action (not executed)
    Script(ScriptAction),
    /// Unrecognized `type`
    #[serde(other)]
    Unknown,
}

impl ActionKind {
    /// Short name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Group(_) => "GROUP",
            Self::Set(_) => "SET",
            Self::Wait(_) => "WAIT",
            Self::Condition(_) => "CONDITION",
            Self::Navigate(_) => "NAVIGATE",
            Self::Toggle(_) => "TOGGLE",
            Self::Script(_) => "SCRIPT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Reference from a parent to a child node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    /// Child node id
    pub id: String,
    /// Editor hint (`GROUP` or `ACTION`), not used for execution
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ChildRef {
    /// Reference to `id` without a kind hint.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }
}

/// How a group runs its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One after another
    #[default]
    Serial,
    /// All at once
    Parallel,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAction {
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    #[serde(default)]
    pub children: Vec<ChildRef>,
}

/// Where a `SET` takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// `value` is the literal to write
    #[default]
    Static,
    /// `value` names a tag whose current value is written
    Tag,
}

/// Type a `SET` value is converted to before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Text
    String,
    /// Integer when integral, float otherwise
    Number,
    /// Boolean
    Boolean,
}

/// Write a value to one or more tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAction {
    /// Tags to write
    #[serde(default)]
    pub target_ids: Vec<String>,
    /// Literal value or source tag
    pub value: TagValue,
    /// Interpretation of `value`
    #[serde(default)]
    pub value_source: ValueSource,
    /// Optional conversion before writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

/// Pause for `duration` milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitAction {
    /// Milliseconds; negative or non-finite values mean no wait
    #[serde(default)]
    pub duration: f64,
}

impl WaitAction {
    /// Wait time as a `Duration`, saturating at `Duration::MAX`.
    pub fn delay(&self) -> Duration {
        if self.duration.is_finite() && self.duration > 0.0 {
            Duration::try_from_secs_f64(self.duration / 1000.0).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

/// Branch on a tag value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionAction {
    /// Tag to read
    pub target_id: String,
    /// Comparison operator (`>`, `>=`, `<`, `<=`, `==`, `!=`, `contains`)
    pub operator: String,
    /// Right-hand operand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<TagValue>,
    /// Nodes run when the comparison holds
    #[serde(rename = "then", default)]
    pub then_branch: Vec<ChildRef>,
    /// Nodes run otherwise
    #[serde(rename = "else", default)]
    pub else_branch: Vec<ChildRef>,
}

/// Navigation target kind.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigateKind {
    Page,
    Popup,
    Url,
    Window,
    Close,
}

impl std::fmt::Display for NavigateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Page => "page",
            Self::Popup => "popup",
            Self::Url => "url",
            Self::Window => "window",
            Self::Close => "close",
        };
        f.write_str(s)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateAction {
    pub target_type: NavigateKind,
    #[serde(default)]
    pub target_path: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAction {
    #[serde(default)]
    pub target_ids: Vec<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptAction {
    #[serde(default)]
    pub code: String,
}

/// Validated, immutable node arena.
#[derive(Debug, Clone)]
pub struct ActionTree {
    root: String,
    nodes: HashMap<String, ActionNode>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl ActionTree {
    /// Validate a document and build the arena.
    ///
    /// Rejects duplicate ids, a missing root, references to unknown nodes
    /// and cycles. Shared sub-trees are allowed.
    pub fn from_document(document: ActionDocument) -> DocumentResult<Self> {
        let mut nodes = HashMap::with_capacity(document.nodes.len());
        for node in document.nodes {
            if nodes.contains_key(&node.id) {
                return Err(DocumentError::DuplicateId { id: node.id });
            }
            nodes.insert(node.id.clone(), node);
        }

        if !nodes.contains_key(&document.root) {
            return Err(DocumentError::MissingRoot { id: document.root });
        }

        for node in nodes.values() {
            let missing = node
                .child_ids()
                .into_iter()
                .find(|id| !nodes.contains_key(*id));
            if let Some(missing) = missing {
                return Err(DocumentError::DanglingReference {
                    from: node.id.clone(),
                    to: missing.to_string(),
                });
            }
        }

        let tree = Self {
            root: document.root,
            nodes,
        };
        tree.check_acyclic()?;
        Ok(tree)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    /// Read, parse and validate a JSON document file.
    pub fn load(path: &Path) -> DocumentResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn check_acyclic(&self) -> DocumentResult<()> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.nodes.len());
        for id in self.nodes.keys() {
            self.visit(id, &mut marks)?;
        }
        Ok(())
    }

    fn visit<'a>(&'a self, id: &'a str, marks: &mut HashMap<&'a str, Mark>) -> DocumentResult<()> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(DocumentError::Cycle { id: id.to_string() }),
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        if let Some(node) = self.nodes.get(id) {
            for child in node.child_ids() {
                self.visit(child, marks)?;
            }
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    /// Root node id.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Root node.
    pub fn root(&self) -> Option<&ActionNode> {
        self.nodes.get(&self.root)
    }

    /// Node by id.
    pub fn get(&self, id: &str) -> Option<&ActionNode> {
        self.nodes.get(id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
