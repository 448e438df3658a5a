use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{HookflowError, Result};
use crate::value::render;

/// One configured step of a flow.
///
/// `kind` selects the block that executes the node; `data` carries its
/// configuration, where string values may contain `{path}` templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub data: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_empty_vec")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

fn null_as_empty_map<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Node>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn on_branch(mut self, branch: Branch) -> Self {
        self.branch = Some(branch.as_str().to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Configuration value as text: strings verbatim, scalars rendered,
    /// missing or null keys as `""`.
    pub fn text(&self, key: &str) -> String {
        self.data.get(key).map(render).unwrap_or_default()
    }

    /// Trimmed configuration text, `None` when empty.
    pub fn non_empty(&self, key: &str) -> Option<String> {
        let text = self.text(key);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Branch label of this node when it is the child of a conditional.
    ///
    /// The explicit `branch` field wins; authoring tools store the label in
    /// `data.path`.
    pub fn branch(&self) -> Option<Branch> {
        match &self.branch {
            Some(label) => Branch::from_label(label),
            None => self
                .data
                .get("path")
                .and_then(Value::as_str)
                .and_then(Branch::from_label),
        }
    }

    /// `key: value` pairs configured as a list of `{key, value}` objects.
    pub fn pairs(&self, key: &str) -> Vec<(String, String)> {
        let Some(Value::Array(items)) = self.data.get(key) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| {
                let name = item.get("key").and_then(Value::as_str)?.trim();
                if name.is_empty() {
                    return None;
                }
                let value = item.get("value").map(render).unwrap_or_default();
                Some((name.to_string(), value))
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// The label routing a child of a conditional node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Condition,
    Else,
}

impl Branch {
    pub fn from_label(label: &str) -> Option<Branch> {
        match label.trim() {
            "condition" | "true" | "then" => Some(Branch::Condition),
            "else" | "false" => Some(Branch::Else),
            _ => None,
        }
    }

    pub fn from_decision(decision: bool) -> Branch {
        if decision {
            Branch::Condition
        } else {
            Branch::Else
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::Condition => "condition",
            Branch::Else => "else",
        }
    }

    pub fn matches(&self, decision: bool) -> bool {
        *self == Branch::from_decision(decision)
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query parameter declared by the flow's endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub key: String,
    #[serde(default, alias = "defaultValue")]
    pub default_value: Option<Value>,
}

/// A loaded flow: the root node plus the endpoint metadata stored on it.
#[derive(Debug, Clone)]
pub struct Flow {
    root: Node,
    json: Value,
}

impl Flow {
    pub fn from_node(root: Node) -> Self {
        let json = serde_json::to_value(&root).unwrap_or(Value::Null);
        Flow { root, json }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let root: Node = serde_json::from_value(value.clone()).map_err(|e| {
            HookflowError::FlowError {
                message: format!("invalid flow tree: {}", e),
            }
        })?;
        Ok(Flow { root, json: value })
    }

    pub fn parse(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)?;
        Self::from_json(value)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn slug(&self) -> String {
        self.root.text("slug")
    }

    pub fn query_params(&self) -> Vec<QueryParam> {
        match self.root.get("queryParams") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value::<QueryParam>(item.clone()).ok())
                .filter(|param| !param.key.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Declared query parameter defaults; a missing default is `""`.
    pub fn defaults(&self) -> Map<String, Value> {
        self.query_params()
            .into_iter()
            .map(|param| {
                let value = match param.default_value {
                    Some(Value::Null) | None => Value::String(String::new()),
                    Some(v) => v,
                };
                (param.key, value)
            })
            .collect()
    }

    pub fn to_json(&self) -> &Value {
        &self.json
    }
}
