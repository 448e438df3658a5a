use serde_json::Value;

use crate::flow::Branch;

/// What a block hands back to the executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Payload recorded in the run's outputs.
    pub output: Option<Value>,
    /// Explicit branch chosen by decision blocks.
    pub branch: Option<Branch>,
    /// `Some(false)` stops traversal of the node's children.
    pub next: Option<bool>,
    /// The block wrote a terminal response.
    pub sent: bool,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn output(value: Value) -> Self {
        Outcome {
            output: Some(value),
            next: Some(true),
            ..Default::default()
        }
    }

    pub fn branch(branch: Branch) -> Self {
        Outcome {
            branch: Some(branch),
            ..Default::default()
        }
    }

    pub fn stop(mut self) -> Self {
        self.next = Some(false);
        self
    }

    pub fn sent(mut self) -> Self {
        self.sent = true;
        self
    }

    pub fn continues(&self) -> bool {
        self.next != Some(false)
    }
}
