// Customer interaction history

use serde::{Deserialize, Serialize};

/// Interaction to append to a customer's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInteraction {
    pub direction: String,
    pub source: String,
    pub notes: Option<String>,
}

impl NewInteraction {
    /// Outbound interaction recorded by the workflow engine.
    pub fn outbound_from_workflow(notes: Option<String>) -> Self {
        Self {
            direction: "outbound".to_string(),
            source: "workflow".to_string(),
            notes,
        }
    }
}
