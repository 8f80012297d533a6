use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_STATUS: &str = "Pending";
pub const DEFAULT_ASSIGNEE: &str = "Both";

/// Assignee labels that make the partner responsible and trigger an email.
pub const PARTNER_ASSIGNEES: [&str; 2] = ["Partner", "Both"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub content: String,
    pub category: String,
    pub deadline: Option<String>,
    pub status: String,
    pub assigned_to: String,
    #[serde(skip)]
    pub couple_id: i64,
}

impl Task {
    pub fn notifies_partner(&self) -> bool {
        PARTNER_ASSIGNEES.contains(&self.assigned_to.as_str())
    }
}

/// Body of `POST /api/tasks`. The content travels under the `task` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub task: Option<String>,
    pub category: Option<String>,
    pub deadline: Option<String>,
    pub assigned_to: Option<String>,
}

/// Validated task ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub content: String,
    pub category: String,
    pub deadline: Option<String>,
    pub assigned_to: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}
