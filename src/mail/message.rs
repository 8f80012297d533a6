use serde::Serialize;

/// A plain-text email, independent of the transport that delivers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub const ASSIGNMENT_SUBJECT: &str = "New Goal in TwoDo! 🚀";

pub fn assignment_email(task_content: &str, assignee: &str, recipient: &str) -> EmailMessage {
    EmailMessage {
        to: recipient.to_string(),
        subject: ASSIGNMENT_SUBJECT.to_string(),
        body: format!(
            "Hi!\n\nA new task was added to TwoDo: '{}'\nResponsibility: {}\n\nCheck it out and let's get it done! ✨",
            task_content, assignee
        ),
    }
}
