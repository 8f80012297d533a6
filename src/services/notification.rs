use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::mail::{Mailer, assignment_email};

/// Sends the assignment email. Delivery errors are logged and swallowed.
pub async fn notify_assignment(
    mailer: &dyn Mailer,
    task_content: &str,
    assignee: &str,
    recipient_email: &str,
) {
    let email = assignment_email(task_content, assignee, recipient_email);
    match mailer.send(&email).await {
        Ok(()) => info!("Email sent to {}", recipient_email),
        Err(e) => error!("Failed to send email to {}: {}", recipient_email, e),
    }
}

/// Fire-and-forget variant; the caller never waits on the transport.
pub fn spawn_notify_assignment(
    mailer: Arc<dyn Mailer>,
    task_content: String,
    assignee: String,
    recipient_email: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        notify_assignment(mailer.as_ref(), &task_content, &assignee, &recipient_email).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::mail::{EmailMessage, MailError};

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &EmailMessage) -> Result<(), MailError> {
            Err(MailError::Delivery("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_spawned_notification_delivers_template() {
        let mailer = Arc::new(RecordingMailer::default());
        spawn_notify_assignment(
            mailer.clone(),
            "Buy milk".to_string(),
            "Partner".to_string(),
            "b@x.com".to_string(),
        )
        .await
        .expect("task should not panic");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], assignment_email("Buy milk", "Partner", "b@x.com"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_contained() {
        let handle = spawn_notify_assignment(
            Arc::new(FailingMailer),
            "Buy milk".to_string(),
            "Both".to_string(),
            "b@x.com".to_string(),
        );
        assert!(handle.await.is_ok());
    }
}
