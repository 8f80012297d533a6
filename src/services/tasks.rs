use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::auth::CurrentUser;
use crate::db::repository;
use crate::error::AppError;
use crate::mail::Mailer;
use crate::models::task::{DEFAULT_ASSIGNEE, DEFAULT_CATEGORY};
use crate::models::{NewTask, NewTaskRequest, Task, UpdateStatusRequest};
use crate::services::notification::spawn_notify_assignment;

/// Task operations. Every query is scoped to the caller's couple; tasks of
/// other couples behave exactly like missing ones.
pub struct TaskService {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
}

impl TaskService {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub async fn list(&self, user: &CurrentUser) -> Result<Vec<Task>, AppError> {
        let tasks = repository::find_tasks_by_couple(&self.db, user.couple_id).await?;
        Ok(tasks)
    }

    pub async fn add(&self, user: &CurrentUser, req: NewTaskRequest) -> Result<Task, AppError> {
        let content = match req.task {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Err(AppError::Validation("Task content is required".to_string())),
        };

        let new_task = NewTask {
            content,
            category: req.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            deadline: req.deadline,
            assigned_to: req.assigned_to.unwrap_or_else(|| DEFAULT_ASSIGNEE.to_string()),
        };

        let task = repository::insert_task(&self.db, user.couple_id, new_task).await?;
        info!(task_id = task.id, couple_id = task.couple_id, "task added");

        if task.notifies_partner() {
            self.notify_partner(user, &task).await;
        }

        Ok(task)
    }

    pub async fn update_status(
        &self,
        user: &CurrentUser,
        task_id: i64,
        req: UpdateStatusRequest,
    ) -> Result<Task, AppError> {
        let status = req
            .status
            .ok_or_else(|| AppError::Validation("status is required".to_string()))?;

        let task = repository::update_task_status(&self.db, task_id, user.couple_id, &status)
            .await?
            .ok_or_else(AppError::task_not_found)?;

        info!(task_id, status = %task.status, "task status updated");
        Ok(task)
    }

    pub async fn delete(&self, user: &CurrentUser, task_id: i64) -> Result<(), AppError> {
        let deleted = repository::delete_task(&self.db, task_id, user.couple_id).await?;
        if deleted {
            info!(task_id, "task deleted");
            Ok(())
        } else {
            Err(AppError::task_not_found())
        }
    }

    /// Emails the first other member of the couple, if there is one.
    /// Nothing here can fail the request that created the task.
    async fn notify_partner(&self, user: &CurrentUser, task: &Task) {
        let partner = match repository::find_partner(&self.db, user.couple_id, user.id).await {
            Ok(Some(partner)) => partner,
            Ok(None) => {
                debug!(couple_id = user.couple_id, "no partner to notify");
                return;
            }
            Err(e) => {
                warn!("partner lookup failed, skipping notification: {}", e);
                return;
            }
        };

        spawn_notify_assignment(
            self.mailer.clone(),
            task.content.clone(),
            task.assigned_to.clone(),
            partner.email,
        );
    }
}
