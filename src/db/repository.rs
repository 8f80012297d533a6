use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::models::{Couple, NewTask, NewUser, Session, Task, User};

const TASK_COLUMNS: &str = "id, content, category, deadline, status, assigned_to, couple_id";
const USER_COLUMNS: &str = "id, username, email, password_hash, couple_id";

/// Fixed-width RFC 3339 form used for every stored timestamp.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Creates the user, joining the couple called `couple_name` or creating it.
/// The transaction takes the write lock before reading, so concurrent
/// registrations under one new name serialize and end up in the same couple.
pub async fn create_user(db: &SqlitePool, new_user: NewUser) -> Result<User, sqlx::Error> {
    let mut tx = db.begin_with("BEGIN IMMEDIATE").await?;

    sqlx::query("INSERT INTO couples (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(&new_user.couple_name)
        .execute(&mut *tx)
        .await?;

    let couple = sqlx::query_as::<_, Couple>("SELECT id, name FROM couples WHERE name = ?")
        .bind(&new_user.couple_name)
        .fetch_one(&mut *tx)
        .await?;
    let couple_id = couple.id;

    let id = sqlx::query(
        "INSERT INTO users (username, email, password_hash, couple_id) VALUES (?, ?, ?, ?)"
    )
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(couple_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        couple_id,
    })
}

pub async fn find_user_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_user_by_username(db: &SqlitePool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(db)
        .await
}

/// First other member of the couple, by id.
pub async fn find_partner(
    db: &SqlitePool,
    couple_id: i64,
    user_id: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE couple_id = ? AND id != ? ORDER BY id ASC LIMIT 1"
    ))
    .bind(couple_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

pub async fn find_tasks_by_couple(db: &SqlitePool, couple_id: i64) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE couple_id = ? ORDER BY id ASC"
    ))
    .bind(couple_id)
    .fetch_all(db)
    .await
}

pub async fn find_task_in_couple(
    db: &SqlitePool,
    id: i64,
    couple_id: i64,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND couple_id = ?"
    ))
    .bind(id)
    .bind(couple_id)
    .fetch_optional(db)
    .await
}

pub async fn insert_task(
    db: &SqlitePool,
    couple_id: i64,
    new_task: NewTask,
) -> Result<Task, sqlx::Error> {
    let status = crate::models::task::DEFAULT_STATUS.to_string();

    let id = sqlx::query(
        r#"
        INSERT INTO tasks
            (content, category, deadline, status, assigned_to, couple_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#
    )
    .bind(&new_task.content)
    .bind(&new_task.category)
    .bind(&new_task.deadline)
    .bind(&status)
    .bind(&new_task.assigned_to)
    .bind(couple_id)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(Task {
        id,
        content: new_task.content,
        category: new_task.category,
        deadline: new_task.deadline,
        status,
        assigned_to: new_task.assigned_to,
        couple_id,
    })
}

/// Returns `None` when no task with that id belongs to the couple.
pub async fn update_task_status(
    db: &SqlitePool,
    id: i64,
    couple_id: i64,
    status: &str,
) -> Result<Option<Task>, sqlx::Error> {
    let affected = sqlx::query("UPDATE tasks SET status = ?1 WHERE id = ?2 AND couple_id = ?3")
        .bind(status)
        .bind(id)
        .bind(couple_id)
        .execute(db)
        .await?
        .rows_affected();

    if affected == 0 {
        return Ok(None);
    }
    find_task_in_couple(db, id, couple_id).await
}

pub async fn delete_task(db: &SqlitePool, id: i64, couple_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND couple_id = ?2")
        .bind(id)
        .bind(couple_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn insert_session(
    db: &SqlitePool,
    token: &str,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Session, sqlx::Error> {
    let now = timestamp(now);

    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, last_seen_at) VALUES (?1, ?2, ?3, ?3)"
    )
    .bind(token)
    .bind(user_id)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Session {
        token: token.to_string(),
        user_id,
        created_at: now.clone(),
        last_seen_at: now,
    })
}

pub async fn find_session(db: &SqlitePool, token: &str) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(
        "SELECT token, user_id, created_at, last_seen_at FROM sessions WHERE token = ?"
    )
    .bind(token)
    .fetch_optional(db)
    .await
}

pub async fn touch_session(db: &SqlitePool, token: &str, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE token = ?2")
        .bind(timestamp(now))
        .bind(token)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_session(db: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(db)
        .await?
        .rows_affected();
    Ok(result > 0)
}

/// Removes sessions idle since before `idle_cutoff` or created before `created_cutoff`.
pub async fn delete_expired_sessions(
    db: &SqlitePool,
    idle_cutoff: DateTime<Utc>,
    created_cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE last_seen_at < ?1 OR created_at < ?2")
        .bind(timestamp(idle_cutoff))
        .bind(timestamp(created_cutoff))
        .execute(db)
        .await?
        .rows_affected();
    Ok(result)
}
