use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::password;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{LoginRequest, NewUser, RegisterRequest, User, UserProfile};

pub struct AccountService {
    db: SqlitePool,
}

impl AccountService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Creates the account, joining the couple with the exact same name if one exists.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile, AppError> {
        let username = required(req.username, "username")?;
        let email = required(req.email, "email")?;
        let password = required(req.password, "password")?;
        let couple_name = required(req.couple_name, "couple_name")?;

        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|_| AppError::InternalServerError)?
            .map_err(|e| {
                warn!("password hashing failed: {}", e);
                AppError::InternalServerError
            })?;

        let new_user = NewUser {
            username,
            email,
            password_hash,
            couple_name,
        };

        let user = repository::create_user(&self.db, new_user)
            .await
            .map_err(registration_error)?;

        info!(user_id = user.id, couple_id = user.couple_id, "user registered");
        Ok(user.into())
    }

    /// Unknown usernames and wrong passwords fail identically.
    pub async fn authenticate(&self, req: LoginRequest) -> Result<User, AppError> {
        let username = required(req.username, "username")?;
        let password = required(req.password, "password")?;

        let user = repository::find_user_by_username(&self.db, &username).await?;

        let verified = tokio::task::spawn_blocking(move || match user {
            Some(user) if password::verify_password(&password, &user.password_hash) => Some(user),
            Some(_) => None,
            None => {
                password::verify_dummy(&password);
                None
            }
        })
        .await
        .map_err(|_| AppError::InternalServerError)?;

        match verified {
            Some(user) => Ok(user),
            None => {
                info!("failed login attempt");
                Err(AppError::invalid_credentials())
            }
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

/// SQLite primary result codes SQLITE_BUSY and SQLITE_LOCKED.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn registration_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        let primary_code = db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff);
        if matches!(primary_code, Some(SQLITE_BUSY | SQLITE_LOCKED)) {
            warn!("registration hit a locked database: {}", db_err.message());
            return AppError::Conflict("Registration is busy, please retry".to_string());
        }
        if db_err.is_unique_violation() {
            let message = db_err.message();
            let detail = if message.contains("users.username") {
                "Username already exists"
            } else if message.contains("users.email") {
                "Email already exists"
            } else {
                "Account already exists"
            };
            return AppError::Conflict(detail.to_string());
        }
    }
    AppError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, connect_in_memory};

    fn registration(username: &str, email: &str, couple_name: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some("pw1".to_string()),
            couple_name: Some(couple_name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let service = AccountService::new(pool);

        let profile = service
            .register(registration("alice", "a@x.com", "Smiths"))
            .await
            .expect("register");
        assert_eq!(profile.username, "alice");

        let user = service
            .authenticate(LoginRequest {
                username: Some("alice".to_string()),
                password: Some("pw1".to_string()),
            })
            .await
            .expect("login");
        assert_eq!(user.id, profile.id);
        assert_ne!(user.password_hash, "pw1");
    }

    #[tokio::test]
    async fn test_register_conflicts_name_the_field() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let service = AccountService::new(pool);
        service
            .register(registration("alice", "a@x.com", "Smiths"))
            .await
            .expect("register");

        let err = service
            .register(registration("alice", "other@x.com", "Smiths"))
            .await
            .expect_err("duplicate username");
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Username already exists"));

        let err = service
            .register(registration("bob", "a@x.com", "Smiths"))
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, AppError::Conflict(ref m) if m == "Email already exists"));
    }

    #[tokio::test]
    async fn test_register_requires_every_field() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let service = AccountService::new(pool);

        let mut req = registration("alice", "a@x.com", "Smiths");
        req.couple_name = Some("   ".to_string());
        let err = service.register(req).await.expect_err("blank couple");
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .register(RegisterRequest::default())
            .await
            .expect_err("empty body");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bad_password_and_unknown_user_look_the_same() {
        let pool = connect_in_memory().await.expect("Failed to create test db");
        let service = AccountService::new(pool);
        service
            .register(registration("alice", "a@x.com", "Smiths"))
            .await
            .expect("register");

        let wrong_password = service
            .authenticate(LoginRequest {
                username: Some("alice".to_string()),
                password: Some("nope".to_string()),
            })
            .await
            .expect_err("wrong password");
        let unknown_user = service
            .authenticate(LoginRequest {
                username: Some("mallory".to_string()),
                password: Some("pw1".to_string()),
            })
            .await
            .expect_err("unknown user");

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_share_one_new_couple() {
        let path = std::env::temp_dir().join(format!("twodo-race-{}.db", uuid::Uuid::new_v4()));
        let pool = db::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .expect("Failed to create file db");
        db::MIGRATOR.run(&pool).await.expect("Failed to run migrations");

        let mut handles = Vec::new();
        for i in 0..4 {
            let service = AccountService::new(pool.clone());
            handles.push(tokio::spawn(async move {
                service
                    .register(registration(
                        &format!("user{}", i),
                        &format!("user{}@x.com", i),
                        "Newlyweds",
                    ))
                    .await
            }));
        }

        let mut couple_ids = Vec::new();
        for handle in handles {
            match handle.await.expect("register task panicked") {
                Ok(profile) => couple_ids.push(profile.couple_id),
                Err(AppError::Conflict(_)) => {}
                Err(other) => panic!("unexpected registration error: {:?}", other),
            }
        }

        assert!(!couple_ids.is_empty());
        assert!(couple_ids.iter().all(|id| *id == couple_ids[0]));

        let couples: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM couples WHERE name = 'Newlyweds'")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(couples, 1);

        pool.close().await;
        let _ = std::fs::remove_file(&path);
    }
}
