use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use twodo::api::{cors_layer, router};
use twodo::auth::SessionStore;
use twodo::config::AppConfig;
use twodo::db;
use twodo::mail::{LogMailer, Mailer, SmtpMailer};
use twodo::services::SessionSweeper;
use twodo::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    db::MIGRATOR.run(&pool).await?;

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => {
            info!("sending notifications through {}:{}", mail.smtp_host, mail.smtp_port);
            Arc::new(SmtpMailer::new(mail)?)
        }
        None => {
            warn!("SMTP_HOST is not set, notifications will only be logged");
            Arc::new(LogMailer)
        }
    };

    let sessions = SessionStore::new(pool.clone(), config.session.clone());

    if !config.session.sweep_interval.is_zero() {
        let sweeper = SessionSweeper::new(sessions.clone(), config.session.sweep_interval);
        tokio::spawn(sweeper.start());
    }

    let state = AppState {
        db: pool,
        mailer,
        sessions,
    };

    let mut app = router(state);
    if let Some(cors) = cors_layer(&config.cors_allowed_origins) {
        app = app.layer(cors);
    }

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "twodo=debug,tower_http=info".to_string()),
    );
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
