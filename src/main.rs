//! OTP sign-in broker
//!
//! A server-side one-time-passcode sign-in protocol: a session state
//! machine that issues, verifies, resends and expires 6-digit codes,
//! backed by a retry-wrapped persistence layer.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use otp_broker::email::EmailSender;
use otp_broker::{
    cookie_key, routes, AppState, Config, ConsoleEmailSender, MemoryBackend, ResilientStore,
    SmtpEmailSender,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "otp_broker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");
    if config.test_endpoints {
        tracing::warn!("test endpoints are enabled; do not run this in production");
    }

    let email_sender: Box<dyn EmailSender> = match config.smtp.clone() {
        Some(smtp) => Box::new(
            SmtpEmailSender::new(smtp).map_err(|e| anyhow::anyhow!("SMTP setup failed: {e}"))?,
        ),
        None => Box::new(ConsoleEmailSender::new()),
    };

    // Create app state
    let state = Arc::new(AppState::new(
        ResilientStore::new(MemoryBackend::new()),
        email_sender,
        cookie_key(),
        config.clone(),
    ));

    // Create router
    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Broker listening on http://{}", addr);
    tracing::info!("Sign-in API at http://{}/wsapi", config.domain);

    axum::serve(listener, app).await?;

    Ok(())
}
