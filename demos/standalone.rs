use anyhow::anyhow;
use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use timesheet_autofill::{
    ConfigError, PageDriver, PageLauncher, ResendNotifier, TimesheetService,
    helpers::config::{config_path, load_config},
};

/// Stand-in until a real browser driver is wired in. Every submission fails
/// at launch and is reported to the operator by email.
struct UnavailableLauncher;

#[async_trait]
impl PageLauncher for UnavailableLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn PageDriver>> {
        Err(anyhow!("no browser driver configured"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting timesheet autofill example");

    let path = config_path();
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e @ ConfigError::TemplateCreated { .. }) => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mailer = &config.credentials.mailer;
    let notifier = ResendNotifier::new(&mailer.password, mailer.email.clone());

    let timesheet_service =
        TimesheetService::new(Arc::new(UnavailableLauncher), Arc::new(notifier), config);

    let app = Router::new()
        .nest("/api/timesheet", timesheet_service.router())
        .route("/health", axum::routing::get(|| async { "OK" }));

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server running on http://0.0.0.0:3000");

    axum::serve(listener, app).await?;

    Ok(())
}

/*
Example usage:

1. GET /api/timesheet/timesheet-preview?date=2018-11-21
   - Week label and intended hours, no browser involved

2. POST /api/timesheet/timesheet-submit
   - Body (optional): {"target_date": "2018-11-21"}
   - Runs one submission; 409 if one is already running or the week
     cannot be submitted

Set TIMESHEET_CONFIG to point at a config file other than ./config.json.
*/
