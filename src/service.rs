use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    driver::PageDriver,
    error::{SubmissionError, SubmissionResult},
    helpers::{
        email::{Notification, Notifier},
        policy::intended_hours,
        week::{week_ending, week_label},
    },
    models::{config::ConfigFile, hours::HourMap},
    workflow::{submit_timesheet, SubmissionReport},
};

/// Opens a fresh browser page for one run.
#[async_trait]
pub trait PageLauncher: Send + Sync {
    async fn launch(&self) -> anyhow::Result<Box<dyn PageDriver>>;
}

/// Runs timesheet submissions on request, one at a time.
#[derive(Clone)]
pub struct TimesheetService {
    pub launcher: Arc<dyn PageLauncher>,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<ConfigFile>,
    running: Arc<Mutex<()>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct WeekQuery {
    pub date: Option<NaiveDate>,
}

/// JSON body accepted by `POST /timesheet-submit`. An empty body means
/// "the current week".
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubmitRequest {
    pub target_date: Option<NaiveDate>,
}

impl SubmitRequest {
    /// Parse a request body. Whitespace-only bodies count as empty.
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WeekPreview {
    pub week_label: String,
    pub week_ending: NaiveDate,
    pub intended: HourMap,
}

impl TimesheetService {
    pub fn new(
        launcher: Arc<dyn PageLauncher>,
        notifier: Arc<dyn Notifier>,
        config: ConfigFile,
    ) -> Self {
        info!("Creating new TimesheetService instance");
        Self {
            launcher,
            notifier,
            config: Arc::new(config),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Create an Axum router for the timesheet service
    pub fn router(self) -> Router {
        info!("Creating timesheet service router");
        let shared_state = Arc::new(self);

        Router::new()
            .route("/timesheet-submit", post(timesheet_submit))
            .route("/timesheet-preview", get(timesheet_preview))
            .with_state(shared_state)
    }

    /// Week label and intended hours for the week containing `date`, without
    /// touching the portal.
    pub fn preview(&self, date: NaiveDate) -> WeekPreview {
        let timesheet = &self.config.timesheet;
        WeekPreview {
            week_label: week_label(date),
            week_ending: week_ending(date),
            intended: intended_hours(date, &timesheet.default_hours, &timesheet.exceptional_hours),
        }
    }

    /// Launch a page and run one submission. Failures that happen before the
    /// timesheet is submitted are also reported by email.
    pub async fn process_timesheet(
        &self,
        target_date: Option<NaiveDate>,
    ) -> SubmissionResult<SubmissionReport> {
        let result = match self.launcher.launch().await {
            Ok(page) => {
                submit_timesheet(
                    page.as_ref(),
                    &self.config.timesheet,
                    &self.config.credentials,
                    self.notifier.as_ref(),
                    target_date,
                )
                .await
            }
            Err(source) => Err(SubmissionError::Driver {
                step: "launching the browser".to_string(),
                source,
            }),
        };

        if let Err(e) = &result {
            if !e.timesheet_submitted() {
                self.report_failure(e).await;
            }
        }

        result
    }

    /// Email the operator about a failed run. Bounded by the step timeout so
    /// a stuck mail provider cannot hold the run lock.
    async fn report_failure(&self, e: &SubmissionError) {
        let operator = &self.config.credentials.mailer.email;
        let report = Notification::failure(operator, &e.to_string());
        let limit = self.config.timesheet.portal.step_timeout();

        match tokio::time::timeout(limit, self.notifier.send(report)).await {
            Ok(Ok(id)) => info!("Error report sent to {}, email ID: {}", operator, id),
            Ok(Err(send_error)) => error!("Failed to send error report: {}", send_error),
            Err(_) => error!("Timed out after {:?} while sending error report", limit),
        }
    }
}

async fn timesheet_submit(
    State(service): State<Arc<TimesheetService>>,
    Query(query): Query<WeekQuery>,
    body: Bytes,
) -> (StatusCode, String) {
    let request = match SubmitRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed submit request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
            );
        }
    };
    let target_date = request.target_date.or(query.date);
    info!("Received timesheet submit request for {:?}", target_date);

    let Ok(_guard) = service.running.try_lock() else {
        warn!("Submission already in progress, rejecting request");
        return (
            StatusCode::CONFLICT,
            "A timesheet submission is already running".to_string(),
        );
    };

    match service.process_timesheet(target_date).await {
        Ok(report) => {
            info!(
                "Timesheet \"{}\" submitted, email ID: {}",
                report.week_label, report.message_id
            );
            (
                StatusCode::OK,
                format!(
                    "Timesheet \"{}\" submitted successfully! Email ID: {}",
                    report.week_label, report.message_id
                ),
            )
        }
        Err(e) if e.timesheet_submitted() => {
            warn!("Timesheet submitted without notification: {}", e);
            (StatusCode::OK, e.to_string())
        }
        Err(e) if e.is_abort() => {
            warn!("Timesheet submission aborted: {}", e);
            (StatusCode::CONFLICT, e.to_string())
        }
        Err(e) => {
            error!("Failed to submit timesheet: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error submitting timesheet: {}", e),
            )
        }
    }
}

async fn timesheet_preview(
    State(service): State<Arc<TimesheetService>>,
    Query(query): Query<WeekQuery>,
) -> Json<WeekPreview> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    info!("Previewing intended hours for {}", date);
    Json(service.preview(date))
}
