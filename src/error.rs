//! Error types for timesheet submission.
//!
//! Every failure a run can end in is a distinct [`SubmissionError`] variant so
//! callers can tell "nothing was submitted" apart from "submitted, but the
//! confirmation email failed".

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::hours::{HourMap, TimesheetState};

/// Failure to decode or rewrite a captured timecard request body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Request body has no `values` parameter")]
    MissingValues,

    #[error("`values` parameter is not valid percent-encoded UTF-8: {0}")]
    Encoding(String),

    #[error("`values` parameter is not valid JSON: {0}")]
    Json(String),

    #[error("`values` JSON has no timecards[0] object")]
    MissingTimecard,
}

/// Failure to load `config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config existed; a template was written and the run must stop.
    #[error("Created config template at {path}; edit it and rerun")]
    TemplateCreated { path: PathBuf },

    #[error("Failed to access config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// Why a submission run stopped.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Login failed: {reason}")]
    AuthenticationFailure { reason: String },

    #[error("Timesheet \"{week}\" is in {state} state, nothing to submit")]
    NonPendingTimesheet { week: String, state: TimesheetState },

    #[error(
        "Logged hours exceed intended hours (intended {intended:?}, logged {logged:?}); submit this timesheet manually"
    )]
    NegativeReconciliation { intended: HourMap, logged: HourMap },

    #[error("Could not rewrite timecard request: {0}")]
    PayloadDecodeFailure(#[from] PayloadError),

    #[error("Timed out after {after:?} while {step}")]
    SuspensionTimeout { step: String, after: Duration },

    #[error("Week \"{label}\" not reached after {attempts} steps back")]
    WeekNotFound { label: String, attempts: u32 },

    #[error("Unexpected page content while {step}: {message}")]
    PageContent { step: String, message: String },

    #[error("The add-time request was never intercepted")]
    InterceptorNotTriggered,

    #[error("Browser error while {step}: {source}")]
    Driver {
        step: String,
        #[source]
        source: anyhow::Error,
    },

    /// The timesheet was submitted; only the confirmation email failed.
    #[error("Timesheet for week ending {week_ending} was submitted but the notification failed: {source}")]
    NotificationFailure {
        week_ending: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SubmissionError {
    /// True when the remote timesheet already reached the submitted state,
    /// so re-running would be redundant.
    pub fn timesheet_submitted(&self) -> bool {
        matches!(self, SubmissionError::NotificationFailure { .. })
    }

    /// True for the outcomes that mean the run deliberately stopped before
    /// touching the timesheet.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            SubmissionError::NonPendingTimesheet { .. }
                | SubmissionError::NegativeReconciliation { .. }
        )
    }
}

pub type SubmissionResult<T> = Result<T, SubmissionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pending_displays_week_and_state() {
        let error = SubmissionError::NonPendingTimesheet {
            week: "18 - 24 November 2018".to_string(),
            state: TimesheetState::Processed,
        };
        assert_eq!(
            error.to_string(),
            "Timesheet \"18 - 24 November 2018\" is in PROCESSED state, nothing to submit"
        );
        assert!(error.is_abort());
        assert!(!error.timesheet_submitted());
    }

    #[test]
    fn notification_failure_is_reported_as_submitted() {
        let error = SubmissionError::NotificationFailure {
            week_ending: "2018-11-24".to_string(),
            source: anyhow::anyhow!("smtp down"),
        };
        assert!(error.timesheet_submitted());
        assert!(!error.is_abort());
        assert!(error.to_string().contains("2018-11-24"));
    }

    #[test]
    fn payload_error_converts_with_question_mark() {
        fn fails() -> SubmissionResult<()> {
            Err::<(), _>(PayloadError::MissingValues)?;
            Ok(())
        }

        assert!(matches!(
            fails(),
            Err(SubmissionError::PayloadDecodeFailure(PayloadError::MissingValues))
        ));
    }
}
