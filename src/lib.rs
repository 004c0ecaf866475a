//! Timesheet Autofill Library
//!
//! This library logs in to the timesheet portal, works out which hours are
//! still missing for a week, adds them through the portal's own "quick add"
//! request, submits the timesheet and emails a confirmation.

pub mod driver;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;
pub mod workflow;

pub use error::{ConfigError, PayloadError, SubmissionError};
pub use service::{PageLauncher, SubmitRequest, TimesheetService};
pub use workflow::{submit_timesheet, SubmissionReport, SubmissionWorkflow, WorkflowState};

// Re-export key types for convenience
pub use driver::{PageDriver, TimecardInterceptor};
pub use helpers::email::{Notification, Notifier, ResendNotifier};
pub use models::config::{ConfigFile, Credentials, TimesheetConfig};
pub use models::hours::{ExceptionRange, ExceptionTable, HourMap, Workday};
