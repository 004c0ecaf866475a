//! The submission run: log in, find the target week, reconcile hours, add
//! the shortfall through an intercepted request, submit and notify.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::driver::{PageDriver, RequestInterceptor, TimecardInterceptor};
use crate::error::{SubmissionError, SubmissionResult};
use crate::helpers::email::{Notification, Notifier};
use crate::helpers::policy::intended_hours;
use crate::helpers::reconcile::{reconcile, Decision};
use crate::helpers::week::{week_ending, week_label};
use crate::models::config::{Credentials, TimesheetConfig};
use crate::models::hours::{HourMap, TimesheetState, Workday};

/// Portal selectors. jQuery syntax.
pub mod selectors {
    pub const USERNAME: &str = "#okta-signin-username";
    pub const PASSWORD: &str = "#okta-signin-password";
    pub const LOGIN_SUBMIT: &str = "input[type=\"submit\"]";
    pub const LOGGED_IN: &str = ".navpage-layout";
    pub const PREVIOUS_WEEK: &str = ".date-selector button.icon-chevron-left";
    pub const WEEK_HEADING: &str = ".date-selector .date-range [role=heading]";
    pub const STATE: &str = ".tcp-header .ts-data:contains(State) .ts-val";
    pub const DAILY_TOTALS: &str = "#cal-container-1 .cal-container-4";
    pub const CARDS_PANEL: &str = ".cards-panel-body";
    pub const CATEGORY_OPTIONS: &str = "ul.select2-results li.select2-result-selectable";
    pub const SUBMIT: &str = ".sp-row-content button.btn-primary:contains(Submit)";
    pub const CONFIRMATION: &str = ".sp-row-content a:contains(PDF)";

    pub fn week_changed_from(heading: &str) -> String {
        format!(".date-selector:not(:contains({}))", heading)
    }

    pub fn project_card(project: &str) -> String {
        format!(".card:contains({})", project)
    }

    pub fn add_line(project: &str) -> String {
        format!("{} button:contains(Add Line Item)", project_card(project))
    }

    pub fn category_arrow(project: &str) -> String {
        format!(
            "{} .select2-container.project-category .select2-arrow",
            project_card(project)
        )
    }

    pub fn category_option(category: &str) -> String {
        format!("{} div:contains({})", CATEGORY_OPTIONS, category)
    }

    pub fn add_time(project: &str) -> String {
        format!("{} button.btn-primary:contains(Add Time)", project_card(project))
    }

    pub fn project_row(project: &str) -> String {
        format!(".tc-row:contains({})", project)
    }
}

pub const SCREENSHOT_FILE: &str = "submitted.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Login,
    NavigateToTimesheet,
    LocateWeek,
    CheckStatus,
    Reconcile,
    SkipFill,
    Fill,
    Submit,
    Notify,
    Done,
    Aborted,
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub week_label: String,
    pub week_ending: NaiveDate,
    pub intended: HourMap,
    pub logged: HourMap,
    /// Hours added through the intercepted request, `None` when the week
    /// already matched.
    pub filled: Option<HourMap>,
    pub screenshot: PathBuf,
    pub message_id: String,
}

/// Submits the timesheet for the week containing `target_date` (today when
/// `None`).
pub async fn submit_timesheet(
    page: &dyn PageDriver,
    config: &TimesheetConfig,
    credentials: &Credentials,
    notifier: &dyn Notifier,
    target_date: Option<NaiveDate>,
) -> SubmissionResult<SubmissionReport> {
    let target_date = target_date.unwrap_or_else(|| Local::now().date_naive());
    SubmissionWorkflow::new(page, config, credentials, notifier, target_date)
        .run()
        .await
}

pub struct SubmissionWorkflow<'a> {
    page: &'a dyn PageDriver,
    config: &'a TimesheetConfig,
    credentials: &'a Credentials,
    notifier: &'a dyn Notifier,
    target_date: NaiveDate,
    state: WorkflowState,
}

impl<'a> SubmissionWorkflow<'a> {
    pub fn new(
        page: &'a dyn PageDriver,
        config: &'a TimesheetConfig,
        credentials: &'a Credentials,
        notifier: &'a dyn Notifier,
        target_date: NaiveDate,
    ) -> Self {
        Self {
            page,
            config,
            credentials,
            notifier,
            target_date,
            state: WorkflowState::Login,
        }
    }

    /// Current state; after `run` returns this is `Done`, `Aborted`, or the
    /// state the run failed in.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub async fn run(&mut self) -> SubmissionResult<SubmissionReport> {
        info!("Submitting timesheet for week of {}", self.target_date);

        self.login().await?;

        self.transition(WorkflowState::NavigateToTimesheet);
        self.open_timesheet().await?;

        self.transition(WorkflowState::LocateWeek);
        let label = self.locate_week().await?;

        self.transition(WorkflowState::CheckStatus);
        self.check_status(&label).await?;

        self.transition(WorkflowState::Reconcile);
        let intended = intended_hours(
            self.target_date,
            &self.config.default_hours,
            &self.config.exceptional_hours,
        );
        let logged = self.logged_hours().await?;
        let reconciliation = reconcile(&intended, &logged);

        let filled = match reconciliation.decision {
            Decision::Abort => {
                self.transition(WorkflowState::Aborted);
                error!("Cannot log configured hours; submit this timesheet manually");
                return Err(SubmissionError::NegativeReconciliation { intended, logged });
            }
            Decision::Skip => {
                self.transition(WorkflowState::SkipFill);
                None
            }
            Decision::Fill(hours) => {
                self.transition(WorkflowState::Fill);
                self.fill(&hours).await?;
                Some(hours)
            }
        };

        self.transition(WorkflowState::Submit);
        let screenshot = self.submit().await?;

        self.transition(WorkflowState::Notify);
        let week_ending = week_ending(self.target_date);
        let message_id = self.notify(week_ending, screenshot.clone()).await?;

        self.transition(WorkflowState::Done);
        info!("SUCCESS: timesheet \"{}\" submitted", label);

        Ok(SubmissionReport {
            week_label: label,
            week_ending,
            intended,
            logged,
            filled,
            screenshot,
            message_id,
        })
    }

    fn transition(&mut self, next: WorkflowState) {
        info!("Workflow {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs one browser call under the step timeout.
    async fn step<T, F>(&self, step: &str, fut: F) -> SubmissionResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let limit = self.config.portal.step_timeout();
        match timeout(limit, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                error!("Browser error while {}: {}", step, source);
                Err(SubmissionError::Driver {
                    step: step.to_string(),
                    source,
                })
            }
            Err(_) => {
                error!("Timed out after {:?} while {}", limit, step);
                Err(SubmissionError::SuspensionTimeout {
                    step: step.to_string(),
                    after: limit,
                })
            }
        }
    }

    async fn login(&self) -> SubmissionResult<()> {
        let portal = &self.config.portal.url;
        info!("Going to {}...", portal);
        self.step("opening the portal", self.page.goto(portal)).await?;

        // Redirects to the identity provider may take a while
        self.step(
            "waiting for the login form",
            self.page.wait_for(selectors::USERNAME),
        )
        .await
        .map_err(|e| SubmissionError::AuthenticationFailure {
            reason: e.to_string(),
        })?;

        let account = &self.credentials.portal;
        info!("Logging in {}...", account.email);
        self.step(
            "typing the username",
            self.page.type_text(selectors::USERNAME, &account.email),
        )
        .await?;
        self.step(
            "typing the password",
            self.page.type_text(selectors::PASSWORD, &account.password),
        )
        .await?;
        self.step(
            "submitting the login form",
            self.page.click(selectors::LOGIN_SUBMIT),
        )
        .await?;

        self.step(
            "waiting for the portal after login",
            self.page.wait_for(selectors::LOGGED_IN),
        )
        .await
        .map_err(|e| SubmissionError::AuthenticationFailure {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    async fn open_timesheet(&self) -> SubmissionResult<()> {
        info!("Loading timesheet page...");
        // The timesheet is framed after login; loading it again makes it the
        // top-level document.
        self.step(
            "reloading the timesheet page",
            self.page.goto(&self.config.portal.url),
        )
        .await?;
        self.step(
            "waiting for the week selector",
            self.page.wait_for(selectors::PREVIOUS_WEEK),
        )
        .await
    }

    async fn locate_week(&self) -> SubmissionResult<String> {
        let label = week_label(self.target_date);
        let max_steps = self.config.portal.max_week_steps;
        info!("Going to week \"{}\"...", label);

        for attempt in 0..=max_steps {
            let heading = self
                .step(
                    "reading the week heading",
                    self.page.text_of(selectors::WEEK_HEADING),
                )
                .await?;

            if heading.starts_with(&label) {
                info!("Reached week \"{}\" after {} step(s)", label, attempt);
                return Ok(label);
            }
            if attempt == max_steps {
                break;
            }

            self.step(
                "going to the previous week",
                self.page.click(selectors::PREVIOUS_WEEK),
            )
            .await?;
            self.step(
                "waiting for the week to change",
                self.page.wait_for(&selectors::week_changed_from(&heading)),
            )
            .await?;
        }

        error!("Week \"{}\" not found after {} steps", label, max_steps);
        Err(SubmissionError::WeekNotFound {
            label,
            attempts: max_steps,
        })
    }

    async fn check_status(&mut self, label: &str) -> SubmissionResult<()> {
        let text = self
            .step(
                "reading the timesheet state",
                self.page.text_of(selectors::STATE),
            )
            .await?;
        let state = text
            .parse::<TimesheetState>()
            .unwrap_or_else(|never| match never {});

        if state.is_pending() {
            return Ok(());
        }

        self.transition(WorkflowState::Aborted);
        warn!(
            "No need to submit timesheet \"{}\" because it's in {} state",
            label, state
        );
        Err(SubmissionError::NonPendingTimesheet {
            week: label.to_string(),
            state,
        })
    }

    async fn logged_hours(&self) -> SubmissionResult<HourMap> {
        let cells = self
            .step(
                "reading logged hours",
                self.page.texts_of(selectors::DAILY_TOTALS),
            )
            .await?;

        let logged = parse_logged_hours(&cells).map_err(|message| {
            SubmissionError::PageContent {
                step: "reading logged hours".to_string(),
                message,
            }
        })?;

        info!("Currently logged: {:?}", logged);
        Ok(logged)
    }

    async fn fill(&self, hours: &HourMap) -> SubmissionResult<()> {
        let project = &self.config.project;
        let category = &self.config.category;
        info!("Filling timesheet...");

        self.step(
            "waiting for the project cards",
            self.page.wait_for(selectors::CARDS_PANEL),
        )
        .await?;

        info!("Selecting project {}...", project);
        let add_line = selectors::add_line(project);
        self.step("waiting for Add Line Item", self.page.wait_for(&add_line))
            .await?;
        self.step(
            "clicking Add Line Item",
            self.page.trigger(&add_line, "click"),
        )
        .await?;

        info!("Selecting category {}...", category);
        let arrow = selectors::category_arrow(project);
        self.step("waiting for the category dropdown", self.page.wait_for(&arrow))
            .await?;
        self.step(
            "opening the category dropdown",
            self.page.trigger(&arrow, "mousedown"),
        )
        .await?;
        self.step(
            "waiting for the category options",
            self.page.wait_for(selectors::CATEGORY_OPTIONS),
        )
        .await?;
        self.step(
            "choosing the category",
            self.page
                .trigger(&selectors::category_option(category), "mouseup"),
        )
        .await?;

        info!("Logging hours {:?}...", hours);
        let interceptor = Arc::new(TimecardInterceptor::new(hours.clone()));
        let hook: Arc<dyn RequestInterceptor> = interceptor.clone();
        self.step(
            "arming request interception",
            self.page.set_interceptor(Some(hook)),
        )
        .await?;

        let added = self.add_time(project).await;

        if let Err(e) = self
            .step("disarming request interception", self.page.set_interceptor(None))
            .await
        {
            warn!("Could not disarm request interception: {}", e);
        }

        match interceptor.finish() {
            Err(e) => Err(e.into()),
            Ok(false) => {
                added?;
                error!("Time row appeared but no timecard request was intercepted");
                Err(SubmissionError::InterceptorNotTriggered)
            }
            Ok(true) => added,
        }
    }

    async fn add_time(&self, project: &str) -> SubmissionResult<()> {
        self.step(
            "clicking Add Time",
            self.page.trigger(&selectors::add_time(project), "click"),
        )
        .await?;
        self.step(
            "waiting for the new time row",
            self.page.wait_for(&selectors::project_row(project)),
        )
        .await
    }

    async fn submit(&self) -> SubmissionResult<PathBuf> {
        info!("Ready to submit...");
        self.step(
            "clicking Submit",
            self.page.trigger(selectors::SUBMIT, "click"),
        )
        .await?;
        self.step(
            "waiting for the submission confirmation",
            self.page.wait_for(selectors::CONFIRMATION),
        )
        .await?;
        info!("Submitted successfully.");

        let screenshot = self.config.portal.artifact_dir.join(SCREENSHOT_FILE);
        self.step(
            "capturing the confirmation",
            self.page.screenshot(&screenshot),
        )
        .await?;
        Ok(screenshot)
    }

    async fn notify(&self, week_ending: NaiveDate, screenshot: PathBuf) -> SubmissionResult<String> {
        let weekend_date = week_ending.format("%Y-%m-%d").to_string();
        info!("Sending emails...");

        let notification =
            Notification::submitted(&self.config.email_settings, &weekend_date, vec![screenshot]);

        let failure = |source| SubmissionError::NotificationFailure {
            week_ending: weekend_date.clone(),
            source,
        };

        match timeout(
            self.config.portal.step_timeout(),
            self.notifier.send(notification),
        )
        .await
        {
            Ok(Ok(message_id)) => Ok(message_id),
            Ok(Err(e)) => {
                error!("Timesheet submitted but the email failed: {}", e);
                Err(failure(e))
            }
            Err(_) => {
                error!("Timesheet submitted but the email timed out");
                Err(failure(anyhow::anyhow!(
                    "email not sent within {:?}",
                    self.config.portal.step_timeout()
                )))
            }
        }
    }
}

/// Reads the per-day totals row. The portal shows either Monday-Friday or a
/// full Sunday-Saturday row; weekend cells are ignored.
fn parse_logged_hours(cells: &[String]) -> Result<HourMap, String> {
    let workday_cells = match cells.len() {
        5 => cells,
        7 => &cells[1..6],
        n => return Err(format!("expected 5 or 7 daily totals, found {}", n)),
    };

    Workday::ALL
        .iter()
        .zip(workday_cells)
        .map(|(day, text)| {
            leading_integer(text)
                .map(|hours| (*day, hours))
                .ok_or_else(|| format!("cannot read hours for {} from {:?}", day, text))
        })
        .collect()
}

/// Integer prefix of `text` after trimming, so "7.50" reads as 7.
fn leading_integer(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}
