#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use timesheet_autofill::driver::{
    InterceptDecision, InterceptedRequest, PageDriver, RequestInterceptor, ADD_TIMECARD_URL,
};
use timesheet_autofill::helpers::email::{Notification, Notifier};
use timesheet_autofill::models::config::{
    Account, Credentials, EmailSettings, PortalSettings, TimesheetConfig,
};
use timesheet_autofill::models::hours::{ExceptionTable, HourMap, Workday};
use timesheet_autofill::workflow::selectors;

pub const PROJECT: &str = "PRJ0020909";
pub const CATEGORY: &str = "Development";

pub const BLANK_TIMECARD: &str = r#"{"timecards":[{"monday":"0","tuesday":"0","wednesday":"0","thursday":"0","friday":"0","time_sheet":"37274231db61ab40b94169c3ca961995","category":"task_work","task":"e0dfbc03db2cef406062dff648961958","project_time_category":"9e7e8b024f20cf0027ac04c85210c702"}],"timesheetId":"37274231db61ab40b94169c3ca961995","action":"quick_add"}"#;

pub fn blank_timecard_body() -> String {
    format!("values={}", urlencoding::encode(BLANK_TIMECARD))
}

pub fn full_week(hours: u32) -> HourMap {
    Workday::ALL.iter().map(|day| (*day, hours)).collect()
}

pub fn config() -> TimesheetConfig {
    TimesheetConfig {
        project: PROJECT.to_string(),
        category: CATEGORY.to_string(),
        default_hours: full_week(8),
        exceptional_hours: ExceptionTable::default(),
        email_settings: EmailSettings {
            to: vec!["report@example.com".to_string()],
            cc: vec!["lead@example.com".to_string()],
            bcc: Vec::new(),
            subject_template: "{weekendDate} 1234 PEREZ".to_string(),
        },
        portal: PortalSettings {
            url: "https://portal.example/time".to_string(),
            step_timeout_secs: 30,
            max_week_steps: 10,
            artifact_dir: PathBuf::from("/tmp/timesheet-autofill-tests"),
        },
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        portal: Account {
            email: "me@corp.example".to_string(),
            password: "hunter2".to_string(),
        },
        mailer: Account {
            email: "me@mail.example".to_string(),
            password: "re_test".to_string(),
        },
    }
}

#[derive(Default)]
struct PageState {
    headings: Vec<String>,
    week_index: usize,
    status: String,
    totals: Vec<String>,
    captured_body: String,
    timecard_path: String,
    hanging: HashSet<String>,
    interceptor: Option<Arc<dyn RequestInterceptor>>,
    row_added: bool,
    calls: Vec<String>,
    sent_bodies: Vec<String>,
    passed_through: Vec<String>,
}

/// Scripted stand-in for the portal.
///
/// `headings` lists the week headings from the current week backwards;
/// pressing "previous week" moves one entry along (sticking at the last).
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new(headings: &[&str], status: &str, totals: &[&str]) -> Self {
        Self {
            state: Mutex::new(PageState {
                headings: headings.iter().map(|h| h.to_string()).collect(),
                status: status.to_string(),
                totals: totals.iter().map(|t| t.to_string()).collect(),
                captured_body: blank_timecard_body(),
                timecard_path: ADD_TIMECARD_URL.to_string(),
                ..Default::default()
            }),
        }
    }

    /// `wait_for(selector)` never resolves.
    pub fn hang_on(self, selector: &str) -> Self {
        self.state.lock().unwrap().hanging.insert(selector.to_string());
        self
    }

    pub fn with_captured_body(self, body: &str) -> Self {
        self.state.lock().unwrap().captured_body = body.to_string();
        self
    }

    /// "Add Time" posts the new row to `path` instead of the usual
    /// timecard endpoint. The row still appears on the page.
    pub fn with_timecard_path(self, path: &str) -> Self {
        self.state.lock().unwrap().timecard_path = path.to_string();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|call| call.starts_with(prefix))
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    /// Timecard bodies that reached the "server".
    pub fn sent_bodies(&self) -> Vec<String> {
        self.state.lock().unwrap().sent_bodies.clone()
    }

    pub fn passed_through(&self) -> Vec<String> {
        self.state.lock().unwrap().passed_through.clone()
    }

    pub fn interceptor_armed(&self) -> bool {
        self.state.lock().unwrap().interceptor.is_some()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    /// What the browser does when "Add Time" is clicked: an unrelated poll
    /// followed by the add-timecard request.
    fn fire_add_time(&self) {
        let mut state = self.state.lock().unwrap();
        let requests = [
            (
                false,
                InterceptedRequest {
                    url: "https://portal.example/api/now/ui/polling".to_string(),
                    body: Some("poll=1".to_string()),
                },
            ),
            (
                true,
                InterceptedRequest {
                    url: format!("https://portal.example{}", state.timecard_path),
                    body: Some(state.captured_body.clone()),
                },
            ),
        ];

        for (is_timecard, request) in requests {
            let decision = match &state.interceptor {
                Some(hook) => hook.intercept(&request),
                None => InterceptDecision::PassThrough,
            };
            match decision {
                InterceptDecision::PassThrough => {
                    state.passed_through.push(request.url.clone());
                    if is_timecard {
                        state.sent_bodies.push(request.body.unwrap_or_default());
                        state.row_added = true;
                    }
                }
                InterceptDecision::Replace(body) => {
                    state.sent_bodies.push(body);
                    state.row_added = true;
                }
                InterceptDecision::Block => {}
            }
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn wait_for(&self, selector: &str) -> anyhow::Result<()> {
        self.record(format!("wait {}", selector));
        let blocked = {
            let state = self.state.lock().unwrap();
            state.hanging.contains(selector)
                || (selector == selectors::project_row(PROJECT) && !state.row_added)
        };
        if blocked {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> anyhow::Result<()> {
        self.record(format!("type {} {}", selector, text));
        Ok(())
    }

    async fn click(&self, selector: &str) -> anyhow::Result<()> {
        self.record(format!("click {}", selector));
        if selector == selectors::PREVIOUS_WEEK {
            let mut state = self.state.lock().unwrap();
            if state.week_index + 1 < state.headings.len() {
                state.week_index += 1;
            }
        }
        Ok(())
    }

    async fn trigger(&self, selector: &str, event: &str) -> anyhow::Result<()> {
        self.record(format!("trigger {} {}", event, selector));
        if selector == selectors::add_time(PROJECT) && event == "click" {
            self.fire_add_time();
        }
        Ok(())
    }

    async fn text_of(&self, selector: &str) -> anyhow::Result<String> {
        self.record(format!("text {}", selector));
        let state = self.state.lock().unwrap();
        match selector {
            selectors::WEEK_HEADING => state
                .headings
                .get(state.week_index)
                .cloned()
                .ok_or_else(|| anyhow!("no week heading")),
            selectors::STATE => Ok(state.status.clone()),
            other => Err(anyhow!("no element matches {}", other)),
        }
    }

    async fn texts_of(&self, selector: &str) -> anyhow::Result<Vec<String>> {
        self.record(format!("texts {}", selector));
        if selector == selectors::DAILY_TOTALS {
            Ok(self.state.lock().unwrap().totals.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn screenshot(&self, path: &Path) -> anyhow::Result<()> {
        self.record(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn set_interceptor(
        &self,
        interceptor: Option<Arc<dyn RequestInterceptor>>,
    ) -> anyhow::Result<()> {
        self.record(format!("intercept {}", interceptor.is_some()));
        self.state.lock().unwrap().interceptor = interceptor;
        Ok(())
    }
}

/// Records notifications instead of sending them.
#[derive(Default)]
pub struct FakeNotifier {
    pub fail: bool,
    pub hang: bool,
    sent: Mutex<Vec<Notification>>,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Records the notification, then never answers.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, notification: Notification) -> anyhow::Result<String> {
        self.sent.lock().unwrap().push(notification);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            Err(anyhow!("mail server unavailable"))
        } else {
            Ok(format!("msg-{}", self.sent.lock().unwrap().len()))
        }
    }
}
