//! Interface to the browser that drives the timesheet portal, plus the
//! request interceptor used to inject hours into the "quick add" call.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::PayloadError;
use crate::helpers::payload::transform_payload;
use crate::models::hours::HourMap;

/// URL fragment identifying the portal's add-to-timesheet request.
pub const ADD_TIMECARD_URL: &str =
    "/timecardprocessor.do?sysparm_name=addToTimesheet&sysparm_processor=TimeCardPortalService";

/// Browser page controlled by the workflow.
///
/// Selectors are jQuery-style, so `:contains(...)` and `:not(...)` are
/// accepted. Implementations should not apply their own timeouts to
/// `wait_for`; the workflow bounds every call.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> anyhow::Result<()>;

    /// Resolves once at least one element matches `selector`.
    async fn wait_for(&self, selector: &str) -> anyhow::Result<()>;

    async fn type_text(&self, selector: &str, text: &str) -> anyhow::Result<()>;

    async fn click(&self, selector: &str) -> anyhow::Result<()>;

    /// Triggers a DOM event (`click`, `mousedown`, `mouseup`, ...) on every
    /// element matching `selector`.
    async fn trigger(&self, selector: &str, event: &str) -> anyhow::Result<()>;

    /// Trimmed text of the first element matching `selector`.
    async fn text_of(&self, selector: &str) -> anyhow::Result<String>;

    /// Text of every element matching `selector`, in document order.
    async fn texts_of(&self, selector: &str) -> anyhow::Result<Vec<String>>;

    async fn screenshot(&self, path: &Path) -> anyhow::Result<()>;

    /// Installs `interceptor` for every outgoing request, or removes it when
    /// `None`.
    async fn set_interceptor(
        &self,
        interceptor: Option<Arc<dyn RequestInterceptor>>,
    ) -> anyhow::Result<()>;
}

/// Outgoing request as seen by an interceptor.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub url: String,
    pub body: Option<String>,
}

/// How the driver should continue an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptDecision {
    PassThrough,
    Replace(String),
    Block,
}

pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &InterceptedRequest) -> InterceptDecision;
}

#[derive(Debug)]
enum InterceptState {
    Armed,
    Consumed,
    Failed(PayloadError),
}

/// One-shot interceptor for the add-timecard request.
///
/// The hour map is fixed at construction. The first matching request gets
/// its body rewritten; every later request, matching or not, passes through
/// untouched. If the rewrite fails the request is blocked and the error is
/// kept for [`TimecardInterceptor::finish`].
#[derive(Debug)]
pub struct TimecardInterceptor {
    url_fragment: String,
    hours: HourMap,
    state: Mutex<InterceptState>,
}

impl TimecardInterceptor {
    pub fn new(hours: HourMap) -> Self {
        Self::for_url(ADD_TIMECARD_URL, hours)
    }

    pub fn for_url(url_fragment: impl Into<String>, hours: HourMap) -> Self {
        Self {
            url_fragment: url_fragment.into(),
            hours,
            state: Mutex::new(InterceptState::Armed),
        }
    }

    pub fn hours(&self) -> &HourMap {
        &self.hours
    }

    pub fn is_consumed(&self) -> bool {
        self.state
            .lock()
            .map(|state| !matches!(*state, InterceptState::Armed))
            .unwrap_or(true)
    }

    /// Outcome of the interception: `Ok(true)` once the request was rewritten,
    /// `Ok(false)` if no matching request was seen, the rewrite error
    /// otherwise.
    pub fn finish(&self) -> Result<bool, PayloadError> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match std::mem::replace(&mut *state, InterceptState::Consumed) {
            InterceptState::Armed => {
                *state = InterceptState::Armed;
                Ok(false)
            }
            InterceptState::Consumed => Ok(true),
            InterceptState::Failed(e) => Err(e),
        }
    }
}

impl RequestInterceptor for TimecardInterceptor {
    fn intercept(&self, request: &InterceptedRequest) -> InterceptDecision {
        if !request.url.contains(&self.url_fragment) {
            return InterceptDecision::PassThrough;
        }

        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !matches!(*state, InterceptState::Armed) {
            warn!("Timecard request seen again after interception, passing through");
            return InterceptDecision::PassThrough;
        }

        info!("Intercepted timecard request: {}", request.url);
        let result = request
            .body
            .as_deref()
            .ok_or(PayloadError::MissingValues)
            .and_then(|body| transform_payload(body, &self.hours));

        match result {
            Ok(body) => {
                *state = InterceptState::Consumed;
                InterceptDecision::Replace(body)
            }
            Err(e) => {
                error!("Blocking timecard request, rewrite failed: {}", e);
                *state = InterceptState::Failed(e);
                InterceptDecision::Block
            }
        }
    }
}
