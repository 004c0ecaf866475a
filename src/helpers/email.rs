use std::path::PathBuf;

use async_trait::async_trait;
use resend_rs::{
    types::{Attachment, CreateEmailBaseOptions},
    Resend,
};
use tracing::{error, info};

use crate::models::config::EmailSettings;

/// An email to deliver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    /// Local files attached by name.
    pub attachments: Vec<PathBuf>,
}

impl Notification {
    /// Confirmation sent once the timesheet for the week ending
    /// `weekend_date` has been submitted.
    pub fn submitted(settings: &EmailSettings, weekend_date: &str, attachments: Vec<PathBuf>) -> Self {
        Self {
            to: settings.to.clone(),
            cc: settings.cc.clone(),
            bcc: settings.bcc.clone(),
            subject: settings.subject_for(weekend_date),
            text: format!(
                "Timesheet for {} has been submitted successfully.",
                weekend_date
            ),
            attachments,
        }
    }

    /// Report sent to the operator when a run stopped before the timesheet
    /// was submitted.
    pub fn failure(operator: &str, error_info: &str) -> Self {
        Self {
            to: vec![operator.to_string()],
            subject: "Error from timesheet autofill".to_string(),
            text: error_info.to_string(),
            ..Default::default()
        }
    }
}

/// Email delivery. One attempt per call, no retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, notification: Notification) -> anyhow::Result<String>;
}

pub struct ResendNotifier {
    resend: Resend,
    from: String,
}

impl ResendNotifier {
    pub fn new(api_key: &str, from: impl Into<String>) -> Self {
        Self {
            resend: Resend::new(api_key),
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send(&self, notification: Notification) -> anyhow::Result<String> {
        info!(
            "Preparing to send email with subject: {}",
            notification.subject
        );

        let mut email = CreateEmailBaseOptions::new(
            self.from.as_str(),
            notification.to.iter().map(String::as_str),
            notification.subject.as_str(),
        )
        .with_text(&notification.text);

        for address in &notification.cc {
            email = email.with_cc(address);
        }
        for address in &notification.bcc {
            email = email.with_bcc(address);
        }

        for path in &notification.attachments {
            let content = tokio::fs::read(path).await?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            info!("Attaching {} ({} bytes)", filename, content.len());
            email = email.with_attachment(Attachment::from_content(content).with_filename(&filename));
        }

        match self.resend.emails.send(email).await {
            Ok(response) => {
                info!("Email sent successfully with ID: {}", response.id);
                Ok(response.id.to_string())
            }
            Err(e) => {
                error!("Failed to send email: {}", e);
                Err(e.into())
            }
        }
    }
}
