use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::hours::{ExceptionTable, HourMap, Workday};

/// Everything one run needs apart from credentials.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetConfig {
    /// Project number as shown on the portal's project card.
    pub project: String,
    /// Time category label picked from the card's dropdown.
    pub category: String,
    pub default_hours: HourMap,
    #[serde(default)]
    pub exceptional_hours: ExceptionTable,
    pub email_settings: EmailSettings,
    #[serde(default)]
    pub portal: PortalSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    /// Subject line; `{weekendDate}` is replaced by the week's Saturday.
    pub subject_template: String,
}

impl EmailSettings {
    pub fn subject_for(&self, weekend_date: &str) -> String {
        self.subject_template.replace("{weekendDate}", weekend_date)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct PortalSettings {
    pub url: String,
    /// Upper bound for every navigation, wait and network round-trip.
    pub step_timeout_secs: u64,
    /// How many times "previous week" may be pressed while looking for the
    /// target week.
    pub max_week_steps: u32,
    /// Where screenshots are written.
    pub artifact_dir: PathBuf,
}

impl PortalSettings {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            url: "https://coxauto.service-now.com/time".to_string(),
            step_timeout_secs: 30,
            max_week_steps: 60,
            artifact_dir: PathBuf::from("."),
        }
    }
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Portal login plus the mail account confirmations are sent from.
///
/// For the Resend notifier the mailer password is the API key.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub portal: Account,
    pub mailer: Account,
}

/// On-disk layout of `config.json`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub credentials: Credentials,
    #[serde(flatten)]
    pub timesheet: TimesheetConfig,
}

impl ConfigFile {
    /// Placeholder values written when no config file exists yet.
    pub fn template() -> Self {
        let default_hours = Workday::ALL.iter().map(|day| (*day, 8)).collect();

        Self {
            credentials: Credentials {
                portal: Account {
                    email: "YOUR_NAME@coxautoinc.com".to_string(),
                    password: String::new(),
                },
                mailer: Account {
                    email: "YOUR_NAME@mojix.com".to_string(),
                    password: String::new(),
                },
            },
            timesheet: TimesheetConfig {
                project: "PRJ0000000".to_string(),
                category: "Development".to_string(),
                default_hours,
                exceptional_hours: ExceptionTable::default(),
                email_settings: EmailSettings {
                    to: vec!["cox_report@mojix.com".to_string()],
                    cc: vec!["LEAD_NAME@mojix.com".to_string()],
                    bcc: Vec::new(),
                    subject_template: "{weekendDate} 1234 LASTNAME".to_string(),
                },
                portal: PortalSettings::default(),
            },
        }
    }
}
