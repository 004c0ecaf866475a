//! Rewrites the portal's "quick add" request body.
//!
//! The body is a form with a `values` parameter holding URL-encoded JSON:
//!
//! ```text
//! {
//!     "timecards": [
//!         {
//!             "monday": "8", "tuesday": "8", "wednesday": "8",
//!             "thursday": "8", "friday": "8",
//!             "time_sheet": "37274231db61ab40b94169c3ca961995",
//!             "category": "task_work",
//!             "task": "e0dfbc03db2cef406062dff648961958",
//!             "project_time_category": "9e7e8b024f20cf0027ac04c85210c702"
//!         }
//!     ],
//!     "timesheetId": "37274231db61ab40b94169c3ca961995",
//!     "action": "quick_add"
//! }
//! ```

use serde_json::Value;
use tracing::{error, info};

use crate::error::PayloadError;
use crate::models::hours::HourMap;

const VALUES_PARAM: &str = "values";

/// Decodes the JSON carried in the body's `values` parameter.
pub fn decode_values(raw_body: &str) -> Result<Value, PayloadError> {
    let encoded = raw_body
        .split('&')
        .find_map(|pair| pair.strip_prefix("values="))
        .ok_or(PayloadError::MissingValues)?;

    let decoded =
        urlencoding::decode(encoded).map_err(|e| PayloadError::Encoding(e.to_string()))?;

    serde_json::from_str(&decoded).map_err(|e| PayloadError::Json(e.to_string()))
}

/// Overwrites `timecards[0][day]` with each amount in `hours` and re-encodes
/// the body. Other JSON fields and other form parameters are left as they
/// were.
pub fn transform_payload(raw_body: &str, hours: &HourMap) -> Result<String, PayloadError> {
    let mut values = decode_values(raw_body).inspect_err(|e| {
        error!("Failed to decode timecard request body: {}", e);
    })?;

    let timecard = values
        .get_mut("timecards")
        .and_then(|cards| cards.get_mut(0))
        .and_then(Value::as_object_mut)
        .ok_or(PayloadError::MissingTimecard)?;

    for (day, amount) in hours {
        timecard.insert(day.as_str().to_string(), Value::String(amount.to_string()));
    }

    let json = values.to_string();
    info!("Rewritten timecard values: {}", json);
    let replacement = format!("{}={}", VALUES_PARAM, urlencoding::encode(&json));

    let mut replaced = false;
    let body = raw_body
        .split('&')
        .map(|pair| {
            if !replaced && pair.starts_with("values=") {
                replaced = true;
                replacement.clone()
            } else {
                pair.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    Ok(body)
}
