//! Helpers shared by every spider for deriving record ids and statuses.

use crate::common::constants::{CONFIRMED_WINDOW_DAYS, MISSING_AGENCY_ID};
use crate::common::types::{EventTime, Status};
use chrono::{Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase a meeting name into an id-safe slug.
///
/// Punctuation is dropped and whitespace runs become a single underscore.
pub fn slugify(name: &str) -> String {
    let cleaned = PUNCTUATION_RE.replace_all(name, "").to_lowercase();
    WHITESPACE_RE.replace_all(cleaned.trim(), "_").into_owned()
}

/// Build the stable record id `spider/YYYYmmddHHMM/agency_id/slug`.
pub fn generate_id(spider_name: &str, start: &EventTime, agency_id: Option<&str>, name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        spider_name,
        start.naive_datetime().format("%Y%m%d%H%M"),
        agency_id.unwrap_or(MISSING_AGENCY_ID),
        slugify(name)
    )
}

/// Derive a meeting status from its text and start relative to `now`.
pub fn generate_status(
    name: &str,
    description: &str,
    extra_text: &str,
    start: &EventTime,
    now: NaiveDateTime,
) -> Status {
    let text = format!("{} {} {}", name, description, extra_text).to_lowercase();
    if text.contains("cancel") || text.contains("rescheduled") {
        return Status::Cancelled;
    }

    let start_dt = start.naive_datetime();
    if start_dt < now {
        Status::Passed
    } else if start_dt - now < Duration::days(CONFIRMED_WINDOW_DAYS) {
        Status::Confirmed
    } else {
        Status::Tentative
    }
}

/// Current wall-clock time in the agency's timezone.
pub fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// Collapse internal whitespace runs, as found in scraped text nodes.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
