use std::fmt::{self, Write};

use chrono::{DateTime, Duration, Utc};

use crate::cert_probe::describe;
use crate::cert_probe::result::ProbeResult;

/// Days before expiry at which a certificate starts being reported.
pub const DEFAULT_THRESHOLD_DAYS: u32 = 28;

/// Subject line of the notification mail.
pub const MAIL_SUBJECT: &str = "notafter: domain cert expiries";

/// How urgently a domain's certificate needs attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Urgency {
    /// Expires later than the threshold.
    Ok,
    Expired,
    LessThanADay,
    /// Expires within the threshold, in this many whole days.
    Days(i64),
    /// The probe failed; holds the error description.
    Failed(String),
}

impl Urgency {
    pub fn needs_notify(&self) -> bool {
        !matches!(self, Urgency::Ok)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Ok => f.write_str("ok"),
            Urgency::Expired => f.write_str("already expired"),
            Urgency::LessThanADay => f.write_str("expires in less than a day"),
            Urgency::Days(n) => write!(f, "expires in {} {}", n, pluralize(*n, "day")),
            Urgency::Failed(description) => f.write_str(description),
        }
    }
}

/// Classifies a certificate expiring at `not_after` against `now`.
///
/// `gap == threshold` is still reported; only certificates valid for strictly
/// longer than the threshold are `Ok`.
pub fn classify_expiry(
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Urgency {
    let gap = not_after - now;
    let day = Duration::days(1);

    if gap > threshold {
        Urgency::Ok
    } else if gap < Duration::zero() {
        Urgency::Expired
    } else if gap < day {
        Urgency::LessThanADay
    } else {
        Urgency::Days(gap.num_days())
    }
}

pub fn classify(result: &ProbeResult, now: DateTime<Utc>, threshold: Duration) -> Urgency {
    match &result.outcome {
        Ok(not_after) => classify_expiry(*not_after, now, threshold),
        Err(e) => Urgency::Failed(describe(e)),
    }
}

fn pluralize(n: i64, noun: &str) -> String {
    if n == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}

/// The classified view of one run's probe results, evaluated at a fixed `now`.
pub struct Report<'a> {
    results: &'a [ProbeResult],
    now: DateTime<Utc>,
    threshold: Duration,
}

impl<'a> Report<'a> {
    pub fn new(results: &'a [ProbeResult], now: DateTime<Utc>, threshold: Duration) -> Self {
        Self {
            results,
            now,
            threshold,
        }
    }

    /// True if any domain failed to probe or expires within the threshold.
    pub fn needs_notify(&self) -> bool {
        self.results
            .iter()
            .any(|r| classify(r, self.now, self.threshold).needs_notify())
    }

    /// One `<domain>: <classification>` line per domain, in input order,
    /// each terminated by a newline.
    pub fn render(&self) -> String {
        let mut body = String::new();
        for result in self.results {
            let urgency = classify(result, self.now, self.threshold);
            let _ = writeln!(body, "{}: {}", result.domain, urgency);
        }
        body
    }
}
