//! Cron utility functions for validating expressions and calculating
//! timezone-aware next occurrences

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;

use crate::errors::{SchedulerError, SchedulerResult};

/// Normalize a 5-field cron expression to the 6-field form the `cron` crate
/// expects by prepending a seconds field of `0`
///
/// 6- and 7-field expressions pass through unchanged.
pub fn normalize_cron_expression(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {}", expression.trim())
    } else {
        expression.trim().to_string()
    }
}

/// Parse a 5/6-field cron expression, surfacing a validation error on
/// malformed input
pub fn parse_cron(expression: &str) -> SchedulerResult<CronSchedule> {
    let normalized = normalize_cron_expression(expression);
    CronSchedule::from_str(&normalized).map_err(|e| {
        SchedulerError::validation(format!("invalid cron expression '{expression}': {e}"))
    })
}

/// Resolve an IANA timezone name, surfacing a validation error on an
/// unknown name
pub fn parse_timezone(name: &str) -> SchedulerResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| SchedulerError::validation(format!("unknown timezone '{name}'")))
}

/// Next occurrence of `schedule` after now, evaluated in `tz`, as UTC
///
/// Returns `None` when the expression has no future occurrences.
pub fn next_occurrence(schedule: &CronSchedule, tz: Tz) -> Option<DateTime<Utc>> {
    let now = Utc::now().with_timezone(&tz);
    schedule
        .after(&now)
        .next()
        .map(|next| next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_field_expressions_gain_a_seconds_field() {
        assert_eq!(normalize_cron_expression("0 9 * * *"), "0 0 9 * * *");
        assert_eq!(normalize_cron_expression("*/5 * * * *"), "0 */5 * * * *");
    }

    #[test]
    fn test_six_field_expressions_pass_through() {
        assert_eq!(normalize_cron_expression("30 0 9 * * *"), "30 0 9 * * *");
    }

    #[test]
    fn test_parse_cron_accepts_both_forms() {
        assert!(parse_cron("0 9 * * *").is_ok());
        assert!(parse_cron("30 0 9 * * *").is_ok());
        assert!(parse_cron("not a cron").is_err());
        assert!(parse_cron("99 99 * * *").is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("UTC").is_ok());
        assert!(parse_timezone("Europe/Berlin").is_ok());
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_next_occurrence_is_in_the_future() {
        let schedule = parse_cron("*/5 * * * *").unwrap();
        let next = next_occurrence(&schedule, chrono_tz::UTC).unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn test_next_occurrence_respects_timezone() {
        // Daily at 09:00 in two zones 8+ hours apart must not agree on the
        // same UTC instant
        let schedule = parse_cron("0 9 * * *").unwrap();
        let berlin = next_occurrence(&schedule, chrono_tz::Europe::Berlin).unwrap();
        let tokyo = next_occurrence(&schedule, chrono_tz::Asia::Tokyo).unwrap();
        assert_ne!(berlin, tokyo);
    }
}
