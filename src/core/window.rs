use crate::domain::model::Window;
use crate::utils::error::{JobError, Result};
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// 月初寬限時數：在此之內的執行仍歸屬上個月
pub const DEFAULT_GRACE_HOURS: i64 = 3;

/// Computes the billing window a run targets.
#[derive(Debug, Clone, Copy)]
pub struct PeriodWindowResolver {
    grace_period: Duration,
}

impl Default for PeriodWindowResolver {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_GRACE_HOURS))
    }
}

impl PeriodWindowResolver {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    /// Default mode picks the current calendar month, or the previous one
    /// while `now` is within the grace period after the month boundary
    /// (boundary inclusive). Explicit mode needs both `year` and `month`
    /// and rejects months that have not started yet.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        year: Option<i32>,
        month: Option<u32>,
    ) -> Result<Window> {
        match (year, month) {
            (None, None) => self.default_window(now),
            (Some(year), Some(month)) => explicit_window(now, year, month),
            (Some(year), None) => Err(JobError::invalid_settings(format!(
                "year {} given without a month",
                year
            ))),
            (None, Some(month)) => Err(JobError::invalid_settings(format!(
                "month {} given without a year",
                month
            ))),
        }
    }

    fn default_window(&self, now: DateTime<Utc>) -> Result<Window> {
        let this_month = month_start(now.year(), now.month())?;

        let start = if now - this_month <= self.grace_period {
            let (year, month) = previous_month(now.year(), now.month());
            month_start(year, month)?
        } else {
            this_month
        };

        month_window(start)
    }
}

fn explicit_window(now: DateTime<Utc>, year: i32, month: u32) -> Result<Window> {
    if !(1..=12).contains(&month) {
        return Err(JobError::invalid_settings(format!(
            "month {} is outside 1..=12",
            month
        )));
    }

    let start = month_start(year, month)?;
    if start > now {
        return Err(JobError::invalid_settings(format!(
            "window {}-{:02} starts in the future ({})",
            year, month, start
        )));
    }

    month_window(start)
}

fn month_window(start: DateTime<Utc>) -> Result<Window> {
    let (year, month) = next_month(start.year(), start.month());
    Ok(Window::new(start, month_start(year, month)?))
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| {
            JobError::invalid_settings(format!("{}-{:02} is not a valid month", year, month))
        })
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorKind;

    fn start_of_july() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn june() -> Window {
        Window::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            start_of_july(),
        )
    }

    fn july() -> Window {
        Window::new(
            start_of_july(),
            Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_first_hours_of_month_look_back() {
        let resolver = PeriodWindowResolver::default();

        let window = resolver
            .resolve(start_of_july() + Duration::hours(3), None, None)
            .unwrap();
        assert_eq!(window, june());

        let window = resolver
            .resolve(start_of_july() + Duration::minutes(5), None, None)
            .unwrap();
        assert_eq!(window, june());
    }

    #[test]
    fn test_other_days_use_current_month() {
        let resolver = PeriodWindowResolver::default();

        let window = resolver
            .resolve(start_of_july() + Duration::days(20), None, None)
            .unwrap();
        assert_eq!(window, july());

        let window = resolver
            .resolve(start_of_july() + Duration::hours(3) + Duration::seconds(1), None, None)
            .unwrap();
        assert_eq!(window, july());
    }

    #[test]
    fn test_grace_period_is_configurable() {
        let resolver = PeriodWindowResolver::new(Duration::hours(0));
        let window = resolver
            .resolve(start_of_july() + Duration::minutes(1), None, None)
            .unwrap();
        assert_eq!(window, july());
    }

    #[test]
    fn test_january_looks_back_to_december() {
        let resolver = PeriodWindowResolver::default();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 1, 0, 0).unwrap();

        let window = resolver.resolve(now, None, None).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_explicit_month_in_the_past_or_current() {
        let resolver = PeriodWindowResolver::default();

        // 剛結束的月份
        let window = resolver
            .resolve(start_of_july() + Duration::days(31), Some(2024), Some(7))
            .unwrap();
        assert_eq!(window, july());

        // 仍在進行中的月份
        let window = resolver
            .resolve(start_of_july() + Duration::days(30), Some(2024), Some(7))
            .unwrap();
        assert_eq!(window, july());

        // 起點恰好等於 now
        let window = resolver.resolve(start_of_july(), Some(2024), Some(7)).unwrap();
        assert_eq!(window, july());
    }

    #[test]
    fn test_explicit_month_in_the_future_is_rejected() {
        let resolver = PeriodWindowResolver::default();
        let error = resolver
            .resolve(start_of_july() - Duration::days(1), Some(2024), Some(7))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidJobSettings);
    }

    #[test]
    fn test_explicit_mode_needs_valid_year_and_month() {
        let resolver = PeriodWindowResolver::default();
        let now = start_of_july() + Duration::days(100);

        assert!(resolver.resolve(now, Some(2024), Some(13)).is_err());
        assert!(resolver.resolve(now, Some(2024), Some(0)).is_err());
        assert!(resolver.resolve(now, Some(2024), None).is_err());
        assert!(resolver.resolve(now, None, Some(7)).is_err());
    }
}
