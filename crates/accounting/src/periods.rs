//! Accounting periods and the period-close lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopledger_core::{DomainError, DomainResult};

/// A half-open accounting period `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub locked: bool,
}

impl AccountingPeriod {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date < self.end
    }
}

/// Per-tenant set of accounting periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCalendar {
    periods: Vec<AccountingPeriod>,
}

impl PeriodCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_period(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<()> {
        if end <= start {
            return Err(DomainError::validation("period end must be after start"));
        }
        if self.periods.iter().any(|p| start < p.end && p.start < end) {
            return Err(DomainError::validation("periods cannot overlap"));
        }
        self.periods.push(AccountingPeriod {
            start,
            end,
            locked: false,
        });
        Ok(())
    }

    pub fn period_containing(&self, date: DateTime<Utc>) -> Option<&AccountingPeriod> {
        self.periods.iter().find(|p| p.contains(date))
    }

    /// Dates outside any defined period are open.
    pub fn is_locked(&self, date: DateTime<Utc>) -> bool {
        self.period_containing(date).is_some_and(|p| p.locked)
    }

    pub fn lock_containing(&mut self, date: DateTime<Utc>) -> DomainResult<AccountingPeriod> {
        let period = self
            .periods
            .iter_mut()
            .find(|p| p.contains(date))
            .ok_or(DomainError::NotFound)?;
        period.locked = true;
        Ok(*period)
    }

    pub fn unlock_containing(&mut self, date: DateTime<Utc>) -> DomainResult<AccountingPeriod> {
        let period = self
            .periods
            .iter_mut()
            .find(|p| p.contains(date))
            .ok_or(DomainError::NotFound)?;
        period.locked = false;
        Ok(*period)
    }

    pub fn periods(&self) -> &[AccountingPeriod] {
        &self.periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn periods_are_half_open() {
        let mut calendar = PeriodCalendar::new();
        calendar
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();

        let period = calendar.period_containing(date(2025, 4, 1)).unwrap();
        assert!(period.contains(date(2025, 4, 30)));
        assert!(calendar.period_containing(date(2025, 5, 1)).is_none());
    }

    #[test]
    fn overlapping_periods_are_rejected() {
        let mut calendar = PeriodCalendar::new();
        calendar
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();
        let err = calendar
            .add_period(date(2025, 4, 15), date(2025, 5, 15))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lock_and_unlock_round_trip() {
        let mut calendar = PeriodCalendar::new();
        calendar
            .add_period(date(2025, 4, 1), date(2025, 5, 1))
            .unwrap();
        assert!(!calendar.is_locked(date(2025, 4, 10)));

        calendar.lock_containing(date(2025, 4, 10)).unwrap();
        assert!(calendar.is_locked(date(2025, 4, 10)));

        calendar.unlock_containing(date(2025, 4, 10)).unwrap();
        assert!(!calendar.is_locked(date(2025, 4, 10)));
    }

    #[test]
    fn dates_outside_defined_periods_are_open() {
        let calendar = PeriodCalendar::new();
        assert!(!calendar.is_locked(date(2025, 4, 10)));
    }
}
