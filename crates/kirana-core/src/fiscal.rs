//! # Fiscal Years
//!
//! Printed invoice numbers carry the fiscal year they were posted in.
//! Indian fiscal years run April to March, so 19 Oct 2026 falls in `2026-27`.
//!
//! The underlying invoice sequence never resets; only the printed label
//! changes at the year boundary.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// April, the statutory start of the Indian fiscal year.
pub const DEFAULT_FISCAL_START_MONTH: u32 = 4;

/// A fiscal year identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalYear {
    pub start_year: i32,
    pub start_month: u32,
}

impl FiscalYear {
    /// The fiscal year that contains `date`. `start_month` is 1-12.
    pub fn containing(date: NaiveDate, start_month: u32) -> Self {
        let start_month = start_month.clamp(1, 12);
        let start_year = if date.month() >= start_month {
            date.year()
        } else {
            date.year() - 1
        };
        FiscalYear { start_year, start_month }
    }

    /// `2026-27` for split years, `2026` when the year starts in January.
    pub fn label(&self) -> String {
        if self.start_month == 1 {
            self.start_year.to_string()
        } else {
            format!("{}-{:02}", self.start_year, (self.start_year + 1).rem_euclid(100))
        }
    }

    /// First day of this fiscal year.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.start_year, self.start_month, 1)
    }
}

/// Formats the printed invoice number, e.g. `INV/2026-27/000042`.
pub fn display_number(prefix: &str, fiscal_year: &FiscalYear, number: i64) -> String {
    format!("{}/{}/{:06}", prefix, fiscal_year.label(), number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_april_boundary() {
        let march = FiscalYear::containing(date(2027, 3, 31), DEFAULT_FISCAL_START_MONTH);
        let april = FiscalYear::containing(date(2027, 4, 1), DEFAULT_FISCAL_START_MONTH);

        assert_eq!(march.label(), "2026-27");
        assert_eq!(april.label(), "2027-28");
        assert_eq!(april.first_day(), Some(date(2027, 4, 1)));
    }

    #[test]
    fn test_century_rollover_label() {
        let fy = FiscalYear::containing(date(2099, 6, 1), 4);
        assert_eq!(fy.label(), "2099-00");
    }

    #[test]
    fn test_calendar_fiscal_year() {
        let fy = FiscalYear::containing(date(2026, 10, 19), 1);
        assert_eq!(fy.label(), "2026");
    }

    #[test]
    fn test_display_number() {
        let fy = FiscalYear::containing(date(2026, 10, 19), 4);
        assert_eq!(display_number("INV", &fy, 42), "INV/2026-27/000042");
    }
}
