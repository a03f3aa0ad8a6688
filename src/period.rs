use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Returned for relative ranges that cannot produce valid dates
pub const INVALID_RANGE: &str = "for an invalid range";

/// Returned for period types this build does not know about
pub const UNSPECIFIED_PERIOD: &str = "for an unspecified period";

/// Historical window a metric is compared against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoricalPeriod {
    /// The last `count` complete units before today
    Relative { count: i64, unit: PeriodUnit },
    /// A calendar period named relative to today
    Named { period: NamedPeriod },
    /// A specific calendar month
    Month { year: i32, month: u32 },
    /// A specific calendar year
    Year { year: i32 },
    /// A specific calendar date
    Date { date: NaiveDate },
    /// Any `type` tag not listed above
    #[serde(other)]
    Unrecognized,
}

/// Unit of a relative range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    #[serde(alias = "days")]
    Day,
    #[serde(alias = "weeks")]
    Week,
    #[serde(alias = "months")]
    Month,
    #[serde(alias = "years")]
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NamedPeriod {
    Yesterday,
    Today,
    LastWeek,
    ThisWeek,
    LastMonth,
    ThisMonth,
    LastYear,
    ThisYear,
}

impl HistoricalPeriod {
    /// Describe this period as a phrase anchored to `today` (a UTC date).
    ///
    /// Weeks run Sunday to Saturday. Never fails: ranges that cannot be
    /// expressed return [`INVALID_RANGE`], unknown period types return
    /// [`UNSPECIFIED_PERIOD`].
    pub fn describe(&self, today: NaiveDate) -> String {
        let phrase = match self {
            HistoricalPeriod::Relative { count, unit } => describe_relative(*count, *unit, today),
            HistoricalPeriod::Named { period } => describe_named(*period, today),
            HistoricalPeriod::Month { year, month } => NaiveDate::from_ymd_opt(*year, *month, 1)
                .map(|first| format!("for month {}", first.format("%B %Y"))),
            HistoricalPeriod::Year { year } => Some(format!("for year {}", year)),
            HistoricalPeriod::Date { date } => Some(describe_date(*date, today)),
            HistoricalPeriod::Unrecognized => {
                tracing::warn!(period = ?self, "Unrecognized historical period type");
                return UNSPECIFIED_PERIOD.to_string();
            }
        };

        phrase.unwrap_or_else(|| INVALID_RANGE.to_string())
    }
}

fn describe_relative(count: i64, unit: PeriodUnit, today: NaiveDate) -> Option<String> {
    if count <= 0 {
        return None;
    }

    match unit {
        PeriodUnit::Day => {
            let start = today.checked_sub_signed(Duration::try_days(count)?)?;
            let end = today.pred_opt()?;
            Some(format!("for dates {} to {}", iso(start), iso(end)))
        }
        PeriodUnit::Week => {
            let end = last_completed_saturday(today)?;
            let start = end.checked_sub_signed(Duration::try_days(count.checked_mul(7)? - 1)?)?;
            let noun = if count == 1 { "week" } else { "weeks" };
            Some(format!("for {} {} to {}", noun, iso(start), iso(end)))
        }
        PeriodUnit::Month => {
            let end = first_of_month(today).pred_opt()?;
            let back = Months::new(u32::try_from(count - 1).ok()?);
            let start = first_of_month(end).checked_sub_months(back)?;
            if count == 1 {
                Some(format!("for month {}", end.format("%B")))
            } else {
                Some(format!(
                    "for months {} to {}",
                    start.format("%B %Y"),
                    end.format("%B %Y")
                ))
            }
        }
        PeriodUnit::Year => {
            let end = today.year() - 1;
            let start = end.checked_sub(i32::try_from(count - 1).ok()?)?;
            if count == 1 {
                Some(format!("for year {}", end))
            } else {
                Some(format!("for years {} to {}", start, end))
            }
        }
    }
}

fn describe_named(period: NamedPeriod, today: NaiveDate) -> Option<String> {
    let since_sunday = Duration::days(today.weekday().num_days_from_sunday() as i64);
    let this_sunday = today.checked_sub_signed(since_sunday)?;

    let phrase = match period {
        NamedPeriod::Yesterday => format!("for yesterday ({})", iso(today.pred_opt()?)),
        NamedPeriod::Today => format!("for today ({})", iso(today)),
        NamedPeriod::ThisWeek => format!("for this week ({} to {})", iso(this_sunday), iso(today)),
        NamedPeriod::LastWeek => {
            let start = this_sunday.checked_sub_signed(Duration::days(7))?;
            let end = this_sunday.pred_opt()?;
            format!("for last week ({} to {})", iso(start), iso(end))
        }
        NamedPeriod::ThisMonth => {
            format!("for this month ({} to {})", iso(first_of_month(today)), iso(today))
        }
        NamedPeriod::LastMonth => {
            let last_month = first_of_month(today).pred_opt()?;
            format!("for last month ({})", last_month.format("%B %Y"))
        }
        NamedPeriod::ThisYear => {
            let first = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
            format!("for this year ({} to {})", iso(first), iso(today))
        }
        NamedPeriod::LastYear => format!("for last year ({})", today.year() - 1),
    };

    Some(phrase)
}

fn describe_date(date: NaiveDate, today: NaiveDate) -> String {
    let mut phrase = format!("for date {}", iso(date));
    if date == today {
        phrase.push_str(" (today)");
    } else if Some(date) == today.pred_opt() {
        phrase.push_str(" (yesterday)");
    }
    phrase
}

/// Saturday closing the latest Sunday-Saturday week that ended before today
fn last_completed_saturday(today: NaiveDate) -> Option<NaiveDate> {
    let back = today.weekday().num_days_from_sunday() as i64 + 1;
    today.checked_sub_signed(Duration::days(back))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn relative(count: i64, unit: PeriodUnit) -> HistoricalPeriod {
        HistoricalPeriod::Relative { count, unit }
    }

    fn named(period: NamedPeriod) -> HistoricalPeriod {
        HistoricalPeriod::Named { period }
    }

    // 2024-03-15 is a Friday
    fn today() -> NaiveDate {
        ymd(2024, 3, 15)
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(
            relative(3, PeriodUnit::Day).describe(today()),
            "for dates 2024-03-12 to 2024-03-14"
        );
        assert_eq!(
            relative(1, PeriodUnit::Day).describe(today()),
            "for dates 2024-03-14 to 2024-03-14"
        );
    }

    #[test]
    fn test_relative_single_month() {
        assert_eq!(relative(1, PeriodUnit::Month).describe(today()), "for month February");
        assert_eq!(
            relative(1, PeriodUnit::Month).describe(ymd(2024, 1, 10)),
            "for month December"
        );
    }

    #[test]
    fn test_relative_months_cross_year() {
        assert_eq!(
            relative(3, PeriodUnit::Month).describe(today()),
            "for months December 2023 to February 2024"
        );
    }

    #[test]
    fn test_relative_weeks() {
        assert_eq!(
            relative(1, PeriodUnit::Week).describe(today()),
            "for week 2024-03-03 to 2024-03-09"
        );
        assert_eq!(
            relative(2, PeriodUnit::Week).describe(today()),
            "for weeks 2024-02-25 to 2024-03-09"
        );
    }

    #[test]
    fn test_relative_week_boundaries() {
        // Saturday: the current week has not finished yet
        assert_eq!(
            relative(1, PeriodUnit::Week).describe(ymd(2024, 3, 16)),
            "for week 2024-03-03 to 2024-03-09"
        );
        // Sunday: yesterday closed a full week
        assert_eq!(
            relative(1, PeriodUnit::Week).describe(ymd(2024, 3, 17)),
            "for week 2024-03-10 to 2024-03-16"
        );
    }

    #[test]
    fn test_relative_years() {
        assert_eq!(relative(1, PeriodUnit::Year).describe(today()), "for year 2023");
        assert_eq!(
            relative(3, PeriodUnit::Year).describe(today()),
            "for years 2021 to 2023"
        );
    }

    #[test]
    fn test_non_positive_count_is_invalid() {
        for unit in [PeriodUnit::Day, PeriodUnit::Week, PeriodUnit::Month, PeriodUnit::Year] {
            for count in [0, -1, -30, i64::MIN] {
                assert_eq!(relative(count, unit).describe(today()), INVALID_RANGE);
            }
        }
    }

    #[test]
    fn test_huge_count_is_invalid() {
        assert_eq!(relative(i64::MAX, PeriodUnit::Day).describe(today()), INVALID_RANGE);
        assert_eq!(relative(i64::MAX, PeriodUnit::Week).describe(today()), INVALID_RANGE);
        assert_eq!(relative(i64::MAX, PeriodUnit::Month).describe(today()), INVALID_RANGE);
        assert_eq!(relative(i64::MAX, PeriodUnit::Year).describe(today()), INVALID_RANGE);
    }

    #[test]
    fn test_named_periods() {
        let t = today();
        assert_eq!(named(NamedPeriod::Yesterday).describe(t), "for yesterday (2024-03-14)");
        assert_eq!(named(NamedPeriod::Today).describe(t), "for today (2024-03-15)");
        assert_eq!(
            named(NamedPeriod::ThisWeek).describe(t),
            "for this week (2024-03-10 to 2024-03-15)"
        );
        assert_eq!(
            named(NamedPeriod::LastWeek).describe(t),
            "for last week (2024-03-03 to 2024-03-09)"
        );
        assert_eq!(
            named(NamedPeriod::ThisMonth).describe(t),
            "for this month (2024-03-01 to 2024-03-15)"
        );
        assert_eq!(named(NamedPeriod::LastMonth).describe(t), "for last month (February 2024)");
        assert_eq!(
            named(NamedPeriod::ThisYear).describe(t),
            "for this year (2024-01-01 to 2024-03-15)"
        );
        assert_eq!(named(NamedPeriod::LastYear).describe(t), "for last year (2023)");
    }

    #[test]
    fn test_specific_month_and_year() {
        let month = HistoricalPeriod::Month { year: 2023, month: 11 };
        assert_eq!(month.describe(today()), "for month November 2023");

        let bad_month = HistoricalPeriod::Month { year: 2023, month: 13 };
        assert_eq!(bad_month.describe(today()), INVALID_RANGE);

        let year = HistoricalPeriod::Year { year: 2024 };
        assert_eq!(year.describe(today()), "for year 2024");
    }

    #[test]
    fn test_specific_date_annotations() {
        let on_today = HistoricalPeriod::Date { date: today() };
        assert_eq!(on_today.describe(today()), "for date 2024-03-15 (today)");

        let on_yesterday = HistoricalPeriod::Date { date: ymd(2024, 3, 14) };
        assert_eq!(on_yesterday.describe(today()), "for date 2024-03-14 (yesterday)");

        let earlier = HistoricalPeriod::Date { date: ymd(2024, 1, 2) };
        assert_eq!(earlier.describe(today()), "for date 2024-01-02");
    }

    #[test]
    fn test_unrecognized_returns_sentinel() {
        assert_eq!(HistoricalPeriod::Unrecognized.describe(today()), UNSPECIFIED_PERIOD);
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            period: HistoricalPeriod,
        }

        let relative: Wrapper = toml::from_str(
            r#"
            [period]
            type = "relative"
            count = 7
            unit = "days"
            "#,
        )
        .unwrap();
        assert_eq!(relative.period, HistoricalPeriod::Relative { count: 7, unit: PeriodUnit::Day });

        let named: Wrapper = toml::from_str(
            r#"
            [period]
            type = "named"
            period = "lastMonth"
            "#,
        )
        .unwrap();
        assert_eq!(named.period, HistoricalPeriod::Named { period: NamedPeriod::LastMonth });

        let date: Wrapper = toml::from_str(
            r#"
            [period]
            type = "date"
            date = "2024-03-15"
            "#,
        )
        .unwrap();
        assert_eq!(date.period, HistoricalPeriod::Date { date: ymd(2024, 3, 15) });

        let unknown: Wrapper = toml::from_str(
            r#"
            [period]
            type = "fiscal_quarter"
            "#,
        )
        .unwrap();
        assert_eq!(unknown.period, HistoricalPeriod::Unrecognized);
    }
}
