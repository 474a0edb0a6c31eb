use crate::error::AppError;
use crate::models::{DateWindow, RangeToken};
use chrono::{Datelike, Days, NaiveDate};

pub fn parse_range_token(raw: &str) -> Result<RangeToken, AppError> {
    match raw {
        "7days" => Ok(RangeToken::SevenDays),
        "30days" => Ok(RangeToken::ThirtyDays),
        "90days" => Ok(RangeToken::NinetyDays),
        "thisMonth" => Ok(RangeToken::ThisMonth),
        other => Err(AppError::InvalidRangeToken(other.to_string())),
    }
}

/// Resolves a range token against a fixed "today" into the current and
/// previous reporting periods. Fixed-length presets compare against the
/// immediately preceding equal-length window; the calendar-month preset
/// compares against the full prior month.
pub fn resolve(token: RangeToken, today: NaiveDate) -> DateWindow {
    match token.fixed_days() {
        Some(days) => {
            let current_start = today - Days::new(days);
            DateWindow {
                current_start,
                current_end: today,
                previous_start: current_start - Days::new(days),
                previous_end: current_start,
            }
        }
        None => {
            let current_start = month_start(today);
            // The day before the 1st is always the last day of the prior month.
            let previous_end = current_start.pred_opt().unwrap_or(current_start);
            DateWindow {
                current_start,
                current_end: today,
                previous_start: month_start(previous_end),
                previous_end,
            }
        }
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn fixed_presets_are_contiguous_and_equal_length() {
        let today = date(2024, 6, 15);
        for (token, days) in [
            (RangeToken::SevenDays, 7),
            (RangeToken::ThirtyDays, 30),
            (RangeToken::NinetyDays, 90),
        ] {
            let w = resolve(token, today);
            assert_eq!(w.current_end, today);
            assert_eq!(w.current_start, today - Days::new(days));
            assert_eq!(w.previous_end, w.current_start);
            assert_eq!(w.previous_start, w.current_start - Days::new(days));
        }
    }

    #[test]
    fn no_window_starts_after_it_ends() {
        let today = date(2024, 3, 1);
        for token in [
            RangeToken::SevenDays,
            RangeToken::ThirtyDays,
            RangeToken::NinetyDays,
            RangeToken::ThisMonth,
        ] {
            let w = resolve(token, today);
            assert!(w.current_start <= w.current_end, "{token:?}");
            assert!(w.previous_start <= w.previous_end, "{token:?}");
        }
    }

    #[test]
    fn this_month_compares_against_full_prior_month() {
        let w = resolve(RangeToken::ThisMonth, date(2024, 6, 15));
        assert_eq!(w.current_start, date(2024, 6, 1));
        assert_eq!(w.current_end, date(2024, 6, 15));
        assert_eq!(w.previous_start, date(2024, 5, 1));
        assert_eq!(w.previous_end, date(2024, 5, 31));
    }

    #[test]
    fn this_month_in_january_rolls_back_to_december() {
        let w = resolve(RangeToken::ThisMonth, date(2024, 1, 10));
        assert_eq!(w.previous_start, date(2023, 12, 1));
        assert_eq!(w.previous_end, date(2023, 12, 31));
    }

    #[test]
    fn this_month_handles_leap_february() {
        let w = resolve(RangeToken::ThisMonth, date(2024, 3, 5));
        assert_eq!(w.previous_end, date(2024, 2, 29));
    }

    #[test]
    fn parse_accepts_the_closed_token_set() {
        assert_eq!(parse_range_token("7days").expect("7days"), RangeToken::SevenDays);
        assert_eq!(
            parse_range_token("thisMonth").expect("thisMonth"),
            RangeToken::ThisMonth
        );
    }

    #[test]
    fn parse_rejects_unknown_tokens_instead_of_guessing() {
        let err = parse_range_token("2weeks").expect_err("should reject");
        assert!(matches!(err, AppError::InvalidRangeToken(ref t) if t == "2weeks"));
    }
}
