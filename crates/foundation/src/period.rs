use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Year,
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    Empty,
    Malformed(String),
    YearOutOfRange(i32),
    MonthOutOfRange(u32),
}

impl fmt::Display for PeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodError::Empty => write!(f, "empty period"),
            PeriodError::Malformed(s) => write!(f, "malformed period: {s:?}"),
            PeriodError::YearOutOfRange(y) => write!(f, "year out of range: {y}"),
            PeriodError::MonthOutOfRange(m) => write!(f, "month out of range: {m}"),
        }
    }
}

impl std::error::Error for PeriodError {}

/// A discrete period on the time axis: a whole year or a single month.
///
/// Ordering is chronological. A bare year sorts before every month of the
/// same year, so a yearly record counts as known from January onwards.
///
/// The textual form is fixed width (`YYYY` / `YYYY-MM`) which keeps
/// lexicographic and chronological order identical for years 1000..=9999.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    // Declared after `year` so the derived `Ord` is (year, month). `None` < `Some`.
    month: Option<u8>,
}

impl Period {
    pub const MIN_YEAR: i32 = 1000;
    pub const MAX_YEAR: i32 = 9999;

    pub fn year(year: i32) -> Result<Self, PeriodError> {
        check_year(year)?;
        Ok(Self { year, month: None })
    }

    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange(month));
        }
        Ok(Self {
            year,
            month: Some(month as u8),
        })
    }

    /// Parses `YYYY`, `YYYY-MM`, `YYYY-MM-DD` (and date-time strings with that
    /// prefix) keeping the precision of the input, capped at month.
    pub fn parse(s: &str) -> Result<Self, PeriodError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PeriodError::Empty);
        }
        let malformed = || PeriodError::Malformed(s.to_string());

        let date = match s.find(['T', ' ']) {
            Some(at) => &s[..at],
            None => s,
        };
        let mut parts = date.split(['-', '/']);

        let year_part = parts.next().ok_or_else(malformed)?;
        if year_part.len() != 4 || !year_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let year: i32 = year_part.parse().map_err(|_| malformed())?;

        let Some(month_part) = parts.next() else {
            return Period::year(year);
        };
        if month_part.is_empty()
            || month_part.len() > 2
            || !month_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let month: u32 = month_part.parse().map_err(|_| malformed())?;

        if let Some(day_part) = parts.next() {
            let day_ok = !day_part.is_empty()
                && day_part.len() <= 2
                && day_part.bytes().all(|b| b.is_ascii_digit())
                && day_part.parse::<u32>().is_ok_and(|d| (1..=31).contains(&d));
            if !day_ok {
                return Err(malformed());
            }
        }
        if parts.next().is_some() {
            return Err(malformed());
        }

        Period::month(year, month)
    }

    /// Parses and coerces to `granularity`. Finer inputs are truncated; a bare
    /// year cannot be widened to a month and is rejected.
    pub fn parse_as(s: &str, granularity: Granularity) -> Result<Self, PeriodError> {
        let p = Period::parse(s)?;
        match (granularity, p.month) {
            (Granularity::Year, _) => Ok(Self {
                year: p.year,
                month: None,
            }),
            (Granularity::Month, Some(_)) => Ok(p),
            (Granularity::Month, None) => Err(PeriodError::Malformed(s.trim().to_string())),
        }
    }

    pub fn year_number(&self) -> i32 {
        self.year
    }

    pub fn month_number(&self) -> Option<u32> {
        self.month.map(u32::from)
    }

    pub fn granularity(&self) -> Granularity {
        match self.month {
            Some(_) => Granularity::Month,
            None => Granularity::Year,
        }
    }

    /// Human label for date displays: `January 2008`, or `2008` for years.
    pub fn long_label(&self) -> String {
        match self.month {
            Some(m) => format!("{} {}", MONTH_NAMES[usize::from(m) - 1], self.year),
            None => self.year.to_string(),
        }
    }
}

fn check_year(year: i32) -> Result<(), PeriodError> {
    if !(Period::MIN_YEAR..=Period::MAX_YEAR).contains(&year) {
        return Err(PeriodError::YearOutOfRange(year));
    }
    Ok(())
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Period::parse(&s)
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Granularity, Period, PeriodError};

    fn p(s: &str) -> Period {
        Period::parse(s).unwrap()
    }

    #[test]
    fn parses_supported_shapes() {
        assert_eq!(p("2007"), Period::year(2007).unwrap());
        assert_eq!(p("2007-03"), Period::month(2007, 3).unwrap());
        assert_eq!(p("2007-3"), Period::month(2007, 3).unwrap());
        assert_eq!(p("2007-03-15"), Period::month(2007, 3).unwrap());
        assert_eq!(p("2007-03-15T10:00:00Z"), Period::month(2007, 3).unwrap());
        assert_eq!(p(" 2007/11 "), Period::month(2007, 11).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Period::parse(""), Err(PeriodError::Empty));
        assert!(Period::parse("07-03").is_err());
        assert!(Period::parse("2007-13").is_err());
        assert!(Period::parse("2007-03-40").is_err());
        assert!(Period::parse("Country Name").is_err());
        assert!(Period::parse("2007-03-01-02").is_err());
    }

    #[test]
    fn display_is_zero_padded_and_round_trips() {
        let m = Period::month(2009, 1).unwrap();
        assert_eq!(m.to_string(), "2009-01");
        assert_eq!(p(&m.to_string()), m);
    }

    #[test]
    fn lexicographic_order_matches_chronological_order() {
        let mut periods = vec![p("2008-10"), p("2008-02"), p("2007-12"), p("2008-09")];
        let mut labels: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        periods.sort();
        labels.sort();
        let sorted_labels: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, sorted_labels);
    }

    #[test]
    fn bare_year_sorts_before_its_months() {
        assert!(p("2008") < p("2008-01"));
        assert!(p("2007-12") < p("2008"));
    }

    #[test]
    fn coerces_granularity() {
        assert_eq!(
            Period::parse_as("2008-09-15", Granularity::Month).unwrap(),
            p("2008-09")
        );
        assert_eq!(
            Period::parse_as("2008-09-15", Granularity::Year).unwrap(),
            p("2008")
        );
        assert!(Period::parse_as("2008", Granularity::Month).is_err());
    }

    #[test]
    fn long_labels() {
        assert_eq!(p("2008-05").long_label(), "May 2008");
        assert_eq!(p("2012").long_label(), "2012");
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&p("2010-04")).unwrap();
        assert_eq!(json, "\"2010-04\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p("2010-04"));
        assert!(serde_json::from_str::<Period>("\"nope\"").is_err());
    }
}
