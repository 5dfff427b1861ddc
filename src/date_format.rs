//! Moment-style filename formats (`YYYY-MM-DD`, `GGGG-[W]WW`, `YYYY-[Q]Q`).
//!
//! A format compiles into an anchored regex with one capture group per
//! token. Week tokens are always ISO weeks.

use crate::errors::{NavError, NavResult};
use crate::models::{Document, Granularity};
use crate::period;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]|YYYY|GGGG|gggg|YY|MMMM|MMM|MM|M|DD|D|WW|W|ww|w|Q|dddd|ddd|E|e")
        .expect("valid regex")
});

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

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year,
    ShortYear,
    WeekYear,
    MonthName,
    MonthAbbr,
    MonthPadded,
    Month,
    DayPadded,
    Day,
    WeekPadded,
    Week,
    Quarter,
    WeekdayName,
    WeekdayAbbr,
    IsoWeekday,
    LocaleWeekday,
}

impl Token {
    fn parse_token(token: &str) -> Option<Self> {
        let token = match token {
            "YYYY" => Self::Year,
            "YY" => Self::ShortYear,
            "GGGG" | "gggg" => Self::WeekYear,
            "MMMM" => Self::MonthName,
            "MMM" => Self::MonthAbbr,
            "MM" => Self::MonthPadded,
            "M" => Self::Month,
            "DD" => Self::DayPadded,
            "D" => Self::Day,
            "WW" | "ww" => Self::WeekPadded,
            "W" | "w" => Self::Week,
            "Q" => Self::Quarter,
            "dddd" => Self::WeekdayName,
            "ddd" => Self::WeekdayAbbr,
            "E" => Self::IsoWeekday,
            "e" => Self::LocaleWeekday,
            _ => return None,
        };
        Some(token)
    }

    fn regex(self) -> &'static str {
        match self {
            Self::Year | Self::WeekYear => r"\d{4}",
            Self::ShortYear | Self::MonthPadded | Self::DayPadded | Self::WeekPadded => r"\d{2}",
            Self::Month | Self::Day | Self::Week => r"\d{1,2}",
            Self::MonthName | Self::WeekdayName => r"[A-Za-z]+",
            Self::MonthAbbr | Self::WeekdayAbbr => r"[A-Za-z]{3}",
            Self::Quarter => r"[1-4]",
            Self::IsoWeekday | Self::LocaleWeekday => r"\d",
        }
    }

    fn render(self, date: NaiveDate) -> String {
        match self {
            Self::Year => format!("{:04}", date.year()),
            Self::ShortYear => format!("{:02}", date.year().rem_euclid(100)),
            Self::WeekYear => format!("{:04}", period::iso_week_year(date)),
            Self::MonthName => MONTH_NAMES[date.month0() as usize].to_string(),
            Self::MonthAbbr => MONTH_NAMES[date.month0() as usize][..3].to_string(),
            Self::MonthPadded => format!("{:02}", date.month()),
            Self::Month => date.month().to_string(),
            Self::DayPadded => format!("{:02}", date.day()),
            Self::Day => date.day().to_string(),
            Self::WeekPadded => format!("{:02}", period::iso_week(date)),
            Self::Week => period::iso_week(date).to_string(),
            Self::Quarter => period::quarter_of(date).to_string(),
            Self::WeekdayName => {
                WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize].to_string()
            }
            Self::WeekdayAbbr => {
                WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize][..3].to_string()
            }
            Self::IsoWeekday => date.weekday().number_from_monday().to_string(),
            Self::LocaleWeekday => date.weekday().num_days_from_monday().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Field(Token),
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    week_year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    week: Option<u32>,
    quarter: Option<u32>,
}

/// A compiled filename format.
#[derive(Debug, Clone)]
pub struct DateFormat {
    pattern: String,
    pieces: Vec<Piece>,
    matcher: Regex,
}

impl DateFormat {
    pub fn compile(pattern: &str) -> NavResult<Self> {
        if pattern.trim().is_empty() {
            return Err(NavError::Format("date format must not be empty".to_string()));
        }

        let mut pieces = Vec::new();
        let mut cursor = 0usize;
        for found in TOKEN_PATTERN.find_iter(pattern) {
            if found.start() > cursor {
                pieces.push(Piece::Literal(pattern[cursor..found.start()].to_string()));
            }
            let text = found.as_str();
            match text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
                Some(literal) => pieces.push(Piece::Literal(literal.to_string())),
                None => {
                    let token = Token::parse_token(text)
                        .ok_or_else(|| NavError::Format(format!("unknown token '{}' in '{}'", text, pattern)))?;
                    pieces.push(Piece::Field(token));
                }
            }
            cursor = found.end();
        }
        if cursor < pattern.len() {
            pieces.push(Piece::Literal(pattern[cursor..].to_string()));
        }

        if !pieces.iter().any(|piece| matches!(piece, Piece::Field(_))) {
            return Err(NavError::Format(format!("date format '{}' has no date tokens", pattern)));
        }

        let mut source = String::from("^");
        let mut group = 0usize;
        for piece in &pieces {
            match piece {
                Piece::Literal(text) => source.push_str(&regex::escape(text)),
                Piece::Field(token) => {
                    source.push_str(&format!("(?P<f{}>{})", group, token.regex()));
                    group += 1;
                }
            }
        }
        source.push('$');

        Ok(Self {
            pattern: pattern.to_string(),
            pieces,
            matcher: Regex::new(&source)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Decodes `text`; any mismatch or impossible date yields `None`.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let captures = self.matcher.captures(text)?;
        let mut fields = Fields::default();
        let tokens = self.pieces.iter().filter_map(|piece| match piece {
            Piece::Field(token) => Some(*token),
            Piece::Literal(_) => None,
        });
        for (group, token) in tokens.enumerate() {
            let value = captures.name(&format!("f{}", group))?.as_str();
            match token {
                Token::Year => merge(&mut fields.year, value.parse().ok()?)?,
                Token::ShortYear => merge(&mut fields.year, 2000 + value.parse::<i32>().ok()?)?,
                Token::WeekYear => merge(&mut fields.week_year, value.parse().ok()?)?,
                Token::MonthName | Token::MonthAbbr => merge(&mut fields.month, month_from_name(value)?)?,
                Token::MonthPadded | Token::Month => merge(&mut fields.month, value.parse().ok()?)?,
                Token::DayPadded | Token::Day => merge(&mut fields.day, value.parse().ok()?)?,
                Token::WeekPadded | Token::Week => merge(&mut fields.week, value.parse().ok()?)?,
                Token::Quarter => merge(&mut fields.quarter, value.parse().ok()?)?,
                Token::WeekdayName | Token::WeekdayAbbr | Token::IsoWeekday | Token::LocaleWeekday => {}
            }
        }
        fields.resolve()
    }

    pub fn format(&self, date: NaiveDate) -> String {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(text) => text.clone(),
                Piece::Field(token) => token.render(date),
            })
            .collect()
    }
}

impl Fields {
    fn resolve(&self) -> Option<NaiveDate> {
        if let Some(week) = self.week {
            let week_year = self.week_year.or(self.year)?;
            return period::iso_week_start(week_year, week);
        }
        let year = self.year.or(self.week_year)?;
        if let Some(quarter) = self.quarter {
            return period::quarter_start(year, quarter);
        }
        match (self.month, self.day) {
            (Some(month), day) => NaiveDate::from_ymd_opt(year, month, day.unwrap_or(1)),
            (None, Some(_)) => None,
            (None, None) => period::year_start(year),
        }
    }
}

fn merge<T: PartialEq + Copy>(slot: &mut Option<T>, value: T) -> Option<()> {
    match slot {
        Some(existing) if *existing != value => None,
        _ => {
            *slot = Some(value);
            Some(())
        }
    }
}

fn month_from_name(value: &str) -> Option<u32> {
    let lower = value.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| {
            let name = name.to_ascii_lowercase();
            name == lower || (lower.len() == 3 && name.starts_with(&lower))
        })
        .map(|index| index as u32 + 1)
}

/// Decodes the date of `document` as stored under `folder` with `format`.
///
/// The path relative to the folder (without `.md`) is tried first so nested
/// formats like `YYYY/MM/YYYY-MM-DD` work; the bare filename is the fallback.
pub fn extract_date(document: &Document, folder: &str, format: &DateFormat) -> Option<NaiveDate> {
    let folder = folder.trim_matches('/');
    let relative = if folder.is_empty() {
        document.path.as_str()
    } else {
        document
            .path
            .strip_prefix(folder)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(document.path.as_str())
    };
    let relative = relative.strip_suffix(".md").unwrap_or(relative);
    format
        .parse(relative)
        .or_else(|| format.parse(document.basename()))
}

/// Default filename format for each granularity.
pub fn default_format(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Daily => "YYYY-MM-DD",
        Granularity::Weekly => "GGGG-[W]WW",
        Granularity::Monthly => "YYYY-MM",
        Granularity::Quarterly => "YYYY-[Q]Q",
        Granularity::Yearly => "YYYY",
    }
}
