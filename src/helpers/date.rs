//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt::Write;

/// Formats CMS timestamps for display
#[derive(Debug, Clone)]
pub struct DateFormatter {
    date_format: String,
    time_format: String,
    locale: Locale,
    timezone: Option<Tz>,
}

impl DateFormatter {
    /// Create a formatter from Moment.js-style formats, a language tag and
    /// an IANA timezone name (empty for UTC)
    pub fn new(date_format: &str, time_format: &str, language: &str, timezone: &str) -> Self {
        let timezone = if timezone.trim().is_empty() {
            None
        } else {
            match timezone.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    tracing::warn!("Unknown timezone {:?}, falling back to UTC", timezone);
                    None
                }
            }
        };

        Self {
            date_format: moment_to_chrono_format(date_format),
            time_format: moment_to_chrono_format(time_format),
            locale: locale_for(language),
            timezone,
        }
    }

    /// Format the date part, e.g. `15 mar 2021`
    pub fn date(&self, date: &DateTime<FixedOffset>) -> String {
        self.format(date, &self.date_format)
    }

    /// Format the time part, e.g. `19:25`
    pub fn time(&self, date: &DateTime<FixedOffset>) -> String {
        self.format(date, &self.time_format)
    }

    /// Format an optional timestamp, empty when absent
    pub fn date_or_empty(&self, date: Option<&DateTime<FixedOffset>>) -> String {
        date.map(|d| self.date(d)).unwrap_or_default()
    }

    fn format(&self, date: &DateTime<FixedOffset>, format: &str) -> String {
        match self.timezone {
            Some(tz) => format_localized(&date.with_timezone(&tz), format, self.locale),
            None => format_localized(&date.with_timezone(&Utc), format, self.locale),
        }
    }
}

fn format_localized<Z: TimeZone>(date: &DateTime<Z>, format: &str, locale: Locale) -> String
where
    Z::Offset: std::fmt::Display,
{
    let mut out = String::new();
    if write!(out, "{}", date.format_localized(format, locale)).is_err() {
        tracing::warn!("Unusable date format {:?}", format);
        out.clear();
    }
    out
}

/// Map a language tag such as `pt-BR` to a chrono locale
fn locale_for(language: &str) -> Locale {
    match language.to_ascii_lowercase().replace('_', "-").as_str() {
        "pt" | "pt-br" => Locale::pt_BR,
        "pt-pt" => Locale::pt_PT,
        "es" | "es-es" => Locale::es_ES,
        "fr" | "fr-fr" => Locale::fr_FR,
        "de" | "de-de" => Locale::de_DE,
        "en-gb" => Locale::en_GB,
        _ => Locale::en_US,
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Z: TimeZone>(date: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longer tokens first within each category so shorter ones don't eat them
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DD", "%d"),
        // Hour
        ("HH", "%H"),
        ("hh", "%I"),
        // Minute
        ("mm", "%M"),
        // Second
        ("ss", "%S"),
    ];

    // A literal `%` would otherwise start a chrono specifier
    let mut result = format.replace('%', "%%");

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-03-25T19:25:28+00:00").unwrap()
    }

    #[test]
    fn test_moment_to_chrono() {
        assert_eq!(moment_to_chrono_format("YYYY-MM-DD"), "%Y-%m-%d");
        assert_eq!(moment_to_chrono_format("DD MMM YYYY"), "%d %b %Y");
        assert_eq!(moment_to_chrono_format("HH:mm"), "%H:%M");
        assert_eq!(moment_to_chrono_format("DD%MM"), "%d%%%m");
    }

    #[test]
    fn test_literal_percent_in_format() {
        let fmt = DateFormatter::new("YYYY 100%", "HH:mm %", "en-US", "");
        assert_eq!(fmt.date(&timestamp()), "2021 100%");
        assert_eq!(fmt.time(&timestamp()), "19:25 %");
    }

    #[test]
    fn test_english_formatting() {
        let fmt = DateFormatter::new("DD MMM YYYY", "HH:mm", "en-US", "");
        assert_eq!(fmt.date(&timestamp()), "25 Mar 2021");
        assert_eq!(fmt.time(&timestamp()), "19:25");
    }

    #[test]
    fn test_portuguese_formatting() {
        let fmt = DateFormatter::new("DD MMM YYYY", "HH:mm", "pt-BR", "");
        assert_eq!(fmt.date(&timestamp()), "25 mar 2021");
    }

    #[test]
    fn test_timezone_conversion() {
        let fmt = DateFormatter::new("YYYY-MM-DD", "HH:mm", "en-US", "America/Sao_Paulo");
        assert_eq!(fmt.time(&timestamp()), "16:25");

        let late = DateTime::parse_from_rfc3339("2021-03-26T01:00:00+00:00").unwrap();
        assert_eq!(fmt.date(&late), "2021-03-25");
    }

    #[test]
    fn test_unknown_timezone_and_language_fall_back() {
        let fmt = DateFormatter::new("DD MMM YYYY", "HH:mm", "xx", "Mars/Olympus");
        assert_eq!(fmt.date(&timestamp()), "25 Mar 2021");
        assert_eq!(fmt.date_or_empty(None), "");
    }

    #[test]
    fn test_date_xml() {
        assert_eq!(date_xml(&timestamp()), "2021-03-25T19:25:28+00:00");
    }
}
