use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Format a date the way the API expects it in query strings and bodies.
pub fn format_date(date: Date) -> String {
    // Infallible for calendar dates with four-digit years.
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| format!("{:04}-{:02}-{:02}", date.year(), date.month() as u8, date.day()))
}

pub fn parse_date(value: &str) -> Result<Date, time::error::Parse> {
    Date::parse(value, DATE_FORMAT)
}

/// Leading `YYYY-MM-DD` of a server date or timestamp, e.g. a deadline
/// stored as `2024-03-01T00:00:00.000Z`.
pub fn date_prefix(value: &str) -> Option<Date> {
    value.get(..10).and_then(|prefix| parse_date(prefix).ok())
}

/// Serde adapter for `YYYY-MM-DD` dates.
pub mod iso_date {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(de::Error::custom)
    }
}
