use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

const SPACE_SEPARATED: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
const T_SEPARATED: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// A timestamp cell, either a full instant or a bare calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    Instant(OffsetDateTime),
    Date(Date),
}

impl ParsedTimestamp {
    pub fn at_start_of_day(self) -> OffsetDateTime {
        match self {
            Self::Instant(ts) => ts,
            Self::Date(d) => d.midnight().assume_utc(),
        }
    }
}

/// Parse RFC3339, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]` or
/// `YYYY-MM-DD`. Values without an offset are taken as UTC.
pub fn parse_timestamp_str(s: &str) -> Result<ParsedTimestamp, time::error::Parse> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(ParsedTimestamp::Instant(ts));
    }
    if let Ok(ts) = PrimitiveDateTime::parse(s, SPACE_SEPARATED) {
        return Ok(ParsedTimestamp::Instant(ts.assume_utc()));
    }
    if let Ok(ts) = PrimitiveDateTime::parse(s, T_SEPARATED) {
        return Ok(ParsedTimestamp::Instant(ts.assume_utc()));
    }
    Date::parse(s, DATE_ONLY).map(ParsedTimestamp::Date)
}

pub fn parse_timestamp(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    parse_timestamp_str(s).map(ParsedTimestamp::at_start_of_day)
}
