use std::{fmt, str::FromStr};

use time::{Date, Month, OffsetDateTime, UtcOffset};

/// Width of the calendar buckets a reading table is resampled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(try_from = "String", into = "String")
)]
pub enum PeriodCode {
    /// 3 calendar months.
    Quarter,
    /// 4 calendar months.
    FourMonth,
    /// 6 calendar months.
    SemiAnnual,
    /// 1 calendar year.
    Annual,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown comparison period '{0}' (expected one of: 3 Months, 4 Months, Semi-Annual, Annual)")]
pub struct UnknownPeriodLabel(pub String);

impl PeriodCode {
    pub const ALL: [PeriodCode; 4] = [
        PeriodCode::Quarter,
        PeriodCode::FourMonth,
        PeriodCode::SemiAnnual,
        PeriodCode::Annual,
    ];

    /// Resolve a user-facing label such as `"Semi-Annual"`.
    ///
    /// Matching ignores surrounding whitespace and ASCII case. Anything
    /// outside the fixed label set is rejected.
    pub fn from_label(label: &str) -> Result<Self, UnknownPeriodLabel> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPeriodLabel(label.to_string()))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Quarter => "3 Months",
            Self::FourMonth => "4 Months",
            Self::SemiAnnual => "Semi-Annual",
            Self::Annual => "Annual",
        }
    }

    pub fn months(self) -> i64 {
        match self {
            Self::Quarter => 3,
            Self::FourMonth => 4,
            Self::SemiAnnual => 6,
            Self::Annual => 12,
        }
    }

    /// Index of the bucket containing `ts`.
    ///
    /// Buckets are counted in whole months from January of year 0 on the
    /// UTC calendar, so every width divides the year evenly and bucket
    /// starts line up with calendar quarters, thirds, halves and years.
    pub fn bucket_index(self, ts: OffsetDateTime) -> i64 {
        let utc = ts.to_offset(UtcOffset::UTC);
        let month_index = i64::from(utc.year()) * 12 + i64::from(u8::from(utc.month())) - 1;
        month_index.div_euclid(self.months())
    }

    /// First instant of the bucket with the given index.
    pub fn bucket_start(self, index: i64) -> Option<OffsetDateTime> {
        let month_index = index.checked_mul(self.months())?;
        let year = i32::try_from(month_index.div_euclid(12)).ok()?;
        let month = Month::try_from(u8::try_from(month_index.rem_euclid(12) + 1).ok()?).ok()?;
        let date = Date::from_calendar_date(year, month, 1).ok()?;
        Some(date.midnight().assume_utc())
    }
}

impl fmt::Display for PeriodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PeriodCode {
    type Err = UnknownPeriodLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

impl TryFrom<String> for PeriodCode {
    type Error = UnknownPeriodLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_label(&value)
    }
}

impl From<PeriodCode> for String {
    fn from(p: PeriodCode) -> Self {
        p.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn labels_map_to_codes() {
        assert_eq!(PeriodCode::from_label("3 Months"), Ok(PeriodCode::Quarter));
        assert_eq!(PeriodCode::from_label("4 Months"), Ok(PeriodCode::FourMonth));
        assert_eq!(PeriodCode::from_label("Semi-Annual"), Ok(PeriodCode::SemiAnnual));
        assert_eq!(PeriodCode::from_label(" annual "), Ok(PeriodCode::Annual));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = PeriodCode::from_label("Monthly").unwrap_err();
        assert_eq!(err, UnknownPeriodLabel("Monthly".to_string()));
        assert!("".parse::<PeriodCode>().is_err());
    }

    #[test]
    fn quarter_buckets_follow_calendar_quarters() {
        let p = PeriodCode::Quarter;
        assert_eq!(
            p.bucket_index(datetime!(2023-03-31 23:59:59 UTC)),
            p.bucket_index(datetime!(2023-01-01 00:00:00 UTC))
        );
        assert_ne!(
            p.bucket_index(datetime!(2023-03-31 23:59:59 UTC)),
            p.bucket_index(datetime!(2023-04-01 00:00:00 UTC))
        );
    }

    #[test]
    fn four_month_buckets_start_in_january_may_september() {
        let p = PeriodCode::FourMonth;
        let idx = p.bucket_index(datetime!(2023-06-15 12:00:00 UTC));
        assert_eq!(p.bucket_start(idx), Some(datetime!(2023-05-01 00:00:00 UTC)));
        let idx = p.bucket_index(datetime!(2023-12-31 00:00:00 UTC));
        assert_eq!(p.bucket_start(idx), Some(datetime!(2023-09-01 00:00:00 UTC)));
    }

    #[test]
    fn bucket_uses_utc_calendar() {
        let p = PeriodCode::Annual;
        // Local new year, still the previous year in UTC.
        let local = datetime!(2024-01-01 01:00:00 +03:00);
        assert_eq!(p.bucket_start(p.bucket_index(local)), Some(datetime!(2023-01-01 00:00:00 UTC)));
    }

    #[test]
    fn semi_annual_bucket_start() {
        let p = PeriodCode::SemiAnnual;
        let idx = p.bucket_index(datetime!(2022-07-01 00:00:00 UTC));
        assert_eq!(p.bucket_start(idx), Some(datetime!(2022-07-01 00:00:00 UTC)));
        assert_eq!(p.bucket_start(idx - 1), Some(datetime!(2022-01-01 00:00:00 UTC)));
    }
}
