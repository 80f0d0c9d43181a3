pub mod aggregated_series;
pub mod period;
pub mod reading;

pub use aggregated_series::{AggregatedRow, AggregatedSeries};
pub use period::{PeriodCode, UnknownPeriodLabel};
pub use reading::{numeric_columns, NumericColumn, Reading};
