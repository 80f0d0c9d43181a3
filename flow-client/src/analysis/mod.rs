pub mod series_aggregator;

pub use series_aggregator::{aggregate, time_span};
