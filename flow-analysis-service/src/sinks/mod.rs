pub mod reading_table;

pub use reading_table::{LoadedReadings, ReadingTableSink};
