pub mod columns;
pub mod delimited_file;
pub mod ndjson_file;
pub mod sample;
pub mod timestamp;

pub use delimited_file::DelimitedReadingSource;
pub use ndjson_file::NdjsonReadingSource;
pub use sample::SampleReadingSource;
