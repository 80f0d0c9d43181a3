pub mod config;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
