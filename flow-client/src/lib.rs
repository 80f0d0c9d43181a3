pub mod analysis;
pub mod domain;
