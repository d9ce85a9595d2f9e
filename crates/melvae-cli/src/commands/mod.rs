//! CLI command implementations

pub mod dataset;
pub mod generate;
pub mod inspect;
pub mod preprocess;
pub mod project;
pub mod train;
