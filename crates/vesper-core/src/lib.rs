pub mod config;
pub mod domain;
pub mod error;
pub mod ids;
pub mod time;

pub use error::VesperError;
