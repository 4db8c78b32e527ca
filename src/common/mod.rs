// Common utilities and shared types used across the application

pub mod constants;
pub mod error;
pub mod helpers;
pub mod types;

// Re-export commonly used items at module root for convenience
pub use error::{Result, ScraperError};
pub use types::{Classification, Event, Status};
