pub mod app;
pub mod common;
pub mod config;
pub mod crawler;
pub mod infra;
pub mod logging;
pub mod pipeline;
pub mod spider;
pub mod spiders;

pub use common::error::{Result, ScraperError};
pub use common::types::Event;
pub use spider::{ParseOutput, Request, RequestKind, Response, Spider};
