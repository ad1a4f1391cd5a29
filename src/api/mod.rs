pub mod client;
pub mod models;

pub use client::{ApiError, HttpClient, Result, Transport};
pub use models::{ImportConfig, ResponseHead, TransportResponse};
