//! Blocking client for the NCBI E-utilities `efetch` endpoint.

pub mod client;
pub mod config;

pub use client::NcbiClient;
pub use config::NcbiConfig;
