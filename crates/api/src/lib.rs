//! HTTP API: configuration, authentication middleware, routing and
//! request/response mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
