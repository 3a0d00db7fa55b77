//! HTTP API: request identity resolution, routing, and response mapping.

pub mod app;
pub mod context;
pub mod login;
pub mod middleware;
