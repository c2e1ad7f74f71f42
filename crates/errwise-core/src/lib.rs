//! Core ErrWise client library (session lifecycle, API transport, config).

pub mod api;
pub mod config;
pub mod session;
