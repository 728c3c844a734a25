//! HTTP service hosting concurrent pricing sessions

pub mod api;
pub mod config;
