//! `dsearch-server` — thin axum shell around [`dsearch_core::Engine`],
//! exposing it as the HTTP/JSON API in spec §6. Mirrors the teacher's split
//! between `crates/core` (domain logic) and `server` (HTTP transport).

pub mod api;
pub mod error;
pub mod middleware;
pub mod router;
pub mod state;
