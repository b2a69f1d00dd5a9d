//! HTTP API handlers, one module per resource (spec §6), mirroring the
//! teacher's `server/src/api.rs` handler shape: `State<AppContext>`,
//! `Json<T>` request/response bodies, errors propagated via `?` into
//! [`crate::error::ApiError`].

pub mod auth;
pub mod directories;
pub mod search;
pub mod stats;
pub mod system;
