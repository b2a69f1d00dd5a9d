//! Shared application state handed to every axum handler via `State`,
//! grounded on the teacher's `AppContext` (`server/src/types.rs`): a thin
//! `Clone`-able wrapper around an `Arc` to the composition root.

use dsearch_core::Engine;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<Engine>,
    pub start_time: Instant,
}

impl AppContext {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, start_time: Instant::now() }
    }
}
