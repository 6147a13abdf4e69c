//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use noor_core::{Accounts, ChapterLoader};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Accounts,
    pub chapters: Arc<ChapterLoader>,
}
