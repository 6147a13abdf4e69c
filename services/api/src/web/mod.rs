pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    get_surah_handler, health_handler, list_surahs_handler, me_handler, record_history_handler,
};
