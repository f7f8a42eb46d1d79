//! HTTP API handlers for painel-server

pub mod auth;
pub mod buildinfo;
pub mod health;
pub mod options;
pub mod results;

pub use auth::{current_session, login, logout, require_session};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use options::get_options;
pub use results::get_results;
