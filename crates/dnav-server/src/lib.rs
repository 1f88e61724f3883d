//! D-NAV Server — HTTP routes and CLI commands over the extraction runtime.

pub mod cli;
pub mod config;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;
