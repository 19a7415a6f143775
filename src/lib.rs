pub mod adapters;
pub mod commands;
pub mod config;
pub mod core;
pub mod domain;
pub mod http;
pub mod utils;

pub use adapters::{Argon2Hasher, LocalStore};
pub use config::{Cli, Command, Settings};
pub use http::{api_routes, build_router, AppState};
pub use utils::error::{AppError, Result};
