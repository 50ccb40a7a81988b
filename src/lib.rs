pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use crate::config::{assets::LocalAssets, ServerConfig, Topology};
pub use crate::core::{calculator::Calculator, catalog::Catalog, cell::CellRef, sheet::Sheet};
pub use crate::server::{build_router, templates::TemplateSet, AppState};
pub use crate::utils::error::{AppError, Result};
