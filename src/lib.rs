pub mod app;
pub mod board;
pub mod config;
pub mod errors;
pub mod facade;
pub mod handlers;
pub mod models;
pub mod session;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::{RunMode, ServerConfig};
pub use facade::{Facade, FacadeError, HttpFacade};
pub use state::AppState;
