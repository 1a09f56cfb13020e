pub mod app;
pub mod backup;
pub mod cli;
pub mod clock;
pub mod collections;
pub mod config;
pub mod confirm;
pub mod lock;
pub mod model;
pub mod search;
pub mod storage;
pub mod trash;

pub use app::App;
pub use collections::Collections;
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use trash::TrashManager;
