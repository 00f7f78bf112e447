pub mod assets;
pub mod audio;
pub mod context;
pub mod render;
pub mod ui;

pub use context::{Config, EngineContext, LoadContext, Scene};
