pub mod graphics;
pub mod texture;
