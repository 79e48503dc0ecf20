pub mod consts;
pub mod model;

pub use model::{Autoescape, EngineConfig};
