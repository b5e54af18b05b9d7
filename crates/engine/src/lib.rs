pub mod bible;
pub mod character_lock;
pub mod compiler;
pub mod diff;
pub mod edl;
pub mod error;
pub mod ops;
pub mod pricing;
pub mod render;
pub mod timeline;
pub mod viewport;

pub use error::{EngineError, EngineResult};
pub use timeline::*;
pub use compiler::*;
