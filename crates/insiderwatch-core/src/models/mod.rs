//! Data models for InsiderWatch

mod alert;
mod record;
mod summary;

pub use alert::*;
pub use record::*;
pub use summary::*;
