//! Shared kernel - error taxonomy and result alias

pub mod error;
pub mod result;

pub use error::AdapterError;
pub use result::Result;
