pub mod error;
pub mod flow;

pub use error::{FlowError, Result};
