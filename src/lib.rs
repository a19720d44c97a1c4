pub mod batch;
pub mod error;
pub mod source;
pub mod tiled;

pub use error::ExportError;
pub use tiled::{ExportOptions, ExportOutcome, Plane};
