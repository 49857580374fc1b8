//! Document sources that feed the ingest pipeline.

mod local;

pub use local::LocalSource;

use crate::error::SourceError;
use crate::models::SourceDocument;

/// Produces decoded documents ready for chunking.
pub trait DocumentSource: Send + Sync {
    /// Human-readable name.
    fn name(&self) -> &str;

    /// Load every document the source currently holds.
    fn load(&self) -> Result<Vec<SourceDocument>, SourceError>;
}
