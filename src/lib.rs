pub mod cli;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod sources;
pub mod utils;

pub use cli::{Cli, Commands};
pub use error::{IndexError, IngestError, QueryError};
pub use models::{Config, OutputFormat};
pub use services::{RagService, VectorIndex};
