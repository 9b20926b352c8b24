pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod source;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{build, BuildOptions, Document, Index, SourceDoc};
pub use query::{retrieve, Hit, QueryEngine, DEFAULT_TOP_K};
