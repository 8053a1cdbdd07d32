pub mod config;
pub mod error;
pub mod jitter;
pub mod keywords;
pub mod quota;
pub mod repo;
pub mod types;

pub use error::{Denial, StartError};
pub use keywords::{KeywordConfig, KeywordSet, KeywordSource};
pub use quota::QuotaRecord;
pub use types::*;
