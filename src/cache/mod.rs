pub mod error;
pub mod fingerprint;
pub mod store;

pub use error::CacheError;
pub use fingerprint::Fingerprint;
pub use store::{CacheEntry, CacheStore};
