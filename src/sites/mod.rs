pub mod error;
pub mod locate;

pub use error::LocateSiteError;
pub use locate::{NodeAllocation, SiteLocator, SiteShare};
