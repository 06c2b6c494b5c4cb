//! Third-party asset search.

pub mod youtube;

use crate::error::Result;
use crate::models::{Match, Track};

pub use youtube::YouTube;

pub trait AssetProvider: Send + Sync {
    /// Candidate assets for `track`, best first. No results is not an error.
    fn search(&self, track: &Track) -> Result<Vec<Match>>;
}
