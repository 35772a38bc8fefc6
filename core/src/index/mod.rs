//! Scene selection from the per-year position cache, and rebuilding that
//! cache from a listing.

pub mod builder;
pub mod candidate;
pub mod positions;

pub use builder::{ListingSource, PositionCacheBuilder, YearBuild};
pub use candidate::{resolve, Candidate, CandidateIndex, CandidateQuery};
pub use positions::PositionCache;
