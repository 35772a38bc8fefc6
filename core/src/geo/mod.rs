//! Geographic selection: exact windows, their longitude expansion, and the
//! tiered search area used to pre-select scenes by centroid.

pub mod angle;
pub mod search;
pub mod window;

pub use angle::central_angle;
pub use search::{search_membership, SearchArea, SearchTier, SEARCH_TIERS};
pub use window::{normalize_longitude, Expansion, GeoWindow, WindowBounds};
