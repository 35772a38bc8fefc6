pub mod inspection;
pub mod position;
pub mod scene_file;

pub use inspection::InspectionRecord;
pub use position::{PositionRecord, SceneMetadata};
pub use scene_file::{NamedArray, SceneFile};
