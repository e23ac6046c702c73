pub mod object3d;
pub mod scene;
pub mod transform;

// Re-export main types for convenience
pub use object3d::{EmptyDisplay, Object3D, ObjectData, ObjectId};
pub use scene::{ParentMode, Scene, SelectAction};
pub use transform::Transform;
