pub mod catalog;
pub mod digest;
pub mod forwarder;
pub mod liveness;

pub use catalog::ServiceCatalog;
pub use forwarder::{CameraForward, HttpCameraForwarder};
pub use liveness::LivenessProbe;
