pub mod interceptor;
pub mod splice;
pub mod tracker;

pub use interceptor::{InterceptOutcome, PtzInterceptor};
pub use tracker::StatusTracker;
