pub mod build;
pub mod dom;
pub mod parse;

pub use build::{
    build_continuous_move_request, build_fault, build_service_capabilities_response,
    build_simple_response, build_status_response,
};
pub use parse::{
    extract_duration, extract_profile_token, extract_stop_flags, extract_vector, parse,
    PanTiltComponent, SoapRequest, StopFlags, Vector, ZoomComponent,
};
