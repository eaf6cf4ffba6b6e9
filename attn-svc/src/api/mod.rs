//! HTTP API handlers for attn-svc

pub mod attendance;
pub mod buildinfo;
pub mod health;
pub mod photos;
pub mod roster;

pub use attendance::attendance_routes;
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use photos::photo_routes;
pub use roster::roster_routes;
