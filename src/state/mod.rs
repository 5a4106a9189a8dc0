//! Compressed-state encoding and the content-addressed dedup map
//! (spec.md S3, S4.1).

mod compressed;
mod id;
mod state_map;
mod variable_info;

pub use compressed::CompressedState;
pub use id::StateId;
pub use state_map::StateIdMap;
pub use variable_info::{VariableInfo, VariableInformation};
