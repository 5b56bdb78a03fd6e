//! Source/transport abstractions (Discord today, behind ports).

pub mod port;
pub mod types;
