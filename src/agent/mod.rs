//! Model-driven tool selection with deterministic fallback.

pub mod driver;
pub mod guard;
pub mod prompt;
pub mod react;
pub mod router;

pub use router::{
    AgentRouter, Coverage, Decision, FallbackReason, ResolvedTool, RouteRequest, RouterSettings,
};
