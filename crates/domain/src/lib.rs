//! crosspost domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Posts, platform content and publish results
//! - `status`: Post lifecycle states and the transition table
//! - `credentials`: Per-platform credential sets
//! - `policy`: Platform content constraints
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Due selection, the publish pass, reporting and lifecycle changes

pub mod credentials;
pub mod model;
pub mod policy;
pub mod ports;
pub mod status;
pub mod usecases;

pub use credentials::*;
pub use model::*;
pub use ports::*;
pub use status::{PostStatus, TransitionError, can_transition};
