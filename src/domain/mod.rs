//! Domain layer: value types shared by the gateway and the services.
//!
//! This module contains the poll budgets, the validated cluster parameter
//! type, and the ordered verifier steps.

pub mod cluster_parameter;
pub mod poll_policy;
pub mod verifier_step;

pub use cluster_parameter::ClusterParameter;
pub use poll_policy::{Converged, PollPolicy};
pub use verifier_step::VerifierStep;
