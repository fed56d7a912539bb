//! Wire and domain types for the todo service, shared by the controller and its front ends.

pub mod domain;
pub mod error;
pub mod protocol;
