//! Utility modules for the Jifunze API.
//!
//! - [`auth_helpers`]: loading tenant facts and running the Scope Resolver

pub mod auth_helpers;
