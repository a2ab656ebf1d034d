//! Domain models for the storefront.
//!
//! These types are the validated, client-side view of remote entities. They
//! are separate from the wire records in [`crate::api::types`], which mirror
//! the remote API's JSON exactly.

pub mod catalog;
pub mod user;

pub use catalog::{Category, Product, Review};
pub use user::{AuthSession, User};
