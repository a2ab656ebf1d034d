//! Core types for ComfyCube.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod password;
pub mod price;
pub mod rating;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use password::{Password, PasswordError};
pub use price::{Price, PriceError};
pub use rating::{Rating, RatingError};
pub use role::{Role, RoleParseError};
