//! ComfyCube Core - Shared domain types.
//!
//! This crate provides the value types used across the ComfyCube workspace:
//! - `storefront` - Client-side state model (session, catalog, cart, wishlist)
//! - `cli` - Command-line front end over the storefront stores
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, passwords,
//!   ratings and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
