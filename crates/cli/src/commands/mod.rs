//! Command implementations.
//!
//! Each command drives one storefront operation and prints the resulting
//! state. Errors are returned to `main`, which decides how to surface them.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod wishlist;
