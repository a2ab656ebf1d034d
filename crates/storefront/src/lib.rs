//! ComfyCube storefront library.
//!
//! Client-side state for the ComfyCube furniture store: the session, the
//! catalog client, the cart and wishlist stores, their persistence, and
//! their sync with the remote catalog/order API. A presentation layer owns a
//! [`state::Storefront`], dispatches operations on it and re-renders when a
//! store's `subscribe()` receiver fires.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod session;
pub mod state;
pub mod storage;
pub mod sync;
pub mod view;
pub mod wishlist;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
