//! Oakline Core - Shared types library.
//!
//! This crate provides the types shared by every Oakline component:
//! - `cart` - Cart store library (local and server-backed carts)
//! - `cli` - Command-line front end that owns the cart store
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products and cart state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
