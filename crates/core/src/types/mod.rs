//! Core types for Oakline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{CartLine, CartSource, CartState};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::Product;
