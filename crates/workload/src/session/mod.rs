//! Built-in content generation.
//!
//! Sessions are random walks over a shopping app's screens. See
//! [`ShoppingSessionGenerator`].

mod pages;
mod shopping;

pub use pages::{NavigationGraph, Page};
pub use shopping::ShoppingSessionGenerator;
