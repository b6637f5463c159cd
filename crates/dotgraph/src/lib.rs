//! Directed graph model that serializes to Graphviz DOT.
//!
//! Build a [`DotGraph`], layer in global and pattern-keyed style rules, render
//! it to DOT text and optionally hand that text to an [`ImageRenderer`] which
//! runs the external `dot` converter.

pub mod errors;
pub mod graph;
pub mod manifest;
pub mod render;
pub mod renderer;
pub mod style;

pub use errors::*;
pub use graph::*;
pub use manifest::*;
pub use renderer::*;
pub use style::*;
