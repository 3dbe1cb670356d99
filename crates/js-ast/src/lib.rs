//! ES-style syntax tree and builders.
//!
//! The target of template lowering: a generic ES-shaped tree that a
//! downstream printer serializes into concrete source text. The tree knows
//! nothing about templates; it only enforces the statement/expression/pattern
//! classification and carries source locations.

pub mod ast;
pub mod builder;

pub use ast::*;
