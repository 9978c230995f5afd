//! Built-in node handlers.
//!
//! Each module contributes one or more handlers and a `register` function
//! that adds them to a [`NodeRegistry`](crate::registry::NodeRegistry).
//! These computations are illustrative arithmetic, not real network layers.
//!
//! # Available Nodes
//!
//! - [`input`] - `input`: emits a fixed numeric parameter
//! - [`dense`] - `dense`: weighted sum of all inputs plus bias
//! - [`lstm`] - `lstm_cell`: simplified recurrent cell with fixed gates
//! - [`mock`] - `counter`, `echo`, `fail`, `panic`: predictable handlers for tests

pub mod dense;
pub mod input;
pub mod lstm;
pub mod mock;
