//! # Node abstractions.
//!
//! - [`Node`] - trait for the business logic wrapped by a service runtime
//! - [`NodeFn`] - closure-based node implementation
//! - [`NodeRef`] - shared reference to a node (`Arc<dyn Node>`)

mod node;
mod node_fn;

pub use node::Node;
pub use node_fn::{NodeFn, NodeRef};
