//! # Function-backed node (`NodeFn`)
//!
//! [`NodeFn`] wraps a closure `F: Fn(Value) -> Fut`, producing a fresh future per
//! invocation. Shared state, if any, goes into an explicit `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use nodevisor::{Node, NodeError, NodeFn, NodeRef};
//! use serde_json::Value;
//!
//! let echo: NodeRef = NodeFn::arc("echo", |input: Value| async move {
//!     Ok::<_, NodeError>(input)
//! });
//! assert_eq!(echo.name(), "echo");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;
use crate::nodes::node::Node;

/// Shared handle to a node.
pub type NodeRef = Arc<dyn Node>;

/// Function-backed node implementation.
#[derive(Debug)]
pub struct NodeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> NodeFn<F> {
    /// Creates a new function-backed node.
    ///
    /// Prefer [`NodeFn::arc`] when you immediately need a [`NodeRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the node and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Node for NodeFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, NodeError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: Value) -> Result<Value, NodeError> {
        (self.f)(input).await
    }
}
