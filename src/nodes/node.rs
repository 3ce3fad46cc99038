//! # Node abstraction.
//!
//! A [`Node`] is the unit of business logic a [`ServiceRuntime`](crate::ServiceRuntime)
//! turns into a service. It exposes one async operation, [`run`](Node::run), that maps an
//! opaque JSON input to an opaque JSON output or fails with a [`NodeError`].
//!
//! The runtime never inspects input or output; schema validation belongs to the caller.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;

/// # Wrapped unit of business logic.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use nodevisor::{Node, NodeError};
/// use serde_json::{Value, json};
///
/// struct Upper;
///
/// #[async_trait]
/// impl Node for Upper {
///     fn name(&self) -> &str { "upper" }
///
///     async fn run(&self, input: Value) -> Result<Value, NodeError> {
///         let s = input.as_str().ok_or_else(|| NodeError::InvalidInput {
///             message: "expected a string".into(),
///         })?;
///         Ok(json!(s.to_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait Node: Send + Sync + 'static {
    /// Returns a stable, human-readable node name.
    fn name(&self) -> &str;

    /// Executes one invocation.
    ///
    /// May suspend for as long as it needs; the runtime calls it on its own task so a
    /// slow call never blocks event dispatch or other invocations.
    async fn run(&self, input: Value) -> Result<Value, NodeError>;
}
