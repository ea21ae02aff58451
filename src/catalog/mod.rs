//! Resource catalog: named, typed event feeds and their bindings.
//!
//! The catalog is built once at startup and read-only afterwards. Each
//! registered resource exposes the uniform [`ResourceBinding`]
//! capability — "attach this sink, give me back a disposable handle" —
//! so the dispatcher never needs compile-time knowledge of a feed's
//! element type: the generic instantiation happens here, once per
//! registered resource.

pub mod feed;
pub mod filter;
pub mod query;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{KEY_SEPARATOR, SubscriptionHandle};
use crate::error::GatewayError;
use crate::service::NotificationSink;
use crate::service::dispatcher::SUBSCRIBE_MARKER;

pub use feed::{FeedSignal, TypedFeed};
pub use filter::{FilterCompiler, FilterError, FilterPredicate, FnFilterCompiler};
pub use query::{FILTER_PARAM, ResourceQuery};

/// Uniform capability every registered resource exposes.
pub trait ResourceBinding: Send + Sync {
    /// The resource's catalog name.
    fn name(&self) -> &str;

    /// Whether the resource has a filter compiler attached.
    fn accepts_filters(&self) -> bool;

    /// Applies the query's filter (if any) and attaches the sink,
    /// returning the disposable handle of the running subscription.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::FilterRejected`] if the query carries a
    /// filter the resource's compiler refuses (or the resource accepts
    /// no filters at all).
    fn bind(
        &self,
        query: &ResourceQuery,
        sink: NotificationSink,
    ) -> Result<SubscriptionHandle, GatewayError>;
}

/// Name-keyed table of all resources this gateway serves.
#[derive(Default)]
pub struct ResourceCatalog {
    bindings: HashMap<String, Arc<dyn ResourceBinding>>,
}

impl ResourceCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidResourceName`] if the name is
    /// empty or contains a reserved sequence (the subscription key
    /// separator or the subscribe marker), and
    /// [`GatewayError::DuplicateResource`] if the name is taken.
    pub fn register(&mut self, binding: Arc<dyn ResourceBinding>) -> Result<(), GatewayError> {
        let name = binding.name().to_string();
        if name.is_empty() || name.contains(KEY_SEPARATOR) || name.contains(SUBSCRIBE_MARKER) {
            return Err(GatewayError::InvalidResourceName(name));
        }
        if self.bindings.contains_key(&name) {
            return Err(GatewayError::DuplicateResource(name));
        }
        self.bindings.insert(name, binding);
        Ok(())
    }

    /// Looks up a resource by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ResourceBinding>> {
        self.bindings.get(name).map(Arc::clone)
    }

    /// Returns all registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.bindings.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no resources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCatalog")
            .field("resources", &self.names())
            .finish()
    }
}
