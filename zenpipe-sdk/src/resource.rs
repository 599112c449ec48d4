//! Lazily resolved, memoized resource.

use std::sync::OnceLock;

use zenpipe_common::Resource;

type Resolver = Box<dyn Fn() -> Resource + Send + Sync>;

/// Computes a [`Resource`] on first access and caches it.
///
/// The owning provider normally [`bind`](Self::bind)s its resource before the
/// first export; the resolver only runs when nothing was bound. The resolver
/// must be pure and idempotent: any two calls would return equal resources.
/// The cache is a `OnceLock`, so the value is settled at most once per
/// instance even under concurrent first access.
pub struct LazyResource {
    cell: OnceLock<Resource>,
    resolver: Resolver,
}

impl LazyResource {
    pub fn new(resolver: impl Fn() -> Resource + Send + Sync + 'static) -> Self {
        Self {
            cell: OnceLock::new(),
            resolver: Box::new(resolver),
        }
    }

    /// Settle on `resource` unless a value was already resolved.
    ///
    /// Returns `false` when the cached value was kept.
    pub fn bind(&self, resource: &Resource) -> bool {
        self.cell.set(resource.clone()).is_ok()
    }

    pub fn get(&self) -> &Resource {
        self.cell.get_or_init(|| (self.resolver)())
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl std::fmt::Debug for LazyResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyResource")
            .field("resource", &self.cell.get())
            .finish()
    }
}
