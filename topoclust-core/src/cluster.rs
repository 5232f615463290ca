//! Named groups of clustered elements.

use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A group of elements identified by a stable key.
///
/// Equality and hashing only consider the key: a cluster stays the same
/// cluster while merges change its membership.
///
/// # Examples
/// ```
/// use topoclust_core::Cluster;
///
/// let mut cluster = Cluster::singleton("alpha", "alpha".to_owned());
/// cluster.absorb(vec!["beta".to_owned()]);
/// assert_eq!(cluster.id(), "alpha");
/// assert_eq!(cluster.elements(), ["alpha", "beta"]);
/// ```
#[derive(Clone, Debug)]
pub struct Cluster<T> {
    id: Arc<str>,
    elements: Vec<T>,
}

impl<T> Cluster<T> {
    /// Creates a cluster holding a single element.
    #[must_use]
    pub fn singleton(id: impl AsRef<str>, element: T) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            elements: vec![element],
        }
    }

    /// Returns the cluster key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the members in accumulation order.
    #[must_use]
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns whether the cluster has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Appends `elements` to the membership.
    pub fn absorb(&mut self, elements: impl IntoIterator<Item = T>) {
        self.elements.extend(elements);
    }

    /// Removes the `count` most recently added members.
    ///
    /// Removing more members than the cluster holds empties it.
    pub fn remove_last(&mut self, count: usize) {
        let keep = self.elements.len().saturating_sub(count);
        self.elements.truncate(keep);
    }

    /// Keeps only the members for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.elements.retain(keep);
    }

    /// Consumes the cluster, returning its members.
    #[must_use]
    pub fn into_elements(self) -> Vec<T> {
        self.elements
    }
}

impl<T> PartialEq for Cluster<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Cluster<T> {}

impl<T> Hash for Cluster<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
