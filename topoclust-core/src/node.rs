//! Compute node references and selected node sets.

use std::{fmt, sync::Arc};

/// Reference to a compute node running on a host.
///
/// Nodes are identified by their URL. Nodes built without a URL fall back to
/// their display form (`name@host`) as identifier.
///
/// # Examples
/// ```
/// use topoclust_core::Node;
///
/// let node = Node::new("alpha", "pnp://alpha:64738/worker-1");
/// assert_eq!(node.host(), "alpha");
/// assert_eq!(node.key(), "pnp://alpha:64738/worker-1");
///
/// let detached = Node::without_url("alpha", "worker-2");
/// assert_eq!(detached.key(), "worker-2@alpha");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Node {
    key: Arc<str>,
    host: Arc<str>,
    url: Option<Arc<str>>,
}

impl Node {
    /// Creates a node reachable at `url` on `host`.
    #[must_use]
    pub fn new(host: impl AsRef<str>, url: impl AsRef<str>) -> Self {
        let url: Arc<str> = Arc::from(url.as_ref());
        Self {
            key: Arc::clone(&url),
            host: Arc::from(host.as_ref()),
            url: Some(url),
        }
    }

    /// Creates a node that carries no URL, identified by `name@host`.
    #[must_use]
    pub fn without_url(host: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        let host = host.as_ref();
        Self {
            key: Arc::from(format!("{}@{host}", name.as_ref())),
            host: Arc::from(host),
            url: None,
        }
    }

    /// Returns the host name the node runs on.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the node URL when one is known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns the stable identifier used to key clusters.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Nodes chosen by a selection, plus nodes reserved alongside them.
///
/// Exclusive descriptors reserve whole hosts; nodes on such hosts beyond the
/// requested count are reported as extra nodes.
///
/// # Examples
/// ```
/// use topoclust_core::{Node, NodeSet};
///
/// let set = NodeSet::with_extra_nodes(
///     vec![Node::new("alpha", "n1")],
///     vec![Node::new("alpha", "n2")],
/// );
/// assert_eq!(set.len(), 1);
/// assert_eq!(set.extra_nodes().map(<[Node]>::len), Some(1));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NodeSet {
    nodes: Vec<Node>,
    extra_nodes: Option<Vec<Node>>,
}

impl NodeSet {
    /// Creates a node set without extra nodes.
    #[must_use]
    pub const fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            extra_nodes: None,
        }
    }

    /// Creates a node set reporting `extra` as reserved extra nodes.
    ///
    /// An empty `extra` list is normalised to "no extra nodes".
    #[must_use]
    pub fn with_extra_nodes(nodes: Vec<Node>, extra: Vec<Node>) -> Self {
        Self {
            nodes,
            extra_nodes: (!extra.is_empty()).then_some(extra),
        }
    }

    /// Returns the selected nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the extra nodes, if any were reserved.
    #[must_use]
    pub fn extra_nodes(&self) -> Option<&[Node]> {
        self.extra_nodes.as_deref()
    }

    /// Returns the number of selected nodes, excluding extra nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether no node was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends every node and extra node of `other` to this set.
    pub fn extend(&mut self, other: Self) {
        self.nodes.extend(other.nodes);
        if let Some(extra) = other.extra_nodes {
            self.extra_nodes.get_or_insert_with(Vec::new).extend(extra);
        }
    }

    /// Consumes the set, returning the selected and extra nodes.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Node>, Vec<Node>) {
        (self.nodes, self.extra_nodes.unwrap_or_default())
    }
}

impl From<Vec<Node>> for NodeSet {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes)
    }
}
