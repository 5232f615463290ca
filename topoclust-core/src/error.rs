//! Error types for the topoclust core library.
//!
//! Defines error enums exposed by the public API and a convenient result alias.

use std::fmt;

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced while constructing a [`crate::TopologyDescriptor`].
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DescriptorError {
    /// Proximity thresholds must not be negative.
    #[error("threshold must be non-negative (got {got})")]
    NegativeThreshold {
        /// The rejected threshold.
        got: i64,
    },
}

define_error_codes! {
    /// Stable codes describing [`DescriptorError`] variants.
    enum DescriptorErrorCode for DescriptorError {
        /// Proximity thresholds must not be negative.
        NegativeThreshold => NegativeThreshold { .. } => "DESCRIPTOR_NEGATIVE_THRESHOLD",
    }
}

/// Error type produced by the clustering engine and the selection front-end.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum TopologyError {
    /// Two pivot nodes have no known distance between them.
    #[error("no distances found between pivot nodes `{left}` and `{right}`")]
    MissingPivotDistance {
        /// Cluster key of the first pivot node.
        left: String,
        /// Cluster key of the second pivot node.
        right: String,
    },
    /// The topology knows nothing about the candidate nodes.
    #[error("topology information is not available for {candidates} candidate nodes")]
    TopologyUnavailable {
        /// Number of candidate nodes supplied to the selection.
        candidates: usize,
    },
    /// `clusterize` was asked for zero clusters.
    #[error("number of clusters must be at least 1 (got {got})")]
    InvalidClusterCount {
        /// The rejected cluster count.
        got: usize,
    },
    /// A topology-based request reached a manager with topology disabled.
    #[error("topology is disabled")]
    TopologyDisabled,
    /// A distance-based request reached a manager with distances disabled.
    #[error("topology distance is disabled, cannot use distance-based descriptors")]
    DistanceDisabled,
    /// A matched node belongs to a host missing from the node index.
    #[error("inconsistent topology state: host `{host}` is not indexed")]
    InconsistentState {
        /// The host that could not be resolved.
        host: String,
    },
    /// The request descriptor was invalid.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

define_error_codes! {
    /// Stable codes describing [`TopologyError`] variants.
    enum TopologyErrorCode for TopologyError {
        /// Two pivot nodes have no known distance between them.
        MissingPivotDistance => MissingPivotDistance { .. } => "TOPOLOGY_MISSING_PIVOT_DISTANCE",
        /// The topology knows nothing about the candidate nodes.
        TopologyUnavailable => TopologyUnavailable { .. } => "TOPOLOGY_UNAVAILABLE",
        /// `clusterize` was asked for zero clusters.
        InvalidClusterCount => InvalidClusterCount { .. } => "TOPOLOGY_INVALID_CLUSTER_COUNT",
        /// A topology-based request reached a manager with topology disabled.
        TopologyDisabled => TopologyDisabled => "TOPOLOGY_DISABLED",
        /// A distance-based request reached a manager with distances disabled.
        DistanceDisabled => DistanceDisabled => "TOPOLOGY_DISTANCE_DISABLED",
        /// A matched node belongs to a host missing from the node index.
        InconsistentState => InconsistentState { .. } => "TOPOLOGY_INCONSISTENT_STATE",
        /// The request descriptor was invalid.
        InvalidDescriptor => Descriptor(..) => "TOPOLOGY_INVALID_DESCRIPTOR",
    }
}

impl TopologyError {
    /// Retrieve the inner [`DescriptorErrorCode`] when the error originated in
    /// descriptor validation.
    #[must_use]
    pub const fn descriptor_code(&self) -> Option<DescriptorErrorCode> {
        match self {
            Self::Descriptor(error) => Some(error.code()),
            _ => None,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, TopologyError>;
