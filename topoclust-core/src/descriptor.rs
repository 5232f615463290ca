//! Topology descriptors parameterizing node selection.
//!
//! A descriptor is built once by the caller preparing a node request and is
//! read-only afterwards. The selection front-end dispatches on its kind.

use crate::{
    distance::{Distance, DistanceFunction},
    error::DescriptorError,
    node::Node,
};

/// Placement policy requested for a set of nodes.
///
/// # Examples
/// ```
/// use topoclust_core::{DistanceFunction, ThresholdProximity, TopologyDescriptor};
///
/// let descriptor: TopologyDescriptor = ThresholdProximity::new(50)?
///     .with_function(DistanceFunction::Avg)
///     .into();
/// assert!(descriptor.is_topology_based());
/// assert!(descriptor.requires_distances());
/// assert_eq!(descriptor.name(), "threshold_proximity");
/// # Ok::<(), topoclust_core::DescriptorError>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyDescriptor {
    /// Any nodes, topology ignored.
    #[default]
    Arbitrary,
    /// The closest set of nodes found by clustering.
    BestProximity(BestProximity),
    /// The closest set of nodes whose pairwise cluster distance stays within a
    /// threshold.
    ThresholdProximity(ThresholdProximity),
    /// Nodes sharing one host.
    SingleHost,
    /// One host reserved entirely for the request.
    SingleHostExclusive,
    /// Several hosts reserved entirely for the request.
    MultipleHostsExclusive,
    /// One node on each of several hosts, each host reserved entirely.
    DifferentHostsExclusive,
}

impl TopologyDescriptor {
    /// Returns whether selection needs topology information.
    #[must_use]
    pub const fn is_topology_based(&self) -> bool {
        !matches!(self, Self::Arbitrary)
    }

    /// Returns whether selection needs measured host distances.
    #[must_use]
    pub const fn requires_distances(&self) -> bool {
        matches!(self, Self::BestProximity(_) | Self::ThresholdProximity(_))
    }

    /// Stable snake-case name of the descriptor kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Arbitrary => "arbitrary",
            Self::BestProximity(_) => "best_proximity",
            Self::ThresholdProximity(_) => "threshold_proximity",
            Self::SingleHost => "single_host",
            Self::SingleHostExclusive => "single_host_exclusive",
            Self::MultipleHostsExclusive => "multiple_hosts_exclusive",
            Self::DifferentHostsExclusive => "different_hosts_exclusive",
        }
    }
}

impl From<BestProximity> for TopologyDescriptor {
    fn from(descriptor: BestProximity) -> Self {
        Self::BestProximity(descriptor)
    }
}

impl From<ThresholdProximity> for TopologyDescriptor {
    fn from(descriptor: ThresholdProximity) -> Self {
        Self::ThresholdProximity(descriptor)
    }
}

/// Parameters of a best-proximity request.
///
/// Defaults to complete linkage ([`DistanceFunction::Max`]) and no pivot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BestProximity {
    function: DistanceFunction,
    pivot: Vec<Node>,
}

impl BestProximity {
    /// Creates a request with the default distance function and no pivot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the linkage function.
    #[must_use]
    pub fn with_function(mut self, function: DistanceFunction) -> Self {
        self.function = function;
        self
    }

    /// Sets the nodes the selection must be close to.
    #[must_use]
    pub fn with_pivot(mut self, pivot: Vec<Node>) -> Self {
        self.pivot = pivot;
        self
    }

    /// Linkage function used by clustering.
    #[must_use]
    pub const fn function(&self) -> DistanceFunction {
        self.function
    }

    /// Pivot nodes; empty for floating selection.
    #[must_use]
    pub fn pivot(&self) -> &[Node] {
        &self.pivot
    }
}

/// Parameters of a threshold-proximity request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdProximity {
    threshold: Distance,
    function: DistanceFunction,
    pivot: Vec<Node>,
}

impl ThresholdProximity {
    /// Creates a request admitting merges up to `threshold`.
    ///
    /// # Errors
    /// Returns [`DescriptorError::NegativeThreshold`] when `threshold < 0`.
    pub fn new(threshold: Distance) -> Result<Self, DescriptorError> {
        if threshold < 0 {
            return Err(DescriptorError::NegativeThreshold { got: threshold });
        }
        Ok(Self {
            threshold,
            function: DistanceFunction::default(),
            pivot: Vec::new(),
        })
    }

    /// Sets the linkage function.
    #[must_use]
    pub fn with_function(mut self, function: DistanceFunction) -> Self {
        self.function = function;
        self
    }

    /// Sets the nodes the selection must be close to.
    #[must_use]
    pub fn with_pivot(mut self, pivot: Vec<Node>) -> Self {
        self.pivot = pivot;
        self
    }

    /// Largest admissible cluster distance.
    #[must_use]
    pub const fn threshold(&self) -> Distance {
        self.threshold
    }

    /// Linkage function used by clustering.
    #[must_use]
    pub const fn function(&self) -> DistanceFunction {
        self.function
    }

    /// Pivot nodes; empty for floating selection.
    #[must_use]
    pub fn pivot(&self) -> &[Node] {
        &self.pivot
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::DescriptorErrorCode;

    #[rstest]
    #[case(TopologyDescriptor::Arbitrary, false, false)]
    #[case(BestProximity::new().into(), true, true)]
    #[case(TopologyDescriptor::SingleHost, true, false)]
    #[case(TopologyDescriptor::SingleHostExclusive, true, false)]
    #[case(TopologyDescriptor::MultipleHostsExclusive, true, false)]
    #[case(TopologyDescriptor::DifferentHostsExclusive, true, false)]
    fn descriptor_requirements(
        #[case] descriptor: TopologyDescriptor,
        #[case] topology: bool,
        #[case] distances: bool,
    ) {
        assert_eq!(descriptor.is_topology_based(), topology);
        assert_eq!(descriptor.requires_distances(), distances);
    }

    #[test]
    fn best_proximity_defaults_to_complete_linkage() {
        let descriptor = BestProximity::new();
        assert_eq!(descriptor.function(), DistanceFunction::Max);
        assert!(descriptor.pivot().is_empty());
    }

    #[rstest]
    #[case(0)]
    #[case(250)]
    #[case(i64::MAX)]
    fn non_negative_thresholds_are_accepted(#[case] threshold: i64) {
        let descriptor = ThresholdProximity::new(threshold).expect("threshold is valid");
        assert_eq!(descriptor.threshold(), threshold);
        assert_eq!(descriptor.function(), DistanceFunction::Max);
    }

    #[rstest]
    #[case(-1)]
    #[case(i64::MIN)]
    fn negative_thresholds_are_rejected(#[case] threshold: i64) {
        let err = ThresholdProximity::new(threshold).expect_err("threshold is negative");
        assert_eq!(err, DescriptorError::NegativeThreshold { got: threshold });
        assert_eq!(err.code(), DescriptorErrorCode::NegativeThreshold);
    }

    #[test]
    fn builders_keep_pivot_and_function() {
        let pivot = vec![Node::new("alpha", "pnp://alpha/1")];
        let descriptor = ThresholdProximity::new(10)
            .expect("threshold is valid")
            .with_function(DistanceFunction::Min)
            .with_pivot(pivot.clone());
        assert_eq!(descriptor.pivot(), pivot.as_slice());
        assert_eq!(descriptor.function(), DistanceFunction::Min);
    }
}
