//! Linkage functions combining two cluster distances into one.
//!
//! Distances are integers in caller-chosen units (microseconds when produced
//! by network probes). Any negative value means "not connected"; [`UNREACHABLE`]
//! is the canonical sentinel.

use core::{fmt, str::FromStr};

use thiserror::Error;

/// Distance between two nodes, hosts or clusters.
pub type Distance = i64;

/// Sentinel distance for pairs with no known connection.
pub const UNREACHABLE: Distance = -1;

/// Returns whether `distance` denotes a connected pair.
#[must_use]
pub const fn is_reachable(distance: Distance) -> bool {
    distance >= 0
}

/// Rule deriving a cluster-to-cluster distance from two member distances.
///
/// `Avg` and `Max` treat a negative operand as "not connected" and return
/// [`UNREACHABLE`]. `Min` does not guard negatives and returns the raw
/// minimum, so a single unreachable member makes the merged cluster
/// unreachable as well.
///
/// # Examples
/// ```
/// use topoclust_core::{DistanceFunction, UNREACHABLE};
///
/// assert_eq!(DistanceFunction::Avg.distance(10, 15), 12);
/// assert_eq!(DistanceFunction::Max.distance(10, 15), 15);
/// assert_eq!(DistanceFunction::Min.distance(10, 15), 10);
/// assert_eq!(DistanceFunction::Max.distance(UNREACHABLE, 15), UNREACHABLE);
/// assert_eq!(DistanceFunction::Min.distance(-7, 15), -7);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DistanceFunction {
    /// Average linkage.
    Avg,
    /// Complete linkage.
    #[default]
    Max,
    /// Single linkage.
    Min,
}

impl DistanceFunction {
    /// Combines two distances according to the linkage rule.
    #[must_use]
    pub const fn distance(self, d1: Distance, d2: Distance) -> Distance {
        match self {
            Self::Avg => {
                if d1 < 0 || d2 < 0 {
                    UNREACHABLE
                } else {
                    // Halve before adding so `i64::MAX` operands cannot overflow.
                    d1 / 2 + d2 / 2 + (d1 % 2 + d2 % 2) / 2
                }
            }
            Self::Max => {
                if d1 < 0 || d2 < 0 {
                    UNREACHABLE
                } else if d1 > d2 {
                    d1
                } else {
                    d2
                }
            }
            Self::Min => {
                if d1 < d2 {
                    d1
                } else {
                    d2
                }
            }
        }
    }

    /// Returns the lowercase name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

impl fmt::Display for DistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`DistanceFunction`] name.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown distance function `{provided}`; expected `avg`, `max` or `min`")]
pub struct UnknownDistanceFunction {
    /// The rejected input.
    pub provided: String,
}

impl FromStr for DistanceFunction {
    type Err = UnknownDistanceFunction;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "avg" | "average" => Ok(Self::Avg),
            "max" | "maximum" => Ok(Self::Max),
            "min" | "minimum" => Ok(Self::Min),
            other => Err(UnknownDistanceFunction {
                provided: other.to_owned(),
            }),
        }
    }
}
