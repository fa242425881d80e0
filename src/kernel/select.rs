//! Declarative edge selection.
//!
//! Kernels number edges in whatever order their topology code produces, and
//! that order shifts as soon as an upstream cut changes. Synthesis code
//! therefore names edges by geometry: "the edge along Y at x = 1.2, z = 0.3",
//! "every edge in the plane z = H". A selector is evaluated against
//! [`GeometryKernel::edges`](super::GeometryKernel::edges) right before the
//! fillet or chamfer that needs it.

use std::fmt;

use nalgebra::Vector3;

use super::{EdgeId, EdgeInfo};

/// Positional tolerance for edge matching, in millimetres.
pub const SELECT_TOLERANCE: f64 = 1e-6;

/// World coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl Axis {
    /// Unit vector along the axis.
    #[must_use]
    pub fn unit(self) -> Vector3<f64> {
        match self {
            Self::X => Vector3::x(),
            Self::Y => Vector3::y(),
            Self::Z => Vector3::z(),
        }
    }

    /// Indices of the two coordinates perpendicular to the axis, in
    /// `(x, y, z)` order.
    const fn across(self) -> (usize, usize) {
        match self {
            Self::X => (1, 2),
            Self::Y => (0, 2),
            Self::Z => (0, 1),
        }
    }
}

/// A predicate over edges.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeSelector {
    /// Edges parallel to `axis` whose two perpendicular coordinates equal
    /// `(a, b)`. For `Y` these are `(x, z)`, for `Z` `(x, y)`, for `X` `(y, z)`.
    AlongAxisAt {
        /// Edge direction.
        axis: Axis,
        /// First perpendicular coordinate.
        a: f64,
        /// Second perpendicular coordinate.
        b: f64,
    },
    /// Edges with both endpoints in the horizontal plane at this height.
    InPlaneZ(f64),
    /// Edges matching any of the inner selectors.
    AnyOf(Vec<EdgeSelector>),
    /// Edges matching the first selector but not the second.
    Excluding(Box<EdgeSelector>, Box<EdgeSelector>),
}

impl EdgeSelector {
    /// Shorthand for [`EdgeSelector::AlongAxisAt`].
    #[must_use]
    pub const fn along(axis: Axis, a: f64, b: f64) -> Self {
        Self::AlongAxisAt { axis, a, b }
    }

    /// Matches edges matching either selector.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::AnyOf(mut inner) => {
                inner.push(other);
                Self::AnyOf(inner)
            }
            first => Self::AnyOf(vec![first, other]),
        }
    }

    /// Removes edges matching `other` from this selection.
    #[must_use]
    pub fn excluding(self, other: Self) -> Self {
        Self::Excluding(Box::new(self), Box::new(other))
    }

    /// Tests a single edge.
    #[must_use]
    pub fn matches(&self, edge: &EdgeInfo) -> bool {
        match self {
            Self::AlongAxisAt { axis, a, b } => {
                if edge.length() < SELECT_TOLERANCE {
                    return false;
                }
                if edge.direction().dot(&axis.unit()).abs() < 1.0 - 1e-9 {
                    return false;
                }
                let (i, j) = axis.across();
                [edge.start, edge.end].iter().all(|p| {
                    (p[i] - a).abs() < SELECT_TOLERANCE && (p[j] - b).abs() < SELECT_TOLERANCE
                })
            }
            Self::InPlaneZ(z) => {
                (edge.start.z - z).abs() < SELECT_TOLERANCE
                    && (edge.end.z - z).abs() < SELECT_TOLERANCE
            }
            Self::AnyOf(inner) => inner.iter().any(|s| s.matches(edge)),
            Self::Excluding(keep, drop) => keep.matches(edge) && !drop.matches(edge),
        }
    }

    /// Returns the handles of all matching edges, in input order.
    #[must_use]
    pub fn select(&self, edges: &[EdgeInfo]) -> Vec<EdgeId> {
        edges
            .iter()
            .filter(|e| self.matches(e))
            .map(|e| e.id)
            .collect()
    }
}

impl fmt::Display for EdgeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlongAxisAt { axis, a, b } => write!(f, "along {axis:?} at ({a}, {b})"),
            Self::InPlaneZ(z) => write!(f, "in plane z={z}"),
            Self::AnyOf(inner) => {
                f.write_str("any of [")?;
                for (i, s) in inner.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{s}")?;
                }
                f.write_str("]")
            }
            Self::Excluding(keep, drop) => write!(f, "{keep} except {drop}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn edge(id: usize, a: [f64; 3], b: [f64; 3]) -> EdgeInfo {
        EdgeInfo {
            id: EdgeId(id),
            start: Point3::from(a),
            end: Point3::from(b),
        }
    }

    #[test]
    fn along_axis_matches_position_and_direction() {
        let edges = [
            edge(0, [1.0, -0.5, 0.0], [1.0, 0.5, 0.0]),
            edge(1, [1.0, -0.5, 0.2], [1.0, 0.5, 0.2]),
            edge(2, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
            edge(3, [1.0, 0.5, 0.0], [1.0, -0.5, 0.0]),
        ];
        let selector = EdgeSelector::along(Axis::Y, 1.0, 0.0);
        assert_eq!(selector.select(&edges), vec![EdgeId(0), EdgeId(3)]);
    }

    #[test]
    fn plane_selector_with_exclusion() {
        let edges = [
            edge(0, [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]),
            edge(1, [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]),
            edge(2, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            edge(3, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ];
        let selector = EdgeSelector::InPlaneZ(1.0)
            .or(EdgeSelector::InPlaneZ(0.0))
            .excluding(EdgeSelector::along(Axis::Y, 0.0, 1.0));
        assert_eq!(selector.select(&edges), vec![EdgeId(0), EdgeId(3)]);
    }

    #[test]
    fn display_is_readable() {
        let selector = EdgeSelector::along(Axis::Z, 1.0, 2.0).or(EdgeSelector::InPlaneZ(0.5));
        let text = selector.to_string();
        assert!(text.contains("along Z"));
        assert!(text.contains("z=0.5"));
    }
}
