//! Geometry kernel interface.
//!
//! Synthesis code never touches solid geometry directly. It drives a
//! [`GeometryKernel`]: create primitives, place them, cut, fuse, round edges,
//! and read back faces. Any B-rep kernel can sit behind the trait; the crate
//! ships [`PolyKernel`], a polygonal reference implementation.
//!
//! # Conventions
//!
//! - Units are millimetres.
//! - A new primitive's local frame has its minimum corner (box) or base
//!   centre (cylinder) at the origin; the [`Placement`] maps it into world
//!   space.
//! - Placements are absolute. Setting a placement replaces the previous one.
//! - Every operation that produces a new solid (cut, fuse, fillet, chamfer)
//!   bakes the inputs' placements into the result, which starts with the
//!   identity placement. Inputs are left untouched.
//! - Edge handles are only valid until the solid is replaced.

mod poly;
pub mod select;

pub use poly::{KernelOp, PolyKernel};
pub use select::{Axis, EdgeSelector};

use std::fmt;

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle to a solid owned by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SolidId(pub(crate) u64);

impl fmt::Display for SolidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of an edge in the list returned by [`GeometryKernel::edges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub usize);

/// RGB color, components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
}

impl Color {
    /// Creates a color from its components.
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from an `[r, g, b]` triple.
    #[must_use]
    pub const fn from_triple(rgb: [f64; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

/// Rigid placement of a solid: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement(Isometry3<f64>);

impl Placement {
    /// The identity placement.
    #[must_use]
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    /// Creates a placement from a position and a rotation.
    #[must_use]
    pub fn new(position: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(Translation3::from(position), rotation))
    }

    /// Pure translation.
    #[must_use]
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// Translation to `(x, y, z)` with a rotation of `degrees` about Z.
    #[must_use]
    pub fn at_rotated_z(x: f64, y: f64, z: f64, degrees: f64) -> Self {
        Self::new(
            Vector3::new(x, y, z),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), degrees.to_radians()),
        )
    }

    /// Rotation of `degrees` about the world Z axis.
    #[must_use]
    pub fn rotation_z(degrees: f64) -> Self {
        Self::at_rotated_z(0.0, 0.0, 0.0, degrees)
    }

    /// Returns `true` for the identity placement.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0.translation.vector == Vector3::zeros() && self.0.rotation == UnitQuaternion::identity()
    }

    /// Maps a local point into world space.
    #[must_use]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.0.transform_point(p)
    }

    /// Maps a local direction into world space.
    #[must_use]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.0.transform_vector(v)
    }

    /// World position of the local origin.
    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        self.0.translation.vector
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

/// A straight edge of a solid, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeInfo {
    /// Handle to pass to fillet/chamfer.
    pub id: EdgeId,
    /// First endpoint.
    pub start: Point3<f64>,
    /// Second endpoint.
    pub end: Point3<f64>,
}

impl EdgeInfo {
    /// Unit direction from `start` to `end`.
    #[must_use]
    pub fn direction(&self) -> Vector3<f64> {
        (self.end - self.start).normalize()
    }

    /// Edge length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Midpoint.
    #[must_use]
    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.start, &self.end)
    }
}

/// A planar face of a solid, vertices in world coordinates and boundary order.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Boundary vertices.
    pub vertices: Vec<Point3<f64>>,
}

impl Face {
    /// Number of vertices on the boundary.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Errors reported by a geometry kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// The handle does not refer to a live solid.
    #[error("unknown solid handle #{id}")]
    UnknownSolid {
        /// Raw handle value.
        id: u64,
    },

    /// A document object name is not bound to a solid.
    #[error("no object named '{name}'")]
    UnknownObject {
        /// The object name.
        name: String,
    },

    /// A size parameter is not strictly positive and finite.
    #[error("invalid {what}: {value}")]
    InvalidDimension {
        /// Which parameter.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// An operation produced no geometry.
    #[error("{operation} produced an empty solid")]
    EmptyResult {
        /// The operation.
        operation: &'static str,
    },

    /// An edge handle is out of range.
    #[error("edge {index} out of range (solid has {count} edges)")]
    UnknownEdge {
        /// Requested edge index.
        index: usize,
        /// Number of edges on the solid.
        count: usize,
    },

    /// An edge is not shared by exactly two faces with distinct normals.
    #[error("edge {index} borders {planes} distinct face planes, expected 2")]
    EdgeTopology {
        /// Edge index.
        index: usize,
        /// Number of distinct face planes found.
        planes: usize,
    },

    /// A selector matched no edges.
    #[error("no edges of '{object}' match {selector}")]
    EmptySelection {
        /// Object name.
        object: String,
        /// Selector description.
        selector: String,
    },

    /// A per-face color list does not match the face count.
    #[error("face color list has {got} entries, solid has {expected} faces")]
    FaceColorCount {
        /// Number of faces.
        expected: usize,
        /// Number of colors supplied.
        got: usize,
    },

    /// Fusing requires at least one input.
    #[error("fuse requires at least one solid")]
    NothingToFuse,
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Operations a solid modelling kernel must provide.
pub trait GeometryKernel {
    /// Creates a box spanning `length` in X, `width` in Y and `height` in Z.
    ///
    /// # Errors
    ///
    /// Fails if any size is not strictly positive.
    fn create_box(
        &mut self,
        length: f64,
        width: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId>;

    /// Creates a cylinder along local Z with its base centred on the origin.
    ///
    /// # Errors
    ///
    /// Fails if the radius or height is not strictly positive.
    fn create_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId>;

    /// Returns `base` minus `tool` as a new solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles or an empty result.
    fn cut(&mut self, base: SolidId, tool: SolidId) -> KernelResult<SolidId>;

    /// Returns the union of `parts` as a new solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles or an empty input list.
    fn fuse(&mut self, parts: &[SolidId]) -> KernelResult<SolidId>;

    /// Rounds the given edges with `radius`.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, bad edge indices, or non-manifold edges.
    fn fillet_edges(&mut self, solid: SolidId, edges: &[EdgeId], radius: f64)
        -> KernelResult<SolidId>;

    /// Bevels the given edges with an equal-distance chamfer of `size`.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, bad edge indices, or non-manifold edges.
    fn chamfer_edges(&mut self, solid: SolidId, edges: &[EdgeId], size: f64)
        -> KernelResult<SolidId>;

    /// Duplicates a solid, including its placement and colors.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn copy_shape(&mut self, solid: SolidId) -> KernelResult<SolidId>;

    /// Returns the current placement.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn placement(&self, solid: SolidId) -> KernelResult<Placement>;

    /// Replaces the placement.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn set_placement(&mut self, solid: SolidId, placement: Placement) -> KernelResult<()>;

    /// Lists the solid's edges in world coordinates.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn edges(&self, solid: SolidId) -> KernelResult<Vec<EdgeInfo>>;

    /// Lists the solid's faces in world coordinates, in a stable order.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn faces(&self, solid: SolidId) -> KernelResult<Vec<Face>>;

    /// Assigns one color per face, in [`faces`](Self::faces) order.
    ///
    /// # Errors
    ///
    /// Fails when the list length differs from the face count.
    fn set_face_colors(&mut self, solid: SolidId, colors: &[Color]) -> KernelResult<()>;

    /// Returns per-face colors, if assigned.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn face_colors(&self, solid: SolidId) -> KernelResult<Option<Vec<Color>>>;

    /// Sets a single display color for the whole solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn set_shape_color(&mut self, solid: SolidId, color: Color) -> KernelResult<()>;

    /// Returns the whole-solid display color, if set.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn shape_color(&self, solid: SolidId) -> KernelResult<Option<Color>>;

    /// Destroys a solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    fn remove(&mut self, solid: SolidId) -> KernelResult<()>;

    /// Brings derived data up to date. Kernels that evaluate eagerly can
    /// leave this as a no-op.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn recompute(&mut self) -> KernelResult<()> {
        Ok(())
    }
}
