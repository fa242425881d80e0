//! Polygonal reference kernel.
//!
//! Solids are closed sets of convex planar polygons. Cuts and fusions are BSP
//! booleans: faces shared between touching inputs vanish, and faces crossing
//! another input's planes come back split. Fillets and chamfers
//! subtract (convex edge) or add (concave edge) a prism whose profile is the
//! rounding: a faceted arc for fillets, a single facet for chamfers.
//!
//! Every mutating call is appended to a journal, which tests use to check
//! which operations a synthesis step issued.

mod bsp;
mod polygon;

use std::collections::BTreeMap;
use std::f64::consts::PI;

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};
use tracing::trace;

use self::polygon::{centroid, newell_normal, Polygon};
use super::{
    Color, EdgeId, EdgeInfo, Face, GeometryKernel, KernelError, KernelResult, Placement, SolidId,
};

/// Default number of side facets on a cylinder.
pub const DEFAULT_CYLINDER_SEGMENTS: usize = 24;

/// Number of facets approximating a fillet arc.
pub const FILLET_FACETS: usize = 4;

/// Tolerance for treating two unit normals as the same plane orientation.
const NORMAL_TOLERANCE: f64 = 1e-6;

/// Quantum used to group collinear segments into edges.
const LINE_QUANTUM: f64 = 1e-6;

/// A mutating call recorded by [`PolyKernel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelOp {
    /// Box created.
    CreateBox { result: SolidId },
    /// Cylinder created.
    CreateCylinder { result: SolidId },
    /// Boolean difference.
    Cut {
        base: SolidId,
        tool: SolidId,
        result: SolidId,
    },
    /// Multi-way union.
    Fuse { parts: usize, result: SolidId },
    /// Edge rounding.
    Fillet {
        solid: SolidId,
        edges: usize,
        result: SolidId,
    },
    /// Edge bevelling.
    Chamfer {
        solid: SolidId,
        edges: usize,
        result: SolidId,
    },
    /// Duplicate.
    Copy { source: SolidId, result: SolidId },
    /// Placement replaced.
    SetPlacement { solid: SolidId },
    /// Per-face colors assigned.
    SetFaceColors { solid: SolidId, count: usize },
    /// Whole-solid color assigned.
    SetShapeColor { solid: SolidId },
    /// Solid destroyed.
    Remove { solid: SolidId },
    /// Pending edits applied.
    Recompute,
}

impl KernelOp {
    /// Returns `true` for operations that change the geometry of an existing
    /// solid (cut, fillet, chamfer).
    #[must_use]
    pub const fn edits_geometry(&self) -> bool {
        matches!(
            self,
            Self::Cut { .. } | Self::Fillet { .. } | Self::Chamfer { .. }
        )
    }

    /// Returns `true` when this operation reads or writes `solid`.
    #[must_use]
    pub fn touches(&self, solid: SolidId) -> bool {
        match *self {
            Self::CreateBox { result } | Self::CreateCylinder { result } => result == solid,
            Self::Cut { base, tool, result } => base == solid || tool == solid || result == solid,
            Self::Fuse { result, .. } => result == solid,
            Self::Fillet { solid: s, result, .. } | Self::Chamfer { solid: s, result, .. } => {
                s == solid || result == solid
            }
            Self::Copy { source, result } => source == solid || result == solid,
            Self::SetPlacement { solid: s }
            | Self::SetFaceColors { solid: s, .. }
            | Self::SetShapeColor { solid: s }
            | Self::Remove { solid: s } => s == solid,
            Self::Recompute => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Solid {
    polygons: Vec<Polygon>,
    placement: Placement,
    shape_color: Option<Color>,
    face_colors: Option<Vec<Color>>,
}

impl Solid {
    fn baked(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            placement: Placement::identity(),
            shape_color: None,
            face_colors: None,
        }
    }

    fn world_polygons(&self) -> Vec<Polygon> {
        if self.placement.is_identity() {
            self.polygons.clone()
        } else {
            self.polygons
                .iter()
                .map(|p| p.transformed(&self.placement))
                .collect()
        }
    }
}

/// A straight edge with the polygons that border it.
#[derive(Debug, Clone)]
struct EdgeData {
    start: Point3<f64>,
    end: Point3<f64>,
    polygons: Vec<usize>,
}

/// Polygonal solid modelling kernel.
#[derive(Debug)]
pub struct PolyKernel {
    solids: BTreeMap<u64, Solid>,
    next_id: u64,
    cylinder_segments: usize,
    journal: Vec<KernelOp>,
}

impl Default for PolyKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl PolyKernel {
    /// Creates an empty kernel with the default cylinder tessellation.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_cylinder_segments(DEFAULT_CYLINDER_SEGMENTS)
    }

    /// Creates an empty kernel approximating cylinders with `segments` sides.
    #[must_use]
    pub const fn with_cylinder_segments(segments: usize) -> Self {
        Self {
            solids: BTreeMap::new(),
            next_id: 1,
            cylinder_segments: if segments < 3 { 3 } else { segments },
            journal: Vec::new(),
        }
    }

    /// Every mutating call so far, oldest first.
    #[must_use]
    pub fn journal(&self) -> &[KernelOp] {
        &self.journal
    }

    /// Number of live solids.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    /// Enclosed volume of a solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    pub fn volume(&self, solid: SolidId) -> KernelResult<f64> {
        let polygons = self.get(solid)?.world_polygons();
        let mut six_v = 0.0;
        for p in &polygons {
            let v0 = p.vertices[0].coords;
            for w in p.vertices[1..].windows(2) {
                six_v += v0.dot(&w[0].coords.cross(&w[1].coords));
            }
        }
        Ok(six_v / 6.0)
    }

    /// Axis-aligned bounds `(min, max)` of a solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles or a solid without geometry.
    pub fn bounding_box(&self, solid: SolidId) -> KernelResult<(Point3<f64>, Point3<f64>)> {
        let polygons = self.get(solid)?.world_polygons();
        let mut points = polygons.iter().flat_map(|p| p.vertices.iter());
        let first = *points.next().ok_or(KernelError::EmptyResult {
            operation: "bounding box",
        })?;
        Ok(points.fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    fn get(&self, solid: SolidId) -> KernelResult<&Solid> {
        self.solids
            .get(&solid.0)
            .ok_or(KernelError::UnknownSolid { id: solid.0 })
    }

    fn get_mut(&mut self, solid: SolidId) -> KernelResult<&mut Solid> {
        self.solids
            .get_mut(&solid.0)
            .ok_or(KernelError::UnknownSolid { id: solid.0 })
    }

    fn insert(&mut self, solid: Solid) -> SolidId {
        let id = SolidId(self.next_id);
        self.next_id += 1;
        self.solids.insert(id.0, solid);
        id
    }

    fn insert_baked(
        &mut self,
        polygons: Vec<Polygon>,
        operation: &'static str,
    ) -> KernelResult<SolidId> {
        if polygons.is_empty() {
            return Err(KernelError::EmptyResult { operation });
        }
        Ok(self.insert(Solid::baked(polygons)))
    }

    fn round_edges(
        &mut self,
        solid: SolidId,
        edges: &[EdgeId],
        size: f64,
        profile: Profile,
    ) -> KernelResult<SolidId> {
        check_positive("rounding size", size)?;
        let mut polygons = self.get(solid)?.world_polygons();
        let all_edges = collect_edges(&polygons);

        let mut tools = Vec::with_capacity(edges.len());
        for edge in edges {
            let data = all_edges.get(edge.0).ok_or(KernelError::UnknownEdge {
                index: edge.0,
                count: all_edges.len(),
            })?;
            tools.push(rounding_tool(edge.0, data, &polygons, size, profile)?);
        }
        for (tool, convex) in tools {
            polygons = if convex {
                bsp::subtract(polygons, tool)
            } else {
                bsp::union(polygons, tool)
            };
        }
        let operation = match profile {
            Profile::Arc => "fillet",
            Profile::Flat => "chamfer",
        };
        self.insert_baked(polygons, operation)
    }
}

fn check_positive(what: &'static str, value: f64) -> KernelResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidDimension { what, value })
    }
}

fn quad(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> Option<Polygon> {
    Polygon::new(vec![
        Point3::from(a),
        Point3::from(b),
        Point3::from(c),
        Point3::from(d),
    ])
}

fn box_polygons(l: f64, w: f64, h: f64) -> Vec<Polygon> {
    [
        quad([0.0, 0.0, 0.0], [0.0, w, 0.0], [l, w, 0.0], [l, 0.0, 0.0]),
        quad([0.0, 0.0, h], [l, 0.0, h], [l, w, h], [0.0, w, h]),
        quad([0.0, 0.0, 0.0], [l, 0.0, 0.0], [l, 0.0, h], [0.0, 0.0, h]),
        quad([0.0, w, 0.0], [0.0, w, h], [l, w, h], [l, w, 0.0]),
        quad([0.0, 0.0, 0.0], [0.0, 0.0, h], [0.0, w, h], [0.0, w, 0.0]),
        quad([l, 0.0, 0.0], [l, w, 0.0], [l, w, h], [l, 0.0, h]),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn cylinder_polygons(r: f64, h: f64, segments: usize) -> Vec<Polygon> {
    #[allow(clippy::cast_precision_loss)]
    let ring: Vec<(f64, f64)> = (0..segments)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / segments as f64;
            (r * a.cos(), r * a.sin())
        })
        .collect();

    let mut polygons = Vec::with_capacity(segments + 2);
    polygons.extend(Polygon::new(
        ring.iter().rev().map(|&(x, y)| Point3::new(x, y, 0.0)).collect(),
    ));
    polygons.extend(Polygon::new(
        ring.iter().map(|&(x, y)| Point3::new(x, y, h)).collect(),
    ));
    for i in 0..segments {
        let (x0, y0) = ring[i];
        let (x1, y1) = ring[(i + 1) % segments];
        polygons.extend(quad([x0, y0, 0.0], [x1, y1, 0.0], [x1, y1, h], [x0, y0, h]));
    }
    polygons
}

fn quantize(v: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let q = (v / LINE_QUANTUM).round() as i64;
    q
}

/// Groups polygon boundary segments into maximal straight edges and keeps
/// those where at least two differently oriented polygons meet. Seams between
/// coplanar fragments of one face are dropped.
fn collect_edges(polygons: &[Polygon]) -> Vec<EdgeData> {
    struct Line {
        dir: Vector3<f64>,
        origin: Point3<f64>,
        spans: Vec<(f64, f64, usize)>,
    }

    let mut lines: BTreeMap<[i64; 6], Line> = BTreeMap::new();
    for (index, polygon) in polygons.iter().enumerate() {
        let n = polygon.vertices.len();
        for i in 0..n {
            let a = polygon.vertices[i];
            let b = polygon.vertices[(i + 1) % n];
            let delta = b - a;
            let len = delta.norm();
            if len < LINE_QUANTUM {
                continue;
            }
            let mut dir = delta / len;
            let lead = dir.iter().copied().find(|c| c.abs() > 1e-9).unwrap_or(1.0);
            if lead < 0.0 {
                dir = -dir;
            }
            let origin = a - dir * a.coords.dot(&dir);
            let key = [
                quantize(dir.x),
                quantize(dir.y),
                quantize(dir.z),
                quantize(origin.x),
                quantize(origin.y),
                quantize(origin.z),
            ];
            let (t0, t1) = {
                let (ta, tb) = (a.coords.dot(&dir), b.coords.dot(&dir));
                if ta <= tb {
                    (ta, tb)
                } else {
                    (tb, ta)
                }
            };
            lines
                .entry(key)
                .or_insert_with(|| Line {
                    dir,
                    origin,
                    spans: Vec::new(),
                })
                .spans
                .push((t0, t1, index));
        }
    }

    let mut edges = Vec::new();
    for line in lines.into_values() {
        let mut spans = line.spans;
        spans.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut current: Option<(f64, f64, Vec<usize>)> = None;
        for (t0, t1, index) in spans {
            match &mut current {
                Some((_, end, members)) if t0 <= *end + LINE_QUANTUM => {
                    *end = end.max(t1);
                    members.push(index);
                }
                _ => {
                    if let Some(done) = current.take() {
                        push_edge(&mut edges, &line.dir, &line.origin, done, polygons);
                    }
                    current = Some((t0, t1, vec![index]));
                }
            }
        }
        if let Some(done) = current {
            push_edge(&mut edges, &line.dir, &line.origin, done, polygons);
        }
    }
    edges
}

fn push_edge(
    edges: &mut Vec<EdgeData>,
    dir: &Vector3<f64>,
    origin: &Point3<f64>,
    (t0, t1, mut members): (f64, f64, Vec<usize>),
    polygons: &[Polygon],
) {
    members.sort_unstable();
    members.dedup();
    if distinct_normals(&members, polygons).len() < 2 {
        return;
    }
    edges.push(EdgeData {
        start: origin + dir * t0,
        end: origin + dir * t1,
        polygons: members,
    });
}

/// One representative polygon index per distinct normal direction.
fn distinct_normals(members: &[usize], polygons: &[Polygon]) -> Vec<usize> {
    let mut reps: Vec<usize> = Vec::new();
    for &m in members {
        let n = polygons[m].plane.normal;
        if !reps
            .iter()
            .any(|&r| (polygons[r].plane.normal - n).norm() < NORMAL_TOLERANCE)
        {
            reps.push(m);
        }
    }
    reps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Profile {
    Arc,
    Flat,
}

/// Builds the prism removed from (convex edge) or added to (concave edge)
/// the solid to round one edge. Returns the prism and whether the edge is
/// convex.
fn rounding_tool(
    index: usize,
    edge: &EdgeData,
    polygons: &[Polygon],
    size: f64,
    profile: Profile,
) -> KernelResult<(Vec<Polygon>, bool)> {
    let reps = distinct_normals(&edge.polygons, polygons);
    if reps.len() != 2 {
        return Err(KernelError::EdgeTopology {
            index,
            planes: reps.len(),
        });
    }

    let p = edge.start;
    let length = (edge.end - edge.start).norm();
    let d = (edge.end - edge.start) / length;

    // In-face directions pointing away from the edge into each face.
    let inward = |poly: &Polygon| {
        let u = poly.plane.normal.cross(&d).normalize();
        if (centroid(&poly.vertices) - p).dot(&u) < 0.0 {
            -u
        } else {
            u
        }
    };
    let (p1, p2) = (&polygons[reps[0]], &polygons[reps[1]]);
    let (u1, u2) = (inward(p1), inward(p2));
    let convex = p1.plane.normal.dot(&u2) < 0.0;

    let theta = u1.dot(&u2).clamp(-1.0, 1.0).acos();
    if theta < 1e-6 || theta > PI - 1e-6 {
        return Err(KernelError::EdgeTopology { index, planes: 1 });
    }

    let apex = p - (u1 + u2) * (0.05 * size);
    let mut section = vec![apex];
    match profile {
        Profile::Flat => {
            section.push(p + u1 * size);
            section.push(p + u2 * size);
        }
        Profile::Arc => {
            let tangent = size / (theta / 2.0).tan();
            let center = p + (u1 + u2).normalize() * (size / (theta / 2.0).sin());
            let from = p + u1 * tangent - center;
            let to = p + u2 * tangent - center;
            let axis = Unit::new_normalize(from.cross(&to));
            let sweep = from.angle(&to);
            #[allow(clippy::cast_precision_loss)]
            for k in 0..=FILLET_FACETS {
                let step = sweep * k as f64 / FILLET_FACETS as f64;
                let rot = UnitQuaternion::from_axis_angle(&axis, step);
                section.push(center + rot * from);
            }
        }
    }

    // Wind the profile counter-clockwise about d, keeping the apex first so
    // the end caps can be fanned from it.
    if newell_normal(&section).dot(&d) < 0.0 {
        section[1..].reverse();
    }
    let far: Vec<Point3<f64>> = section.iter().map(|s| s + d * length).collect();

    let mut prism = Vec::with_capacity(3 * section.len());
    for i in 1..section.len() - 1 {
        prism.extend(Polygon::new(vec![section[0], section[i + 1], section[i]]));
        prism.extend(Polygon::new(vec![far[0], far[i], far[i + 1]]));
    }
    let n = section.len();
    for i in 0..n {
        let j = (i + 1) % n;
        prism.extend(Polygon::new(vec![section[i], section[j], far[j], far[i]]));
    }
    trace!(edge = index, convex, facets = prism.len(), "Built rounding tool");
    Ok((prism, convex))
}

impl GeometryKernel for PolyKernel {
    fn create_box(
        &mut self,
        length: f64,
        width: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId> {
        check_positive("box length", length)?;
        check_positive("box width", width)?;
        check_positive("box height", height)?;
        let id = self.insert(Solid {
            polygons: box_polygons(length, width, height),
            placement,
            shape_color: None,
            face_colors: None,
        });
        self.journal.push(KernelOp::CreateBox { result: id });
        Ok(id)
    }

    fn create_cylinder(
        &mut self,
        radius: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId> {
        check_positive("cylinder radius", radius)?;
        check_positive("cylinder height", height)?;
        let id = self.insert(Solid {
            polygons: cylinder_polygons(radius, height, self.cylinder_segments),
            placement,
            shape_color: None,
            face_colors: None,
        });
        self.journal.push(KernelOp::CreateCylinder { result: id });
        Ok(id)
    }

    fn cut(&mut self, base: SolidId, tool: SolidId) -> KernelResult<SolidId> {
        let a = self.get(base)?.world_polygons();
        let b = self.get(tool)?.world_polygons();
        let result = self.insert_baked(bsp::subtract(a, b), "cut")?;
        self.journal.push(KernelOp::Cut { base, tool, result });
        Ok(result)
    }

    fn fuse(&mut self, parts: &[SolidId]) -> KernelResult<SolidId> {
        if parts.is_empty() {
            return Err(KernelError::NothingToFuse);
        }
        let mut polygons: Vec<Polygon> = Vec::new();
        for &part in parts {
            let next = self.get(part)?.world_polygons();
            polygons = if polygons.is_empty() {
                next
            } else {
                bsp::union(polygons, next)
            };
        }
        let result = self.insert_baked(polygons, "fuse")?;
        self.journal.push(KernelOp::Fuse {
            parts: parts.len(),
            result,
        });
        Ok(result)
    }

    fn fillet_edges(
        &mut self,
        solid: SolidId,
        edges: &[EdgeId],
        radius: f64,
    ) -> KernelResult<SolidId> {
        let result = self.round_edges(solid, edges, radius, Profile::Arc)?;
        self.journal.push(KernelOp::Fillet {
            solid,
            edges: edges.len(),
            result,
        });
        Ok(result)
    }

    fn chamfer_edges(
        &mut self,
        solid: SolidId,
        edges: &[EdgeId],
        size: f64,
    ) -> KernelResult<SolidId> {
        let result = self.round_edges(solid, edges, size, Profile::Flat)?;
        self.journal.push(KernelOp::Chamfer {
            solid,
            edges: edges.len(),
            result,
        });
        Ok(result)
    }

    fn copy_shape(&mut self, solid: SolidId) -> KernelResult<SolidId> {
        let copy = self.get(solid)?.clone();
        let result = self.insert(copy);
        self.journal.push(KernelOp::Copy {
            source: solid,
            result,
        });
        Ok(result)
    }

    fn placement(&self, solid: SolidId) -> KernelResult<Placement> {
        Ok(self.get(solid)?.placement)
    }

    fn set_placement(&mut self, solid: SolidId, placement: Placement) -> KernelResult<()> {
        self.get_mut(solid)?.placement = placement;
        self.journal.push(KernelOp::SetPlacement { solid });
        Ok(())
    }

    fn edges(&self, solid: SolidId) -> KernelResult<Vec<EdgeInfo>> {
        let polygons = self.get(solid)?.world_polygons();
        Ok(collect_edges(&polygons)
            .into_iter()
            .enumerate()
            .map(|(i, e)| EdgeInfo {
                id: EdgeId(i),
                start: e.start,
                end: e.end,
            })
            .collect())
    }

    fn faces(&self, solid: SolidId) -> KernelResult<Vec<Face>> {
        Ok(self
            .get(solid)?
            .world_polygons()
            .into_iter()
            .map(|p| Face {
                vertices: p.vertices,
            })
            .collect())
    }

    fn set_face_colors(&mut self, solid: SolidId, colors: &[Color]) -> KernelResult<()> {
        let target = self.get_mut(solid)?;
        if colors.len() != target.polygons.len() {
            return Err(KernelError::FaceColorCount {
                expected: target.polygons.len(),
                got: colors.len(),
            });
        }
        target.face_colors = Some(colors.to_vec());
        self.journal.push(KernelOp::SetFaceColors {
            solid,
            count: colors.len(),
        });
        Ok(())
    }

    fn face_colors(&self, solid: SolidId) -> KernelResult<Option<Vec<Color>>> {
        Ok(self.get(solid)?.face_colors.clone())
    }

    fn set_shape_color(&mut self, solid: SolidId, color: Color) -> KernelResult<()> {
        self.get_mut(solid)?.shape_color = Some(color);
        self.journal.push(KernelOp::SetShapeColor { solid });
        Ok(())
    }

    fn shape_color(&self, solid: SolidId) -> KernelResult<Option<Color>> {
        Ok(self.get(solid)?.shape_color)
    }

    fn remove(&mut self, solid: SolidId) -> KernelResult<()> {
        self.solids
            .remove(&solid.0)
            .ok_or(KernelError::UnknownSolid { id: solid.0 })?;
        self.journal.push(KernelOp::Remove { solid });
        Ok(())
    }

    /// Geometry is evaluated eagerly, so this only marks the journal.
    fn recompute(&mut self) -> KernelResult<()> {
        self.journal.push(KernelOp::Recompute);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Axis, EdgeSelector};

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn box_has_six_faces_twelve_edges() {
        let mut k = PolyKernel::new();
        let id = k
            .create_box(2.0, 3.0, 4.0, Placement::identity())
            .unwrap();
        assert_eq!(k.faces(id).unwrap().len(), 6);
        assert_eq!(k.edges(id).unwrap().len(), 12);
        assert!(approx_eq(k.volume(id).unwrap(), 24.0, 1e-9));
    }

    #[test]
    fn placement_moves_geometry() {
        let mut k = PolyKernel::new();
        let id = k
            .create_box(1.0, 2.0, 1.0, Placement::at_rotated_z(0.5, -0.5, 1.0, 90.0))
            .unwrap();
        let (lo, hi) = k.bounding_box(id).unwrap();
        assert!(approx_eq(lo.x, -1.5, 1e-9));
        assert!(approx_eq(hi.x, 0.5, 1e-9));
        assert!(approx_eq(lo.y, -0.5, 1e-9));
        assert!(approx_eq(hi.y, 0.5, 1e-9));
        assert!(approx_eq(lo.z, 1.0, 1e-9));
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let mut k = PolyKernel::new();
        assert!(matches!(
            k.create_box(0.0, 1.0, 1.0, Placement::identity()),
            Err(KernelError::InvalidDimension { .. })
        ));
        assert!(k.create_cylinder(-1.0, 1.0, Placement::identity()).is_err());
        assert!(k.journal().is_empty());
    }

    #[test]
    fn cut_removes_overlap() {
        let mut k = PolyKernel::new();
        let a = k.create_box(2.0, 2.0, 2.0, Placement::identity()).unwrap();
        let b = k
            .create_box(2.0, 2.0, 2.0, Placement::translation(1.0, 1.0, 1.0))
            .unwrap();
        let c = k.cut(a, b).unwrap();
        assert!(approx_eq(k.volume(c).unwrap(), 7.0, 1e-9));
        assert!(k.placement(c).unwrap().is_identity());
    }

    #[test]
    fn touching_cut_keeps_volume() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let b = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(0.0, 1.0, 0.0))
            .unwrap();
        let c = k.cut(a, b).unwrap();
        assert!(approx_eq(k.volume(c).unwrap(), 1.0, 1e-9));
        assert_eq!(k.edges(c).unwrap().len(), 12);
    }

    #[test]
    fn cut_through_everything_is_empty() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let b = k
            .create_box(3.0, 3.0, 3.0, Placement::translation(-1.0, -1.0, -1.0))
            .unwrap();
        assert!(matches!(
            k.cut(a, b),
            Err(KernelError::EmptyResult { operation: "cut" })
        ));
    }

    #[test]
    fn chamfer_removes_triangular_prism() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let edges = k.edges(a).unwrap();
        let picked = EdgeSelector::along(Axis::Y, 0.0, 0.0).select(&edges);
        assert_eq!(picked.len(), 1);
        let c = k.chamfer_edges(a, &picked, 0.2).unwrap();
        assert!(approx_eq(k.volume(c).unwrap(), 1.0 - 0.02, 1e-9));
    }

    #[test]
    fn fillet_volume_close_to_exact() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let edges = k.edges(a).unwrap();
        let picked = EdgeSelector::along(Axis::Z, 1.0, 1.0).select(&edges);
        let r = 0.3;
        let c = k.fillet_edges(a, &picked, r).unwrap();
        let exact = 1.0 - r * r * (1.0 - PI / 4.0);
        let chamfer = 1.0 - r * r / 2.0;
        let v = k.volume(c).unwrap();
        assert!(v < 1.0);
        assert!(v > chamfer, "faceted fillet removes less than a chamfer");
        assert!(approx_eq(v, exact, 5e-3));
    }

    #[test]
    fn concave_fillet_adds_material() {
        let mut k = PolyKernel::new();
        let a = k.create_box(2.0, 1.0, 2.0, Placement::identity()).unwrap();
        let notch = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(1.0, 0.0, 1.0))
            .unwrap();
        let l_shape = k.cut(a, notch).unwrap();
        let before = k.volume(l_shape).unwrap();
        let edges = k.edges(l_shape).unwrap();
        let inner = EdgeSelector::along(Axis::Y, 1.0, 1.0).select(&edges);
        assert_eq!(inner.len(), 1);
        let filled = k.fillet_edges(l_shape, &inner, 0.2).unwrap();
        assert!(k.volume(filled).unwrap() > before);
    }

    #[test]
    fn bad_edge_index_is_reported() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        assert!(matches!(
            k.fillet_edges(a, &[EdgeId(99)], 0.1),
            Err(KernelError::UnknownEdge { index: 99, count: 12 })
        ));
    }

    #[test]
    fn fuse_is_a_union() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let b = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(0.5, 0.0, 0.0))
            .unwrap();
        let f = k.fuse(&[a, b]).unwrap();
        assert!((k.volume(f).unwrap() - 1.5).abs() < 1e-9);
        let (lo, hi) = k.bounding_box(f).unwrap();
        assert!(lo.x.abs() < 1e-9 && (hi.x - 1.5).abs() < 1e-9);
        assert!(matches!(k.fuse(&[]), Err(KernelError::NothingToFuse)));
    }

    #[test]
    fn fuse_drops_shared_faces() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let b = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(1.0, 0.0, 0.0))
            .unwrap();
        let c = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(0.0, 0.0, 1.0))
            .unwrap();
        let f = k.fuse(&[a, b, c]).unwrap();
        assert!((k.volume(f).unwrap() - 3.0).abs() < 1e-9);
        // No face lies in the planes the inputs touch in.
        let inner = k.faces(f).unwrap().into_iter().filter(|face| {
            face.vertices.iter().all(|p| (p.x - 1.0).abs() < 1e-9 && p.z < 1.0 + 1e-9)
                || face.vertices.iter().all(|p| (p.z - 1.0).abs() < 1e-9 && p.x < 1.0 + 1e-9)
        });
        assert_eq!(inner.count(), 0);
    }

    #[test]
    fn fuse_of_one_part_is_a_copy() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 2.0, 3.0, Placement::identity()).unwrap();
        let f = k.fuse(&[a]).unwrap();
        assert_ne!(a, f);
        assert_eq!(k.faces(f).unwrap().len(), 6);
        assert!((k.volume(f).unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn face_colors_must_match_face_count() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let red = Color::new(1.0, 0.0, 0.0);
        assert!(matches!(
            k.set_face_colors(a, &[red; 5]),
            Err(KernelError::FaceColorCount { expected: 6, got: 5 })
        ));
        k.set_face_colors(a, &[red; 6]).unwrap();
        assert_eq!(k.face_colors(a).unwrap().map(|c| c.len()), Some(6));
    }

    #[test]
    fn copy_is_independent() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        k.set_shape_color(a, Color::new(0.1, 0.1, 0.1)).unwrap();
        let b = k.copy_shape(a).unwrap();
        k.set_placement(b, Placement::translation(5.0, 0.0, 0.0)).unwrap();
        assert!(k.placement(a).unwrap().is_identity());
        assert_eq!(k.shape_color(b).unwrap(), Some(Color::new(0.1, 0.1, 0.1)));
        k.remove(a).unwrap();
        assert!(k.faces(a).is_err());
        assert_eq!(k.solid_count(), 1);
    }

    #[test]
    fn journal_records_calls_in_order() {
        let mut k = PolyKernel::new();
        let a = k.create_box(1.0, 1.0, 1.0, Placement::identity()).unwrap();
        let b = k
            .create_box(1.0, 1.0, 1.0, Placement::translation(0.5, 0.0, 0.0))
            .unwrap();
        let c = k.cut(a, b).unwrap();
        assert_eq!(
            k.journal(),
            &[
                KernelOp::CreateBox { result: a },
                KernelOp::CreateBox { result: b },
                KernelOp::Cut {
                    base: a,
                    tool: b,
                    result: c
                },
            ]
        );
        assert!(k.journal()[2].edits_geometry());
        assert!(k.journal()[2].touches(b));
    }
}
