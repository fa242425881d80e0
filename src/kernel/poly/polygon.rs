//! Convex planar polygons and plane splitting.

use nalgebra::{Point3, Vector3};

use crate::kernel::Placement;

/// Distance below which a point counts as lying on a plane.
pub const PLANE_EPSILON: f64 = 1e-9;

/// Oriented plane `normal · p = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub w: f64,
}

impl Plane {
    /// Plane through a polygon, using Newell's method so nearly collinear
    /// leading vertices do not matter. `None` for degenerate input.
    pub fn from_points(points: &[Point3<f64>]) -> Option<Self> {
        let normal = newell_normal(points);
        let len = normal.norm();
        if len < 1e-14 {
            return None;
        }
        let normal = normal / len;
        let centroid = centroid(points);
        Some(Self {
            normal,
            w: normal.dot(&centroid.coords),
        })
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    pub fn distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&p.coords) - self.w
    }
}

/// Twice the area-weighted normal of a planar polygon.
pub fn newell_normal(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for (i, a) in points.iter().enumerate() {
        let b = &points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    #[allow(clippy::cast_precision_loss)]
    let n = points.len().max(1) as f64;
    Point3::from(sum / n)
}

/// A convex polygon with its supporting plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<Point3<f64>>,
    pub plane: Plane,
}

impl Polygon {
    /// Builds a polygon, dropping repeated vertices. `None` if fewer than
    /// three distinct vertices remain or the vertices are collinear.
    pub fn new(vertices: Vec<Point3<f64>>) -> Option<Self> {
        let vertices = dedup_ring(vertices);
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(&vertices)?;
        Some(Self { vertices, plane })
    }

    /// Builds a polygon that inherits `plane` from the polygon it was split from.
    fn with_plane(vertices: Vec<Point3<f64>>, plane: Plane) -> Option<Self> {
        let vertices = dedup_ring(vertices);
        if vertices.len() < 3 || newell_normal(&vertices).norm() < 1e-14 {
            return None;
        }
        Some(Self { vertices, plane })
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }

    pub fn transformed(&self, placement: &Placement) -> Self {
        let vertices: Vec<_> = self
            .vertices
            .iter()
            .map(|p| placement.transform_point(p))
            .collect();
        let normal = placement.transform_vector(&self.plane.normal);
        let w = normal.dot(&centroid(&vertices).coords);
        Self {
            vertices,
            plane: Plane { normal, w },
        }
    }

    pub fn area(&self) -> f64 {
        newell_normal(&self.vertices).norm() / 2.0
    }
}

fn dedup_ring(mut vertices: Vec<Point3<f64>>) -> Vec<Point3<f64>> {
    vertices.dedup_by(|a, b| (*a - *b).norm() < PLANE_EPSILON);
    while vertices.len() > 1 {
        let (Some(first), Some(last)) = (vertices.first(), vertices.last()) else {
            break;
        };
        if (first - last).norm() < PLANE_EPSILON {
            vertices.pop();
        } else {
            break;
        }
    }
    vertices
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Where a polygon ended up relative to a splitting plane.
#[derive(Debug, Default)]
pub struct SplitResult {
    pub coplanar_front: Vec<Polygon>,
    pub coplanar_back: Vec<Polygon>,
    pub front: Vec<Polygon>,
    pub back: Vec<Polygon>,
}

/// Classifies `polygon` against `plane`, splitting it when it spans the plane.
/// Coplanar polygons go to the front or back list depending on whether they
/// face the same way as the plane.
pub fn split_polygon(plane: &Plane, polygon: Polygon, out: &mut SplitResult) {
    let mut polygon_type = COPLANAR;
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.distance(v);
            let ty = if t < -PLANE_EPSILON {
                BACK
            } else if t > PLANE_EPSILON {
                FRONT
            } else {
                COPLANAR
            };
            polygon_type |= ty;
            ty
        })
        .collect();

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(&polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
            } else {
                out.coplanar_back.push(polygon);
            }
        }
        FRONT => out.front.push(polygon),
        BACK => out.back.push(polygon),
        _ => {
            let n = polygon.vertices.len();
            let mut f = Vec::with_capacity(n + 1);
            let mut b = Vec::with_capacity(n + 1);
            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let (vi, vj) = (polygon.vertices[i], polygon.vertices[j]);
                if ti != BACK {
                    f.push(vi);
                }
                if ti != FRONT {
                    b.push(vi);
                }
                if ti | tj == SPANNING {
                    let t = (plane.w - plane.normal.dot(&vi.coords))
                        / plane.normal.dot(&(vj - vi));
                    let v = vi + (vj - vi) * t;
                    f.push(v);
                    b.push(v);
                }
            }
            if let Some(p) = Polygon::with_plane(f, polygon.plane) {
                out.front.push(p);
            }
            if let Some(p) = Polygon::with_plane(b, polygon.plane) {
                out.back.push(p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> Polygon {
        Polygon::new(vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ])
        .unwrap()
    }

    #[test]
    fn plane_from_ccw_square_points_up() {
        let p = square(2.0);
        assert!((p.plane.normal.z - 1.0).abs() < 1e-12);
        assert!((p.plane.w - 2.0).abs() < 1e-12);
        assert!((p.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_polygons_are_rejected() {
        assert!(Polygon::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ])
        .is_none());
        assert!(Polygon::new(vec![Point3::origin(), Point3::origin(), Point3::origin()]).is_none());
    }

    #[test]
    fn spanning_polygon_is_split_in_two() {
        let plane = Plane {
            normal: Vector3::x(),
            w: 0.5,
        };
        let mut out = SplitResult::default();
        split_polygon(&plane, square(0.0), &mut out);
        assert_eq!(out.front.len(), 1);
        assert_eq!(out.back.len(), 1);
        assert!((out.front[0].area() - 0.5).abs() < 1e-12);
        assert!((out.back[0].area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn coplanar_polygon_sorted_by_facing() {
        let plane = Plane {
            normal: -Vector3::z(),
            w: 0.0,
        };
        let mut out = SplitResult::default();
        split_polygon(&plane, square(0.0), &mut out);
        assert_eq!(out.coplanar_back.len(), 1);
        assert!(out.coplanar_front.is_empty());
    }

    #[test]
    fn touching_polygon_is_not_split() {
        let plane = Plane {
            normal: Vector3::x(),
            w: 1.0,
        };
        let mut out = SplitResult::default();
        split_polygon(&plane, square(0.0), &mut out);
        assert_eq!(out.back.len(), 1);
        assert!(out.front.is_empty());
    }
}
