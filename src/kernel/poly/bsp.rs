//! Binary space partitioning tree for polygon-soup booleans.
//!
//! Each node stores a splitting plane, the polygons lying in it, and the
//! front and back subtrees. Booleans are expressed through three primitives:
//! [`BspNode::clip_to`] removes everything inside another solid,
//! [`BspNode::invert`] swaps inside and outside, and [`BspNode::build`] adds
//! polygons.

use super::polygon::{split_polygon, Plane, Polygon, SplitResult};

#[derive(Debug, Default)]
pub struct BspNode {
    plane: Option<Plane>,
    polygons: Vec<Polygon>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
}

impl BspNode {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = Self::default();
        node.build(polygons);
        node
    }

    /// Swaps solid space and empty space.
    pub fn invert(&mut self) {
        for polygon in &mut self.polygons {
            polygon.flip();
        }
        if let Some(plane) = &mut self.plane {
            plane.flip();
        }
        if let Some(front) = &mut self.front {
            front.invert();
        }
        if let Some(back) = &mut self.back {
            back.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Removes the parts of `polygons` that lie inside this tree.
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = &self.plane else {
            return polygons;
        };
        let mut split = SplitResult::default();
        for polygon in polygons {
            split_polygon(plane, polygon, &mut split);
        }
        let mut front = split.front;
        front.append(&mut split.coplanar_front);
        let mut back = split.back;
        back.append(&mut split.coplanar_back);

        let mut front = match &self.front {
            Some(node) => node.clip_polygons(front),
            None => front,
        };
        if let Some(node) = &self.back {
            front.extend(node.clip_polygons(back));
        }
        front
    }

    /// Removes the parts of this tree's polygons that lie inside `other`.
    pub fn clip_to(&mut self, other: &Self) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(front) = &mut self.front {
            front.clip_to(other);
        }
        if let Some(back) = &mut self.back {
            back.clip_to(other);
        }
    }

    pub fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<Polygon>) {
        out.extend(self.polygons.iter().cloned());
        if let Some(front) = &self.front {
            front.collect_into(out);
        }
        if let Some(back) = &self.back {
            back.collect_into(out);
        }
    }

    /// Inserts polygons, splitting them by the existing planes.
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut polygons = polygons.into_iter();
        let plane = match self.plane {
            Some(plane) => plane,
            None => {
                let Some(first) = polygons.next() else {
                    return;
                };
                let plane = first.plane;
                self.plane = Some(plane);
                self.polygons.push(first);
                plane
            }
        };

        let mut split = SplitResult::default();
        for polygon in polygons {
            split_polygon(&plane, polygon, &mut split);
        }
        self.polygons.append(&mut split.coplanar_front);
        self.polygons.append(&mut split.coplanar_back);

        if !split.front.is_empty() {
            self.front
                .get_or_insert_with(Box::default)
                .build(split.front);
        }
        if !split.back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(split.back);
        }
    }
}

/// `a − b`.
pub fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspNode::new(a);
    let mut b = BspNode::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.invert();
    a.all_polygons()
}

/// `a ∪ b`.
pub fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspNode::new(a);
    let mut b = BspNode::new(b);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.all_polygons());
    a.all_polygons()
}
