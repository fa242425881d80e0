//! Named-object model document.
//!
//! A [`Document`] owns a geometry kernel and binds stable object names
//! (`Body`, `Pin7`, `Cutter`) to kernel solids. Kernel edits return new
//! solids; the document rebinds the name and frees the old solid, so callers
//! only ever deal in names.

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::kernel::{
    Color, EdgeId, EdgeInfo, EdgeSelector, Face, GeometryKernel, KernelError, KernelResult, Placement,
    SolidId,
};

/// Name used for transient cutting tools.
pub const CUTTER: &str = "Cutter";

/// A model document: a kernel plus a name table.
#[derive(Debug)]
pub struct Document<K: GeometryKernel> {
    name: String,
    kernel: K,
    objects: IndexMap<String, SolidId>,
}

impl<K: GeometryKernel> Document<K> {
    /// Creates an empty document named `name`.
    pub fn new(name: impl Into<String>, kernel: K) -> Self {
        Self {
            name: name.into(),
            kernel,
            objects: IndexMap::new(),
        }
    }

    /// Document name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared access to the kernel.
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Resolves an object name.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::UnknownObject`] for unbound names.
    pub fn solid(&self, name: &str) -> KernelResult<SolidId> {
        self.objects
            .get(name)
            .copied()
            .ok_or_else(|| KernelError::UnknownObject {
                name: name.to_string(),
            })
    }

    /// Returns `true` when `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Bound names in creation order.
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Binds `name` to `solid`, freeing whatever it was bound to before.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures while freeing the old solid.
    pub fn register(&mut self, name: &str, solid: SolidId) -> KernelResult<()> {
        if let Some(old) = self.objects.insert(name.to_string(), solid) {
            if old != solid {
                self.kernel.remove(old)?;
            }
        }
        trace!(object = name, solid = %solid, "Bound object");
        Ok(())
    }

    /// Creates a named box.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures.
    pub fn add_box(
        &mut self,
        name: &str,
        length: f64,
        width: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId> {
        debug!(object = name, length, width, height, "Creating box");
        let id = self.kernel.create_box(length, width, height, placement)?;
        self.register(name, id)?;
        Ok(id)
    }

    /// Creates a named vertical cylinder.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures.
    pub fn add_cylinder(
        &mut self,
        name: &str,
        radius: f64,
        height: f64,
        placement: Placement,
    ) -> KernelResult<SolidId> {
        debug!(object = name, radius, height, "Creating cylinder");
        let id = self.kernel.create_cylinder(radius, height, placement)?;
        self.register(name, id)?;
        Ok(id)
    }

    /// Cuts `target` with a temporary box. When `rounding` is given, the
    /// selected edges of the box are filleted first, which leaves a concave
    /// round in the target.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures, including an empty rounding selection.
    pub fn cut_with_box(
        &mut self,
        target: &str,
        length: f64,
        width: f64,
        height: f64,
        placement: Placement,
        rounding: Option<(&EdgeSelector, f64)>,
    ) -> KernelResult<()> {
        self.add_box(CUTTER, length, width, height, placement)?;
        if let Some((selector, radius)) = rounding {
            if radius > 0.0 {
                self.fillet(CUTTER, selector, radius)?;
            }
        }
        self.cut_with_object(target, CUTTER, false)
    }

    /// Cuts `target` with the object `tool`. The tool is removed unless
    /// `keep_tool` is set.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures.
    pub fn cut_with_object(&mut self, target: &str, tool: &str, keep_tool: bool) -> KernelResult<()> {
        let base = self.solid(target)?;
        let tool_id = self.solid(tool)?;
        debug!(target, tool, keep_tool, "Cutting");
        let result = self.kernel.cut(base, tool_id)?;
        self.register(target, result)?;
        if !keep_tool {
            self.remove(tool)?;
        }
        self.kernel.recompute()
    }

    fn select_edges(
        &self,
        name: &str,
        selector: &EdgeSelector,
    ) -> KernelResult<(SolidId, Vec<EdgeId>)> {
        let id = self.solid(name)?;
        let edges = self.kernel.edges(id)?;
        let picked = selector.select(&edges);
        if picked.is_empty() {
            return Err(KernelError::EmptySelection {
                object: name.to_string(),
                selector: selector.to_string(),
            });
        }
        Ok((id, picked))
    }

    /// Fillets the edges of `name` matching `selector`. Returns how many
    /// edges were rounded.
    ///
    /// # Errors
    ///
    /// Fails when nothing matches or the kernel rejects the fillet.
    pub fn fillet(&mut self, name: &str, selector: &EdgeSelector, radius: f64) -> KernelResult<usize> {
        let (id, picked) = self.select_edges(name, selector)?;
        debug!(object = name, edges = picked.len(), radius, %selector, "Filleting");
        let result = self.kernel.fillet_edges(id, &picked, radius)?;
        self.register(name, result)?;
        self.kernel.recompute()?;
        Ok(picked.len())
    }

    /// Chamfers the edges of `name` matching `selector`.
    ///
    /// # Errors
    ///
    /// Fails when nothing matches or the kernel rejects the chamfer.
    pub fn chamfer(&mut self, name: &str, selector: &EdgeSelector, size: f64) -> KernelResult<usize> {
        let (id, picked) = self.select_edges(name, selector)?;
        debug!(object = name, edges = picked.len(), size, %selector, "Chamfering");
        let result = self.kernel.chamfer_edges(id, &picked, size)?;
        self.register(name, result)?;
        self.kernel.recompute()?;
        Ok(picked.len())
    }

    /// Replaces the placement of `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn place(&mut self, name: &str, placement: Placement) -> KernelResult<()> {
        let id = self.solid(name)?;
        self.kernel.set_placement(id, placement)?;
        self.kernel.recompute()
    }

    /// Sets the placement of `name` to a pure rotation about Z.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn rotate_about_z(&mut self, name: &str, degrees: f64) -> KernelResult<()> {
        debug!(object = name, degrees, "Rotating about Z");
        self.place(name, Placement::rotation_z(degrees))
    }

    /// Copies `source` to `new_name` and gives the copy `placement`.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures.
    pub fn copy(&mut self, source: &str, new_name: &str, placement: Placement) -> KernelResult<SolidId> {
        let id = self.solid(source)?;
        let copy = self.kernel.copy_shape(id)?;
        self.kernel.set_placement(copy, placement)?;
        self.register(new_name, copy)?;
        self.kernel.recompute()?;
        debug!(source, object = new_name, "Copied object");
        Ok(copy)
    }

    /// Removes `name` and frees its solid.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn remove(&mut self, name: &str) -> KernelResult<()> {
        let id = self
            .objects
            .shift_remove(name)
            .ok_or_else(|| KernelError::UnknownObject {
                name: name.to_string(),
            })?;
        trace!(object = name, "Removed object");
        self.kernel.remove(id)
    }

    /// Faces of `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn faces(&self, name: &str) -> KernelResult<Vec<Face>> {
        self.kernel.faces(self.solid(name)?)
    }

    /// Edges of `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn edges(&self, name: &str) -> KernelResult<Vec<EdgeInfo>> {
        self.kernel.edges(self.solid(name)?)
    }

    /// Fuses the named parts into a new object `fused_name`. The parts stay
    /// bound.
    ///
    /// # Errors
    ///
    /// Propagates kernel failures.
    pub fn fuse(&mut self, parts: &[&str], fused_name: &str) -> KernelResult<SolidId> {
        let ids = parts
            .iter()
            .map(|p| self.solid(p))
            .collect::<KernelResult<Vec<_>>>()?;
        debug!(parts = parts.len(), object = fused_name, "Fusing");
        let fused = self.kernel.fuse(&ids)?;
        self.kernel.recompute()?;
        self.register(fused_name, fused)?;
        Ok(fused)
    }

    /// Assigns per-face colors to `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown names or a face count mismatch.
    pub fn set_face_colors(&mut self, name: &str, colors: &[Color]) -> KernelResult<()> {
        let id = self.solid(name)?;
        self.kernel.set_face_colors(id, colors)
    }

    /// Per-face colors of `name`, if assigned.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn face_colors(&self, name: &str) -> KernelResult<Option<Vec<Color>>> {
        self.kernel.face_colors(self.solid(name)?)
    }

    /// Sets the display color of `name`.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn set_shape_color(&mut self, name: &str, color: Color) -> KernelResult<()> {
        let id = self.solid(name)?;
        self.kernel.set_shape_color(id, color)
    }

    /// Display color of `name`, if set.
    ///
    /// # Errors
    ///
    /// Fails for unknown names.
    pub fn shape_color(&self, name: &str) -> KernelResult<Option<Color>> {
        self.kernel.shape_color(self.solid(name)?)
    }
}
