//! STEP AP214 writer for faceted solids.
//!
//! Each object becomes a `FACETED_BREP` of planar `POLY_LOOP` faces; per-face
//! colors are attached with `STYLED_ITEM`s collected in one presentation
//! representation. Points shared between faces are written once.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::kernel::{Color, Face};

/// STEP header metadata.
#[derive(Debug, Clone)]
pub struct StepOptions {
    /// Author recorded in `FILE_NAME`.
    pub author: String,
    /// Organization recorded in `FILE_NAME`.
    pub organization: String,
    /// Preprocessor system recorded in `FILE_NAME`.
    pub preprocessor: String,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            author: String::new(),
            organization: String::new(),
            preprocessor: format!("ic3d-synth {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// One solid to write: name, faces and an optional color per face.
#[derive(Debug, Clone)]
pub struct StepSolid<'a> {
    /// Product and brep name.
    pub name: &'a str,
    /// Planar faces in world coordinates.
    pub faces: &'a [Face],
    /// Colors, one per face, or empty for an unstyled solid.
    pub colors: &'a [Color],
}

/// Doubles quotes so a name can sit inside a STEP string.
fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[allow(clippy::cast_possible_truncation)]
fn point_key(p: &nalgebra::Point3<f64>) -> [i64; 3] {
    [
        (p.x * 1e9).round() as i64,
        (p.y * 1e9).round() as i64,
        (p.z * 1e9).round() as i64,
    ]
}

#[allow(clippy::cast_possible_truncation)]
fn color_key(c: Color) -> [i64; 3] {
    [
        (c.r * 1e6).round() as i64,
        (c.g * 1e6).round() as i64,
        (c.b * 1e6).round() as i64,
    ]
}

fn id_list(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accumulates numbered entities for the DATA section.
pub struct StepBuilder<'a> {
    options: &'a StepOptions,
    entities: Vec<String>,
    next_id: usize,
    styles: HashMap<[i64; 3], usize>,
    styled_items: Vec<usize>,
}

impl<'a> StepBuilder<'a> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(options: &'a StepOptions) -> Self {
        Self {
            options,
            entities: Vec::new(),
            next_id: 1,
            styles: HashMap::new(),
            styled_items: Vec::new(),
        }
    }

    fn add_entity(&mut self, entity: String) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(format!("#{id} = {entity};"));
        id
    }

    /// Presentation style for a color, shared by every face using it.
    fn style_for(&mut self, color: Color) -> usize {
        let key = color_key(color);
        if let Some(&id) = self.styles.get(&key) {
            return id;
        }
        let rgb = self.add_entity(format!(
            "COLOUR_RGB('', {:.6}, {:.6}, {:.6})",
            color.r, color.g, color.b
        ));
        let fill_colour = self.add_entity(format!("FILL_AREA_STYLE_COLOUR('', #{rgb})"));
        let fill = self.add_entity(format!("FILL_AREA_STYLE('', (#{fill_colour}))"));
        let area = self.add_entity(format!("SURFACE_STYLE_FILL_AREA(#{fill})"));
        let side = self.add_entity(format!("SURFACE_SIDE_STYLE('', (#{area}))"));
        let usage = self.add_entity(format!("SURFACE_STYLE_USAGE(.BOTH., #{side})"));
        let assignment = self.add_entity(format!("PRESENTATION_STYLE_ASSIGNMENT((#{usage}))"));
        self.styles.insert(key, assignment);
        assignment
    }

    /// Writes one solid as a faceted brep with its product structure.
    pub fn add_solid(&mut self, solid: &StepSolid<'_>, context: usize) -> usize {
        let mut points: IndexMap<[i64; 3], usize> = IndexMap::new();
        let mut face_ids = Vec::with_capacity(solid.faces.len());
        for (index, face) in solid.faces.iter().enumerate() {
            let mut loop_points = Vec::with_capacity(face.vertices.len());
            for p in &face.vertices {
                let key = point_key(p);
                let id = match points.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = self.add_entity(format!(
                            "CARTESIAN_POINT('', ({:.6}, {:.6}, {:.6}))",
                            p.x, p.y, p.z
                        ));
                        points.insert(key, id);
                        id
                    }
                };
                loop_points.push(id);
            }
            let poly_loop = self.add_entity(format!("POLY_LOOP('', ({}))", id_list(&loop_points)));
            let bound = self.add_entity(format!("FACE_OUTER_BOUND('', #{poly_loop}, .T.)"));
            let face_id = self.add_entity(format!("FACE('', (#{bound}))"));
            if let Some(&color) = solid.colors.get(index) {
                let style = self.style_for(color);
                let item = self.add_entity(format!("STYLED_ITEM('color', (#{style}), #{face_id})"));
                self.styled_items.push(item);
            }
            face_ids.push(face_id);
        }

        let name = escape(solid.name);
        let shell = self.add_entity(format!("CLOSED_SHELL('', ({}))", id_list(&face_ids)));
        let brep = self.add_entity(format!("FACETED_BREP('{name}', #{shell})"));
        let origin = self.add_entity("CARTESIAN_POINT('', (0.0, 0.0, 0.0))".to_string());
        let z = self.add_entity("DIRECTION('', (0.0, 0.0, 1.0))".to_string());
        let x = self.add_entity("DIRECTION('', (1.0, 0.0, 0.0))".to_string());
        let axis = self.add_entity(format!("AXIS2_PLACEMENT_3D('', #{origin}, #{z}, #{x})"));
        let shape = self.add_entity(format!(
            "FACETED_BREP_SHAPE_REPRESENTATION('{name}', (#{axis}, #{brep}), #{context})"
        ));
        self.add_product(&name, shape);
        brep
    }

    fn add_product(&mut self, name: &str, shape: usize) {
        let app = self.add_entity("APPLICATION_CONTEXT('core data for automotive mechanical design processes')".to_string());
        self.add_entity(format!(
            "APPLICATION_PROTOCOL_DEFINITION('international standard', 'automotive_design', 2000, #{app})"
        ));
        let product_context = self.add_entity(format!("PRODUCT_CONTEXT('', #{app}, 'mechanical')"));
        let product = self.add_entity(format!("PRODUCT('{name}', '{name}', '', (#{product_context}))"));
        let formation = self.add_entity(format!("PRODUCT_DEFINITION_FORMATION('', '', #{product})"));
        let definition_context =
            self.add_entity(format!("PRODUCT_DEFINITION_CONTEXT('part definition', #{app}, 'design')"));
        let definition = self.add_entity(format!(
            "PRODUCT_DEFINITION('design', '', #{formation}, #{definition_context})"
        ));
        let definition_shape = self.add_entity(format!("PRODUCT_DEFINITION_SHAPE('', '', #{definition})"));
        self.add_entity(format!("SHAPE_DEFINITION_REPRESENTATION(#{definition_shape}, #{shape})"));
    }

    /// Geometric context in millimetres with 1e-6 uncertainty.
    pub fn add_context(&mut self) -> usize {
        let length = self.add_entity("(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI., .METRE.))".to_string());
        let angle = self.add_entity("(NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($, .RADIAN.))".to_string());
        let solid_angle =
            self.add_entity("(NAMED_UNIT(*) SI_UNIT($, .STERADIAN.) SOLID_ANGLE_UNIT())".to_string());
        let uncertainty = self.add_entity(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-06), #{length}, 'distance_accuracy_value', 'confusion accuracy')"
        ));
        self.add_entity(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{uncertainty})) \
             GLOBAL_UNIT_ASSIGNED_CONTEXT((#{length}, #{angle}, #{solid_angle})) \
             REPRESENTATION_CONTEXT('Context #1', '3D Context with UNIT and UNCERTAINTY'))"
        ))
    }

    /// Renders the complete exchange file.
    #[must_use]
    pub fn finish(mut self, file_name: &str, context: usize, timestamp: &str) -> String {
        if !self.styled_items.is_empty() {
            let items = id_list(&self.styled_items);
            self.add_entity(format!(
                "MECHANICAL_DESIGN_GEOMETRIC_PRESENTATION_REPRESENTATION('', ({items}), #{context})"
            ));
        }

        let mut lines = vec![
            "ISO-10303-21;".to_string(),
            "HEADER;".to_string(),
            "FILE_DESCRIPTION(('IC package 3D model'), '2;1');".to_string(),
            format!(
                "FILE_NAME('{}', '{timestamp}', ('{}'), ('{}'), '{}', '', '');",
                escape(file_name),
                escape(&self.options.author),
                escape(&self.options.organization),
                escape(&self.options.preprocessor),
            ),
            "FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));".to_string(),
            "ENDSEC;".to_string(),
            "DATA;".to_string(),
        ];
        lines.append(&mut self.entities);
        lines.push("ENDSEC;".to_string());
        lines.push("END-ISO-10303-21;".to_string());
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn triangle(z: f64) -> Face {
        Face {
            vertices: vec![
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(0.0, 1.0, z),
            ],
        }
    }

    #[test]
    fn shared_points_are_written_once() {
        let options = StepOptions::default();
        let mut builder = StepBuilder::new(&options);
        let context = builder.add_context();
        let faces = [triangle(0.0), triangle(0.0), triangle(1.0)];
        builder.add_solid(
            &StepSolid {
                name: "Tri",
                faces: &faces,
                colors: &[],
            },
            context,
        );
        let text = builder.finish("tri.step", context, "2026-01-01T00:00:00");
        // Origin of the axis placement adds one more.
        assert_eq!(text.matches("CARTESIAN_POINT").count(), 6 + 1);
        assert_eq!(text.matches("= FACE(").count(), 3);
        assert!(!text.contains("STYLED_ITEM"));
    }

    #[test]
    fn styles_are_shared_per_color() {
        let options = StepOptions::default();
        let mut builder = StepBuilder::new(&options);
        let context = builder.add_context();
        let faces = [triangle(0.0), triangle(1.0), triangle(2.0)];
        let red = Color::new(1.0, 0.0, 0.0);
        let grey = Color::new(0.5, 0.5, 0.5);
        builder.add_solid(
            &StepSolid {
                name: "It's",
                faces: &faces,
                colors: &[red, grey, red],
            },
            context,
        );
        let text = builder.finish("x.step", context, "2026-01-01T00:00:00");
        assert_eq!(text.matches("COLOUR_RGB").count(), 2);
        assert_eq!(text.matches("STYLED_ITEM").count(), 3);
        assert!(text.contains("MECHANICAL_DESIGN_GEOMETRIC_PRESENTATION_REPRESENTATION"));
        assert!(text.contains("FACETED_BREP('It''s'"));
        assert!(text.starts_with("ISO-10303-21;\nHEADER;"));
        assert!(text.ends_with("END-ISO-10303-21;\n"));
    }
}
