use std::{fs, path::Path};

use thiserror::Error;

use crate::geometry::WorldPoint;

use super::{Material, Traceable, primitives::MeshTriangle};

/// Reads a Wavefront OBJ file into a flat list of triangles, ready to be fed
/// to the hierarchy builder. All triangles get the same material.
pub fn load_obj(
    path: impl AsRef<Path>,
    material: Material,
) -> Result<Vec<Box<dyn Traceable>>, ObjOpenError> {
    let content = fs::read_to_string(path)?;
    parse_obj(&content, material)
}

/// Same as `load_obj`, but parses OBJ data that is already in memory.
pub fn parse_obj(
    source: &str,
    material: Material,
) -> Result<Vec<Box<dyn Traceable>>, ObjOpenError> {
    let parsed = wavefront_obj::obj::parse(source.to_string())?;

    let mut triangles: Vec<Box<dyn Traceable>> = Vec::new();
    for o in parsed.objects.into_iter() {
        for geometry in o.geometry {
            for shape in geometry.shapes {
                let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                    // Points and lines have no surface to hit
                    continue;
                };

                let position = |vtindex: (usize, Option<usize>, Option<usize>)| {
                    let vertex = &o.vertices[vtindex.0];
                    WorldPoint::new(vertex.x, vertex.y, vertex.z)
                };

                triangles.push(Box::new(MeshTriangle::new(
                    position(a),
                    position(b),
                    position(c),
                    material.clone(),
                )));
            }
        }
    }

    Ok(triangles)
}

#[derive(Debug, Error)]
pub enum ObjOpenError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

#[cfg(test)]
mod tests {
    use assert2::{assert, let_assert};

    use super::*;
    use crate::geometry::{Ray, WorldVector};
    use crate::scene::bvh::HierarchyBuilder;

    // A unit square made of two triangles in the z = 2 plane
    const SQUARE_OBJ: &str = "\
v 0.0 0.0 2.0
v 1.0 0.0 2.0
v 1.0 1.0 2.0
v 0.0 1.0 2.0
f 1 2 3
f 1 3 4
";

    #[test]
    fn parses_triangles() {
        let triangles = parse_obj(SQUARE_OBJ, Material::default()).unwrap();
        assert!(triangles.len() == 2);
    }

    #[test]
    fn parsed_mesh_is_traceable() {
        let triangles = parse_obj(SQUARE_OBJ, Material::default()).unwrap();
        let tree = HierarchyBuilder::new().build(triangles).unwrap();

        let mut ray = Ray::new(
            WorldPoint::new(0.5, 0.5, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let hit = tree.closest_intersection(&mut ray).unwrap();
        assert!((hit.distance_to_hit - 2.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_garbage() {
        let_assert!(Err(ObjOpenError::ParseError(_)) = parse_obj("v 1.0 oops", Material::default()));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let_assert!(
            Err(ObjOpenError::ReadError(_)) =
                load_obj("/nonexistent/path/teapot.obj", Material::default())
        );
    }
}
