use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use wavefront_obj::{
    mtl::{self, Material},
    obj::{self, ObjSet, Primitive, VTNIndex},
};

use crate::{
    color::Color,
    error::AssetLoadError,
    geometry::{EPSILON, Matrix, WorldPoint, WorldVector},
    resource::Resource,
    vertex::Vertex,
};

/// Texture coordinate given to vertices that don't have one.
const DEFAULT_TEXTURE_COORDINATES: [f32; 2] = [0.5, 0.5];

/// Group of faces sharing one material, drawn with a single call.
#[derive(Clone, Debug)]
pub struct Shape {
    pub name: String,
    vertex_buffer: Resource<Vertex>,
    index_buffer: Resource<u32>,
    texture: Option<PathBuf>,
}

impl Shape {
    pub fn vertex_buffer(&self) -> &Resource<Vertex> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Resource<u32> {
        &self.index_buffer
    }

    /// Diffuse texture of the shape's material, if it has one.
    pub fn texture(&self) -> Option<&Path> {
        self.texture.as_deref()
    }
}

/// Triangle mesh loaded from a Wavefront OBJ file, split into shapes.
#[derive(Clone, Debug, Default)]
pub struct Model {
    shapes: Vec<Shape>,
}

impl Model {
    /// Loads an OBJ file, together with its material library if it references one.
    pub fn load_obj(path: impl AsRef<Path>) -> Result<Model, AssetLoadError> {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or(Path::new(""));

        let content = read_to_string(path)?;
        let obj_set = parse_obj(&content, path)?;

        let materials = match &obj_set.material_library {
            Some(library) => {
                let library_path = base_dir.join(library);
                let content = read_to_string(&library_path)?;
                parse_mtl(&content, &library_path)?
            }
            None => Vec::new(),
        };

        let model = Self::build(obj_set, &materials, path, base_dir)?;
        log::info!(
            "Loaded {} with {} shapes, {} triangles",
            path.display(),
            model.shapes.len(),
            model.triangle_count()
        );
        Ok(model)
    }

    /// Builds a model from in-memory OBJ and MTL text.
    /// Texture paths are resolved relative to `base_dir`.
    pub fn from_sources(
        obj: &str,
        mtl: Option<&str>,
        base_dir: impl AsRef<Path>,
    ) -> Result<Model, AssetLoadError> {
        let base_dir = base_dir.as_ref();
        let obj_set = parse_obj(obj, base_dir)?;
        let materials = match mtl {
            Some(mtl) => parse_mtl(mtl, base_dir)?,
            None => Vec::new(),
        };
        Self::build(obj_set, &materials, base_dir, base_dir)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn get_vertex_buffers(&self) -> impl Iterator<Item = &Resource<Vertex>> {
        self.shapes.iter().map(Shape::vertex_buffer)
    }

    pub fn get_index_buffers(&self) -> impl Iterator<Item = &Resource<u32>> {
        self.shapes.iter().map(Shape::index_buffer)
    }

    pub fn get_per_shape_texture_files(&self) -> Vec<Option<&Path>> {
        self.shapes.iter().map(Shape::texture).collect()
    }

    /// Models are always placed at the world origin.
    pub fn get_world_matrix(&self) -> Matrix {
        Matrix::identity()
    }

    pub fn triangle_count(&self) -> usize {
        self.get_index_buffers()
            .map(|indices| indices.get_number_of_elements() / 3)
            .sum()
    }

    fn build(
        obj_set: ObjSet,
        materials: &[Material],
        source: &Path,
        base_dir: &Path,
    ) -> Result<Model, AssetLoadError> {
        let mut shapes = Vec::new();

        for object in &obj_set.objects {
            for (geometry_index, geometry) in object.geometry.iter().enumerate() {
                let material = match &geometry.material_name {
                    Some(name) => Some(
                        materials
                            .iter()
                            .find(|m| &m.name == name)
                            .ok_or_else(|| AssetLoadError::UnknownMaterial {
                                path: source.to_owned(),
                                name: name.clone(),
                            })?,
                    ),
                    None => None,
                };

                let shape = ShapeBuilder::new(object, material).build(geometry, base_dir);
                if shape.index_buffer.get_number_of_elements() == 0 {
                    log::debug!(
                        "Skipping empty geometry group {geometry_index} of object {:?}",
                        object.name
                    );
                    continue;
                }

                log::debug!(
                    "Shape {:?}: {} vertices, {} indices, texture {:?}",
                    shape.name,
                    shape.vertex_buffer.get_number_of_elements(),
                    shape.index_buffer.get_number_of_elements(),
                    shape.texture
                );
                shapes.push(shape);
            }
        }

        Ok(Model { shapes })
    }
}

struct ShapeBuilder<'a> {
    object: &'a obj::Object,
    material: Option<&'a Material>,

    /// Vertex buffer being built, keyed by the OBJ index triple it came from
    vertices: IndexMap<VTNIndex, Vertex>,
    indices: Vec<u32>,
}

impl<'a> ShapeBuilder<'a> {
    fn new(object: &'a obj::Object, material: Option<&'a Material>) -> Self {
        ShapeBuilder {
            object,
            material,
            vertices: IndexMap::new(),
            indices: Vec::new(),
        }
    }

    fn build(mut self, geometry: &obj::Geometry, base_dir: &Path) -> Shape {
        for shape in &geometry.shapes {
            // Triangulation hands the face's last corner first.
            let Primitive::Triangle(c, a, b) = shape.primitive else {
                log::warn!("Skipping non-triangle primitive in {:?}", self.object.name);
                continue;
            };

            let face_normal = self.face_normal(&[a, b, c]);
            let (object, material) = (self.object, self.material);
            for corner in [a, b, c] {
                let entry = self.vertices.entry(corner);
                let index = entry.index();
                entry.or_insert_with(|| make_vertex(object, material, corner, &face_normal));
                self.indices.push(index as u32);
            }
        }

        let name = match (&geometry.material_name, self.object.name.is_empty()) {
            (Some(material), false) => format!("{}/{}", self.object.name, material),
            (Some(material), true) => material.clone(),
            (None, _) => self.object.name.clone(),
        };

        Shape {
            name,
            vertex_buffer: Resource::from_vec(self.vertices.into_values().collect()),
            index_buffer: Resource::from_vec(self.indices),
            texture: self
                .material
                .and_then(|m| m.diffuse_map.as_ref())
                .map(|texture| base_dir.join(texture)),
        }
    }

    /// Flat normal of a face, for corners that don't specify their own.
    fn face_normal(&self, corners: &[VTNIndex; 3]) -> WorldVector {
        let [a, b, c] = corners.map(|corner| position(self.object, corner));
        (b - a)
            .cross(&(c - a))
            .try_normalize(EPSILON)
            .unwrap_or_else(WorldVector::zeros)
    }
}

fn position(object: &obj::Object, corner: VTNIndex) -> WorldPoint {
    let v = &object.vertices[corner.0];
    WorldPoint::new(v.x as f32, v.y as f32, v.z as f32)
}

fn make_vertex(
    object: &obj::Object,
    material: Option<&Material>,
    corner: VTNIndex,
    face_normal: &WorldVector,
) -> Vertex {
    let (_, texture_index, normal_index) = corner;
    let mut vertex = Vertex::default();

    vertex.set_position(&position(object, corner));

    let normal = normal_index.map_or(*face_normal, |i| {
        let n = &object.normals[i];
        WorldVector::new(n.x as f32, n.y as f32, n.z as f32)
    });
    vertex.set_normal(&normal);

    [vertex.u, vertex.v] = texture_index.map_or(DEFAULT_TEXTURE_COORDINATES, |i| {
        let t = &object.tex_vertices[i];
        [t.u as f32, t.v as f32]
    });

    if let Some(material) = material {
        vertex.set_ambient(to_color(&material.color_ambient));
        vertex.set_diffuse(to_color(&material.color_diffuse));
        vertex.set_emissive(material.color_emissive.as_ref().map_or(Color::BLACK, to_color));
    }

    vertex
}

fn to_color(color: &mtl::Color) -> Color {
    Color::new(color.r as f32, color.g as f32, color.b as f32)
}

fn read_to_string(path: &Path) -> Result<String, AssetLoadError> {
    fs::read_to_string(path).map_err(|source| AssetLoadError::Io {
        path: path.to_owned(),
        source,
    })
}

fn parse_obj(content: &str, path: &Path) -> Result<ObjSet, AssetLoadError> {
    obj::parse(content).map_err(|source| AssetLoadError::Obj {
        path: path.to_owned(),
        source,
    })
}

fn parse_mtl(content: &str, path: &Path) -> Result<Vec<Material>, AssetLoadError> {
    mtl::parse(content)
        .map(|set| set.materials)
        .map_err(|source| AssetLoadError::Mtl {
            path: path.to_owned(),
            source,
        })
}
