use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Quat, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::geometry::BufferGeometry;

/// Index of a geometry stored in a [`Scene`]. Geometries are shared between
/// objects, the way one torus buffer backs a hundred donuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryId(pub usize);

/// Order in which euler angles are composed into a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    Xyz,
    Yxz,
    Zxy,
    Xzy,
    Yzx,
    Zyx,
}

impl EulerOrder {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "XYZ" => Self::Xyz,
            "YXZ" => Self::Yxz,
            "ZXY" => Self::Zxy,
            "XZY" => Self::Xzy,
            "YZX" => Self::Yzx,
            "ZYX" => Self::Zyx,
            _ => return None,
        })
    }

    /// Rotation for euler angles (radians). `Xyz` means `Rx * Ry * Rz`.
    pub fn quat(self, angles: Vec3) -> Quat {
        let x = Quat::from_rotation_x(angles.x);
        let y = Quat::from_rotation_y(angles.y);
        let z = Quat::from_rotation_z(angles.z);
        match self {
            Self::Xyz => x * y * z,
            Self::Yxz => y * x * z,
            Self::Zxy => z * x * y,
            Self::Xzy => x * z * y,
            Self::Yzx => y * z * x,
            Self::Zyx => z * y * x,
        }
    }
}

/// Local transform of a scene object. Rotation is in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub order: EulerOrder,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            order: EulerOrder::Xyz,
            scale: default_scale(),
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            self.order.quat(self.rotation),
            self.position,
        )
    }

    /// Changes the composition order without touching the angles.
    pub fn reorder(&mut self, order: EulerOrder) {
        self.order = order;
    }
}

/// Object placed in the scene. Objects without geometry act as groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryId>,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub wireframe: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            geometry: None,
            color: default_color(),
            wireframe: false,
            visible: true,
            transform: Transform::default(),
            parent: None,
        }
    }
}

impl SceneObject {
    pub fn mesh(name: impl Into<String>, geometry: GeometryId, color: Vec3) -> Self {
        Self {
            name: name.into(),
            geometry: Some(geometry),
            color,
            ..Self::default()
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }
}

/// Perspective camera. Keeps its orientation when moved, like a real
/// camera; call [`PerspectiveCamera::look_at`] to re-aim it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(75.0, 1.0, 0.1, 2000.0)
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_degrees,
            aspect: aspect.max(0.01),
            near,
            far,
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Turns the camera toward `target`. Ignored when the target coincides
    /// with the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let direction = target - self.position;
        if direction.length_squared() > f32::EPSILON {
            self.forward = direction.normalize();
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(0.01);
    }

    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.forward.cross(self.up).length_squared() > f32::EPSILON {
            self.up
        } else {
            Vec3::Z
        };
        Mat4::look_to_rh(self.position, self.forward, up)
    }

    /// Projection with wgpu's `[0, 1]` depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Runtime representation of a scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub geometries: Vec<BufferGeometry>,
    pub camera: PerspectiveCamera,
    #[serde(default)]
    pub background: Vec3,
}

impl Scene {
    pub fn new(camera: PerspectiveCamera) -> Self {
        Self {
            camera,
            ..Self::default()
        }
    }

    pub fn add_geometry(&mut self, geometry: BufferGeometry) -> GeometryId {
        self.geometries.push(geometry);
        GeometryId(self.geometries.len() - 1)
    }

    pub fn geometry(&self, id: GeometryId) -> Option<&BufferGeometry> {
        self.geometries.get(id.0)
    }

    pub fn add(&mut self, object: SceneObject) -> &mut SceneObject {
        self.objects.push(object);
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|object| object.name == name)
    }

    /// Applies a mutation to the requested object.
    pub fn update<F, R>(&mut self, name: &str, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneObject) -> R,
    {
        self.get_mut(name).map(updater)
    }

    pub fn set_position(&mut self, name: &str, position: Vec3) -> bool {
        self.update(name, |obj| obj.transform.position = position)
            .is_some()
    }

    pub fn set_rotation(&mut self, name: &str, rotation: Vec3) -> bool {
        self.update(name, |obj| obj.transform.rotation = rotation)
            .is_some()
    }

    pub fn set_scale(&mut self, name: &str, scale: Vec3) -> bool {
        self.update(name, |obj| obj.transform.scale = scale).is_some()
    }

    /// Object-to-world matrix, composing every ancestor group.
    pub fn world_matrix(&self, name: &str) -> Result<Mat4> {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(name);
        let mut depth = 0;
        while let Some(object_name) = current {
            let object = self
                .get(object_name)
                .ok_or_else(|| anyhow!("unknown object {object_name}"))?;
            matrix = object.transform.matrix() * matrix;
            current = object.parent.as_deref();
            depth += 1;
            if depth > self.objects.len() {
                bail!("parent chain of {name} forms a cycle");
            }
        }
        Ok(matrix)
    }

    pub fn world_position(&self, name: &str) -> Result<Vec3> {
        Ok(self.world_matrix(name)?.transform_point3(Vec3::ZERO))
    }

    /// Visible objects with geometry, paired with their world matrices.
    /// Objects hidden through a hidden ancestor are skipped too.
    pub fn drawables(&self) -> Result<Vec<(&SceneObject, Mat4)>> {
        let mut out = Vec::new();
        for object in &self.objects {
            if object.geometry.is_none() || !self.visible_in_world(object) {
                continue;
            }
            out.push((object, self.world_matrix(&object.name)?));
        }
        Ok(out)
    }

    fn visible_in_world(&self, object: &SceneObject) -> bool {
        let mut current = Some(object);
        let mut depth = 0;
        while let Some(obj) = current {
            if !obj.visible {
                return false;
            }
            depth += 1;
            if depth > self.objects.len() {
                return false;
            }
            current = obj.parent.as_deref().and_then(|parent| self.get(parent));
        }
        true
    }

    /// Parses the scene XML format. Every field may be written as an
    /// attribute or as a child element.
    ///
    /// ```xml
    /// <scene background="#111111">
    ///   <geometry id="cube" type="box" size="1 1 1"/>
    ///   <object name="Cube" geometry="cube"><color>#ff0000</color></object>
    ///   <camera><position>0 0 3</position></camera>
    /// </scene>
    /// ```
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        let mut scene = Scene::new(PerspectiveCamera::default().with_position(Vec3::new(0.0, 0.0, 3.0)));
        scene.background = parse_color(optional_text(&root, "background"), Vec3::ZERO)?;

        let mut ids = HashMap::new();
        for node in root.children().filter(|n| n.has_tag_name("geometry")) {
            let id = required_text(&node, "id")?;
            let geometry = parse_geometry(&node).with_context(|| format!("geometry {id}"))?;
            ids.insert(id, scene.add_geometry(geometry));
        }

        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let mut object = SceneObject {
                name: required_text(&node, "name")?,
                ..SceneObject::default()
            };
            if let Some(geometry) = optional_text(&node, "geometry") {
                object.geometry = Some(
                    *ids.get(&geometry)
                        .ok_or_else(|| anyhow!("object {} uses unknown geometry {geometry}", object.name))?,
                );
            }
            object.color = parse_color(optional_text(&node, "color"), object.color)?;
            object.transform.position =
                parse_vec3(optional_text(&node, "position"), object.transform.position)?;
            let degrees = parse_vec3(optional_text(&node, "rotation"), Vec3::ZERO)?;
            object.transform.rotation = Vec3::new(
                degrees.x.to_radians(),
                degrees.y.to_radians(),
                degrees.z.to_radians(),
            );
            if let Some(order) = optional_text(&node, "order") {
                object.transform.order = EulerOrder::from_name(&order)
                    .ok_or_else(|| anyhow!("unknown rotation order {order}"))?;
            }
            object.transform.scale = parse_vec3(optional_text(&node, "scale"), object.transform.scale)?;
            object.wireframe = parse_bool(optional_text(&node, "wireframe"), false)?;
            object.visible = parse_bool(optional_text(&node, "visible"), true)?;
            object.parent = optional_text(&node, "parent");
            scene.objects.push(object);
        }

        for object in &scene.objects {
            if let Some(parent) = &object.parent {
                if scene.get(parent).is_none() {
                    bail!("object {} has unknown parent {parent}", object.name);
                }
            }
        }

        if let Some(node) = root.children().find(|n| n.has_tag_name("camera")) {
            let camera = &mut scene.camera;
            camera.fov_degrees = parse_f32(optional_text(&node, "fov"), camera.fov_degrees)?;
            camera.near = parse_f32(optional_text(&node, "near"), camera.near)?;
            camera.far = parse_f32(optional_text(&node, "far"), camera.far)?;
            camera.position = parse_vec3(optional_text(&node, "position"), camera.position)?;
            if let Some(target) = optional_text(&node, "target") {
                let target = parse_vec3(Some(target), Vec3::ZERO)?;
                camera.look_at(target);
            }
        }

        Ok(scene)
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_visible() -> bool {
    true
}

fn parse_geometry(node: &Node<'_, '_>) -> Result<BufferGeometry> {
    let kind = required_text(node, "type")?;
    match kind.as_str() {
        "box" => {
            let size = parse_vec3(optional_text(node, "size"), Vec3::ONE)?;
            let segments = parse_numbers::<u32>(optional_text(node, "segments"))?;
            let segments = match segments.as_slice() {
                [] => [1, 1, 1],
                [s] => [*s, *s, *s],
                [w, h, d] => [*w, *h, *d],
                _ => bail!("box segments take one or three values"),
            };
            Ok(BufferGeometry::cuboid(size.x, size.y, size.z, segments))
        }
        "torus" => {
            let radius = parse_f32(optional_text(node, "radius"), 1.0)?;
            let tube = parse_f32(optional_text(node, "tube"), 0.4)?;
            let segments = parse_numbers::<u32>(optional_text(node, "segments"))?;
            let (radial, tubular) = match segments.as_slice() {
                [] => (12, 48),
                [radial, tubular] => (*radial, *tubular),
                _ => bail!("torus segments take two values"),
            };
            Ok(BufferGeometry::torus(radius, tube, radial, tubular))
        }
        "triangles" => {
            let positions = parse_numbers::<f32>(optional_text(node, "positions"))?;
            Ok(BufferGeometry::from_triangles(positions)?)
        }
        other => Err(anyhow!("unknown geometry type {other}")),
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("{tag} attribute or <{tag}> tag is missing"))
}

/// A field given either as an attribute or as a child element; the
/// attribute wins when both are present.
fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.attribute(tag)
        .or_else(|| {
            node.children()
                .find(|child| child.has_tag_name(tag))
                .and_then(|child| child.text())
        })
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_numbers<T: std::str::FromStr>(value: Option<String>) -> Result<Vec<T>>
where
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<T>()
                .map_err(|err| anyhow!("invalid number {component:?}: {err}"))
        })
        .collect()
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    if value.is_none() {
        return Ok(default);
    }
    match parse_numbers::<f32>(value)?.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(anyhow!("vector needs exactly three components")),
    }
}

/// Accepts `#rrggbb` or three 0-255 components.
fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    if let Some(hex) = value.strip_prefix('#') {
        let rgb = u32::from_str_radix(hex, 16)
            .ok()
            .filter(|_| hex.len() == 6)
            .ok_or_else(|| anyhow!("invalid hex color {value}"))?;
        return Ok(hex_color(rgb));
    }
    let rgb = parse_vec3(Some(value), default)?;
    Ok(rgb / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        None => Ok(default),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(anyhow!("expected true or false, got {other}")),
    }
}

/// Converts a `0xrrggbb` color to 0..1 components.
pub fn hex_color(rgb: u32) -> Vec3 {
    Vec3::new(
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_4;

    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <geometry>
            <id>cube</id>
            <type>box</type>
            <size>1 1 1</size>
            <segments>2</segments>
        </geometry>
        <object>
            <name>Group</name>
            <position>0 1 0</position>
        </object>
        <object>
            <name>Cube</name>
            <geometry>cube</geometry>
            <color>#00ff00</color>
            <position>-1.5 0 0</position>
            <rotation>45 0 0</rotation>
            <order>YXZ</order>
            <parent>Group</parent>
        </object>
        <camera>
            <fov>60</fov>
            <position>0 0 5</position>
            <target>0 0 0</target>
        </camera>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_objects_and_camera() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.geometries.len(), 1);
        let cube = scene.get("Cube").unwrap();
        assert_eq!(cube.color, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(cube.transform.order, EulerOrder::Yxz);
        assert!((cube.transform.rotation.x - FRAC_PI_4).abs() < 1e-6);
        assert_eq!(scene.camera.fov_degrees, 60.0);
        assert_eq!(scene.camera.forward, Vec3::NEG_Z);
    }

    #[test]
    fn children_inherit_group_transform() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let position = scene.world_position("Cube").unwrap();
        assert!((position - Vec3::new(-1.5, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn attributes_and_child_elements_are_interchangeable() {
        let xml = r##"<scene background="#000000">
            <geometry id="cube" type="box" size="2 2 2"/>
            <geometry type="torus"><id>ring</id><radius>0.3</radius></geometry>
            <object name="Cube" geometry="cube" position="1 0 0" wireframe="true"/>
            <object name="Ring"><geometry>ring</geometry><color>#ff0000</color></object>
            <camera fov="50" position="0 0 4"/>
        </scene>"##;
        let scene = Scene::from_xml(xml).unwrap();
        assert_eq!(scene.geometries.len(), 2);
        let cube = scene.get("Cube").unwrap();
        assert!(cube.geometry.is_some());
        assert!(cube.wireframe);
        assert_eq!(cube.transform.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.get("Ring").unwrap().color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.camera.fov_degrees, 50.0);
        assert_eq!(scene.camera.position, Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><geometry>none</geometry></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn unknown_geometry_is_an_error() {
        let bad = "<scene><object><name>A</name><geometry>none</geometry></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }

    #[test]
    fn partial_triangles_are_rejected() {
        let bad = "<scene><geometry><id>t</id><type>triangles</type><positions>0 0 0 1 1 1</positions></geometry></scene>";
        let err = Scene::from_xml(bad).unwrap_err();
        assert!(format!("{err:#}").contains("multiple of 9"));
    }

    #[test]
    fn parent_cycles_are_detected() {
        let mut scene = Scene::default();
        scene.add(SceneObject::group("A").with_parent("B"));
        scene.add(SceneObject::group("B").with_parent("A"));
        assert!(scene.world_matrix("A").is_err());
    }

    #[test]
    fn rotation_order_changes_the_result() {
        let angles = Vec3::new(FRAC_PI_4, FRAC_PI_4, 0.0);
        let xyz = EulerOrder::Xyz.quat(angles) * Vec3::Z;
        let yxz = EulerOrder::Yxz.quat(angles) * Vec3::Z;
        assert!((xyz - yxz).length() > 1e-3);
    }

    #[test]
    fn update_and_setters_report_missing_objects() {
        let mut scene = Scene::default();
        scene.add(SceneObject::group("Group"));
        assert!(scene.set_position("Group", Vec3::Y));
        assert_eq!(scene.get("Group").unwrap().transform.position, Vec3::Y);
        assert!(!scene.set_scale("Unknown", Vec3::ONE));
    }

    #[test]
    fn camera_keeps_orientation_until_reaimed() {
        let mut camera = PerspectiveCamera::default().with_position(Vec3::new(0.0, 0.0, 3.0));
        camera.position.x = 1.0;
        assert_eq!(camera.forward, Vec3::NEG_Z);
        camera.look_at(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(camera.forward, Vec3::NEG_Z);
        camera.look_at(Vec3::new(1.0, 3.0, 3.0));
        assert_eq!(camera.forward, Vec3::Y);
    }

    #[test]
    fn hidden_groups_hide_children() {
        let mut scene = Scene::default();
        let cube = scene.add_geometry(BufferGeometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1]));
        scene.add(SceneObject::group("Group")).visible = false;
        scene.add(SceneObject::mesh("Cube", cube, Vec3::ONE).with_parent("Group"));
        assert!(scene.drawables().unwrap().is_empty());
    }
}
