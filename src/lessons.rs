//! Tutorial lessons expressed as scenes plus optional per-frame animations.

use std::f32::consts::{PI, TAU};
use std::fmt;

use anyhow::{anyhow, Result};
use glam::Vec3;
use log::info;

use crate::clock::FrameTime;
use crate::driver::FrameCallback;
use crate::geometry::BufferGeometry;
use crate::input::InputState;
use crate::scene::{hex_color, EulerOrder, PerspectiveCamera, Scene, SceneObject};
use crate::tween::{Property, Timeline};
use crate::viewport::Viewport;

const RED: u32 = 0xff0000;

/// State a host owns and hands to every frame callback.
#[derive(Debug)]
pub struct LessonContext {
    pub scene: Scene,
    pub viewport: Viewport,
    pub input: InputState,
}

impl LessonContext {
    pub fn new(mut scene: Scene, viewport: Viewport) -> Self {
        scene.camera.set_aspect(viewport.aspect());
        Self {
            scene,
            viewport,
            input: InputState::new(),
        }
    }

    /// Resizes the viewport and keeps the camera projection in step.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
        self.scene.camera.set_aspect(self.viewport.aspect());
    }
}

/// A built lesson: its context and, for animated lessons, the frame callback.
pub struct LessonSetup {
    pub context: LessonContext,
    pub animation: Option<FrameCallback<LessonContext>>,
}

impl LessonSetup {
    /// Static setup for a scene loaded from disk.
    pub fn from_scene(scene: Scene, viewport: Viewport) -> Self {
        Self {
            context: LessonContext::new(scene, viewport),
            animation: None,
        }
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }
}

impl fmt::Debug for LessonSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonSetup")
            .field("context", &self.context)
            .field("animated", &self.is_animated())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lesson {
    BasicScene,
    TransformObjects,
    AnimationClock,
    AnimationDelta,
    AnimationTween,
    Cameras,
    FullscreenAndResizing,
    Geometries,
    Donuts,
}

impl Lesson {
    pub const ALL: [Lesson; 9] = [
        Lesson::BasicScene,
        Lesson::TransformObjects,
        Lesson::AnimationClock,
        Lesson::AnimationDelta,
        Lesson::AnimationTween,
        Lesson::Cameras,
        Lesson::FullscreenAndResizing,
        Lesson::Geometries,
        Lesson::Donuts,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::BasicScene => "basic-scene",
            Self::TransformObjects => "transform-objects",
            Self::AnimationClock => "animation-clock",
            Self::AnimationDelta => "animation-delta",
            Self::AnimationTween => "animation-tween",
            Self::Cameras => "cameras",
            Self::FullscreenAndResizing => "fullscreen-and-resizing",
            Self::Geometries => "geometries",
            Self::Donuts => "donuts",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BasicScene => "red cube seen from z=3",
            Self::TransformObjects => "position, scale, rotation order and groups",
            Self::AnimationClock => "rotation driven by elapsed time, orbiting camera",
            Self::AnimationDelta => "rotation integrated from frame deltas",
            Self::AnimationTween => "cube moved by a tween timeline",
            Self::Cameras => "camera orbit following the cursor",
            Self::FullscreenAndResizing => "viewport tracks the window, double click for fullscreen",
            Self::Geometries => "subdivided box, custom and random triangles",
            Self::Donuts => "a centred slab among a hundred tori",
        }
    }

    pub fn from_id(id: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|lesson| lesson.id() == id)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|lesson| lesson.id()).collect();
                anyhow!("unknown lesson {id}; expected one of: {}", known.join(", "))
            })
    }

    /// Builds the lesson's scene and animation. `seed` feeds every random
    /// placement so runs are reproducible.
    pub fn setup(self, viewport: Viewport, seed: u64) -> Result<LessonSetup> {
        let scene = match self {
            Self::BasicScene
            | Self::AnimationClock
            | Self::AnimationDelta
            | Self::AnimationTween
            | Self::FullscreenAndResizing => red_cube_scene(1),
            Self::TransformObjects => transform_objects(),
            Self::Cameras => {
                let mut scene = red_cube_scene(5);
                scene.camera.near = 1.0;
                scene.camera.far = 1000.0;
                scene
            }
            Self::Geometries => geometries(seed)?,
            Self::Donuts => donuts(seed),
        };
        info!(
            "lesson {} ready with {} object(s)",
            self.id(),
            scene.objects.len()
        );
        Ok(LessonSetup {
            context: LessonContext::new(scene, viewport),
            animation: self.animation(),
        })
    }

    /// A fresh frame callback for animated lessons. Hosts call this again to
    /// restart an animation on the current scene.
    pub fn animation(self) -> Option<FrameCallback<LessonContext>> {
        match self {
            Self::AnimationClock => Some(clock_animation()),
            Self::AnimationDelta => Some(delta_animation()),
            Self::AnimationTween => Some(tween_animation()),
            Self::Cameras => Some(cursor_orbit()),
            Self::FullscreenAndResizing => Some(track_viewport()),
            Self::BasicScene | Self::TransformObjects | Self::Geometries | Self::Donuts => None,
        }
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

fn base_camera() -> PerspectiveCamera {
    PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0).with_position(Vec3::new(0.0, 0.0, 3.0))
}

fn red_cube_scene(segments: u32) -> Scene {
    let mut scene = Scene::new(base_camera());
    let cube = scene.add_geometry(BufferGeometry::cuboid(1.0, 1.0, 1.0, [segments; 3]));
    scene.add(SceneObject::mesh("Cube", cube, hex_color(RED)));
    scene
}

fn transform_objects() -> Scene {
    let mut scene = Scene::new(base_camera());
    let cube = scene.add_geometry(BufferGeometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1]));

    let mesh = scene.add(SceneObject::mesh("Cube", cube, hex_color(RED)));
    mesh.transform.position = Vec3::new(1.0, -1.0, 1.0).normalize();
    mesh.transform.scale = Vec3::new(2.0, 0.5, 0.6);
    mesh.transform.reorder(EulerOrder::Yxz);
    mesh.transform.rotation = Vec3::new(PI * 0.25, PI * 0.25, 0.0);

    let group = scene.add(SceneObject::group("Group"));
    group.transform.position.y = 1.0;
    for (name, color, x) in [
        ("Cube 1", 0xffff00, 0.0),
        ("Cube 2", 0x00ff00, -1.5),
        ("Cube 3", 0x0000ff, 1.5),
    ] {
        scene.add(
            SceneObject::mesh(name, cube, hex_color(color))
                .with_position(Vec3::new(x, 0.0, 0.0))
                .with_parent("Group"),
        );
    }

    let target = scene
        .get("Group")
        .map(|group| group.transform.position)
        .unwrap_or(Vec3::ZERO);
    scene.camera.look_at(target);
    scene
}

fn geometries(seed: u64) -> Result<Scene> {
    let mut scene = Scene::new(base_camera());
    let color = hex_color(RED);

    let cube = scene.add_geometry(BufferGeometry::cuboid(1.0, 1.0, 1.0, [2, 2, 2]));
    scene.add(SceneObject::mesh("Cube", cube, color).with_wireframe(true));

    let triangle = scene.add_geometry(BufferGeometry::from_triangles(vec![
        0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0,
    ])?);
    scene.add(
        SceneObject::mesh("Triangle", triangle, color)
            .with_position(Vec3::X)
            .with_wireframe(true),
    );

    let mut rng = fastrand::Rng::with_seed(seed);
    let random = scene.add_geometry(BufferGeometry::random_triangles(10, &mut rng));
    scene.add(SceneObject::mesh("Random triangles", random, color).with_wireframe(true));
    Ok(scene)
}

fn donuts(seed: u64) -> Scene {
    let mut camera = base_camera();
    camera.position = Vec3::new(1.0, 1.0, 2.0);
    let mut scene = Scene::new(camera);

    let mut slab = BufferGeometry::cuboid(3.0, 0.5, 0.2, [1, 1, 1]);
    slab.translate(Vec3::new(1.5, 0.25, 0.1));
    slab.center();
    let slab = scene.add_geometry(slab);
    scene.add(SceneObject::mesh("Slab", slab, hex_color(0xe0c8a0)));

    let torus = scene.add_geometry(BufferGeometry::torus(0.3, 0.2, 20, 45));
    let mut rng = fastrand::Rng::with_seed(seed);
    for i in 0..100 {
        let donut = scene.add(SceneObject::mesh(
            format!("Donut {i}"),
            torus,
            hex_color(0xc08060),
        ));
        donut.transform.position = Vec3::new(
            (rng.f32() - 0.5) * 10.0,
            (rng.f32() - 0.5) * 10.0,
            (rng.f32() - 0.5) * 10.0,
        );
        donut.transform.rotation = Vec3::new(rng.f32() * PI, rng.f32() * PI, 0.0);
        donut.transform.scale = Vec3::splat(rng.f32());
    }
    scene
}

fn cube_position(scene: &Scene) -> Vec3 {
    scene
        .get("Cube")
        .map(|cube| cube.transform.position)
        .unwrap_or(Vec3::ZERO)
}

fn clock_animation() -> FrameCallback<LessonContext> {
    Box::new(|ctx: &mut LessonContext, time: FrameTime| {
        let elapsed = time.elapsed as f32;
        ctx.scene
            .update("Cube", |cube| cube.transform.rotation.y = elapsed * PI)
            .ok_or_else(|| anyhow!("scene has no Cube"))?;
        let camera = &mut ctx.scene.camera;
        camera.position.y = elapsed.sin();
        camera.position.x = elapsed.cos();
        let target = cube_position(&ctx.scene);
        ctx.scene.camera.look_at(target);
        Ok(())
    })
}

fn delta_animation() -> FrameCallback<LessonContext> {
    Box::new(|ctx: &mut LessonContext, time: FrameTime| {
        let step = time.delta as f32;
        ctx.scene
            .update("Cube", |cube| {
                cube.transform.rotation.x += step;
                cube.transform.rotation.y += step;
            })
            .ok_or_else(|| anyhow!("scene has no Cube"))
    })
}

fn tween_animation() -> FrameCallback<LessonContext> {
    let mut timeline = Timeline::new();
    timeline
        .to("Cube", Property::PositionX, 2.0, 1.0, 1.0)
        .to("Cube", Property::PositionX, 0.0, 1.0, 2.0);
    Box::new(move |ctx: &mut LessonContext, time: FrameTime| {
        timeline.apply(&mut ctx.scene, time.elapsed as f32);
        Ok(())
    })
}

fn cursor_orbit() -> FrameCallback<LessonContext> {
    Box::new(|ctx: &mut LessonContext, _: FrameTime| {
        let cursor = ctx.input.cursor();
        let camera = &mut ctx.scene.camera;
        camera.position.z = (cursor.x * TAU).cos() * 3.0;
        camera.position.x = (cursor.x * TAU).sin() * 3.0;
        camera.position.y = cursor.y * 5.0;
        let target = cube_position(&ctx.scene);
        ctx.scene.camera.look_at(target);
        Ok(())
    })
}

fn track_viewport() -> FrameCallback<LessonContext> {
    Box::new(|ctx: &mut LessonContext, _: FrameTime| {
        let aspect = ctx.viewport.aspect();
        if (ctx.scene.camera.aspect - aspect).abs() > f32::EPSILON {
            ctx.scene.camera.set_aspect(aspect);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::Vec2;

    use super::*;
    use crate::clock::ManualTime;
    use crate::driver::FrameDriver;
    use crate::scheduler::ManualScheduler;

    fn run(lesson: Lesson, frames: usize, step: Duration) -> LessonContext {
        let setup = lesson.setup(Viewport::new(800, 600), 1).unwrap();
        let mut ctx = setup.context;
        let time = ManualTime::new();
        let mut driver = FrameDriver::new(ManualScheduler::new(), time.clone());
        driver.start(setup.animation.unwrap()).unwrap();
        for _ in 0..frames {
            time.advance(step);
            driver.on_frame(&mut ctx).unwrap();
        }
        ctx
    }

    #[test]
    fn every_id_round_trips() {
        for lesson in Lesson::ALL {
            assert_eq!(Lesson::from_id(lesson.id()).unwrap(), lesson);
        }
        let err = Lesson::from_id("hello").unwrap_err();
        assert!(err.to_string().contains("basic-scene"));
    }

    #[test]
    fn basic_scene_is_static() {
        let setup = Lesson::BasicScene.setup(Viewport::new(800, 600), 1).unwrap();
        assert!(!setup.is_animated());
        let scene = &setup.context.scene;
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.get("Cube").unwrap().color, Vec3::X);
        assert_eq!(scene.camera.position.z, 3.0);
        assert!((scene.camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn group_children_sit_one_unit_up() {
        let setup = Lesson::TransformObjects.setup(Viewport::new(800, 600), 1).unwrap();
        let scene = &setup.context.scene;
        let left = scene.world_position("Cube 2").unwrap();
        assert!((left - Vec3::new(-1.5, 1.0, 0.0)).length() < 1e-6);
        let cube = scene.get("Cube").unwrap();
        assert!((cube.transform.position.length() - 1.0).abs() < 1e-6);
        assert_eq!(cube.transform.order, EulerOrder::Yxz);
        assert!(scene.camera.forward.y > 0.0);
    }

    #[test]
    fn clock_lesson_turns_half_a_turn_per_second() {
        let ctx = run(Lesson::AnimationClock, 60, Duration::from_secs_f64(1.0 / 60.0));
        let cube = ctx.scene.get("Cube").unwrap();
        assert!((cube.transform.rotation.y - PI).abs() < 1e-3);
        assert!((ctx.scene.camera.position.x - 1.0f32.cos()).abs() < 1e-3);
        assert!((ctx.scene.camera.position.y - 1.0f32.sin()).abs() < 1e-3);
    }

    #[test]
    fn delta_lesson_integrates_one_radian_per_second() {
        let ctx = run(Lesson::AnimationDelta, 20, Duration::from_millis(100));
        let rotation = ctx.scene.get("Cube").unwrap().transform.rotation;
        assert!((rotation.x - 2.0).abs() < 1e-4);
        assert!((rotation.y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn tween_lesson_goes_out_and_back() {
        let out = run(Lesson::AnimationTween, 20, Duration::from_millis(100));
        assert!((out.scene.get("Cube").unwrap().transform.position.x - 2.0).abs() < 1e-5);
        let back = run(Lesson::AnimationTween, 40, Duration::from_millis(100));
        assert!(back.scene.get("Cube").unwrap().transform.position.x.abs() < 1e-5);
    }

    #[test]
    fn cursor_moves_the_camera_around_the_cube() {
        let setup = Lesson::Cameras.setup(Viewport::new(800, 600), 1).unwrap();
        let mut ctx = setup.context;
        let viewport = ctx.viewport;
        ctx.input.set_pointer_position(Vec2::new(600.0, 150.0), &viewport);
        let time = ManualTime::new();
        let mut driver = FrameDriver::new(ManualScheduler::new(), time.clone());
        driver.start(setup.animation.unwrap()).unwrap();
        time.advance(Duration::from_millis(16));
        driver.on_frame(&mut ctx).unwrap();
        // cursor (0.25, -0.25): a quarter turn puts the camera on +x
        let position = ctx.scene.camera.position;
        assert!((position - Vec3::new(3.0, -1.25, 0.0)).length() < 1e-5);
        assert!(ctx.scene.camera.forward.x < 0.0);
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let setup = Lesson::FullscreenAndResizing.setup(Viewport::new(800, 600), 1).unwrap();
        let mut ctx = setup.context;
        ctx.resize(1920, 1080);
        assert!((ctx.scene.camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn seeded_lessons_are_reproducible() {
        let a = Lesson::Donuts.setup(Viewport::new(800, 600), 42).unwrap();
        let b = Lesson::Donuts.setup(Viewport::new(800, 600), 42).unwrap();
        assert_eq!(a.context.scene.objects.len(), 101);
        assert_eq!(a.context.scene.objects, b.context.scene.objects);
        assert_eq!(a.context.scene.geometries.len(), 2);

        let slab = a.context.scene.geometry(a.context.scene.objects[0].geometry.unwrap());
        let center = slab.unwrap().bounding_box().unwrap().center();
        assert!(center.length() < 1e-5);

        let geometries = Lesson::Geometries.setup(Viewport::new(800, 600), 3).unwrap();
        let scene = &geometries.context.scene;
        assert!(scene.objects.iter().all(|object| object.wireframe));
        assert_eq!(scene.geometries[2].triangle_count(), 10);
    }
}
