use std::fs;

use anyhow::{Context, Result};
use log::info;

use crate::config::{RuntimeConfig, Source};
use crate::driver::{FrameCallback, FrameDriver};
use crate::error::DriverError;
use crate::lessons::{Lesson, LessonContext, LessonSetup};
use crate::scene::{Scene, SceneObject};

/// A lesson or scene file ready to hand to a host.
pub struct Loaded {
    pub label: String,
    pub lesson: Option<Lesson>,
    pub setup: LessonSetup,
}

impl Loaded {
    /// Builds the selected lesson, or reads and parses the scene file.
    pub fn from_source(source: &Source, config: &RuntimeConfig) -> Result<Self> {
        match source {
            Source::Lesson(lesson) => Ok(Self {
                label: format!("lesson {lesson}"),
                lesson: Some(*lesson),
                setup: lesson.setup(config.viewport(), config.seed)?,
            }),
            Source::SceneFile(path) => {
                let xml = fs::read_to_string(path)
                    .with_context(|| format!("failed to read scene {}", path.display()))?;
                let scene = Scene::from_xml(&xml)
                    .with_context(|| format!("failed to parse scene {}", path.display()))?;
                Ok(Self {
                    label: format!("scene {}", path.display()),
                    lesson: None,
                    setup: LessonSetup::from_scene(scene, config.viewport()),
                })
            }
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Loaded {} with {} objects",
            self.label,
            self.setup.context.scene.objects.len()
        )
    }
}

/// Starts `driver` with the lesson animation. Static scenes get a single
/// frame that stops the driver again, so they are drawn once.
pub fn start_animation(
    driver: &mut FrameDriver<LessonContext>,
    animation: Option<FrameCallback<LessonContext>>,
) -> Result<(), DriverError> {
    match animation {
        Some(animation) => driver.start(animation),
        None => {
            let handle = driver.handle();
            driver.start(move |_: &mut LessonContext, _| {
                handle.stop();
                Ok(())
            })
        }
    }
}

/// Runs without a window at the configured refresh rate and prints the
/// final state of every object.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_headless(config: &RuntimeConfig, setup: LessonSetup) -> Result<()> {
    use crate::clock::ManualTime;
    use crate::host::{HeadlessHost, Pacing};
    use crate::scheduler::ManualScheduler;

    let LessonSetup {
        mut context,
        animation,
    } = setup;
    let summary = if config.realtime {
        let host = HeadlessHost::new(config.refresh_rate, Pacing::RealTime)
            .with_max_frames(config.frames);
        let mut driver = FrameDriver::with_scheduler(ManualScheduler::new());
        start_animation(&mut driver, animation)?;
        host.run(&mut driver, &mut context)?
    } else {
        let time = ManualTime::new();
        let host = HeadlessHost::new(config.refresh_rate, Pacing::Simulated(time.clone()))
            .with_max_frames(config.frames);
        let mut driver = FrameDriver::new(ManualScheduler::new(), time);
        start_animation(&mut driver, animation)?;
        host.run(&mut driver, &mut context)?
    };

    println!(
        "Ran {} frame(s) (elapsed {:.2}s)",
        summary.frames, summary.elapsed
    );
    print_final_state(&context.scene);
    info!("headless run finished");
    Ok(())
}

pub fn print_final_state(scene: &Scene) {
    println!("Final object states:");
    for object in &scene.objects {
        println!("{}", describe_object(object));
    }
}

pub fn describe_object(object: &SceneObject) -> String {
    let transform = &object.transform;
    format!(
        " - {} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
        object.name,
        transform.position.x,
        transform.position.y,
        transform.position.z,
        transform.rotation.x,
        transform.rotation.y,
        transform.rotation.z,
        transform.scale.x,
        transform.scale.y,
        transform.scale.z
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::Vec3;

    use super::*;
    use crate::clock::ManualTime;
    use crate::scheduler::ManualScheduler;
    use crate::viewport::Viewport;

    #[test]
    fn describe_object_prints_transform() {
        let mut object = SceneObject::group("Cube");
        object.transform.position = Vec3::new(1.0, -0.5, 0.0);
        object.transform.rotation.y = std::f32::consts::PI;
        assert_eq!(
            describe_object(&object),
            " - Cube pos=(1.00, -0.50, 0.00) rot=(0.00, 3.14, 0.00) scale=(1.00, 1.00, 1.00)"
        );
    }

    #[test]
    fn static_scenes_tick_once() {
        let setup = Lesson::BasicScene.setup(Viewport::new(800, 600), 1).unwrap();
        let mut context = setup.context;
        let time = ManualTime::new();
        let mut driver = FrameDriver::new(ManualScheduler::new(), time.clone());
        start_animation(&mut driver, setup.animation).unwrap();
        let mut ticks = 0;
        while driver.frame_pending() {
            time.advance(Duration::from_millis(16));
            if driver.on_frame(&mut context).unwrap().ticked() {
                ticks += 1;
            }
        }
        assert_eq!(ticks, 1);
        assert!(!driver.is_running());
    }

    #[test]
    fn missing_scene_file_is_reported() {
        let config = RuntimeConfig::default();
        let source = Source::SceneFile("does/not/exist.xml".into());
        let err = Loaded::from_source(&source, &config).err().unwrap();
        assert!(err.to_string().contains("failed to read scene"));
    }
}
