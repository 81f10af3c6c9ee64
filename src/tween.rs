use serde::{Deserialize, Serialize};

use crate::scene::{Scene, Transform};

/// Easing curve applied to tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out, the default curve of most tweening libraries.
    #[default]
    Power1Out,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Power1Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Interpolation from one value to another over a time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    pub delay: f32,
    pub duration: f32,
    pub from: f32,
    pub to: f32,
    #[serde(default)]
    pub ease: Ease,
}

impl Tween {
    /// Value at `elapsed` seconds: `from` before the delay, `to` after the end.
    pub fn value_at(&self, elapsed: f32) -> f32 {
        let local = elapsed - self.delay;
        if local <= 0.0 {
            return self.from;
        }
        if self.duration <= 0.0 || local >= self.duration {
            return self.to;
        }
        let t = self.ease.apply(local / self.duration);
        self.from + (self.to - self.from) * t
    }

    pub fn end(&self) -> f32 {
        self.delay + self.duration.max(0.0)
    }
}

/// Transform component a timeline track animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Property {
    PositionX,
    PositionY,
    PositionZ,
    RotationX,
    RotationY,
    RotationZ,
    ScaleX,
    ScaleY,
    ScaleZ,
}

impl Property {
    fn slot(self, transform: &mut Transform) -> &mut f32 {
        match self {
            Self::PositionX => &mut transform.position.x,
            Self::PositionY => &mut transform.position.y,
            Self::PositionZ => &mut transform.position.z,
            Self::RotationX => &mut transform.rotation.x,
            Self::RotationY => &mut transform.rotation.y,
            Self::RotationZ => &mut transform.rotation.z,
            Self::ScaleX => &mut transform.scale.x,
            Self::ScaleY => &mut transform.scale.y,
            Self::ScaleZ => &mut transform.scale.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrackState {
    Pending,
    Active { from: f32 },
    Done,
}

#[derive(Debug, Clone)]
struct Track {
    object: String,
    property: Property,
    to: f32,
    delay: f32,
    duration: f32,
    ease: Ease,
    state: TrackState,
}

/// Ordered set of "tween to" animations applied to scene objects.
///
/// A track captures the property's current value when it becomes active, so
/// chained tracks on the same property continue from where the previous one
/// ended.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    tracks: Vec<Track>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animates `object.property` to `to` over `duration` seconds after `delay`.
    pub fn to(
        &mut self,
        object: impl Into<String>,
        property: Property,
        to: f32,
        duration: f32,
        delay: f32,
    ) -> &mut Self {
        self.tracks.push(Track {
            object: object.into(),
            property,
            to,
            delay: delay.max(0.0),
            duration: duration.max(0.0),
            ease: Ease::default(),
            state: TrackState::Pending,
        });
        self
    }

    /// Overrides the easing of the most recently added track.
    pub fn ease(&mut self, ease: Ease) -> &mut Self {
        if let Some(track) = self.tracks.last_mut() {
            track.ease = ease;
        }
        self
    }

    /// Writes every active track's value for `elapsed` seconds into `scene`.
    pub fn apply(&mut self, scene: &mut Scene, elapsed: f32) {
        for track in &mut self.tracks {
            if track.state == TrackState::Done || elapsed < track.delay {
                continue;
            }
            let Some(object) = scene.get_mut(&track.object) else {
                continue;
            };
            let slot = track.property.slot(&mut object.transform);
            let from = match track.state {
                TrackState::Active { from } => from,
                _ => *slot,
            };
            let tween = Tween {
                delay: track.delay,
                duration: track.duration,
                from,
                to: track.to,
                ease: track.ease,
            };
            *slot = tween.value_at(elapsed);
            track.state = if elapsed >= tween.end() {
                TrackState::Done
            } else {
                TrackState::Active { from }
            };
        }
    }

    pub fn finished(&self) -> bool {
        self.tracks.iter().all(|track| track.state == TrackState::Done)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::SceneObject;

    #[test]
    fn tween_holds_before_delay_and_clamps_after() {
        let tween = Tween {
            delay: 1.0,
            duration: 1.0,
            from: 0.0,
            to: 2.0,
            ease: Ease::Linear,
        };
        assert_eq!(tween.value_at(0.5), 0.0);
        assert!((tween.value_at(1.5) - 1.0).abs() < 1e-6);
        assert_eq!(tween.value_at(5.0), 2.0);
    }

    #[test]
    fn power1_out_is_ahead_of_linear() {
        assert!(Ease::Power1Out.apply(0.5) > Ease::Linear.apply(0.5));
        assert_eq!(Ease::Power1Out.apply(1.0), 1.0);
        assert_eq!(Ease::Power1Out.apply(-1.0), 0.0);
    }

    #[test]
    fn chained_tracks_continue_from_previous_value() {
        let mut scene = Scene::default();
        scene.add(SceneObject::group("Cube"));
        let mut timeline = Timeline::new();
        timeline
            .to("Cube", Property::PositionX, 2.0, 1.0, 1.0)
            .to("Cube", Property::PositionX, 0.0, 1.0, 2.0)
            .ease(Ease::Linear);

        timeline.apply(&mut scene, 0.5);
        assert_eq!(scene.get("Cube").unwrap().transform.position, Vec3::ZERO);

        timeline.apply(&mut scene, 2.0);
        assert_eq!(scene.get("Cube").unwrap().transform.position.x, 2.0);

        timeline.apply(&mut scene, 2.5);
        assert!((scene.get("Cube").unwrap().transform.position.x - 1.0).abs() < 1e-6);

        timeline.apply(&mut scene, 3.5);
        assert_eq!(scene.get("Cube").unwrap().transform.position.x, 0.0);
        assert!(timeline.finished());
    }

    #[test]
    fn skipped_frames_still_land_on_targets() {
        let mut scene = Scene::default();
        scene.add(SceneObject::group("Cube"));
        let mut timeline = Timeline::new();
        timeline
            .to("Cube", Property::PositionX, 2.0, 1.0, 1.0)
            .to("Cube", Property::PositionX, 0.5, 1.0, 2.0);
        timeline.apply(&mut scene, 10.0);
        assert_eq!(scene.get("Cube").unwrap().transform.position.x, 0.5);
    }
}
