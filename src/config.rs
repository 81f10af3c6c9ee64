use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::lessons::Lesson;
use crate::viewport::{Viewport, DEFAULT_MAX_PIXEL_RATIO};

pub const USAGE: &str = "Usage: frame-driver <lesson> [--headless] [--frames N] [--fps HZ] [--realtime] \
[--scene FILE] [--seed N] [--width W] [--height H] [--max-pixel-ratio R] | --list";

/// Slowest accepted `--fps`, one frame every ~17 minutes.
pub const MIN_REFRESH_RATE: f64 = 1e-3;

/// What the binary should load.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Lesson(Lesson),
    SceneFile(PathBuf),
}

/// Options collected from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub source: Option<Source>,
    pub list: bool,
    pub headless: bool,
    pub realtime: bool,
    pub frames: u64,
    pub refresh_rate: f64,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub max_pixel_ratio: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: None,
            list: false,
            headless: false,
            realtime: false,
            frames: 60,
            refresh_rate: 60.0,
            seed: 1,
            width: 1280,
            height: 720,
            max_pixel_ratio: DEFAULT_MAX_PIXEL_RATIO,
        }
    }
}

impl RuntimeConfig {
    /// Parses arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Self::default();
        let mut lesson = None;
        let mut scene = None;
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--list" => config.list = true,
                "--headless" => config.headless = true,
                "--realtime" => config.realtime = true,
                "--frames" => config.frames = value(&arg, args.next())?,
                "--fps" => config.refresh_rate = value(&arg, args.next())?,
                "--seed" => config.seed = value(&arg, args.next())?,
                "--width" => config.width = value(&arg, args.next())?,
                "--height" => config.height = value(&arg, args.next())?,
                "--max-pixel-ratio" => config.max_pixel_ratio = value(&arg, args.next())?,
                "--scene" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--scene expects a file path"))?;
                    scene = Some(PathBuf::from(path));
                }
                other if other.starts_with("--") => {
                    bail!("Unknown argument: {other}. {USAGE}");
                }
                other => {
                    if lesson.is_some() {
                        bail!("Unexpected extra argument: {other}. {USAGE}");
                    }
                    lesson = Some(Lesson::from_id(other)?);
                }
            }
        }

        if !(config.refresh_rate.is_finite() && config.refresh_rate >= MIN_REFRESH_RATE) {
            bail!("--fps must be a number of at least {MIN_REFRESH_RATE}");
        }
        if config.width == 0 || config.height == 0 {
            bail!("--width and --height must be non-zero");
        }

        config.source = match (lesson, scene) {
            (Some(_), Some(_)) => bail!("pass either a lesson or --scene, not both"),
            (Some(lesson), None) => Some(Source::Lesson(lesson)),
            (None, Some(path)) => Some(Source::SceneFile(path)),
            (None, None) if config.list => None,
            (None, None) => bail!("{USAGE}"),
        };
        Ok(config)
    }

    /// Initial viewport in logical pixels.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height).with_max_pixel_ratio(self.max_pixel_ratio)
    }
}

fn value<T>(flag: &str, raw: Option<String>) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = raw.ok_or_else(|| anyhow!("{flag} expects a value"))?;
    raw.parse::<T>()
        .with_context(|| format!("invalid value {raw:?} for {flag}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_a_lesson_is_given() {
        let config = RuntimeConfig::parse(["basic-scene"]).unwrap();
        assert_eq!(config.source, Some(Source::Lesson(Lesson::BasicScene)));
        assert_eq!(config.frames, 60);
        assert_eq!(config.refresh_rate, 60.0);
        assert_eq!(config.viewport().aspect(), 1280.0 / 720.0);
        assert!(!config.headless);
    }

    #[test]
    fn flags_with_values_are_parsed() {
        let config = RuntimeConfig::parse([
            "animation-clock",
            "--headless",
            "--frames",
            "120",
            "--fps",
            "30",
            "--seed",
            "9",
            "--width",
            "800",
            "--height",
            "600",
        ])
        .unwrap();
        assert!(config.headless);
        assert_eq!(config.frames, 120);
        assert_eq!(config.refresh_rate, 30.0);
        assert_eq!(config.seed, 9);
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn scene_file_replaces_the_lesson() {
        let config = RuntimeConfig::parse(["--scene", "room.xml", "--headless"]).unwrap();
        assert_eq!(config.source, Some(Source::SceneFile(PathBuf::from("room.xml"))));
        assert!(RuntimeConfig::parse(["basic-scene", "--scene", "room.xml"]).is_err());
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(RuntimeConfig::parse(Vec::<String>::new()).is_err());
        assert!(RuntimeConfig::parse(["basic-scene", "--frames"]).is_err());
        assert!(RuntimeConfig::parse(["basic-scene", "--frames", "many"]).is_err());
        assert!(RuntimeConfig::parse(["basic-scene", "--fps", "0"]).is_err());
        assert!(RuntimeConfig::parse(["basic-scene", "--bogus"]).is_err());
        assert!(RuntimeConfig::parse(["nope"]).is_err());
    }

    #[test]
    fn refresh_rates_below_the_floor_are_rejected() {
        for fps in ["1e-20", "0.0001", "-30", "inf", "NaN"] {
            let err = RuntimeConfig::parse(["basic-scene", "--headless", "--fps", fps]).unwrap_err();
            assert!(err.to_string().contains("--fps"), "{fps}: {err}");
        }
        let config = RuntimeConfig::parse(["basic-scene", "--fps", "0.001"]).unwrap();
        assert_eq!(config.refresh_rate, MIN_REFRESH_RATE);
    }

    #[test]
    fn list_needs_no_lesson() {
        let config = RuntimeConfig::parse(["--list"]).unwrap();
        assert!(config.list);
        assert_eq!(config.source, None);
    }
}
