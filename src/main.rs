#[cfg(not(target_arch = "wasm32"))]
use frame_driver::{
    app::{run_headless, Loaded},
    config::RuntimeConfig,
    window::{self, WindowInitError},
    Lesson,
};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig::parse(std::env::args().skip(1))?;
    if config.list {
        for lesson in Lesson::ALL {
            println!("{:<24} {}", lesson.id(), lesson.description());
        }
    }
    let Some(source) = config.source.as_ref() else {
        return Ok(());
    };

    let loaded = Loaded::from_source(source, &config)?;
    println!("{}", loaded.summary_line());

    if config.headless {
        return run_headless(&config, loaded.setup);
    }
    match window::run(&config, loaded) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!("{err}. Falling back to --headless mode.");
                let loaded = Loaded::from_source(source, &config)?;
                run_headless(&config, loaded.setup)
            } else {
                Err(err)
            }
        }
    }
}
