//! Helpers shared by the commands that talk to the backend.

use co2monitor::app::{App, AppBuilder};
use co2monitor::config::ConfigFile;

use crate::error::CliError;
use crate::render::{describe, ProgressSink};

/// Start the application with the progress printer attached.
pub fn start_app(config: ConfigFile, progress: bool) -> Result<App, CliError> {
    let mut builder = AppBuilder::new(config);
    if progress {
        builder = builder.with_sink(Box::new(ProgressSink::default()));
    }
    Ok(builder.start()?)
}

/// Print a settled scene.
pub fn print_scene(scene: &co2monitor::orchestrator::MapScene) {
    print!("{}", describe(scene));
}
