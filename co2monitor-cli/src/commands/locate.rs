//! `locate`: select the device position.
//!
//! The position comes from the `[device]` config section.

use co2monitor::app::{App, AppError};

use super::common::print_scene;
use crate::error::CliError;

pub async fn run(app: &App, auto: bool) -> Result<(), CliError> {
    let result = if auto {
        app.auto_detect().await
    } else {
        app.locate().await.map(Some)
    };

    match result {
        Ok(Some(scene)) => print_scene(&scene),
        Ok(None) => print_scene(&app.snapshot().await?),
        Err(AppError::Location(outcome)) => {
            // The panel carries the guidance for the failure.
            print_scene(&app.snapshot().await?);
            return Err(AppError::Location(outcome).into());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
