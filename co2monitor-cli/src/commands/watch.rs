//! `watch`: follow the external reading until Ctrl-C.

use co2monitor::app::App;
use co2monitor::model::LocationQuery;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::print_scene;
use crate::error::CliError;

pub async fn run(app: &mut App, city: Option<String>) -> Result<(), CliError> {
    let stop = CancellationToken::new();
    let handler_token = stop.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .map_err(|e| CliError::Signal(e.to_string()))?;

    if let Some(city) = city {
        let scene = app.show(LocationQuery::city(city)).await?;
        print_scene(&scene);
    }

    app.start_external();
    println!("Siguiendo la lectura externa. Ctrl-C para salir.");

    stop.cancelled().await;
    info!("Interrupted, stopping");
    app.stop_external().await;
    Ok(())
}
