//! `show <city>` and `at --lat --lon`.

use co2monitor::app::App;
use co2monitor::model::{Coordinates, LocationQuery};

use super::common::print_scene;
use crate::error::CliError;

pub async fn run_city(app: &App, city: &str) -> Result<(), CliError> {
    let scene = app.show(LocationQuery::city(city)).await?;
    print_scene(&scene);
    Ok(())
}

pub async fn run_at(app: &App, lat: f64, lon: f64, name: Option<String>) -> Result<(), CliError> {
    let at = Coordinates::new(lat, lon);
    if !at.is_valid() {
        return Err(CliError::Config(format!(
            "coordinates out of range: {} (latitude -90..90, longitude -180..180)",
            at
        )));
    }

    let query = match name {
        Some(name) => LocationQuery::named_coordinates(lat, lon, name),
        None => LocationQuery::coordinates(lat, lon),
    };
    let scene = app.show(query).await?;
    print_scene(&scene);
    Ok(())
}
