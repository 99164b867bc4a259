//! `cities`: list the selectable cities.

use co2monitor::app::App;
use co2monitor::model::capitalize;

use crate::error::CliError;

pub async fn run(app: &mut App) -> Result<(), CliError> {
    let cities = app.load_cities().await;
    println!("Ciudades disponibles ({})", cities.len());
    for name in cities {
        println!("  {}", capitalize(name));
    }
    Ok(())
}
