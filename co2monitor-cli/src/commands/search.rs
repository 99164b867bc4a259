//! `search`: suggestions for a query, or select the best match.

use co2monitor::app::App;
use co2monitor::orchestrator::SuggestionKind;

use super::common::print_scene;
use crate::error::CliError;

pub async fn run(app: &mut App, query: &str, limit: usize, select: bool) -> Result<(), CliError> {
    app.load_cities().await;

    if select {
        let scene = app.search(query).await?;
        print_scene(&scene);
        return Ok(());
    }

    let suggestions = app.suggest(query, limit).await;
    if suggestions.is_empty() {
        println!("Sin resultados para '{}'", query);
        return Ok(());
    }

    for s in suggestions {
        match (s.kind, s.at) {
            (SuggestionKind::Global, Some(at)) => println!("  {}  ({})", s.display_name, at),
            _ => println!("  {}", s.display_name),
        }
    }
    Ok(())
}
