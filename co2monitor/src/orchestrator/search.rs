//! Search box semantics: suggestions and "perform search".
//!
//! Local catalog names always come first. Global hits are appended after,
//! skipping any whose name already matches a local city.

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{DataFetchError, HttpClient, MonitorApi};
use crate::catalog::city_key;
use crate::model::{capitalize, Coordinates, LocationQuery, PlaceMatch};

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Local,
    Global,
}

/// One entry of the suggestion list.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: String,
    pub display_name: String,
    pub kind: SuggestionKind,
    /// Known for global hits only; local cities resolve through the catalog.
    pub at: Option<Coordinates>,
}

impl Suggestion {
    /// The selection this suggestion stands for.
    pub fn to_query(&self) -> LocationQuery {
        match (self.kind, self.at) {
            (SuggestionKind::Global, Some(at)) => {
                LocationQuery::named_coordinates(at.lat, at.lon, self.name.clone())
            }
            _ => LocationQuery::city(self.name.clone()),
        }
    }
}

/// Errors from [`resolve`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("Escribe el nombre de una ciudad")]
    EmptyQuery,

    #[error("Ciudad no encontrada. Intenta con otra ciudad.")]
    NotFound(String),

    #[error("Error al buscar la ciudad. Intenta nuevamente.")]
    Fetch(#[source] DataFetchError),
}

/// Merge local names matching `query` with global hits.
///
/// Local matching is a case-insensitive substring test. A blank query
/// yields nothing.
pub fn merge_suggestions(
    local_names: &[String],
    query: &str,
    global: Vec<PlaceMatch>,
) -> Vec<Suggestion> {
    let needle = city_key(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<Suggestion> = local_names
        .iter()
        .filter(|name| city_key(name).contains(&needle))
        .map(|name| Suggestion {
            name: name.clone(),
            display_name: capitalize(name),
            kind: SuggestionKind::Local,
            at: None,
        })
        .collect();

    for hit in global {
        let key = city_key(&hit.name);
        let duplicate = local_names.iter().any(|name| city_key(name) == key);
        if duplicate || out.iter().any(|s| city_key(&s.name) == key) {
            continue;
        }
        out.push(Suggestion {
            name: hit.name,
            display_name: hit.display_name,
            kind: SuggestionKind::Global,
            at: Some(hit.at),
        });
    }

    out
}

/// Build the suggestion list for `query`.
///
/// A failed global search degrades to local suggestions only.
pub async fn suggest<C: HttpClient>(
    api: &MonitorApi<C>,
    local_names: &[String],
    query: &str,
    limit: usize,
) -> Vec<Suggestion> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    let global = match api.search_cities(query, limit).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!(query = query, kind = e.kind(), error = %e, "Global search failed, local suggestions only");
            Vec::new()
        }
    };

    merge_suggestions(local_names, query, global)
}

/// Resolve the search box text into a selection.
///
/// An exact local name wins. Otherwise the first global hit is selected
/// as raw coordinates carrying the hit's name.
pub async fn resolve<C: HttpClient>(
    api: &MonitorApi<C>,
    local_names: &[String],
    query: &str,
) -> Result<LocationQuery, SearchError> {
    let key = city_key(query);
    if key.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    if let Some(name) = local_names.iter().find(|name| city_key(name) == key) {
        debug!(query = query, city = %name, "Search matched local city");
        return Ok(LocationQuery::city(city_key(name)));
    }

    let hits = api
        .search_cities(query, 1)
        .await
        .map_err(SearchError::Fetch)?;

    match hits.into_iter().next() {
        Some(hit) => {
            debug!(query = query, name = %hit.name, lat = hit.at.lat, lon = hit.at.lon, "Search matched global place");
            Ok(LocationQuery::named_coordinates(hit.at.lat, hit.at.lon, hit.name))
        }
        None => Err(SearchError::NotFound(query.trim().to_string())),
    }
}
