//! Known-city catalog.
//!
//! Centers the map synchronously when a city is selected. Starts with the
//! built-in Peruvian cities and learns coordinates for other backend cities
//! as they are looked up.

use crate::model::{CityInfo, Coordinates};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Lowercase lookup key, e.g. `huancayo`.
    pub key: String,
    /// Display name, e.g. `Huancayo`.
    pub name: String,
    pub at: Coordinates,
    pub region: Option<String>,
}

/// City shown when a detected position yields no data.
pub const DEFAULT_CITY: &str = "huancayo";

const BUILTIN: &[(&str, &str, f64, f64, &str)] = &[
    ("huancayo", "Huancayo", -12.0667, -75.2, "Junín"),
    ("lima", "Lima", -12.0464, -77.0428, "Lima"),
    ("arequipa", "Arequipa", -16.4090, -71.5375, "Arequipa"),
    ("cusco", "Cusco", -13.5319, -71.9675, "Cusco"),
    ("trujillo", "Trujillo", -8.1116, -79.0287, "La Libertad"),
    ("chiclayo", "Chiclayo", -6.7714, -79.8371, "Lambayeque"),
    ("piura", "Piura", -5.1945, -80.6328, "Piura"),
    ("iquitos", "Iquitos", -3.7437, -73.2516, "Loreto"),
];

/// Normalize a city name into a lookup key.
pub fn city_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Ordered, case-insensitive city table.
#[derive(Debug, Clone, Default)]
pub struct CityCatalog {
    entries: Vec<CatalogEntry>,
}

impl CityCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in Peruvian cities.
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(key, name, lat, lon, region)| CatalogEntry {
                key: key.to_string(),
                name: name.to_string(),
                at: Coordinates::new(*lat, *lon),
                region: Some(region.to_string()),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Lookup keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        let key = city_key(name);
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn coordinates(&self, name: &str) -> Option<Coordinates> {
        self.get(name).map(|e| e.at)
    }

    /// Record coordinates for a city, replacing any previous entry.
    pub fn learn(&mut self, info: &CityInfo) {
        let key = city_key(&info.name);
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.at = info.at,
            None => self.entries.push(CatalogEntry {
                key,
                name: info.name.clone(),
                at: info.at,
                region: None,
            }),
        }
    }

    /// Names from `names` that have no catalog coordinates yet.
    ///
    /// These need a coordinate lookup before they can be centered
    /// synchronously.
    pub fn unresolved<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .map(String::as_str)
            .filter(|name| self.get(name).is_none())
            .collect()
    }
}
