//! Address suggestions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use suggest_engine::SuggestionKind;

use crate::{insert_opt, ADDRESS_URL};

/// Granularity bound for address search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressBound {
    Country,
    Region,
    Area,
    City,
    Settlement,
    Street,
    House,
}

/// Language of returned suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
}

/// Address kind with its request filters.
#[derive(Debug, Clone, Default)]
pub struct AddressKind {
    pub language: Option<Language>,
    /// Lower search bound. Ignored unless `to_bound` is also set.
    pub from_bound: Option<AddressBound>,
    /// Upper search bound. Ignored unless `from_bound` is also set.
    pub to_bound: Option<AddressBound>,
    /// Narrow the search area, e.g. `{"region": "Москва"}`.
    pub locations: Option<Vec<Value>>,
    /// Prefer these locations when ranking.
    pub locations_boost: Option<Vec<Value>>,
    /// Omit the restricting location from returned values.
    pub restrict_value: bool,
}

impl AddressKind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict results to the `from..=to` granularity.
    pub fn bounds(mut self, from: AddressBound, to: AddressBound) -> Self {
        self.from_bound = Some(from);
        self.to_bound = Some(to);
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }
}

impl SuggestionKind for AddressKind {
    type Data = Address;

    fn default_endpoint(&self) -> &str {
        ADDRESS_URL
    }

    fn payload(&self, query: &str, count: usize) -> Value {
        let mut payload = json!({ "query": query, "count": count });

        if let (Some(from), Some(to)) = (&self.from_bound, &self.to_bound) {
            payload["from_bound"] = json!({ "value": from });
            payload["to_bound"] = json!({ "value": to });
        }
        insert_opt(&mut payload, "language", self.language.as_ref());
        insert_opt(&mut payload, "locations", self.locations.as_ref());
        insert_opt(&mut payload, "locations_boost", self.locations_boost.as_ref());
        if self.restrict_value {
            payload["restrict_value"] = json!(true);
        }

        payload
    }
}

/// Address payload of a suggestion.
///
/// The service returns several dozen fields; the commonly used ones are typed
/// and the rest are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub country_iso_code: Option<String>,
    pub region_with_type: Option<String>,
    pub city_with_type: Option<String>,
    pub settlement_with_type: Option<String>,
    pub street_with_type: Option<String>,
    pub house: Option<String>,
    pub flat: Option<String>,
    pub fias_id: Option<String>,
    pub fias_level: Option<String>,
    pub kladr_id: Option<String>,
    pub geo_lat: Option<String>,
    pub geo_lon: Option<String>,
    pub timezone: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Address {
    /// Latitude and longitude, when the service geocoded the address.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.geo_lat.as_deref()?.parse().ok()?;
        let lon = self.geo_lon.as_deref()?.parse().ok()?;
        Some((lat, lon))
    }
}
