#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical sample record types and the raw input shapes they are built from.
//!
//! Every data source (backend table rows, browser-submitted JSON, spreadsheet
//! imports) is normalized into a [`SampleRecord`]. The raw shapes are modelled
//! explicitly as [`RawSampleRecord`] variants so that each one gets its own
//! adapter instead of ad hoc field-presence checks.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Listing visibility of a sample in the backend data store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SampleStatus {
    /// Visible to every visitor.
    Public,
    /// Visible only to the owner.
    Private,
    /// No longer available for purchase.
    Sold,
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, returning `None` when either component is outside
    /// the valid WGS84 range or not finite.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// The geographic rectangle currently visible in the map viewport.
///
/// `west > east` means the rectangle crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Northern latitude boundary.
    pub north: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Western longitude boundary.
    pub west: f64,
}

impl Bounds {
    /// Creates a new bounds rectangle from the given edges.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Whether the rectangle wraps across the 180th meridian.
    #[must_use]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }
}

/// Error returned when a `"west,south,east,north"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidBoundsError {
    /// The rejected input.
    pub input: String,
}

impl std::fmt::Display for InvalidBoundsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid bounds '{}': expected west,south,east,north",
            self.input
        )
    }
}

impl std::error::Error for InvalidBoundsError {}

impl FromStr for Bounds {
    type Err = InvalidBoundsError;

    /// Parses `"west,south,east,north"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| InvalidBoundsError {
                input: s.to_string(),
            })?;

        match parts.as_slice() {
            [west, south, east, north]
                if south <= north && parts.iter().all(|v| v.is_finite()) =>
            {
                Ok(Self::new(*west, *south, *east, *north))
            }
            _ => Err(InvalidBoundsError {
                input: s.to_string(),
            }),
        }
    }
}

/// One exchangeable sample after normalization.
///
/// The `id` is assigned by the data source and never changes. `price` and
/// `quantity` are never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text category label (e.g. `"Soil"`, `"Tissue Sample"`).
    pub category: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Free-text location (site, city, region).
    pub location: Option<String>,
    /// Collection site coordinates.
    pub coordinates: Option<GeoPoint>,
    /// Date the sample was collected.
    pub collection_date: Option<NaiveDate>,
    /// Storage condition (e.g. `"-80C"`, `"Room temperature"`).
    pub storage_condition: Option<String>,
    /// Units available. Informational only.
    pub quantity: Option<u32>,
    /// Unit price.
    pub price: f64,
    /// Listing visibility.
    pub status: Option<SampleStatus>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
    /// Opaque integrity token.
    pub hash: String,
}

/// A row as stored in the backend data store (snake_case columns).
///
/// Values are kept loosely typed because rows imported by older batches carry
/// numbers as strings and dates in several formats.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendRow {
    pub id: Option<serde_json::Value>,
    pub name: Option<serde_json::Value>,
    pub category: Option<serde_json::Value>,
    pub description: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
    pub latitude: Option<serde_json::Value>,
    pub longitude: Option<serde_json::Value>,
    /// Nested `{latitude, longitude}` object written by canonical records.
    pub coordinates: Option<serde_json::Value>,
    pub collection_date: Option<serde_json::Value>,
    /// Column name used by the first import batches.
    pub date_collected: Option<serde_json::Value>,
    pub storage_condition: Option<serde_json::Value>,
    pub quantity: Option<serde_json::Value>,
    pub available_quantity: Option<serde_json::Value>,
    pub price: Option<serde_json::Value>,
    pub status: Option<serde_json::Value>,
    pub created_at: Option<serde_json::Value>,
    pub updated_at: Option<serde_json::Value>,
    pub hash: Option<serde_json::Value>,
}

/// A record submitted by the browser (camelCase keys).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: Option<serde_json::Value>,
    pub name: Option<serde_json::Value>,
    pub category: Option<serde_json::Value>,
    pub description: Option<serde_json::Value>,
    pub location: Option<serde_json::Value>,
    pub latitude: Option<serde_json::Value>,
    pub longitude: Option<serde_json::Value>,
    pub lat: Option<serde_json::Value>,
    pub lng: Option<serde_json::Value>,
    pub collection_date: Option<serde_json::Value>,
    pub date_collected: Option<serde_json::Value>,
    pub storage_condition: Option<serde_json::Value>,
    pub quantity: Option<serde_json::Value>,
    pub available_quantity: Option<serde_json::Value>,
    pub price: Option<serde_json::Value>,
    pub status: Option<serde_json::Value>,
    pub created_at: Option<serde_json::Value>,
    pub updated_at: Option<serde_json::Value>,
    pub hash: Option<serde_json::Value>,
}

/// Keys that only appear in camelCase client payloads.
const CLIENT_ONLY_KEYS: &[&str] = &[
    "collectionDate",
    "dateCollected",
    "storageCondition",
    "availableQuantity",
    "createdAt",
    "updatedAt",
    "lat",
    "lng",
];

/// The known input shapes a sample record arrives in.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSampleRecord {
    /// Row read from the backend data store.
    Backend(BackendRow),
    /// JSON submitted by the browser.
    Client(ClientRecord),
    /// Spreadsheet row keyed by the header text of the uploaded file.
    Import(BTreeMap<String, String>),
}

impl RawSampleRecord {
    /// Chooses the input shape for an untyped JSON value.
    ///
    /// Objects carrying any camelCase-only key are treated as
    /// [`RawSampleRecord::Client`]; every other object is a
    /// [`RawSampleRecord::Backend`] row. Non-object values yield an empty
    /// backend row.
    #[must_use]
    pub fn classify(value: serde_json::Value) -> Self {
        let is_client = value
            .as_object()
            .is_some_and(|obj| CLIENT_ONLY_KEYS.iter().any(|k| obj.contains_key(*k)));

        if is_client {
            Self::Client(serde_json::from_value(value).unwrap_or_default())
        } else if value.is_object() {
            Self::Backend(serde_json::from_value(value).unwrap_or_default())
        } else {
            Self::Backend(BackendRow::default())
        }
    }
}

impl From<BTreeMap<String, String>> for RawSampleRecord {
    fn from(row: BTreeMap<String, String>) -> Self {
        Self::Import(row)
    }
}
