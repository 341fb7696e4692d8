//! Adapters from each raw input shape into the canonical [`SampleRecord`].
//!
//! Normalization never fails. Optional fields that are missing or
//! unparseable stay `None`; only the identifier, integrity hash, and
//! timestamps are filled in when absent.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sample_exchange_sample_models::{
    BackendRow, ClientRecord, GeoPoint, RawSampleRecord, SampleRecord, SampleStatus,
};
use serde_json::Value;

use crate::parsing::{
    parse_count, parse_date, parse_f64, parse_price, parse_timestamp, value_to_count,
    value_to_f64, value_to_price, value_to_string, value_to_timestamp,
};

/// Spreadsheet header aliases, keyed by canonical field. Headers are compared
/// after [`header_key`] folding, and the first alias present wins.
const IMPORT_ALIASES: &[(&str, &[&str])] = &[
    ("id", &["id", "sample_id"]),
    ("name", &["name", "sample_name", "sample"]),
    ("category", &["category", "sample_type", "type"]),
    ("description", &["description", "notes"]),
    ("location", &["location", "site", "collection_site"]),
    ("latitude", &["latitude", "lat"]),
    ("longitude", &["longitude", "lng", "lon", "long"]),
    (
        "collection_date",
        &["collection_date", "date_collected", "collected", "date"],
    ),
    (
        "storage_condition",
        &["storage_condition", "storage_conditions", "storage"],
    ),
    ("quantity", &["quantity", "available_quantity", "qty"]),
    ("price", &["price", "unit_price", "price_usd"]),
    ("status", &["status"]),
    ("hash", &["hash"]),
    ("created_at", &["created_at"]),
    ("updated_at", &["updated_at"]),
];

/// Field values pulled out of a raw record before defaults are applied.
#[derive(Debug, Default)]
struct Extracted {
    id: Option<String>,
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    location: Option<String>,
    coordinates: Option<GeoPoint>,
    collection_date: Option<NaiveDate>,
    storage_condition: Option<String>,
    quantity: Option<u32>,
    price: Option<f64>,
    status: Option<SampleStatus>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    hash: Option<String>,
}

impl Extracted {
    fn finish(self, now: DateTime<Utc>) -> SampleRecord {
        let id = self.id.unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().to_string();
            log::debug!("Record has no id, assigned {id}");
            id
        });

        let price = match self.price {
            Some(p) if p >= 0.0 => p,
            Some(p) => {
                log::debug!("Record {id} has negative price {p}, using 0");
                0.0
            }
            None => 0.0,
        };

        SampleRecord {
            name: self.name.unwrap_or_default(),
            category: self.category,
            description: self.description,
            location: self.location,
            coordinates: self.coordinates,
            collection_date: self.collection_date,
            storage_condition: self.storage_condition,
            quantity: self.quantity,
            price,
            status: self.status,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
            hash: self.hash.unwrap_or_else(generate_hash),
            id,
        }
    }
}

/// Generates a fresh opaque integrity token.
#[must_use]
pub fn generate_hash() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Normalizes a raw record using the current time for missing timestamps.
#[must_use]
pub fn normalize(raw: RawSampleRecord) -> SampleRecord {
    normalize_at(raw, Utc::now())
}

/// Normalizes a raw record, using `now` for missing timestamps.
#[must_use]
pub fn normalize_at(raw: RawSampleRecord, now: DateTime<Utc>) -> SampleRecord {
    let extracted = match raw {
        RawSampleRecord::Backend(row) => from_backend(&row),
        RawSampleRecord::Client(record) => from_client(&record),
        RawSampleRecord::Import(row) => from_import(&row),
    };
    extracted.finish(now)
}

/// Classifies an untyped JSON value and normalizes it.
#[must_use]
pub fn normalize_value(value: Value) -> SampleRecord {
    normalize(RawSampleRecord::classify(value))
}

/// Normalizes a batch of untyped JSON values, sharing one timestamp.
#[must_use]
pub fn normalize_values(values: Vec<Value>) -> Vec<SampleRecord> {
    let now = Utc::now();
    values
        .into_iter()
        .map(|v| normalize_at(RawSampleRecord::classify(v), now))
        .collect()
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(value_to_string)
}

fn status(value: Option<&Value>) -> Option<SampleStatus> {
    let raw = text(value)?;
    raw.parse().ok().or_else(|| {
        log::debug!("Ignoring unknown sample status '{raw}'");
        None
    })
}

fn date(value: Option<&Value>) -> Option<NaiveDate> {
    text(value).as_deref().and_then(parse_date)
}

fn coordinates(lat: Option<&Value>, lng: Option<&Value>) -> Option<GeoPoint> {
    GeoPoint::new(value_to_f64(lat?)?, value_to_f64(lng?)?)
}

fn nested_coordinates(value: Option<&Value>) -> Option<GeoPoint> {
    let obj = value?.as_object()?;
    coordinates(obj.get("latitude"), obj.get("longitude"))
}

fn quantity(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    let count = value_to_count(value);
    if count.is_none() && !value.is_null() {
        log::debug!("Ignoring invalid quantity {value}");
    }
    count
}

fn from_backend(row: &BackendRow) -> Extracted {
    Extracted {
        id: text(row.id.as_ref()),
        name: text(row.name.as_ref()),
        category: text(row.category.as_ref()),
        description: text(row.description.as_ref()),
        location: text(row.location.as_ref()),
        coordinates: nested_coordinates(row.coordinates.as_ref())
            .or_else(|| coordinates(row.latitude.as_ref(), row.longitude.as_ref())),
        collection_date: date(row.collection_date.as_ref())
            .or_else(|| date(row.date_collected.as_ref())),
        storage_condition: text(row.storage_condition.as_ref()),
        quantity: quantity(row.quantity.as_ref().or(row.available_quantity.as_ref())),
        price: row.price.as_ref().and_then(value_to_price),
        status: status(row.status.as_ref()),
        created_at: row.created_at.as_ref().and_then(value_to_timestamp),
        updated_at: row.updated_at.as_ref().and_then(value_to_timestamp),
        hash: text(row.hash.as_ref()),
    }
}

fn from_client(record: &ClientRecord) -> Extracted {
    Extracted {
        id: text(record.id.as_ref()),
        name: text(record.name.as_ref()),
        category: text(record.category.as_ref()),
        description: text(record.description.as_ref()),
        location: text(record.location.as_ref()),
        coordinates: coordinates(
            record.latitude.as_ref().or(record.lat.as_ref()),
            record.longitude.as_ref().or(record.lng.as_ref()),
        ),
        collection_date: date(record.collection_date.as_ref())
            .or_else(|| date(record.date_collected.as_ref())),
        storage_condition: text(record.storage_condition.as_ref()),
        quantity: quantity(
            record
                .available_quantity
                .as_ref()
                .or(record.quantity.as_ref()),
        ),
        price: record.price.as_ref().and_then(value_to_price),
        status: status(record.status.as_ref()),
        created_at: record.created_at.as_ref().and_then(value_to_timestamp),
        updated_at: record.updated_at.as_ref().and_then(value_to_timestamp),
        hash: text(record.hash.as_ref()),
    }
}

/// Folds a free-text header (`"Collection Date"`, `"unit-price"`) into a
/// lookup key (`collection_date`, `unit_price`).
#[must_use]
pub fn header_key(header: &str) -> String {
    let mut key = String::with_capacity(header.len());
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

fn lookup_alias<'a>(folded: &BTreeMap<String, &'a str>, canonical: &str) -> Option<&'a str> {
    IMPORT_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .and_then(|(_, aliases)| aliases.iter().find_map(|a| folded.get(*a).copied()))
}

fn from_import(row: &BTreeMap<String, String>) -> Extracted {
    let mut folded: BTreeMap<String, &str> = BTreeMap::new();
    for (header, value) in row {
        let value = value.trim();
        if !value.is_empty() {
            folded.entry(header_key(header)).or_insert(value);
        }
    }

    let field = |canonical: &str| lookup_alias(&folded, canonical);

    let coords = field("latitude")
        .and_then(parse_f64)
        .zip(field("longitude").and_then(parse_f64))
        .and_then(|(lat, lng)| GeoPoint::new(lat, lng));

    Extracted {
        id: field("id").map(String::from),
        name: field("name").map(String::from),
        category: field("category").map(String::from),
        description: field("description").map(String::from),
        location: field("location").map(String::from),
        coordinates: coords,
        collection_date: field("collection_date").and_then(parse_date),
        storage_condition: field("storage_condition").map(String::from),
        quantity: field("quantity").and_then(parse_count),
        price: field("price").and_then(parse_price),
        status: field("status").and_then(|s| s.parse().ok()),
        created_at: field("created_at").and_then(parse_timestamp),
        updated_at: field("updated_at").and_then(parse_timestamp),
        hash: field("hash").map(String::from),
    }
}
