#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sample record normalization and category color assignment.
//!
//! Raw records from the backend, the browser, and spreadsheet imports are
//! mapped into the canonical [`SampleRecord`](sample_exchange_sample_models::SampleRecord)
//! by [`normalize`], and each record's category label is given a display
//! color by [`color::resolve_color`].

pub mod color;
pub mod normalize;
pub mod parsing;

pub use color::{CategoryColor, known_categories, resolve_color};
pub use normalize::{normalize, normalize_at, normalize_value, normalize_values};
