//! Viewport rectangle math.
//!
//! Converts a map camera (center, zoom, pixel size) into the visible
//! [`Bounds`] using the Web Mercator projection with 256 px tiles, and tests
//! sample coordinates against those bounds.

use std::f64::consts::PI;

use geo::{Intersects, Point, Rect, coord};
use sample_exchange_sample_models::{Bounds, GeoPoint, SampleRecord};
use serde::{Deserialize, Serialize};

/// Tile edge length in pixels at zoom 0.
const TILE_SIZE: f64 = 256.0;

/// A map camera position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    /// Viewport center.
    pub center: GeoPoint,
    /// Fractional zoom level.
    pub zoom: f64,
    /// Viewport width in CSS pixels.
    pub width_px: u32,
    /// Viewport height in CSS pixels.
    pub height_px: u32,
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.max(0.0).exp2()
}

fn lng_to_x(lng: f64, world: f64) -> f64 {
    (lng + 180.0) / 360.0 * world
}

fn lat_to_y(lat: f64, world: f64) -> f64 {
    let rad = lat.to_radians();
    (1.0 - rad.tan().asinh() / PI) / 2.0 * world
}

fn x_to_lng(x: f64, world: f64) -> f64 {
    x / world * 360.0 - 180.0
}

fn y_to_lat(y: f64, world: f64) -> f64 {
    let y = y.clamp(0.0, world);
    (PI * (1.0 - 2.0 * y / world)).sinh().atan().to_degrees()
}

/// Wraps a longitude into `[-180, 180]`.
fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Computes the rectangle visible from `camera`.
///
/// When the viewport is wider than the whole world the longitude span is
/// `[-180, 180]`; otherwise edges are wrapped, so a viewport straddling the
/// antimeridian yields `west > east`.
#[must_use]
pub fn bounds_for_camera(camera: &Camera) -> Bounds {
    let world = world_size(camera.zoom);
    let width = f64::from(camera.width_px);
    let height = f64::from(camera.height_px);

    let cx = lng_to_x(camera.center.longitude, world);
    let cy = lat_to_y(camera.center.latitude, world);

    let north = y_to_lat(cy - height / 2.0, world);
    let south = y_to_lat(cy + height / 2.0, world);

    let (west, east) = if width >= world {
        (-180.0, 180.0)
    } else {
        (
            wrap_lng(x_to_lng(cx - width / 2.0, world)),
            wrap_lng(x_to_lng(cx + width / 2.0, world)),
        )
    };

    Bounds::new(west, south, east, north)
}

/// The bounds as one or two non-wrapping rectangles.
fn rects(bounds: &Bounds) -> Vec<Rect<f64>> {
    if bounds.crosses_antimeridian() {
        vec![
            Rect::new(
                coord! { x: bounds.west, y: bounds.south },
                coord! { x: 180.0, y: bounds.north },
            ),
            Rect::new(
                coord! { x: -180.0, y: bounds.south },
                coord! { x: bounds.east, y: bounds.north },
            ),
        ]
    } else {
        vec![Rect::new(
            coord! { x: bounds.west, y: bounds.south },
            coord! { x: bounds.east, y: bounds.north },
        )]
    }
}

/// Whether `point` lies inside `bounds`, edges included.
#[must_use]
pub fn contains(bounds: &Bounds, point: GeoPoint) -> bool {
    let p = Point::new(point.longitude, point.latitude);
    rects(bounds).iter().any(|r| r.intersects(&p))
}

/// Samples whose coordinates lie inside `bounds`. Samples without
/// coordinates are never included.
#[must_use]
pub fn filter_in_bounds<'a>(bounds: &Bounds, samples: &'a [SampleRecord]) -> Vec<&'a SampleRecord> {
    let rects = rects(bounds);
    samples
        .iter()
        .filter(|s| {
            s.coordinates.is_some_and(|c| {
                let p = Point::new(c.longitude, c.latitude);
                rects.iter().any(|r| r.intersects(&p))
            })
        })
        .collect()
}

/// Owned variant of [`filter_in_bounds`].
#[must_use]
pub fn retain_in_bounds(bounds: &Bounds, mut samples: Vec<SampleRecord>) -> Vec<SampleRecord> {
    samples.retain(|s| s.coordinates.is_some_and(|c| contains(bounds, c)));
    samples
}
