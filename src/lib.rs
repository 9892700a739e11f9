//! # Map Query
//!
//! Spatial airport-data query and caching layer for map rendering.
//!
//! This library sits between a SQLite airport dataset and a map painting
//! layer. It provides:
//! - Bounding-box airport queries at three resolution tiers
//! - Bounded per-kind caches for child entities (runways, parking, ...)
//! - A single-slot region snapshot cache that absorbs pan/zoom jitter
//! - Screen-space proximity search for hit-testing objects under the cursor
//!
//! The whole layer is synchronous and single-threaded by design: one
//! [`MapQuery`] instance serves one map view, owns its caches exclusively,
//! and issues blocking store queries. Operations are not reentrant.
//!
//! ## Quick Start
//!
//! ```no_run
//! use map_query::{GeoBox, MapLayer, MapQuery};
//! use rusqlite::Connection;
//!
//! # fn main() -> map_query::Result<()> {
//! let db = Connection::open("airports.sqlite").expect("failed to open dataset");
//! let mut queries = MapQuery::new(&db)?;
//!
//! // Fetch every airport visible in the current viewport.
//! let view = GeoBox::new(-10.0, 40.0, 10.0, 50.0);
//! let airports = queries.get_airports(&view, &MapLayer::All { min_runway_length: 0 });
//! println!("{} airports in view", airports.len());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MapQueryError, Result};

// Bounding-box inflation and antimeridian splitting
pub mod rect;
pub use rect::{inflate, inflation_margin, split_at_antimeridian};

// Bounded LRU cache, one instance per child-entity kind
pub mod entity_cache;
pub use entity_cache::EntityCache;

// Map entities, airport flags and row decoding
pub mod types;
pub use types::{
    Airport, AirportFlags, Apron, Helipad, MapLayer, Parking, Runway, TaxiPath,
};

// Single-slot snapshot cache for the last queried region
pub mod region_cache;
pub use region_cache::{RegionCache, RegionSnapshot};

// Screen-space proximity search for hit-testing
pub mod proximity;
pub use proximity::{manhattan_distance, CoordinateConverter, SearchResult};

// Query orchestration: store access, cache population, nearest lookup
pub mod mapquery;
pub use mapquery::{MapQuery, MapQueryStats};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic position with longitude and latitude in degrees.
///
/// # Example
/// ```
/// use map_query::GeoPoint;
/// let pos = GeoPoint::new(-0.4543, 51.4700); // EGLL
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Create a new position from longitude and latitude.
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Check if the position has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.lon >= -180.0
            && self.lon <= 180.0
            && self.lat >= -90.0
            && self.lat <= 90.0
    }
}

/// A latitude/longitude bounding box in degrees.
///
/// A box with `west > east` crosses the antimeridian: it covers
/// `[west..180]` and `[-180..east]`. North must never be below south;
/// the constructor asserts rather than silently reordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBox {
    /// Create a new bounding box from west, south, east and north edges.
    ///
    /// # Panics
    /// Panics if `north < south`. A caller handing in a vertically inverted
    /// box has violated the coordinate contract.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        assert!(
            north >= south,
            "inverted bounding box: north {north} < south {south}"
        );
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The box covering the whole globe.
    pub fn whole_world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// True if the box wraps across the ±180° meridian.
    pub fn is_crossing(&self) -> bool {
        self.west > self.east
    }

    /// Longitudinal extent in degrees, crossing-aware.
    pub fn width(&self) -> f64 {
        if self.is_crossing() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True if `other` lies entirely within this box, crossing-aware.
    pub fn contains(&self, other: &GeoBox) -> bool {
        if other.south < self.south || other.north > self.north {
            return false;
        }

        if self.is_crossing() {
            if other.is_crossing() {
                other.west >= self.west && other.east <= self.east
            } else {
                // The inner box must fit into one of the two halves.
                other.west >= self.west || other.east <= self.east
            }
        } else {
            !other.is_crossing() && other.west >= self.west && other.east <= self.east
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
