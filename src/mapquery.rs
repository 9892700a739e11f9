//! # Map Query
//!
//! Query orchestration over the airport dataset: decides cache hit/miss,
//! issues store queries through inflated and antimeridian-split boxes,
//! populates the region and child-entity caches, and answers proximity
//! lookups over whatever is currently cached.
//!
//! One instance serves one map view. All prepared statements are created
//! in [`MapQuery::new`] and released together when the instance drops;
//! between those points the statements are only bound and executed, never
//! re-prepared. None of the operations are reentrant: a store query must
//! not trigger another query on the same instance.

use log::{debug, warn};
use rusqlite::{named_params, Connection, Statement};

use crate::entity_cache::EntityCache;
use crate::error::{MapQueryError, Result};
use crate::proximity::{CoordinateConverter, SearchResult, SearchResultBuilder};
use crate::rect::{inflate, inflation_margin, split_at_antimeridian};
use crate::region_cache::RegionCache;
use crate::types::{
    sort_runways_by_draw_order, Airport, Apron, Helipad, MapLayer, Parking, Runway, TaxiPath,
};
use crate::GeoBox;

// Per-kind cache bounds. Each child kind is evicted independently.
pub const RUNWAY_CACHE_CAPACITY: usize = 100;
pub const RUNWAY_OVERVIEW_CACHE_CAPACITY: usize = 100;
pub const APRON_CACHE_CAPACITY: usize = 100;
pub const PARKING_CACHE_CAPACITY: usize = 100;
pub const HELIPAD_CACHE_CAPACITY: usize = 100;
pub const TAXI_PATH_CACHE_CAPACITY: usize = 100;

// ============================================================================
// Prepared query texts
// ============================================================================
//
// The column names below are the schema contract this layer depends on but
// does not own. The three airport variants select additively fewer columns
// as the tiers widen; decoding tolerates the missing ones.

const AIRPORT_QUERY: &str = "SELECT airport_id, ident, name, rating, \
     has_avgas, has_jetfuel, has_tower_object, \
     tower_frequency, atis_frequency, awos_frequency, asos_frequency, unicom_frequency, \
     is_closed, is_military, is_addon, \
     num_approach, num_runway_hard, num_runway_soft, num_runway_water, num_runway_light, \
     num_helipad, longest_runway_length, longest_runway_heading, mag_var, \
     tower_lonx, tower_laty, altitude, lonx, laty, left_lonx, top_laty, right_lonx, bottom_laty \
     FROM airport \
     WHERE lonx BETWEEN :leftx AND :rightx AND laty BETWEEN :bottomy AND :topy \
     AND longest_runway_length >= :minlength \
     ORDER BY rating ASC, longest_runway_length";

const AIRPORT_MEDIUM_QUERY: &str = "SELECT airport_id, ident, name, rating, \
     has_avgas, has_jetfuel, tower_frequency, is_closed, is_military, is_addon, \
     num_runway_hard, num_runway_soft, num_runway_water, num_helipad, \
     longest_runway_length, longest_runway_heading, mag_var, \
     lonx, laty, left_lonx, top_laty, right_lonx, bottom_laty \
     FROM airport_medium \
     WHERE lonx BETWEEN :leftx AND :rightx AND laty BETWEEN :bottomy AND :topy \
     ORDER BY longest_runway_length";

const AIRPORT_LARGE_QUERY: &str = "SELECT airport_id, ident, name, rating, \
     has_avgas, has_jetfuel, tower_frequency, is_closed, is_military, is_addon, \
     num_runway_hard, num_runway_soft, num_runway_water, \
     longest_runway_length, longest_runway_heading, mag_var, \
     lonx, laty, left_lonx, top_laty, right_lonx, bottom_laty \
     FROM airport_large \
     WHERE lonx BETWEEN :leftx AND :rightx AND laty BETWEEN :bottomy AND :topy";

const RUNWAY_QUERY: &str = "SELECT length, heading, width, surface, lonx, laty, \
     p.name AS primary_name, s.name AS secondary_name, edge_light, \
     p.offset_threshold AS primary_offset_threshold, \
     p.has_closed_markings AS primary_closed_markings, \
     s.offset_threshold AS secondary_offset_threshold, \
     s.has_closed_markings AS secondary_closed_markings, \
     primary_lonx, primary_laty, secondary_lonx, secondary_laty \
     FROM runway \
     JOIN runway_end p ON primary_end_id = p.runway_end_id \
     JOIN runway_end s ON secondary_end_id = s.runway_end_id \
     WHERE airport_id = :airport_id";

// Only runways long enough to matter at overview zoom.
const RUNWAY_OVERVIEW_QUERY: &str = "SELECT length, heading, lonx, laty, \
     primary_lonx, primary_laty, secondary_lonx, secondary_laty \
     FROM runway WHERE airport_id = :airport_id AND length > 4000";

const APRON_QUERY: &str =
    "SELECT surface, is_draw_surface, vertices FROM apron WHERE airport_id = :airport_id";

const PARKING_QUERY: &str = "SELECT type, name, number, radius, heading, has_jetway, lonx, laty \
     FROM parking WHERE airport_id = :airport_id";

const HELIPAD_QUERY: &str = "SELECT surface, type, length, width, heading, is_closed, lonx, laty \
     FROM helipad WHERE airport_id = :airport_id";

const TAXI_PATH_QUERY: &str = "SELECT type, surface, width, name, is_draw_surface, \
     start_type, end_type, start_lonx, start_laty, end_lonx, end_laty \
     FROM taxi_path WHERE airport_id = :airport_id";

// ============================================================================
// Stats
// ============================================================================

/// Cache-effectiveness and store-usage counters.
///
/// `degraded` counts requests that surfaced an empty result because the
/// store failed; the map keeps drawing, the operator can still see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapQueryStats {
    pub region_hits: u64,
    pub region_misses: u64,
    pub runway_hits: u64,
    pub runway_misses: u64,
    pub runway_overview_hits: u64,
    pub runway_overview_misses: u64,
    pub apron_hits: u64,
    pub apron_misses: u64,
    pub parking_hits: u64,
    pub parking_misses: u64,
    pub helipad_hits: u64,
    pub helipad_misses: u64,
    pub taxi_path_hits: u64,
    pub taxi_path_misses: u64,
    /// Number of statement executions against the store.
    pub store_queries: u64,
    /// Requests degraded to an empty result by a store failure.
    pub degraded: u64,
}

// ============================================================================
// Map Query
// ============================================================================

/// Spatial query cache over one airport dataset connection.
///
/// Owns the region snapshot cache, one bounded cache per child-entity
/// kind, and all prepared statements. Single-threaded: the caches are not
/// shared, and a second map view gets its own instance.
pub struct MapQuery<'db> {
    airport_query: Statement<'db>,
    airport_medium_query: Statement<'db>,
    airport_large_query: Statement<'db>,
    runway_query: Statement<'db>,
    runway_overview_query: Statement<'db>,
    apron_query: Statement<'db>,
    parking_query: Statement<'db>,
    helipad_query: Statement<'db>,
    taxi_path_query: Statement<'db>,

    region_cache: RegionCache,
    runway_cache: EntityCache<i64, Vec<Runway>>,
    runway_overview_cache: EntityCache<i64, Vec<Runway>>,
    apron_cache: EntityCache<i64, Vec<Apron>>,
    parking_cache: EntityCache<i64, Vec<Parking>>,
    helipad_cache: EntityCache<i64, Vec<Helipad>>,
    taxi_path_cache: EntityCache<i64, Vec<TaxiPath>>,

    stats: MapQueryStats,
}

impl<'db> MapQuery<'db> {
    /// Prepare all statements against the given dataset connection.
    ///
    /// Statements are prepared exactly once here and dropped together
    /// with the instance.
    pub fn new(db: &'db Connection) -> Result<Self> {
        Ok(Self {
            airport_query: db.prepare(AIRPORT_QUERY)?,
            airport_medium_query: db.prepare(AIRPORT_MEDIUM_QUERY)?,
            airport_large_query: db.prepare(AIRPORT_LARGE_QUERY)?,
            runway_query: db.prepare(RUNWAY_QUERY)?,
            runway_overview_query: db.prepare(RUNWAY_OVERVIEW_QUERY)?,
            apron_query: db.prepare(APRON_QUERY)?,
            parking_query: db.prepare(PARKING_QUERY)?,
            helipad_query: db.prepare(HELIPAD_QUERY)?,
            taxi_path_query: db.prepare(TAXI_PATH_QUERY)?,
            region_cache: RegionCache::new(),
            runway_cache: EntityCache::new(RUNWAY_CACHE_CAPACITY),
            runway_overview_cache: EntityCache::new(RUNWAY_OVERVIEW_CACHE_CAPACITY),
            apron_cache: EntityCache::new(APRON_CACHE_CAPACITY),
            parking_cache: EntityCache::new(PARKING_CACHE_CAPACITY),
            helipad_cache: EntityCache::new(HELIPAD_CACHE_CAPACITY),
            taxi_path_cache: EntityCache::new(TAXI_PATH_CACHE_CAPACITY),
            stats: MapQueryStats::default(),
        })
    }

    /// Current counter values.
    pub fn stats(&self) -> MapQueryStats {
        self.stats
    }

    /// Reset all counters to zero.
    pub fn reset_stats(&mut self) {
        self.stats = MapQueryStats::default();
    }

    // ========================================================================
    // Region queries
    // ========================================================================

    /// Airports within `rect` at the given layer.
    ///
    /// On a snapshot hit this returns the cached collection, which covers
    /// an inflated superset of `rect`; callers receive the superset rather
    /// than a re-filtered subset. On a miss the requested box is inflated,
    /// split at the antimeridian if needed, and queried piecewise; a store
    /// failure degrades to an empty result for this request.
    ///
    /// The returned slice borrows the snapshot; collect what you need
    /// before issuing child-entity queries on the same instance.
    pub fn get_airports(&mut self, rect: &GeoBox, layer: &MapLayer) -> &[Airport] {
        if self.region_cache.is_hit(rect, layer) {
            self.stats.region_hits += 1;
        } else {
            self.stats.region_misses += 1;
            debug!("airport region cache miss for {rect:?} at {layer:?}");

            self.region_cache.clear();
            let covered = inflate(rect, inflation_margin(rect));
            match self.fetch_airports(&covered, layer) {
                Ok(airports) => self.region_cache.replace(covered, *layer, airports),
                Err(err) => {
                    warn!("airport query failed, serving empty result: {err}");
                    self.stats.degraded += 1;
                }
            }
        }
        self.region_cache.airports()
    }

    /// Query all split pieces of the covered box and merge the decoded
    /// rows in query order. The pieces cannot overlap, so no airport id
    /// appears twice.
    fn fetch_airports(&mut self, covered: &GeoBox, layer: &MapLayer) -> Result<Vec<Airport>> {
        let mut airports = Vec::new();
        for piece in split_at_antimeridian(covered) {
            self.stats.store_queries += 1;
            let mut rows = match layer {
                MapLayer::All { min_runway_length } => self.airport_query.query(named_params! {
                    ":leftx": piece.west,
                    ":rightx": piece.east,
                    ":bottomy": piece.south,
                    ":topy": piece.north,
                    ":minlength": min_runway_length,
                })?,
                MapLayer::Medium => self.airport_medium_query.query(named_params! {
                    ":leftx": piece.west,
                    ":rightx": piece.east,
                    ":bottomy": piece.south,
                    ":topy": piece.north,
                })?,
                MapLayer::Large => self.airport_large_query.query(named_params! {
                    ":leftx": piece.west,
                    ":rightx": piece.east,
                    ":bottomy": piece.south,
                    ":topy": piece.north,
                })?,
            };
            while let Some(row) = rows.next()? {
                airports.push(Airport::from_row(row).map_err(|err| decode_error("airport", err))?);
            }
        }
        Ok(airports)
    }

    // ========================================================================
    // Child-entity queries (by parent airport id)
    // ========================================================================

    /// Full runway set for an airport, sorted into painting order.
    pub fn get_runways(&mut self, airport_id: i64) -> &[Runway] {
        if self.runway_cache.contains(&airport_id) {
            self.stats.runway_hits += 1;
        } else {
            self.stats.runway_misses += 1;
            self.stats.store_queries += 1;
            debug!("runway cache miss for airport {airport_id}");

            let mut runways =
                match fetch_rows(&mut self.runway_query, airport_id, "runway", Runway::from_row) {
                    Ok(runways) => runways,
                    Err(err) => {
                        warn!("runway query failed, serving empty result: {err}");
                        self.stats.degraded += 1;
                        return &[];
                    }
                };

            // Sort to draw the hard runways last
            sort_runways_by_draw_order(&mut runways);
            self.runway_cache.insert(airport_id, runways);
        }
        cached_slice(&mut self.runway_cache, airport_id)
    }

    /// Reduced runway set for zoomed-out overview rendering.
    pub fn get_runways_overview(&mut self, airport_id: i64) -> &[Runway] {
        if self.runway_overview_cache.contains(&airport_id) {
            self.stats.runway_overview_hits += 1;
        } else {
            self.stats.runway_overview_misses += 1;
            self.stats.store_queries += 1;
            debug!("runway overview cache miss for airport {airport_id}");

            let runways = match fetch_rows(
                &mut self.runway_overview_query,
                airport_id,
                "runway",
                Runway::from_overview_row,
            ) {
                Ok(runways) => runways,
                Err(err) => {
                    warn!("runway overview query failed, serving empty result: {err}");
                    self.stats.degraded += 1;
                    return &[];
                }
            };
            self.runway_overview_cache.insert(airport_id, runways);
        }
        cached_slice(&mut self.runway_overview_cache, airport_id)
    }

    /// Apron polygons for an airport.
    pub fn get_aprons(&mut self, airport_id: i64) -> &[Apron] {
        if self.apron_cache.contains(&airport_id) {
            self.stats.apron_hits += 1;
        } else {
            self.stats.apron_misses += 1;
            self.stats.store_queries += 1;
            debug!("apron cache miss for airport {airport_id}");

            let aprons = match fetch_rows(&mut self.apron_query, airport_id, "apron", Apron::from_row)
            {
                Ok(aprons) => aprons,
                Err(err) => {
                    warn!("apron query failed, serving empty result: {err}");
                    self.stats.degraded += 1;
                    return &[];
                }
            };
            self.apron_cache.insert(airport_id, aprons);
        }
        cached_slice(&mut self.apron_cache, airport_id)
    }

    /// Parking spots and gates for an airport. Vehicle parking is
    /// filtered out at decode time.
    pub fn get_parkings(&mut self, airport_id: i64) -> &[Parking] {
        if self.parking_cache.contains(&airport_id) {
            self.stats.parking_hits += 1;
        } else {
            self.stats.parking_misses += 1;
            self.stats.store_queries += 1;
            debug!("parking cache miss for airport {airport_id}");

            let parkings = match fetch_filtered_rows(
                &mut self.parking_query,
                airport_id,
                "parking",
                Parking::from_row,
            ) {
                Ok(parkings) => parkings,
                Err(err) => {
                    warn!("parking query failed, serving empty result: {err}");
                    self.stats.degraded += 1;
                    return &[];
                }
            };
            self.parking_cache.insert(airport_id, parkings);
        }
        cached_slice(&mut self.parking_cache, airport_id)
    }

    /// Helipads for an airport.
    pub fn get_helipads(&mut self, airport_id: i64) -> &[Helipad] {
        if self.helipad_cache.contains(&airport_id) {
            self.stats.helipad_hits += 1;
        } else {
            self.stats.helipad_misses += 1;
            self.stats.store_queries += 1;
            debug!("helipad cache miss for airport {airport_id}");

            let helipads =
                match fetch_rows(&mut self.helipad_query, airport_id, "helipad", Helipad::from_row) {
                    Ok(helipads) => helipads,
                    Err(err) => {
                        warn!("helipad query failed, serving empty result: {err}");
                        self.stats.degraded += 1;
                        return &[];
                    }
                };
            self.helipad_cache.insert(airport_id, helipads);
        }
        cached_slice(&mut self.helipad_cache, airport_id)
    }

    /// Taxiway segments for an airport. Runway and vehicle segments are
    /// filtered out at decode time.
    pub fn get_taxi_paths(&mut self, airport_id: i64) -> &[TaxiPath] {
        if self.taxi_path_cache.contains(&airport_id) {
            self.stats.taxi_path_hits += 1;
        } else {
            self.stats.taxi_path_misses += 1;
            self.stats.store_queries += 1;
            debug!("taxi path cache miss for airport {airport_id}");

            let paths = match fetch_filtered_rows(
                &mut self.taxi_path_query,
                airport_id,
                "taxi path",
                TaxiPath::from_row,
            ) {
                Ok(paths) => paths,
                Err(err) => {
                    warn!("taxi path query failed, serving empty result: {err}");
                    self.stats.degraded += 1;
                    return &[];
                }
            };
            self.taxi_path_cache.insert(airport_id, paths);
        }
        cached_slice(&mut self.taxi_path_cache, airport_id)
    }

    // ========================================================================
    // Proximity lookup
    // ========================================================================

    /// Entities near the screen point `(xs, ys)`, within `screen_distance`
    /// pixels of Manhattan distance, grouped by kind and ordered by
    /// ascending distance.
    ///
    /// Scans whatever is currently cached: the region snapshot airports
    /// (in reverse insertion order, so the most recently added of two
    /// overlapping symbols is scored first) plus every populated parking
    /// and helipad cache entry. Nothing is fetched.
    pub fn get_nearest_objects(
        &self,
        conv: &dyn CoordinateConverter,
        xs: i32,
        ys: i32,
        screen_distance: i32,
    ) -> SearchResult<'_> {
        let mut builder = SearchResultBuilder::new(xs, ys, screen_distance);

        for airport in self.region_cache.airports().iter().rev() {
            builder.add_airport(conv, airport);
        }

        for (_, parkings) in self.parking_cache.iter() {
            for parking in parkings {
                builder.add_parking(conv, parking);
            }
        }

        for (_, helipads) in self.helipad_cache.iter() {
            for helipad in helipads {
                builder.add_helipad(conv, helipad);
            }
        }

        builder.build()
    }
}

// ============================================================================
// Fetch helpers
// ============================================================================

/// Bind the airport id, execute, and decode every row.
fn fetch_rows<T>(
    query: &mut Statement<'_>,
    airport_id: i64,
    entity: &'static str,
    decode: impl Fn(&rusqlite::Row<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut rows = query.query(named_params! { ":airport_id": airport_id })?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        entities.push(decode(row).map_err(|err| decode_error(entity, err))?);
    }
    Ok(entities)
}

/// Like [`fetch_rows`] for decoders that filter rows out.
fn fetch_filtered_rows<T>(
    query: &mut Statement<'_>,
    airport_id: i64,
    entity: &'static str,
    decode: impl Fn(&rusqlite::Row<'_>) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    let mut rows = query.query(named_params! { ":airport_id": airport_id })?;
    let mut entities = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(decoded) = decode(row).map_err(|err| decode_error(entity, err))? {
            entities.push(decoded);
        }
    }
    Ok(entities)
}

fn decode_error(entity: &'static str, err: MapQueryError) -> MapQueryError {
    MapQueryError::RowDecode {
        entity,
        message: err.to_string(),
    }
}

/// The freshly populated (or already cached) collection as a slice.
fn cached_slice<V>(cache: &mut EntityCache<i64, Vec<V>>, airport_id: i64) -> &[V] {
    cache
        .get(&airport_id)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("../tests/fixtures/schema.sql"))
            .unwrap();
        conn
    }

    #[test]
    fn test_statements_prepare_against_schema() {
        let conn = fixture();
        assert!(MapQuery::new(&conn).is_ok());
    }

    #[test]
    fn test_missing_table_fails_preparation() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(MapQuery::new(&conn).is_err());
    }

    #[test]
    fn test_store_failure_degrades_to_empty_and_is_not_cached() {
        let conn = fixture();
        let mut queries = MapQuery::new(&conn).unwrap();

        // Pull the table out from under the prepared statement.
        conn.execute_batch("DROP TABLE helipad").unwrap();

        assert!(queries.get_helipads(1).is_empty());
        assert_eq!(queries.stats().degraded, 1);

        // The failure is per-request: the next call tries the store again.
        assert!(queries.get_helipads(1).is_empty());
        assert_eq!(queries.stats().degraded, 2);
        assert_eq!(queries.stats().helipad_misses, 2);
        assert_eq!(queries.stats().helipad_hits, 0);
    }
}
