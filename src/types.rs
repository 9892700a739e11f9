//! Map entities and row decoding.
//!
//! Entities are constructed only while decoding query result rows and are
//! never mutated afterward. Decoding tolerates missing optional columns:
//! the resolution tiers request additively fewer columns, so a field that
//! is absent from the row simply stays unset. Only the columns every tier
//! shares are required.

use bitflags::bitflags;
use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{GeoBox, GeoPoint};

// ============================================================================
// Resolution tiers
// ============================================================================

/// Query variant descriptor, trading column/row completeness for breadth.
///
/// Two descriptors are cache-equivalent only if they compare equal,
/// including tier parameters: `All { min_runway_length: 0 }` and
/// `All { min_runway_length: 8000 }` hit different result sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapLayer {
    /// Full detail, filtered to runways of at least the given length in feet.
    All { min_runway_length: i32 },
    /// Medium detail for mid zoom levels.
    Medium,
    /// Large airports only, for zoomed-out views.
    Large,
}

// ============================================================================
// Airport flags
// ============================================================================

bitflags! {
    /// Categorical capabilities of an airport, derived from source columns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AirportFlags: u32 {
        const HELIPORT = 1 << 0;
        const SCENERY = 1 << 1;
        const FUEL = 1 << 2;
        const TOWER = 1 << 3;
        const CLOSED = 1 << 4;
        const MILITARY = 1 << 5;
        const ADDON = 1 << 6;
        const APPROACH = 1 << 7;
        const HARD = 1 << 8;
        const SOFT = 1 << 9;
        const WATER = 1 << 10;
        const LIGHT = 1 << 11;
    }
}

/// Column-to-flag derivation table shared by all resolution tiers.
///
/// A flag is set iff the column exists in the row, is non-null and its
/// numeric value is greater than zero. Absent columns contribute nothing.
pub const FLAG_COLUMNS: &[(&str, AirportFlags)] = &[
    ("num_helipad", AirportFlags::HELIPORT),
    ("rating", AirportFlags::SCENERY),
    ("has_avgas", AirportFlags::FUEL),
    ("has_jetfuel", AirportFlags::FUEL),
    ("tower_frequency", AirportFlags::TOWER),
    ("is_closed", AirportFlags::CLOSED),
    ("is_military", AirportFlags::MILITARY),
    ("is_addon", AirportFlags::ADDON),
    ("num_approach", AirportFlags::APPROACH),
    ("num_runway_hard", AirportFlags::HARD),
    ("num_runway_soft", AirportFlags::SOFT),
    ("num_runway_water", AirportFlags::WATER),
    ("num_runway_light", AirportFlags::LIGHT),
];

impl AirportFlags {
    /// Derive the flag set from a result row via [`FLAG_COLUMNS`].
    pub fn from_row(row: &Row<'_>) -> Self {
        let mut flags = AirportFlags::empty();
        for (column, flag) in FLAG_COLUMNS {
            if column_is_positive(row, column) {
                flags |= *flag;
            }
        }
        flags
    }
}

// ============================================================================
// Row decoding helpers
// ============================================================================

/// True if the row's statement selected the given column.
fn has_column(row: &Row<'_>, column: &str) -> bool {
    row.as_ref().column_index(column).is_ok()
}

/// Read an optional column: `None` when missing or null, never an error.
fn optional_column<T: rusqlite::types::FromSql>(row: &Row<'_>, column: &str) -> Option<T> {
    row.get(column).ok()
}

/// True if the column exists, is non-null and numerically greater than zero.
fn column_is_positive(row: &Row<'_>, column: &str) -> bool {
    match row.get_ref(column) {
        Ok(ValueRef::Integer(v)) => v > 0,
        Ok(ValueRef::Real(v)) => v > 0.0,
        _ => false,
    }
}

/// Read a heading/radius style REAL column rounded to the nearest integer.
fn rounded_i32(row: &Row<'_>, column: &str) -> Result<i32> {
    let value: f64 = row.get(column)?;
    Ok(value.round() as i32)
}

// ============================================================================
// Primary entity
// ============================================================================

/// A top-level airport, independently retrievable by spatial range.
///
/// Immutable once decoded. Fields backed by tier-dependent columns are
/// optional; wider tiers leave them `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    pub id: i64,
    pub ident: String,
    pub name: String,
    pub flags: AirportFlags,
    pub longest_runway_length: i32,
    pub longest_runway_heading: i32,
    pub tower_frequency: Option<i32>,
    pub atis_frequency: Option<i32>,
    pub awos_frequency: Option<i32>,
    pub asos_frequency: Option<i32>,
    pub unicom_frequency: Option<i32>,
    /// Field elevation in feet; absent from the wider tiers.
    pub altitude: Option<i32>,
    pub mag_var: f64,
    pub pos: GeoPoint,
    /// Tower position. Present iff the query variant selected the tower
    /// object columns; independent of the TOWER flag, which derives from
    /// `tower_frequency`.
    pub tower_pos: Option<GeoPoint>,
    pub bounding: GeoBox,
}

impl Airport {
    /// Decode an airport from a result row of any tier query.
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        // Tower position only exists for query variants selecting the
        // tower object; a null position (airport without a tower) stays
        // unset as well.
        let tower_pos = if has_column(row, "has_tower_object") {
            match (
                optional_column(row, "tower_lonx"),
                optional_column(row, "tower_laty"),
            ) {
                (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
                _ => None,
            }
        } else {
            None
        };

        Ok(Self {
            id: row.get("airport_id")?,
            ident: row.get("ident")?,
            name: row.get("name")?,
            flags: AirportFlags::from_row(row),
            longest_runway_length: row.get("longest_runway_length")?,
            longest_runway_heading: rounded_i32(row, "longest_runway_heading")?,
            tower_frequency: optional_column(row, "tower_frequency"),
            atis_frequency: optional_column(row, "atis_frequency"),
            awos_frequency: optional_column(row, "awos_frequency"),
            asos_frequency: optional_column(row, "asos_frequency"),
            unicom_frequency: optional_column(row, "unicom_frequency"),
            altitude: optional_column::<f64>(row, "altitude").map(|v| v.round() as i32),
            mag_var: row.get("mag_var")?,
            pos: GeoPoint::new(row.get("lonx")?, row.get("laty")?),
            tower_pos,
            bounding: GeoBox::new(
                row.get("left_lonx")?,
                row.get("bottom_laty")?,
                row.get("right_lonx")?,
                row.get("top_laty")?,
            ),
        })
    }
}

// ============================================================================
// Child entities
// ============================================================================

/// A runway with both end descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    pub length: i32,
    pub heading: i32,
    pub width: i32,
    pub primary_offset_threshold: i32,
    pub secondary_offset_threshold: i32,
    pub surface: String,
    pub primary_name: String,
    pub secondary_name: String,
    pub edge_light: Option<String>,
    pub primary_closed: bool,
    pub secondary_closed: bool,
    pub pos: GeoPoint,
    pub primary_pos: GeoPoint,
    pub secondary_pos: GeoPoint,
}

impl Runway {
    /// Decode a runway from the full per-airport runway query.
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            length: row.get("length")?,
            heading: rounded_i32(row, "heading")?,
            width: row.get("width")?,
            primary_offset_threshold: row.get("primary_offset_threshold")?,
            secondary_offset_threshold: row.get("secondary_offset_threshold")?,
            surface: row.get("surface")?,
            primary_name: row.get("primary_name")?,
            secondary_name: row.get("secondary_name")?,
            edge_light: optional_column(row, "edge_light"),
            primary_closed: column_is_positive(row, "primary_closed_markings"),
            secondary_closed: column_is_positive(row, "secondary_closed_markings"),
            pos: GeoPoint::new(row.get("lonx")?, row.get("laty")?),
            primary_pos: GeoPoint::new(row.get("primary_lonx")?, row.get("primary_laty")?),
            secondary_pos: GeoPoint::new(row.get("secondary_lonx")?, row.get("secondary_laty")?),
        })
    }

    /// Decode a runway from the zoomed-out overview query, which selects
    /// only lengths, headings and positions.
    pub fn from_overview_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            length: row.get("length")?,
            heading: rounded_i32(row, "heading")?,
            width: 0,
            primary_offset_threshold: 0,
            secondary_offset_threshold: 0,
            surface: String::new(),
            primary_name: String::new(),
            secondary_name: String::new(),
            edge_light: None,
            primary_closed: false,
            secondary_closed: false,
            pos: GeoPoint::new(row.get("lonx")?, row.get("laty")?),
            primary_pos: GeoPoint::new(row.get("primary_lonx")?, row.get("primary_laty")?),
            secondary_pos: GeoPoint::new(row.get("secondary_lonx")?, row.get("secondary_laty")?),
        })
    }

    /// Hard surfaces: concrete, asphalt, bituminous, tarmac.
    pub fn is_hard(&self) -> bool {
        matches!(self.surface.as_str(), "C" | "A" | "B" | "T")
    }

    pub fn is_water(&self) -> bool {
        self.surface == "W"
    }

    pub fn is_soft(&self) -> bool {
        !self.is_hard() && !self.is_water()
    }
}

/// Sort runways into painting order: hard runways last, longest on top.
pub fn sort_runways_by_draw_order(runways: &mut [Runway]) {
    runways.sort_by_key(|r| if r.is_hard() { (1, r.length) } else { (0, 0) });
}

/// A parking spot or gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parking {
    pub kind: String,
    pub name: String,
    pub number: i32,
    pub radius: i32,
    pub heading: i32,
    pub jetway: bool,
    pub pos: GeoPoint,
}

impl Parking {
    /// Decode a parking row. Vehicle parking is not a map object and
    /// yields `None`.
    pub fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let kind: String = row.get("type")?;
        if kind == "VEHICLES" {
            return Ok(None);
        }

        Ok(Some(Self {
            kind,
            name: row.get("name")?,
            number: row.get("number")?,
            radius: rounded_i32(row, "radius")?,
            heading: rounded_i32(row, "heading")?,
            jetway: column_is_positive(row, "has_jetway"),
            pos: GeoPoint::new(row.get("lonx")?, row.get("laty")?),
        }))
    }
}

/// A helipad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Helipad {
    pub surface: String,
    pub kind: String,
    pub length: i32,
    pub width: i32,
    pub heading: i32,
    pub closed: bool,
    pub pos: GeoPoint,
}

impl Helipad {
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            surface: row.get("surface")?,
            kind: row.get("type")?,
            length: row.get("length")?,
            width: row.get("width")?,
            heading: rounded_i32(row, "heading")?,
            closed: column_is_positive(row, "is_closed"),
            pos: GeoPoint::new(row.get("lonx")?, row.get("laty")?),
        })
    }
}

/// A taxiway segment between two named nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiPath {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub start_type: String,
    pub end_type: String,
    pub surface: String,
    pub name: String,
    pub width: i32,
    pub draw_surface: bool,
}

impl TaxiPath {
    /// Decode a taxi path row. Segments running along runways or vehicle
    /// lanes are not drawn and yield `None`.
    pub fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let kind: String = row.get("type")?;
        if kind == "RUNWAY" || kind == "VEHICLE" {
            return Ok(None);
        }

        Ok(Some(Self {
            start: GeoPoint::new(row.get("start_lonx")?, row.get("start_laty")?),
            end: GeoPoint::new(row.get("end_lonx")?, row.get("end_laty")?),
            start_type: row.get("start_type")?,
            end_type: row.get("end_type")?,
            surface: row.get("surface")?,
            name: row.get("name")?,
            width: row.get("width")?,
            draw_surface: column_is_positive(row, "is_draw_surface"),
        }))
    }
}

/// An apron surface polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apron {
    pub surface: String,
    pub draw_surface: bool,
    pub vertices: Vec<GeoPoint>,
}

impl Apron {
    pub fn from_row(row: &Row<'_>) -> Result<Self> {
        let vertices: String = row.get("vertices")?;
        Ok(Self {
            surface: row.get("surface")?,
            draw_surface: column_is_positive(row, "is_draw_surface"),
            vertices: parse_vertices(&vertices),
        })
    }
}

/// Decode the apron polygon string format `"lon lat,lon lat,..."`.
/// Malformed vertex pairs are skipped.
fn parse_vertices(vertices: &str) -> Vec<GeoPoint> {
    let mut points = Vec::new();
    for vertex in vertices.split(',') {
        let ordinates: Vec<&str> = vertex.split_whitespace().collect();
        if ordinates.len() != 2 {
            continue;
        }
        if let (Ok(lon), Ok(lat)) = (ordinates[0].parse::<f64>(), ordinates[1].parse::<f64>()) {
            points.push(GeoPoint::new(lon, lat));
        }
    }
    points
}

// ============================================================================
// Tests
// ============================================================================
