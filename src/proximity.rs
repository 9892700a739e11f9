//! Screen-space proximity search for hit-testing map objects.
//!
//! Candidates are scored by Manhattan distance in projected screen
//! coordinates, not geographic distance: that matches perceived pixel
//! proximity under the cursor and is cheaper than Euclidean. Entities the
//! projector reports as invisible are excluded entirely, even if they are
//! geographically in range — an invisible projection carries no usable
//! coordinates.

use serde::Serialize;

use crate::types::{Airport, Helipad, Parking};
use crate::GeoPoint;

/// Projection from geographic to screen coordinates, injected by the
/// rendering layer.
pub trait CoordinateConverter {
    /// Project a position to screen pixels, or `None` when the position
    /// is not visible on screen.
    fn to_screen(&self, pos: &GeoPoint) -> Option<(i32, i32)>;
}

/// Sum of absolute coordinate differences in pixels.
pub fn manhattan_distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
    (x1 - x2).abs() + (y1 - y2).abs()
}

/// Hit-test result, one group per entity kind, each ordered by ascending
/// screen distance to the query point.
///
/// Groups borrow the authoritative cached entities rather than copying
/// them; the result is therefore only valid while the owning
/// [`crate::MapQuery`] is not mutated.
#[derive(Debug, Default, Serialize)]
pub struct SearchResult<'a> {
    pub airports: Vec<&'a Airport>,
    /// Airports matched through their tower position.
    pub towers: Vec<&'a Airport>,
    pub parkings: Vec<&'a Parking>,
    pub helipads: Vec<&'a Helipad>,
}

impl SearchResult<'_> {
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
            && self.towers.is_empty()
            && self.parkings.is_empty()
            && self.helipads.is_empty()
    }
}

/// A result group under construction: entries keyed by distance, kept
/// sorted by binary-search insertion.
#[derive(Debug)]
struct DistanceGroup<'a, T> {
    entries: Vec<(i32, &'a T)>,
}

impl<'a, T> DistanceGroup<'a, T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, distance: i32, entry: &'a T) {
        let idx = self.entries.partition_point(|(d, _)| *d < distance);
        self.entries.insert(idx, (distance, entry));
    }

    fn into_sorted(self) -> Vec<&'a T> {
        self.entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Accumulates proximity matches around one screen point.
pub(crate) struct SearchResultBuilder<'a> {
    xs: i32,
    ys: i32,
    radius: i32,
    airports: DistanceGroup<'a, Airport>,
    towers: DistanceGroup<'a, Airport>,
    parkings: DistanceGroup<'a, Parking>,
    helipads: DistanceGroup<'a, Helipad>,
}

impl<'a> SearchResultBuilder<'a> {
    pub(crate) fn new(xs: i32, ys: i32, radius: i32) -> Self {
        Self {
            xs,
            ys,
            radius,
            airports: DistanceGroup::new(),
            towers: DistanceGroup::new(),
            parkings: DistanceGroup::new(),
            helipads: DistanceGroup::new(),
        }
    }

    /// Distance to the query point if the position is visible and within
    /// the search radius.
    fn score(&self, conv: &dyn CoordinateConverter, pos: &GeoPoint) -> Option<i32> {
        let (x, y) = conv.to_screen(pos)?;
        let distance = manhattan_distance(x, y, self.xs, self.ys);
        (distance < self.radius).then_some(distance)
    }

    /// Consider an airport for the airport group and, when it has a tower
    /// position, for the tower group.
    pub(crate) fn add_airport(&mut self, conv: &dyn CoordinateConverter, airport: &'a Airport) {
        if let Some(distance) = self.score(conv, &airport.pos) {
            self.airports.insert(distance, airport);
        }
        if let Some(tower_pos) = &airport.tower_pos {
            if let Some(distance) = self.score(conv, tower_pos) {
                self.towers.insert(distance, airport);
            }
        }
    }

    pub(crate) fn add_parking(&mut self, conv: &dyn CoordinateConverter, parking: &'a Parking) {
        if let Some(distance) = self.score(conv, &parking.pos) {
            self.parkings.insert(distance, parking);
        }
    }

    pub(crate) fn add_helipad(&mut self, conv: &dyn CoordinateConverter, helipad: &'a Helipad) {
        if let Some(distance) = self.score(conv, &helipad.pos) {
            self.helipads.insert(distance, helipad);
        }
    }

    pub(crate) fn build(self) -> SearchResult<'a> {
        SearchResult {
            airports: self.airports.into_sorted(),
            towers: self.towers.into_sorted(),
            parkings: self.parkings.into_sorted(),
            helipads: self.helipads.into_sorted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AirportFlags;
    use crate::GeoBox;

    /// One pixel per degree, origin at (0, 0). Positions with negative
    /// latitude are reported invisible.
    struct FlatConverter;

    impl CoordinateConverter for FlatConverter {
        fn to_screen(&self, pos: &GeoPoint) -> Option<(i32, i32)> {
            if pos.lat < 0.0 {
                return None;
            }
            Some((pos.lon.round() as i32, pos.lat.round() as i32))
        }
    }

    fn airport(id: i64, lon: f64, lat: f64, tower: Option<GeoPoint>) -> Airport {
        Airport {
            id,
            ident: format!("AP{id}"),
            name: String::new(),
            flags: AirportFlags::empty(),
            longest_runway_length: 0,
            longest_runway_heading: 0,
            tower_frequency: None,
            atis_frequency: None,
            awos_frequency: None,
            asos_frequency: None,
            unicom_frequency: None,
            altitude: None,
            mag_var: 0.0,
            pos: GeoPoint::new(lon, lat),
            tower_pos: tower,
            bounding: GeoBox::new(lon, lat, lon, lat),
        }
    }

    #[test]
    fn test_manhattan_distance() {
        assert_eq!(manhattan_distance(0, 0, 3, 4), 7);
        assert_eq!(manhattan_distance(3, 4, 0, 0), 7);
        assert_eq!(manhattan_distance(5, 5, 5, 5), 0);
    }

    #[test]
    fn test_groups_sorted_by_ascending_distance() {
        let far = airport(1, 30.0, 30.0, None);
        let near = airport(2, 2.0, 2.0, None);
        let mid = airport(3, 10.0, 10.0, None);

        let mut builder = SearchResultBuilder::new(0, 0, 1000);
        for ap in [&far, &near, &mid] {
            builder.add_airport(&FlatConverter, ap);
        }
        let result = builder.build();

        let ids: Vec<i64> = result.airports.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_radius_is_strict() {
        let ap = airport(1, 3.0, 4.0, None); // distance 7
        let mut builder = SearchResultBuilder::new(0, 0, 7);
        builder.add_airport(&FlatConverter, &ap);
        assert!(builder.build().is_empty());

        let mut builder = SearchResultBuilder::new(0, 0, 8);
        builder.add_airport(&FlatConverter, &ap);
        assert_eq!(builder.build().airports.len(), 1);
    }

    #[test]
    fn test_invisible_positions_excluded() {
        // Geographically close but projected invisible
        let hidden = airport(1, 1.0, -1.0, None);
        let mut builder = SearchResultBuilder::new(0, 0, 100);
        builder.add_airport(&FlatConverter, &hidden);
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_tower_group_is_separate() {
        // Airport itself out of range, tower in range
        let ap = airport(1, 80.0, 80.0, Some(GeoPoint::new(1.0, 1.0)));
        let mut builder = SearchResultBuilder::new(0, 0, 10);
        builder.add_airport(&FlatConverter, &ap);
        let result = builder.build();

        assert!(result.airports.is_empty());
        assert_eq!(result.towers.len(), 1);
        assert_eq!(result.towers[0].id, 1);
    }

    #[test]
    fn test_airport_without_tower_contributes_no_tower_match() {
        let ap = airport(1, 1.0, 1.0, None);
        let mut builder = SearchResultBuilder::new(0, 0, 10);
        builder.add_airport(&FlatConverter, &ap);
        let result = builder.build();

        assert_eq!(result.airports.len(), 1);
        assert!(result.towers.is_empty());
    }

    #[test]
    fn test_parking_and_helipad_groups() {
        let parking = Parking {
            kind: "GATE".to_string(),
            name: "A".to_string(),
            number: 1,
            radius: 20,
            heading: 0,
            jetway: true,
            pos: GeoPoint::new(2.0, 2.0),
        };
        let helipad = Helipad {
            surface: "C".to_string(),
            kind: "H".to_string(),
            length: 40,
            width: 40,
            heading: 0,
            closed: false,
            pos: GeoPoint::new(3.0, 3.0),
        };

        let mut builder = SearchResultBuilder::new(0, 0, 100);
        builder.add_parking(&FlatConverter, &parking);
        builder.add_helipad(&FlatConverter, &helipad);
        let result = builder.build();

        assert_eq!(result.parkings.len(), 1);
        assert_eq!(result.helipads.len(), 1);
    }
}
