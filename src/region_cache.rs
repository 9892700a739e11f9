//! Single-slot cache for the last queried map region.
//!
//! Unlike the per-kind entity caches this is not an LRU: exactly one
//! snapshot is live at a time and it is replaced wholesale, never mutated,
//! whenever the region or the effective query parameters change.

use crate::types::{Airport, MapLayer};
use crate::GeoBox;

/// The result of one region query: the inflated box actually covered by
/// the store query, the layer descriptor used, and the decoded airports
/// in query order.
#[derive(Debug, Clone)]
pub struct RegionSnapshot {
    rect: GeoBox,
    layer: MapLayer,
    airports: Vec<Airport>,
}

impl RegionSnapshot {
    /// The inflated region the snapshot covers.
    pub fn rect(&self) -> &GeoBox {
        &self.rect
    }

    /// The layer descriptor the snapshot was queried with.
    pub fn layer(&self) -> &MapLayer {
        &self.layer
    }

    /// Cached airports in query order.
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }
}

/// Holds the current [`RegionSnapshot`], if any.
#[derive(Debug, Default)]
pub struct RegionCache {
    snapshot: Option<RegionSnapshot>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self { snapshot: None }
    }

    /// True if the snapshot can serve a request for `rect` at `layer`:
    /// the snapshot is non-empty, its covered box fully contains the
    /// requested raw box, and the layer descriptors compare equal
    /// (including tier parameters).
    ///
    /// A hit serves the full cached superset; results are intentionally
    /// not re-filtered down to the requested sub-box.
    pub fn is_hit(&self, rect: &GeoBox, layer: &MapLayer) -> bool {
        match &self.snapshot {
            Some(snapshot) => {
                !snapshot.airports.is_empty()
                    && snapshot.rect.contains(rect)
                    && snapshot.layer == *layer
            }
            None => false,
        }
    }

    /// Replace the snapshot with a freshly queried one.
    pub fn replace(&mut self, rect: GeoBox, layer: MapLayer, airports: Vec<Airport>) {
        self.snapshot = Some(RegionSnapshot {
            rect,
            layer,
            airports,
        });
    }

    /// Drop the snapshot entirely.
    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    /// Airports of the current snapshot, or an empty slice if none.
    pub fn airports(&self) -> &[Airport] {
        self.snapshot
            .as_ref()
            .map(|s| s.airports.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshot(&self) -> Option<&RegionSnapshot> {
        self.snapshot.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AirportFlags;
    use crate::GeoPoint;

    fn airport(id: i64) -> Airport {
        Airport {
            id,
            ident: format!("AP{id}"),
            name: format!("Airport {id}"),
            flags: AirportFlags::empty(),
            longest_runway_length: 5000,
            longest_runway_heading: 90,
            tower_frequency: None,
            atis_frequency: None,
            awos_frequency: None,
            asos_frequency: None,
            unicom_frequency: None,
            altitude: None,
            mag_var: 0.0,
            pos: GeoPoint::new(0.0, 0.0),
            tower_pos: None,
            bounding: GeoBox::new(-1.0, -1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_empty_cache_never_hits() {
        let cache = RegionCache::new();
        let rect = GeoBox::new(-1.0, -1.0, 1.0, 1.0);
        assert!(!cache.is_hit(&rect, &MapLayer::Medium));
        assert!(cache.airports().is_empty());
    }

    #[test]
    fn test_hit_requires_containment_and_equal_layer() {
        let mut cache = RegionCache::new();
        let covered = GeoBox::new(-10.0, 30.0, 10.0, 50.0);
        let layer = MapLayer::All {
            min_runway_length: 0,
        };
        cache.replace(covered, layer, vec![airport(1), airport(2)]);

        let inner = GeoBox::new(-5.0, 35.0, 5.0, 45.0);
        assert!(cache.is_hit(&inner, &layer));
        assert_eq!(cache.airports().len(), 2);

        // Same tier, different filter parameter: not cache-equivalent
        let other_params = MapLayer::All {
            min_runway_length: 8000,
        };
        assert!(!cache.is_hit(&inner, &other_params));
        assert!(!cache.is_hit(&inner, &MapLayer::Medium));

        // Box sticking out of the covered region
        let outside = GeoBox::new(-15.0, 35.0, 5.0, 45.0);
        assert!(!cache.is_hit(&outside, &layer));
    }

    #[test]
    fn test_empty_snapshot_is_not_a_hit() {
        let mut cache = RegionCache::new();
        let covered = GeoBox::new(-10.0, 30.0, 10.0, 50.0);
        cache.replace(covered, MapLayer::Medium, Vec::new());

        let inner = GeoBox::new(-5.0, 35.0, 5.0, 45.0);
        assert!(!cache.is_hit(&inner, &MapLayer::Medium));
    }

    #[test]
    fn test_replace_discards_previous_snapshot() {
        let mut cache = RegionCache::new();
        cache.replace(
            GeoBox::new(-10.0, 30.0, 10.0, 50.0),
            MapLayer::Medium,
            vec![airport(1)],
        );
        cache.replace(
            GeoBox::new(100.0, -10.0, 120.0, 10.0),
            MapLayer::Large,
            vec![airport(2), airport(3)],
        );

        let ids: Vec<i64> = cache.airports().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(!cache.is_hit(&GeoBox::new(-5.0, 35.0, 5.0, 45.0), &MapLayer::Medium));
    }
}
