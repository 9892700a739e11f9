//! Bounding-box inflation and antimeridian splitting.
//!
//! Query rectangles are inflated by a margin proportional to their width so
//! that modest pan/zoom movement stays inside the last covered region and
//! does not force a re-query. The store's range predicate assumes
//! `west <= east`, so an inflated box that wraps the ±180° meridian is
//! decomposed into two non-crossing boxes whose results are concatenated;
//! the halves cannot overlap, so duplicates are impossible.

use crate::GeoBox;

/// Fraction of the box width added to each side when inflating.
pub const RECT_INFLATION_FACTOR: f64 = 0.3;
/// Constant number of degrees added on top of the proportional margin.
pub const RECT_INFLATION_ADD: f64 = 0.1;

/// Margin in degrees used to inflate a query rectangle.
///
/// Proportional to the box width so the covered region scales with the
/// zoom level of typical map interaction.
pub fn inflation_margin(rect: &GeoBox) -> f64 {
    rect.width() * RECT_INFLATION_FACTOR + RECT_INFLATION_ADD
}

/// Expand all four edges of `rect` outward by `degrees`.
///
/// Longitudes wrap around the antimeridian (an inflated box may become
/// crossing), latitudes clamp to ±90°. If the inflated width would reach
/// the full 360° the result saturates to the whole-world box.
pub fn inflate(rect: &GeoBox, degrees: f64) -> GeoBox {
    if rect.width() + 2.0 * degrees >= 360.0 {
        return GeoBox {
            west: -180.0,
            south: (rect.south - degrees).max(-90.0),
            east: 180.0,
            north: (rect.north + degrees).min(90.0),
        };
    }

    GeoBox {
        west: wrap_lon_west(rect.west - degrees),
        south: (rect.south - degrees).max(-90.0),
        east: wrap_lon_east(rect.east + degrees),
        north: (rect.north + degrees).min(90.0),
    }
}

/// Split a box crossing the ±180° meridian into its two non-crossing
/// halves, `[west..180]` and `[-180..east]`. A non-crossing box is
/// returned unchanged.
pub fn split_at_antimeridian(rect: &GeoBox) -> Vec<GeoBox> {
    if rect.is_crossing() {
        vec![
            GeoBox::new(rect.west, rect.south, 180.0, rect.north),
            GeoBox::new(-180.0, rect.south, rect.east, rect.north),
        ]
    } else {
        vec![*rect]
    }
}

/// Wrap a western edge into [-180, 180).
fn wrap_lon_west(lon: f64) -> f64 {
    let mut l = (lon + 180.0) % 360.0;
    if l < 0.0 {
        l += 360.0;
    }
    l - 180.0
}

/// Wrap an eastern edge into (-180, 180] so that an edge landing exactly
/// on the antimeridian stays at +180 and does not flag a crossing.
fn wrap_lon_east(lon: f64) -> f64 {
    let l = wrap_lon_west(lon);
    if l == -180.0 {
        180.0
    } else {
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflation_margin() {
        let rect = GeoBox::new(-10.0, 40.0, 10.0, 50.0);
        assert!((inflation_margin(&rect) - (20.0 * 0.3 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_inflate_plain() {
        let rect = GeoBox::new(-10.0, 40.0, 10.0, 50.0);
        let inflated = inflate(&rect, 2.0);
        assert_eq!(inflated, GeoBox::new(-12.0, 38.0, 12.0, 52.0));
        assert!(inflated.contains(&rect));
    }

    #[test]
    fn test_inflate_clamps_latitude() {
        let rect = GeoBox::new(0.0, 85.0, 10.0, 89.0);
        let inflated = inflate(&rect, 5.0);
        assert_eq!(inflated.north, 90.0);
        assert_eq!(inflated.south, 80.0);
    }

    #[test]
    fn test_inflate_wraps_into_crossing() {
        // Pushing the west edge past -180 wraps it to the eastern hemisphere.
        let rect = GeoBox::new(-178.0, -10.0, -160.0, 10.0);
        let inflated = inflate(&rect, 5.0);
        assert!(inflated.is_crossing());
        assert_eq!(inflated.west, 177.0);
        assert_eq!(inflated.east, -155.0);
        assert!(inflated.contains(&rect));
    }

    #[test]
    fn test_inflate_edge_at_antimeridian_not_crossing() {
        let rect = GeoBox::new(170.0, -10.0, 175.0, 10.0);
        let inflated = inflate(&rect, 5.0);
        assert!(!inflated.is_crossing());
        assert_eq!(inflated.east, 180.0);
    }

    #[test]
    fn test_inflate_saturates_to_whole_world() {
        let rect = GeoBox::new(-170.0, -10.0, 170.0, 10.0);
        let inflated = inflate(&rect, 20.0);
        assert_eq!(inflated.west, -180.0);
        assert_eq!(inflated.east, 180.0);
        assert!(!inflated.is_crossing());
    }

    #[test]
    fn test_split_plain_box() {
        let rect = GeoBox::new(-10.0, 40.0, 10.0, 50.0);
        let pieces = split_at_antimeridian(&rect);
        assert_eq!(pieces, vec![rect]);
    }

    #[test]
    fn test_split_crossing_box() {
        let rect = GeoBox::new(170.0, -10.0, -170.0, 10.0);
        let pieces = split_at_antimeridian(&rect);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], GeoBox::new(170.0, -10.0, 180.0, 10.0));
        assert_eq!(pieces[1], GeoBox::new(-180.0, -10.0, -170.0, 10.0));
        // The halves share latitudes and jointly cover the original width.
        assert!((pieces[0].width() + pieces[1].width() - rect.width()).abs() < 1e-9);
    }

    #[test]
    fn test_split_after_inflate_two_iff_crossing() {
        let plain = inflate(&GeoBox::new(-10.0, 40.0, 10.0, 50.0), 2.0);
        assert_eq!(split_at_antimeridian(&plain).len(), 1);

        let crossing = inflate(&GeoBox::new(176.0, -10.0, -176.0, 10.0), 2.0);
        assert!(crossing.is_crossing());
        assert_eq!(split_at_antimeridian(&crossing).len(), 2);
    }
}
