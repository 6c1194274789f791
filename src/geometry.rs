use crate::types::LatLon;
use geo::{Contains, LineString, Polygon};

/// Ray-casting point-in-polygon test.
///
/// A ray leaves `point` toward increasing longitude and every polygon edge it crosses flips
/// the result. Points lying exactly on an edge and horizontal edges get no special treatment,
/// so the answer for those is whichever side the arithmetic falls on. This only backs an
/// advisory nesting check for small hand-drawn boundaries.
pub fn point_in_polygon(point: LatLon, polygon: &[LatLon]) -> bool {
    let n = polygon.len();
    if n == 0 {
        return false;
    }

    let (x, y) = (point.lon(), point.lat());
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (polygon[i].lon(), polygon[i].lat());
        let (xj, yj) = (polygon[j].lon(), polygon[j].lat());

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Every vertex of `candidate` lies inside `container`.
pub fn vertices_within(candidate: &[LatLon], container: &[LatLon]) -> bool {
    candidate.iter().all(|&point| point_in_polygon(point, container))
}

/// Full polygon-in-polygon containment, edges included.
pub fn polygon_within(candidate: &[LatLon], container: &[LatLon]) -> bool {
    to_polygon(container).contains(&to_polygon(candidate))
}

/// Reorders `[lat, lon]` pairs to `[lon, lat]` and repeats the first position at the end
/// when the ring is not already closed.
pub fn to_closed_lon_lat_ring(coordinates: &[LatLon]) -> Vec<[f64; 2]> {
    let mut ring: Vec<[f64; 2]> = coordinates.iter().map(|c| [c.lon(), c.lat()]).collect();

    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }

    ring
}

fn to_polygon(coordinates: &[LatLon]) -> Polygon<f64> {
    let exterior: Vec<(f64, f64)> = coordinates.iter().map(|c| (c.lon(), c.lat())).collect();
    Polygon::new(LineString::from(exterior), vec![])
}
