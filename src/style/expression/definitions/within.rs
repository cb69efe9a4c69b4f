//! `["within", geojson]`: point or line features fully inside a polygon.
//!
//! The polygon is projected into the world coordinates of the feature's
//! tile (tile extent 8192) so both geometries are compared in one integer
//! grid. Points on a polygon edge count as outside.

use serde_json::{json, Value as JsonValue};

use super::Expression;
use crate::style::expression::evaluation::{CanonicalTileId, EvalResult, EvaluationContext, TilePoint};
use crate::style::expression::parsing::ParsingContext;
use crate::style::expression::value::Value;

const EXTENT: f64 = 8192.0;

type Point = [f64; 2];
type Ring = Vec<Point>;
type Polygon = Vec<Ring>;
type BBox = [f64; 4];

/// Polygon geometry in longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub enum PolygonGeometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

#[derive(Debug, Clone)]
pub struct Within {
    pub geojson: JsonValue,
    pub geometry: PolygonGeometry,
}

impl Within {
    pub fn parse(args: &[JsonValue], ctx: &ParsingContext) -> Option<Expression> {
        if args.len() != 2 {
            return ctx.error(format!(
                "'within' expression requires exactly one argument, but found {} instead.",
                args.len() - 1
            ));
        }
        let geojson = &args[1];
        match find_polygon(geojson) {
            Some(geometry) => Some(Expression::Within(Within {
                geojson: geojson.clone(),
                geometry,
            })),
            None => ctx.error(
                "'within' expression requires valid geojson object that contains polygon geometry type.",
            ),
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext) -> EvalResult {
        let (Some(geometry), Some(canonical)) = (ctx.geometry(), ctx.canonical_id()) else {
            return Ok(Value::Bool(false));
        };
        let result = match ctx.geometry_type() {
            Some("Point") => points_within_polygons(geometry, canonical, &self.geometry),
            Some("LineString") => lines_within_polygons(geometry, canonical, &self.geometry),
            _ => false,
        };
        Ok(Value::Bool(result))
    }

    pub fn serialize(&self) -> JsonValue {
        json!(["within", self.geojson])
    }
}

fn find_polygon(geojson: &JsonValue) -> Option<PolygonGeometry> {
    match geojson.get("type")?.as_str()? {
        "FeatureCollection" => geojson
            .get("features")?
            .as_array()?
            .iter()
            .filter_map(|feature| feature.get("geometry"))
            .find_map(polygon_geometry),
        "Feature" => polygon_geometry(geojson.get("geometry")?),
        _ => polygon_geometry(geojson),
    }
}

fn polygon_geometry(geometry: &JsonValue) -> Option<PolygonGeometry> {
    let coordinates = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => parse_polygon(coordinates).map(PolygonGeometry::Polygon),
        "MultiPolygon" => coordinates
            .as_array()?
            .iter()
            .map(parse_polygon)
            .collect::<Option<Vec<_>>>()
            .map(PolygonGeometry::MultiPolygon),
        _ => None,
    }
}

fn parse_polygon(value: &JsonValue) -> Option<Polygon> {
    value
        .as_array()?
        .iter()
        .map(|ring| {
            ring.as_array()?
                .iter()
                .map(|p| Some([p.get(0)?.as_f64()?, p.get(1)?.as_f64()?]))
                .collect::<Option<Ring>>()
        })
        .collect()
}

fn empty_bbox() -> BBox {
    [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY]
}

fn update_bbox(bbox: &mut BBox, p: Point) {
    bbox[0] = bbox[0].min(p[0]);
    bbox[1] = bbox[1].min(p[1]);
    bbox[2] = bbox[2].max(p[0]);
    bbox[3] = bbox[3].max(p[1]);
}

fn mercator_x(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

fn mercator_y(lat: f64) -> f64 {
    (180.0 - (180.0 / std::f64::consts::PI
        * (std::f64::consts::FRAC_PI_4 + lat * std::f64::consts::PI / 360.0).tan().ln()))
        / 360.0
}

/// Strict containment of `inner` in `outer`.
fn box_within_box(inner: &BBox, outer: &BBox) -> bool {
    inner[0] > outer[0] && inner[2] < outer[2] && inner[1] > outer[1] && inner[3] < outer[3]
}

fn tile_coordinates(p: Point, canonical: CanonicalTileId) -> Point {
    let tiles_at_zoom = 2f64.powi(canonical.z as i32);
    [
        (mercator_x(p[0]) * tiles_at_zoom * EXTENT).round(),
        (mercator_y(p[1]) * tiles_at_zoom * EXTENT).round(),
    ]
}

fn on_boundary(p: Point, p1: Point, p2: Point) -> bool {
    let (x1, y1) = (p[0] - p1[0], p[1] - p1[1]);
    let (x2, y2) = (p[0] - p2[0], p[1] - p2[1]);
    x1 * y2 - x2 * y1 == 0.0 && x1 * x2 <= 0.0 && y1 * y2 <= 0.0
}

fn ray_intersect(p: Point, p1: Point, p2: Point) -> bool {
    (p1[1] > p[1]) != (p2[1] > p[1])
        && p[0] < (p2[0] - p1[0]) * (p[1] - p1[1]) / (p2[1] - p1[1]) + p1[0]
}

/// Even-odd ray casting; boundary points are outside.
fn point_within_polygon(p: Point, rings: &Polygon) -> bool {
    let mut inside = false;
    for ring in rings {
        for edge in ring.windows(2) {
            if on_boundary(p, edge[0], edge[1]) {
                return false;
            }
            if ray_intersect(p, edge[0], edge[1]) {
                inside = !inside;
            }
        }
    }
    inside
}

fn point_within_polygons(p: Point, polygons: &[Polygon]) -> bool {
    polygons.iter().any(|polygon| point_within_polygon(p, polygon))
}

fn perp(v1: Point, v2: Point) -> f64 {
    v1[0] * v2[1] - v1[1] * v2[0]
}

/// True when `p1` and `p2` lie strictly on different sides of `q1 -> q2`.
fn two_sided(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let (x1, y1) = (p1[0] - q1[0], p1[1] - q1[1]);
    let (x2, y2) = (p2[0] - q1[0], p2[1] - q1[1]);
    let (x3, y3) = (q2[0] - q1[0], q2[1] - q1[1]);
    let det1 = x1 * y3 - x3 * y1;
    let det2 = x2 * y3 - x3 * y2;
    (det1 > 0.0 && det2 < 0.0) || (det1 < 0.0 && det2 > 0.0)
}

/// Segment `a -> b` crosses segment `c -> d`. Parallel segments never do.
fn line_intersect_line(a: Point, b: Point, c: Point, d: Point) -> bool {
    let vector_p = [b[0] - a[0], b[1] - a[1]];
    let vector_q = [d[0] - c[0], d[1] - c[1]];
    if perp(vector_q, vector_p) == 0.0 {
        return false;
    }
    two_sided(a, b, c, d) && two_sided(c, d, a, b)
}

fn line_intersect_polygon(p1: Point, p2: Point, polygon: &Polygon) -> bool {
    polygon
        .iter()
        .any(|ring| ring.windows(2).any(|edge| line_intersect_line(p1, p2, edge[0], edge[1])))
}

fn line_string_within_polygon(line: &[Point], polygon: &Polygon) -> bool {
    if !line.iter().all(|p| point_within_polygon(*p, polygon)) {
        return false;
    }
    !line
        .windows(2)
        .any(|segment| line_intersect_polygon(segment[0], segment[1], polygon))
}

fn line_string_within_polygons(line: &[Point], polygons: &[Polygon]) -> bool {
    polygons
        .iter()
        .any(|polygon| line_string_within_polygon(line, polygon))
}

fn tile_polygon(coordinates: &Polygon, bbox: &mut BBox, canonical: CanonicalTileId) -> Polygon {
    coordinates
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| {
                    let coord = tile_coordinates(*p, canonical);
                    update_bbox(bbox, coord);
                    coord
                })
                .collect()
        })
        .collect()
}

fn tile_polygons(coordinates: &[Polygon], bbox: &mut BBox, canonical: CanonicalTileId) -> Vec<Polygon> {
    coordinates
        .iter()
        .map(|polygon| tile_polygon(polygon, bbox, canonical))
        .collect()
}

/// Shift `p` by one world width when the polygon sits across the antimeridian.
fn update_point(p: &mut Point, bbox: &mut BBox, poly_bbox: &BBox, world_size: f64) {
    if p[0] < poly_bbox[0] || p[0] > poly_bbox[2] {
        let half_world_size = world_size * 0.5;
        let mut shift = if p[0] - poly_bbox[0] > half_world_size {
            -world_size
        } else if poly_bbox[0] - p[0] > half_world_size {
            world_size
        } else {
            0.0
        };
        if shift == 0.0 {
            shift = if p[0] - poly_bbox[2] > half_world_size {
                -world_size
            } else if poly_bbox[2] - p[0] > half_world_size {
                world_size
            } else {
                0.0
            };
        }
        p[0] += shift;
    }
    update_bbox(bbox, *p);
}

fn world_point(point: &TilePoint, canonical: CanonicalTileId) -> Point {
    [
        point.x as f64 + canonical.x as f64 * EXTENT,
        point.y as f64 + canonical.y as f64 * EXTENT,
    ]
}

fn world_size(canonical: CanonicalTileId) -> f64 {
    2f64.powi(canonical.z as i32) * EXTENT
}

fn tile_points(
    geometry: &[Vec<TilePoint>],
    point_bbox: &mut BBox,
    poly_bbox: &BBox,
    canonical: CanonicalTileId,
) -> Vec<Point> {
    let world_size = world_size(canonical);
    let mut points = Vec::new();
    for point in geometry.iter().flatten() {
        let mut p = world_point(point, canonical);
        update_point(&mut p, point_bbox, poly_bbox, world_size);
        points.push(p);
    }
    points
}

fn tile_lines(
    geometry: &[Vec<TilePoint>],
    line_bbox: &mut BBox,
    poly_bbox: &BBox,
    canonical: CanonicalTileId,
) -> Vec<Vec<Point>> {
    let world_size = world_size(canonical);
    let mut lines: Vec<Vec<Point>> = geometry
        .iter()
        .map(|line| {
            line.iter()
                .map(|point| {
                    let p = world_point(point, canonical);
                    update_bbox(line_bbox, p);
                    p
                })
                .collect()
        })
        .collect();

    // Lines wider than half the world are left unshifted.
    if line_bbox[2] - line_bbox[0] <= world_size / 2.0 {
        *line_bbox = empty_bbox();
        for p in lines.iter_mut().flatten() {
            update_point(p, line_bbox, poly_bbox, world_size);
        }
    }
    lines
}

fn points_within_polygons(
    geometry: &[Vec<TilePoint>],
    canonical: CanonicalTileId,
    polygon: &PolygonGeometry,
) -> bool {
    let mut point_bbox = empty_bbox();
    let mut poly_bbox = empty_bbox();
    match polygon {
        PolygonGeometry::Polygon(coordinates) => {
            let tile_polygon = tile_polygon(coordinates, &mut poly_bbox, canonical);
            let points = tile_points(geometry, &mut point_bbox, &poly_bbox, canonical);
            box_within_box(&point_bbox, &poly_bbox)
                && points.iter().all(|p| point_within_polygon(*p, &tile_polygon))
        }
        PolygonGeometry::MultiPolygon(coordinates) => {
            let tile_polygons = tile_polygons(coordinates, &mut poly_bbox, canonical);
            let points = tile_points(geometry, &mut point_bbox, &poly_bbox, canonical);
            box_within_box(&point_bbox, &poly_bbox)
                && points.iter().all(|p| point_within_polygons(*p, &tile_polygons))
        }
    }
}

fn lines_within_polygons(
    geometry: &[Vec<TilePoint>],
    canonical: CanonicalTileId,
    polygon: &PolygonGeometry,
) -> bool {
    let mut line_bbox = empty_bbox();
    let mut poly_bbox = empty_bbox();
    match polygon {
        PolygonGeometry::Polygon(coordinates) => {
            let tile_polygon = tile_polygon(coordinates, &mut poly_bbox, canonical);
            let lines = tile_lines(geometry, &mut line_bbox, &poly_bbox, canonical);
            box_within_box(&line_bbox, &poly_bbox)
                && lines
                    .iter()
                    .all(|line| line_string_within_polygon(line, &tile_polygon))
        }
        PolygonGeometry::MultiPolygon(coordinates) => {
            let tile_polygons = tile_polygons(coordinates, &mut poly_bbox, canonical);
            let lines = tile_lines(geometry, &mut line_bbox, &poly_bbox, canonical);
            box_within_box(&line_bbox, &poly_bbox)
                && lines
                    .iter()
                    .all(|line| line_string_within_polygons(line, &tile_polygons))
        }
    }
}
