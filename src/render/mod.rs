//! The map renderer (C5): projects stop coordinates into a bounded canvas and
//! draws the four-layer vector-graphics document described in spec.md §4.4.

pub mod svg;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalogue::Catalogue;
use crate::geo::Coordinate;
use crate::render::svg::{Color, Document, Node, PathProps, Point, StrokeLineCap, StrokeLineJoin};

const EPSILON: f64 = 1e-6;

fn is_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

/// Rendering knobs, mirroring the runtime fields one-to-one with the
/// persisted schema (spec.md §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub stop_radius: f64,
    pub line_width: f64,
    pub bus_label_font_size: u32,
    pub bus_label_offset: (f64, f64),
    pub stop_label_font_size: u32,
    pub stop_label_offset: (f64, f64),
    pub underlayer_color: Color,
    pub underlayer_width: f64,
    pub color_palette: Vec<Color>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            padding: 0.0,
            stop_radius: 0.0,
            line_width: 0.0,
            bus_label_font_size: 0,
            bus_label_offset: (0.0, 0.0),
            stop_label_font_size: 0,
            stop_label_offset: (0.0, 0.0),
            underlayer_color: Color::Named("none".to_string()),
            underlayer_width: 0.0,
            color_palette: Vec::new(),
        }
    }
}

/// Fits a bounding box of coordinates onto a `width`×`height` canvas,
/// preserving aspect by taking the smaller of the two zoom factors. Degenerate
/// axes (every point shares a longitude or latitude) fall back to the other
/// axis; if both degenerate, zoom is zero.
struct Projector {
    min_lng: f64,
    max_lat: f64,
    padding: f64,
    zoom: f64,
}

impl Projector {
    fn fit(coordinates: &[Coordinate], width: f64, height: f64, padding: f64) -> Self {
        if coordinates.is_empty() {
            return Self {
                min_lng: 0.0,
                max_lat: 0.0,
                padding,
                zoom: 0.0,
            };
        }

        let min_lng = coordinates.iter().map(|c| c.lng).fold(f64::INFINITY, f64::min);
        let max_lng = coordinates
            .iter()
            .map(|c| c.lng)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_lat = coordinates.iter().map(|c| c.lat).fold(f64::INFINITY, f64::min);
        let max_lat = coordinates
            .iter()
            .map(|c| c.lat)
            .fold(f64::NEG_INFINITY, f64::max);

        let width_zoom = (!is_zero(max_lng - min_lng)).then(|| (width - 2.0 * padding) / (max_lng - min_lng));
        let height_zoom = (!is_zero(max_lat - min_lat)).then(|| (height - 2.0 * padding) / (max_lat - min_lat));

        let zoom = match (width_zoom, height_zoom) {
            (Some(w), Some(h)) => w.min(h),
            (Some(w), None) => w,
            (None, Some(h)) => h,
            (None, None) => 0.0,
        };

        Self {
            min_lng,
            max_lat,
            padding,
            zoom,
        }
    }

    fn project(&self, coordinate: &Coordinate) -> Point {
        Point {
            x: (coordinate.lng - self.min_lng) * self.zoom + self.padding,
            y: (self.max_lat - coordinate.lat) * self.zoom + self.padding,
        }
    }
}

/// Renders the network described by `catalogue` into an SVG document string.
pub struct MapRenderer<'a> {
    catalogue: &'a Catalogue,
    settings: RenderSettings,
}

impl<'a> MapRenderer<'a> {
    pub fn new(catalogue: &'a Catalogue, settings: RenderSettings) -> Self {
        Self { catalogue, settings }
    }

    pub fn render(&self) -> String {
        let buses = self.catalogue.buses_sorted();

        let mut used_stop_indices: BTreeSet<u32> = BTreeSet::new();
        for bus in &buses {
            used_stop_indices.extend(bus.route.iter().copied());
        }
        let mut used_stops: Vec<_> = used_stop_indices
            .iter()
            .map(|&idx| self.catalogue.stop_by_index(idx))
            .collect();
        used_stops.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        let coordinates: Vec<Coordinate> = used_stops.iter().map(|s| s.coordinate).collect();
        let projector = Projector::fit(&coordinates, self.settings.width, self.settings.height, self.settings.padding);

        let mut document = Document::new();
        self.draw_route_lines(&mut document, &buses, &projector);
        self.draw_bus_labels(&mut document, &buses, &projector);
        self.draw_stop_circles(&mut document, &used_stops, &projector);
        self.draw_stop_labels(&mut document, &used_stops, &projector);
        document.render()
    }

    fn palette_color(&self, index: usize) -> Option<Color> {
        if self.settings.color_palette.is_empty() {
            return None;
        }
        Some(self.settings.color_palette[index % self.settings.color_palette.len()].clone())
    }

    fn draw_route_lines(
        &self,
        document: &mut Document,
        buses: &[&crate::catalogue::Bus],
        projector: &Projector,
    ) {
        let mut color = 0usize;
        for bus in buses {
            if bus.route.len() < 2 {
                continue;
            }
            let points = bus
                .route
                .iter()
                .map(|&idx| projector.project(&self.catalogue.stop_by_index(idx).coordinate))
                .collect();
            document.add(Node::Polyline {
                points,
                props: PathProps {
                    fill: None,
                    stroke: self.palette_color(color),
                    stroke_width: Some(self.settings.line_width),
                    stroke_linecap: Some(StrokeLineCap::Round),
                    stroke_linejoin: Some(StrokeLineJoin::Round),
                },
            });
            color += 1;
        }
    }

    fn draw_bus_labels(
        &self,
        document: &mut Document,
        buses: &[&crate::catalogue::Bus],
        projector: &Projector,
    ) {
        let mut color = 0usize;
        for bus in buses {
            if bus.route.is_empty() {
                continue;
            }
            let first = self.catalogue.stop_by_index(bus.route[0]).coordinate;
            self.add_bus_label(document, &bus.name, &first, color, projector);

            let final_stop_differs = !bus.roundtrip && bus.route[0] != bus.final_stop;
            if final_stop_differs {
                let final_coord = self.catalogue.stop_by_index(bus.final_stop).coordinate;
                self.add_bus_label(document, &bus.name, &final_coord, color, projector);
            }
            color += 1;
        }
    }

    fn add_bus_label(
        &self,
        document: &mut Document,
        name: &str,
        coordinate: &Coordinate,
        color: usize,
        projector: &Projector,
    ) {
        let position = projector.project(coordinate);
        document.add(Node::Text {
            position,
            offset: Point {
                x: self.settings.bus_label_offset.0,
                y: self.settings.bus_label_offset.1,
            },
            font_size: self.settings.bus_label_font_size,
            font_family: Some("Verdana".to_string()),
            font_weight: Some("bold".to_string()),
            data: name.to_string(),
            props: PathProps {
                fill: Some(self.settings.underlayer_color.clone()),
                stroke: Some(self.settings.underlayer_color.clone()),
                stroke_width: Some(self.settings.underlayer_width),
                stroke_linecap: Some(StrokeLineCap::Round),
                stroke_linejoin: Some(StrokeLineJoin::Round),
            },
        });
        document.add(Node::Text {
            position,
            offset: Point {
                x: self.settings.bus_label_offset.0,
                y: self.settings.bus_label_offset.1,
            },
            font_size: self.settings.bus_label_font_size,
            font_family: Some("Verdana".to_string()),
            font_weight: Some("bold".to_string()),
            data: name.to_string(),
            props: PathProps {
                fill: self.palette_color(color),
                ..Default::default()
            },
        });
    }

    fn draw_stop_circles(
        &self,
        document: &mut Document,
        stops: &[&crate::catalogue::Stop],
        projector: &Projector,
    ) {
        for stop in stops {
            document.add(Node::Circle {
                center: projector.project(&stop.coordinate),
                radius: self.settings.stop_radius,
                props: PathProps {
                    fill: Some(Color::Named("white".to_string())),
                    ..Default::default()
                },
            });
        }
    }

    fn draw_stop_labels(
        &self,
        document: &mut Document,
        stops: &[&crate::catalogue::Stop],
        projector: &Projector,
    ) {
        for stop in stops {
            let position = projector.project(&stop.coordinate);
            let offset = Point {
                x: self.settings.stop_label_offset.0,
                y: self.settings.stop_label_offset.1,
            };
            document.add(Node::Text {
                position,
                offset,
                font_size: self.settings.stop_label_font_size,
                font_family: Some("Verdana".to_string()),
                font_weight: None,
                data: stop.name.to_string(),
                props: PathProps {
                    fill: Some(self.settings.underlayer_color.clone()),
                    stroke: Some(self.settings.underlayer_color.clone()),
                    stroke_width: Some(self.settings.underlayer_width),
                    stroke_linecap: Some(StrokeLineCap::Round),
                    stroke_linejoin: Some(StrokeLineJoin::Round),
                },
            });
            document.add(Node::Text {
                position,
                offset,
                font_size: self.settings.stop_label_font_size,
                font_family: Some("Verdana".to_string()),
                font_weight: None,
                data: stop.name.to_string(),
                props: PathProps {
                    fill: Some(Color::Named("black".to_string())),
                    ..Default::default()
                },
            });
        }
    }
}
