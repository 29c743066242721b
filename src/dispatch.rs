//! Query dispatcher (C7): typed requests in, typed JSON responses out.
//!
//! Grounded on `json_reader.cpp` (original_source) for exact request/response
//! field names and the two-pass base-request ingest (stops and their
//! distances before buses, since buses reference stops by name). Follows the
//! DTO style of `blaise`'s `crates/server/src/dto/*.rs`: plain `serde`
//! structs at the boundary, hand-written conversions into domain types.
//! Response shape varies by request type and by found/not-found status, so
//! responses are built as `serde_json::Value` rather than one fixed struct,
//! the way the pack's `jelmer-valhalla-client-rs` builds ad hoc JSON with the
//! `json!` macro.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::catalogue::Catalogue;
use crate::geo::Coordinate;
use crate::render::svg::Color;
use crate::render::{MapRenderer, RenderSettings};
use crate::router::{ItineraryItem, RoutingSettings, TransportRouter};

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed request document: {0}")]
    Framing(#[from] serde_json::Error),
    #[error("unknown color representation")]
    InvalidColor,
    #[error(transparent)]
    Catalogue(#[from] crate::catalogue::Error),
    #[error(transparent)]
    Router(#[from] crate::router::Error),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum BaseRequest {
    Stop {
        name: String,
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        road_distances: HashMap<String, f64>,
    },
    Bus {
        name: String,
        is_roundtrip: bool,
        stops: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum StatRequest {
    Stop { id: i64, name: String },
    Bus { id: i64, name: String },
    Map { id: i64 },
    Route { id: i64, from: String, to: String },
}

#[derive(Debug, Deserialize)]
pub struct SerializationSettings {
    pub file: String,
}

#[derive(Debug, Deserialize)]
struct RawRenderSettings {
    width: f64,
    height: f64,
    padding: f64,
    stop_radius: f64,
    line_width: f64,
    bus_label_font_size: u32,
    bus_label_offset: [f64; 2],
    stop_label_font_size: u32,
    stop_label_offset: [f64; 2],
    underlayer_color: Value,
    underlayer_width: f64,
    color_palette: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawRoutingSettings {
    pub bus_wait_time: u32,
    pub bus_velocity: f64,
}

#[derive(Debug, Deserialize)]
pub struct RequestDocument {
    #[serde(default)]
    pub base_requests: Vec<BaseRequest>,
    #[serde(default)]
    pub stat_requests: Vec<StatRequest>,
    pub render_settings: Option<RawRenderSettingsWrapper>,
    pub routing_settings: Option<RawRoutingSettings>,
    pub serialization_settings: Option<SerializationSettings>,
}

/// Thin wrapper so the public field stays `RawRenderSettingsWrapper` while
/// the inner parsing struct (`RawRenderSettings`) stays private; avoids
/// leaking `serde_json::Value` colors through the public API.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct RawRenderSettingsWrapper(RawRenderSettings);

/// Parses a color from its three JSON shapes: a bare string, a 3-element
/// array (rgb), or a 4-element array (rgb + opacity).
fn parse_color(value: &Value) -> Result<Color, Error> {
    match value {
        Value::String(name) => Ok(Color::Named(name.clone())),
        Value::Array(items) => match items.as_slice() {
            [r, g, b] => Ok(Color::Rgb {
                r: as_u8(r)?,
                g: as_u8(g)?,
                b: as_u8(b)?,
            }),
            [r, g, b, a] => Ok(Color::Rgba {
                r: as_u8(r)?,
                g: as_u8(g)?,
                b: as_u8(b)?,
                a: a.as_f64().ok_or(Error::InvalidColor)?,
            }),
            _ => Err(Error::InvalidColor),
        },
        _ => Err(Error::InvalidColor),
    }
}

fn as_u8(value: &Value) -> Result<u8, Error> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(Error::InvalidColor)
}

impl TryFrom<RawRenderSettingsWrapper> for RenderSettings {
    type Error = Error;

    fn try_from(wrapper: RawRenderSettingsWrapper) -> Result<Self, Error> {
        let raw = wrapper.0;
        Ok(RenderSettings {
            width: raw.width,
            height: raw.height,
            padding: raw.padding,
            stop_radius: raw.stop_radius,
            line_width: raw.line_width,
            bus_label_font_size: raw.bus_label_font_size,
            bus_label_offset: (raw.bus_label_offset[0], raw.bus_label_offset[1]),
            stop_label_font_size: raw.stop_label_font_size,
            stop_label_offset: (raw.stop_label_offset[0], raw.stop_label_offset[1]),
            underlayer_color: parse_color(&raw.underlayer_color)?,
            underlayer_width: raw.underlayer_width,
            color_palette: raw.color_palette.iter().map(parse_color).collect::<Result<_, _>>()?,
        })
    }
}

impl TryFrom<RawRoutingSettings> for RoutingSettings {
    type Error = crate::router::Error;

    fn try_from(raw: RawRoutingSettings) -> Result<Self, Self::Error> {
        RoutingSettings::new(raw.bus_wait_time, raw.bus_velocity)
    }
}

/// Ingests base requests into `catalogue`: all stops first (so every
/// distance and bus reference resolves), then distances, then buses.
pub fn ingest_base_requests(catalogue: &mut Catalogue, requests: &[BaseRequest]) -> Result<(), Error> {
    for request in requests {
        if let BaseRequest::Stop { name, latitude, longitude, .. } = request {
            catalogue.add_stop(name, Coordinate::new(*latitude, *longitude));
        }
    }
    for request in requests {
        if let BaseRequest::Stop { name, road_distances, .. } = request {
            for (other, meters) in road_distances {
                catalogue.set_distance(name, other, *meters);
            }
        }
    }
    for request in requests {
        if let BaseRequest::Bus { name, is_roundtrip, stops } = request {
            let stop_refs: Vec<&str> = stops.iter().map(String::as_str).collect();
            catalogue.add_bus(name, &stop_refs, *is_roundtrip)?;
        }
    }
    debug!(
        "Ingested {} stops, {} buses from {} base requests",
        catalogue.stop_count(),
        catalogue.bus_count(),
        requests.len()
    );
    Ok(())
}

/// Answers every stat request, returning the response array in request order.
pub fn answer_all(
    requests: &[StatRequest],
    catalogue: &Catalogue,
    router: Option<&TransportRouter>,
    render_settings: &RenderSettings,
) -> Vec<Value> {
    requests
        .iter()
        .map(|request| answer(request, catalogue, router, render_settings))
        .collect()
}

fn answer(
    request: &StatRequest,
    catalogue: &Catalogue,
    router: Option<&TransportRouter>,
    render_settings: &RenderSettings,
) -> Value {
    match request {
        StatRequest::Stop { id, name } => stop_response(*id, name, catalogue),
        StatRequest::Bus { id, name } => bus_response(*id, name, catalogue),
        StatRequest::Map { id } => map_response(*id, catalogue, render_settings),
        StatRequest::Route { id, from, to } => route_response(*id, from, to, catalogue, router),
    }
}

fn not_found(id: i64) -> Value {
    json!({ "request_id": id, "error_message": "not found" })
}

fn stop_response(id: i64, name: &str, catalogue: &Catalogue) -> Value {
    if catalogue.stop(name).is_none() {
        return not_found(id);
    }
    let buses: Vec<String> = catalogue
        .buses_by_stop(name)
        .unwrap_or_default()
        .into_iter()
        .map(|bus| bus.name.to_string())
        .collect();
    json!({ "request_id": id, "buses": buses })
}

fn bus_response(id: i64, name: &str, catalogue: &Catalogue) -> Value {
    let Some(stat) = catalogue.bus_stat(name) else {
        return not_found(id);
    };
    json!({
        "request_id": id,
        "stop_count": stat.stops_on_route,
        "unique_stop_count": stat.unique_stops,
        "route_length": stat.route_length,
        "curvature": stat.curvature,
    })
}

fn map_response(id: i64, catalogue: &Catalogue, render_settings: &RenderSettings) -> Value {
    let renderer = MapRenderer::new(catalogue, render_settings.clone());
    json!({ "request_id": id, "map": renderer.render() })
}

fn route_response(
    id: i64,
    from: &str,
    to: &str,
    catalogue: &Catalogue,
    router: Option<&TransportRouter>,
) -> Value {
    let (Some(from_stop), Some(to_stop)) = (catalogue.stop(from), catalogue.stop(to)) else {
        return not_found(id);
    };
    let Some(router) = router else {
        return not_found(id);
    };
    let Some((total_time, items)) = router.route_info(from_stop.index, to_stop.index) else {
        return not_found(id);
    };

    let items: Vec<Value> = items
        .into_iter()
        .map(|item| match item {
            ItineraryItem::Wait { stop, time } => json!({
                "type": "Wait",
                "time": time,
                "stop_name": stop.to_string(),
            }),
            ItineraryItem::Bus { bus, span, time } => json!({
                "type": "Bus",
                "time": time,
                "bus": bus.to_string(),
                "span_count": span,
            }),
        })
        .collect();

    json!({ "request_id": id, "total_time": total_time, "items": items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_unknown_stop_is_not_found() {
        let catalogue = Catalogue::new();
        let response = stop_response(1, "X", &catalogue);
        assert_eq!(response, json!({ "request_id": 1, "error_message": "not found" }));
    }

    #[test]
    fn s4_unknown_bus_is_not_found() {
        let catalogue = Catalogue::new();
        let response = bus_response(1, "X", &catalogue);
        assert_eq!(response, json!({ "request_id": 1, "error_message": "not found" }));
    }

    #[test]
    fn s1_route_items() {
        let mut catalogue = Catalogue::new();
        catalogue.add_stop("A", Coordinate::new(0.0, 0.0));
        catalogue.add_stop("B", Coordinate::new(0.0, 1.0));
        catalogue.set_distance("A", "B", 1000.0);
        catalogue.add_bus("1", &["A", "B"], false).unwrap();
        let settings = RoutingSettings::new(6, 60.0).unwrap();
        let router = TransportRouter::build(&catalogue, settings);

        let response = route_response(1, "A", "B", &catalogue, Some(&router));
        assert_eq!(response["total_time"], json!(7.0));
        assert_eq!(response["items"][0]["type"], json!("Wait"));
        assert_eq!(response["items"][1]["type"], json!("Bus"));
    }

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color(&json!("red")).unwrap(), Color::Named("red".into()));
        assert_eq!(parse_color(&json!([1, 2, 3])).unwrap(), Color::Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(
            parse_color(&json!([1, 2, 3, 0.5])).unwrap(),
            Color::Rgba { r: 1, g: 2, b: 3, a: 0.5 }
        );
    }
}
