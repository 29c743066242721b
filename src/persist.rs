//! Binary persistence (C6): a schema binding the catalogue, the router, and
//! render settings together with stable integer ids replacing stop/bus
//! names, written and read with `bincode` over `serde` derives.
//!
//! Grounded on `serialization.h`/`serialization.cpp` (original_source) for
//! the schema shape: stops and buses get contiguous ids assigned in name
//! order, buses and distances reference stops by id, the router ships its
//! edge list and all-pairs table flat, and the edge-info list tags each edge
//! with a `name_id` into whichever of stops/buses it refers to.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalogue::Catalogue;
use crate::geo::Coordinate;
use crate::graph::{Graph, RouteInternalData, Table};
use crate::render::RenderSettings;
use crate::router::{ItineraryItem, RoutingSettings, StopVertex, TransportRouter};

#[derive(Error, Debug)]
pub enum Error {
    #[error("empty file path")]
    EmptyPath,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact: {0}")]
    Encoding(#[from] bincode::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaStop {
    name: String,
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaBus {
    name: String,
    route: Vec<u32>,
    roundtrip: bool,
    final_stop: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SchemaDistance {
    from: u32,
    to: u32,
    meters: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaCatalogue {
    stops: Vec<SchemaStop>,
    buses: Vec<SchemaBus>,
    distances: Vec<SchemaDistance>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SchemaEdge {
    from: u32,
    to: u32,
    weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SchemaCell {
    weight: f64,
    prev_edge: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaEdgeInfo {
    is_bus_edge: bool,
    name_id: u32,
    time: f64,
    span: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SchemaStopVertex {
    in_v: u32,
    out_v: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SchemaRoutingSettings {
    bus_wait_time: u32,
    bus_velocity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaRouter {
    settings: SchemaRoutingSettings,
    vertex_ids: Vec<SchemaStopVertex>,
    edges: Vec<SchemaEdge>,
    table: Vec<Vec<Option<SchemaCell>>>,
    edges_info: Vec<SchemaEdgeInfo>,
}

/// The full binary container: catalogue, router, and render settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    catalogue: SchemaCatalogue,
    router: SchemaRouter,
    render_settings: RenderSettings,
}

impl Artifact {
    /// Builds a serializable artifact from the live runtime state, assigning
    /// stops and buses contiguous ids in name order.
    pub fn from_runtime(
        catalogue: &Catalogue,
        router: &TransportRouter,
        render_settings: RenderSettings,
    ) -> Self {
        let sorted_stops = catalogue.stops_sorted();
        let stop_id_by_index: HashMap<u32, u32> = sorted_stops
            .iter()
            .enumerate()
            .map(|(id, stop)| (stop.index, id as u32))
            .collect();
        let stops = sorted_stops
            .iter()
            .map(|stop| SchemaStop {
                name: stop.name.to_string(),
                lat: stop.coordinate.lat,
                lng: stop.coordinate.lng,
            })
            .collect();

        let sorted_buses = catalogue.buses_sorted();
        let bus_id_by_index: HashMap<u32, u32> = sorted_buses
            .iter()
            .enumerate()
            .map(|(id, bus)| (bus.index, id as u32))
            .collect();
        let buses = sorted_buses
            .iter()
            .map(|bus| SchemaBus {
                name: bus.name.to_string(),
                route: bus.route.iter().map(|idx| stop_id_by_index[idx]).collect(),
                roundtrip: bus.roundtrip,
                final_stop: stop_id_by_index[&bus.final_stop],
            })
            .collect();

        let distances = catalogue
            .raw_distances()
            .map(|(from, to, meters)| SchemaDistance {
                from: stop_id_by_index[&from],
                to: stop_id_by_index[&to],
                meters,
            })
            .collect();

        let vertex_ids = sorted_stops
            .iter()
            .map(|stop| {
                let v = router.vertex_ids()[stop.index as usize];
                SchemaStopVertex {
                    in_v: v.in_v,
                    out_v: v.out_v,
                }
            })
            .collect();

        let edges = router
            .graph()
            .edges()
            .iter()
            .map(|edge| SchemaEdge {
                from: edge.from,
                to: edge.to,
                weight: edge.weight,
            })
            .collect();

        let table = router
            .table()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.map(|c| SchemaCell {
                            weight: c.weight,
                            prev_edge: c.prev_edge,
                        })
                    })
                    .collect()
            })
            .collect();

        let edges_info = router
            .tags()
            .iter()
            .map(|tag| match tag {
                ItineraryItem::Wait { stop, time } => {
                    let stop_index = catalogue.stop(stop).expect("tag references known stop").index;
                    SchemaEdgeInfo {
                        is_bus_edge: false,
                        name_id: stop_id_by_index[&stop_index],
                        time: *time,
                        span: None,
                    }
                }
                ItineraryItem::Bus { bus, span, time } => {
                    let bus_index = catalogue.bus(bus).expect("tag references known bus").index;
                    SchemaEdgeInfo {
                        is_bus_edge: true,
                        name_id: bus_id_by_index[&bus_index],
                        time: *time,
                        span: Some(*span),
                    }
                }
            })
            .collect();

        Self {
            catalogue: SchemaCatalogue {
                stops,
                buses,
                distances,
            },
            router: SchemaRouter {
                settings: SchemaRoutingSettings {
                    bus_wait_time: router.settings().bus_wait_time,
                    bus_velocity: router.settings().bus_velocity,
                },
                vertex_ids,
                edges,
                table,
                edges_info,
            },
            render_settings,
        }
    }

    /// Reconstructs the in-memory catalogue and router. The router is built
    /// in its "accept prebuilt table" mode: no shortest-path recomputation.
    pub fn rehydrate(&self) -> (Catalogue, TransportRouter, RenderSettings) {
        let mut catalogue = Catalogue::new();
        let mut names: Vec<String> = Vec::with_capacity(self.catalogue.stops.len());
        for stop in &self.catalogue.stops {
            catalogue.add_stop(&stop.name, Coordinate::new(stop.lat, stop.lng));
            names.push(stop.name.clone());
        }

        for distance in &self.catalogue.distances {
            catalogue.set_distance(&names[distance.from as usize], &names[distance.to as usize], distance.meters);
        }

        for bus in &self.catalogue.buses {
            catalogue.add_bus_raw(&bus.name, bus.route.clone(), bus.roundtrip, bus.final_stop);
        }

        let vertex_ids: Vec<StopVertex> = self
            .router
            .vertex_ids
            .iter()
            .map(|v| StopVertex {
                in_v: v.in_v,
                out_v: v.out_v,
            })
            .collect();

        let vertex_count = vertex_ids.len() as u32 * 2;
        let mut graph: Graph<f64> = Graph::new(vertex_count);
        for edge in &self.router.edges {
            graph.add_edge(edge.from, edge.to, edge.weight).expect("artifact edge references valid vertex");
        }

        let stop_names: Vec<_> = self.catalogue.stops.iter().map(|s| s.name.as_str()).collect();
        let bus_names: Vec<_> = self.catalogue.buses.iter().map(|b| b.name.as_str()).collect();
        let tags: Vec<ItineraryItem> = self
            .router
            .edges_info
            .iter()
            .map(|info| {
                if info.is_bus_edge {
                    ItineraryItem::Bus {
                        bus: bus_names[info.name_id as usize].into(),
                        span: info.span.unwrap_or(0),
                        time: info.time,
                    }
                } else {
                    ItineraryItem::Wait {
                        stop: stop_names[info.name_id as usize].into(),
                        time: info.time,
                    }
                }
            })
            .collect();

        let table: Table<f64> = self
            .router
            .table
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.map(|c| RouteInternalData {
                            weight: c.weight,
                            prev_edge: c.prev_edge,
                        })
                    })
                    .collect()
            })
            .collect();

        let settings = RoutingSettings {
            bus_wait_time: self.router.settings.bus_wait_time,
            bus_velocity: self.router.settings.bus_velocity,
        };
        let router = TransportRouter::from_parts(settings, vertex_ids, graph, tags, table);

        (catalogue, router, self.render_settings.clone())
    }
}

/// Writes `artifact` to `path` in binary mode. An empty path fails.
pub fn save(path: &str, artifact: &Artifact) -> Result<(), Error> {
    if path.is_empty() {
        return Err(Error::EmptyPath);
    }
    let bytes = bincode::serialize(artifact)?;
    debug!("Writing artifact ({} bytes) to {}", bytes.len(), path);
    fs::write(Path::new(path), bytes)?;
    Ok(())
}

/// Reads and decodes an artifact from `path`. Malformed input fails without
/// touching any existing in-memory state — the caller decides what happens
/// next.
pub fn load(path: &str) -> Result<Artifact, Error> {
    if path.is_empty() {
        return Err(Error::EmptyPath);
    }
    let bytes = fs::read(Path::new(path))?;
    debug!("Read artifact ({} bytes) from {}", bytes.len(), path);
    let artifact = bincode::deserialize(&bytes)?;
    Ok(artifact)
}
