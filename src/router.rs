//! The transport router (C4): a layered time-weighted graph built over a
//! [`Catalogue`], with per-edge semantic tags so edge sequences can be turned
//! back into human-readable itineraries.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::debug;

use crate::catalogue::Catalogue;
use crate::graph::{EdgeId, Graph, ShortestPaths, Table, VertexId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("bus_wait_time must be at least 1 minute")]
    InvalidWaitTime,
    #[error("bus_velocity must be greater than zero")]
    InvalidVelocity,
}

/// Minutes per stop of boarding delay and km/h line speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingSettings {
    pub bus_wait_time: u32,
    pub bus_velocity: f64,
}

impl RoutingSettings {
    pub fn new(bus_wait_time: u32, bus_velocity: f64) -> Result<Self, Error> {
        if bus_wait_time < 1 {
            return Err(Error::InvalidWaitTime);
        }
        if bus_velocity <= 0.0 {
            return Err(Error::InvalidVelocity);
        }
        Ok(Self {
            bus_wait_time,
            bus_velocity,
        })
    }
}

/// The `(in, out)` vertex pair assigned to a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopVertex {
    pub in_v: VertexId,
    pub out_v: VertexId,
}

/// What an edge in the routing graph actually means, needed to turn a raw
/// edge sequence back into a readable itinerary.
#[derive(Debug, Clone, PartialEq)]
pub enum ItineraryItem {
    Wait { stop: Arc<str>, time: f64 },
    Bus { bus: Arc<str>, span: u32, time: f64 },
}

impl ItineraryItem {
    pub fn time(&self) -> f64 {
        match self {
            ItineraryItem::Wait { time, .. } => *time,
            ItineraryItem::Bus { time, .. } => *time,
        }
    }
}

const MINUTES_PER_METER_PER_KMH: f64 = 3.6 / 60.0;

/// Builds and queries the routing graph over a [`Catalogue`].
pub struct TransportRouter {
    settings: RoutingSettings,
    vertex_ids: Vec<StopVertex>,
    graph: Graph<f64>,
    tags: Vec<ItineraryItem>,
    paths: ShortestPaths<f64>,
}

impl TransportRouter {
    /// Builds the graph from scratch and computes the full all-pairs table.
    /// This is the path taken in build mode.
    pub fn build(catalogue: &Catalogue, settings: RoutingSettings) -> Self {
        let now = Instant::now();
        let stop_count = catalogue.stop_count();
        let mut graph: Graph<f64> = Graph::new((stop_count * 2) as u32);
        let mut tags: Vec<ItineraryItem> = Vec::new();
        let mut vertex_ids = vec![StopVertex { in_v: 0, out_v: 0 }; stop_count];

        for (k, stop) in catalogue.stops_sorted().into_iter().enumerate() {
            let in_v = (2 * k) as u32;
            let out_v = (2 * k + 1) as u32;
            vertex_ids[stop.index as usize] = StopVertex { in_v, out_v };

            let edge_id = graph.add_edge(in_v, out_v, settings.bus_wait_time as f64).unwrap();
            debug_assert_eq!(edge_id as usize, tags.len());
            tags.push(ItineraryItem::Wait {
                stop: stop.name.clone(),
                time: settings.bus_wait_time as f64,
            });
        }

        for bus in catalogue.buses_sorted() {
            let route = &bus.route;
            for i in 0..route.len().saturating_sub(1) {
                let mut cumulative = 0.0;
                for j in (i + 1)..route.len() {
                    cumulative += catalogue.distance_by_index(route[j - 1], route[j]);
                    if route[i] == route[j] {
                        continue;
                    }
                    let time = (cumulative / settings.bus_velocity) * MINUTES_PER_METER_PER_KMH;
                    let from_v = vertex_ids[route[i] as usize].out_v;
                    let to_v = vertex_ids[route[j] as usize].in_v;
                    let edge_id = graph.add_edge(from_v, to_v, time).unwrap();
                    debug_assert_eq!(edge_id as usize, tags.len());
                    tags.push(ItineraryItem::Bus {
                        bus: bus.name.clone(),
                        span: (j - i) as u32,
                        time,
                    });
                }
            }
        }

        let paths = ShortestPaths::build(&graph);
        debug!(
            "Built router over {} stops, {} edges, took {:?}",
            stop_count,
            graph.edges().len(),
            now.elapsed()
        );
        Self {
            settings,
            vertex_ids,
            graph,
            tags,
            paths,
        }
    }

    /// Accepts an already-built graph, tag table, and all-pairs table,
    /// skipping recomputation entirely. This is the path taken when
    /// rehydrating a serialized artifact in query mode.
    pub fn from_parts(
        settings: RoutingSettings,
        vertex_ids: Vec<StopVertex>,
        graph: Graph<f64>,
        tags: Vec<ItineraryItem>,
        table: Table<f64>,
    ) -> Self {
        let paths = ShortestPaths::from_table(table);
        Self {
            settings,
            vertex_ids,
            graph,
            tags,
            paths,
        }
    }

    pub fn settings(&self) -> RoutingSettings {
        self.settings
    }

    pub fn vertex_ids(&self) -> &[StopVertex] {
        &self.vertex_ids
    }

    pub fn graph(&self) -> &Graph<f64> {
        &self.graph
    }

    pub fn tags(&self) -> &[ItineraryItem] {
        &self.tags
    }

    pub fn table(&self) -> &Table<f64> {
        self.paths.table()
    }

    /// Returns the fastest itinerary between two stops (by catalogue index),
    /// or `None` if no path connects them. Callers are expected to validate
    /// that both stops exist before calling this — the router itself knows
    /// nothing about stop names.
    pub fn route_info(&self, from_stop: u32, to_stop: u32) -> Option<(f64, Vec<ItineraryItem>)> {
        let from_v = self.vertex_ids[from_stop as usize].in_v;
        let to_v = self.vertex_ids[to_stop as usize].in_v;
        let (total_weight, edge_ids) = self.paths.build_route(&self.graph, from_v, to_v)?;
        let items = edge_ids
            .into_iter()
            .map(|id: EdgeId| self.tags[id as usize].clone())
            .collect();
        Some((total_weight, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn sample() -> Catalogue {
        let mut c = Catalogue::new();
        c.add_stop("A", Coordinate::new(0.0, 0.0));
        c.add_stop("B", Coordinate::new(0.0, 1.0));
        c.set_distance("A", "B", 1000.0);
        c.add_bus("1", &["A", "B"], false).unwrap();
        c
    }

    #[test]
    fn s1_route_a_to_b() {
        let c = sample();
        let settings = RoutingSettings::new(6, 60.0).unwrap();
        let router = TransportRouter::build(&c, settings);

        let a = c.stop("A").unwrap().index;
        let b = c.stop("B").unwrap().index;

        let (total, items) = router.route_info(a, b).unwrap();
        assert_eq!(total, 7.0);
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], ItineraryItem::Wait { time, .. } if *time == 6.0));
        assert!(matches!(&items[1], ItineraryItem::Bus { span, time, .. } if *span == 1 && *time == 1.0));
    }

    #[test]
    fn s2_slower_velocity_doubles_bus_time() {
        let c = sample();
        let settings = RoutingSettings::new(6, 30.0).unwrap();
        let router = TransportRouter::build(&c, settings);

        let a = c.stop("A").unwrap().index;
        let b = c.stop("B").unwrap().index;

        let (total, _) = router.route_info(a, b).unwrap();
        assert_eq!(total, 8.0);
    }

    #[test]
    fn unreachable_pair_is_none() {
        let mut c = sample();
        c.add_stop("C", Coordinate::new(2.0, 2.0));
        let settings = RoutingSettings::new(1, 60.0).unwrap();
        let router = TransportRouter::build(&c, settings);

        let a = c.stop("A").unwrap().index;
        let cc = c.stop("C").unwrap().index;
        assert!(router.route_info(a, cc).is_none());
    }
}
