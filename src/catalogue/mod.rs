mod entities;

pub use entities::*;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::geo::{self, Coordinate};

#[derive(Error, Debug)]
pub enum Error {
    #[error("bus route references unknown stop `{0}`")]
    UnknownStop(String),
}

/// In-memory store of stops, buses, inter-stop distances, and the derived
/// stop→buses index.
///
/// Stops and buses live in index-keyed arenas (`Vec<T>` plus a
/// `HashMap<Arc<str>, u32>` name lookup) rather than behind shared pointers,
/// so identity is just an integer and there is no cyclic ownership to reason
/// about.
#[derive(Debug, Default, Clone)]
pub struct Catalogue {
    stops: Vec<Stop>,
    stop_lookup: HashMap<Arc<str>, u32>,
    buses: Vec<Bus>,
    bus_lookup: HashMap<Arc<str>, u32>,
    distances: HashMap<(u32, u32), f64>,
    stop_to_buses: HashMap<u32, Vec<u32>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a stop. Idempotent on name: if a stop with this name already
    /// exists its coordinate is left untouched and its index is returned.
    pub fn add_stop(&mut self, name: &str, coordinate: Coordinate) -> u32 {
        if let Some(&index) = self.stop_lookup.get(name) {
            return index;
        }
        let index = self.stops.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.stops.push(Stop {
            index,
            name: name.clone(),
            coordinate,
        });
        self.stop_lookup.insert(name, index);
        index
    }

    /// Inserts a bus. Idempotent on name: if a bus with this name already
    /// exists nothing happens and its index is returned.
    ///
    /// `stops` is the caller-supplied direction; for `roundtrip == false` the
    /// stored route is `stops` followed by `stops` reversed, excluding the
    /// pivot. Every referenced stop must already exist in the catalogue.
    pub fn add_bus(
        &mut self,
        name: &str,
        stops: &[&str],
        roundtrip: bool,
    ) -> Result<u32, Error> {
        if let Some(&index) = self.bus_lookup.get(name) {
            return Ok(index);
        }

        let mut indices = Vec::with_capacity(stops.len());
        for &stop_name in stops {
            let stop_index = self
                .stop_lookup
                .get(stop_name)
                .copied()
                .ok_or_else(|| Error::UnknownStop(stop_name.to_string()))?;
            indices.push(stop_index);
        }

        // For a non-roundtrip line the turnaround is the last supplied stop,
        // i.e. the midpoint of the mirrored route — not `route.last()`, which
        // after mirroring is back to the first supplied stop.
        let final_stop = *indices.last().unwrap_or(&0);

        let route = if roundtrip {
            indices
        } else {
            let mut route = indices.clone();
            route.extend(indices.iter().rev().skip(1));
            route
        };
        let index = self.buses.len() as u32;
        let name: Arc<str> = Arc::from(name);

        let mut seen = std::collections::HashSet::new();
        for &stop_index in &route {
            if seen.insert(stop_index) {
                self.stop_to_buses.entry(stop_index).or_default().push(index);
            }
        }

        self.buses.push(Bus {
            index,
            name: name.clone(),
            route,
            roundtrip,
            final_stop,
        });
        self.bus_lookup.insert(name, index);
        Ok(index)
    }

    /// No-op if either endpoint is unknown; overwrites any prior value.
    pub fn set_distance(&mut self, from: &str, to: &str, meters: f64) {
        let (Some(&from_idx), Some(&to_idx)) =
            (self.stop_lookup.get(from), self.stop_lookup.get(to))
        else {
            return;
        };
        self.distances.insert((from_idx, to_idx), meters);
    }

    /// Returns `(from, to)` if set, else `(to, from)` if set, else `0.0`.
    pub fn distance(&self, from: &str, to: &str) -> f64 {
        let (Some(&from_idx), Some(&to_idx)) =
            (self.stop_lookup.get(from), self.stop_lookup.get(to))
        else {
            return 0.0;
        };
        self.distance_by_index(from_idx, to_idx)
    }

    pub(crate) fn distance_by_index(&self, from: u32, to: u32) -> f64 {
        if let Some(&d) = self.distances.get(&(from, to)) {
            return d;
        }
        if let Some(&d) = self.distances.get(&(to, from)) {
            return d;
        }
        0.0
    }

    pub fn stop(&self, name: &str) -> Option<&Stop> {
        let index = self.stop_lookup.get(name)?;
        Some(&self.stops[*index as usize])
    }

    pub fn bus(&self, name: &str) -> Option<&Bus> {
        let index = self.bus_lookup.get(name)?;
        Some(&self.buses[*index as usize])
    }

    pub fn stop_by_index(&self, index: u32) -> &Stop {
        &self.stops[index as usize]
    }

    pub fn bus_by_index(&self, index: u32) -> &Bus {
        &self.buses[index as usize]
    }

    /// Stops in name-lexicographic order.
    pub fn stops_sorted(&self) -> Vec<&Stop> {
        let mut stops: Vec<&Stop> = self.stops.iter().collect();
        stops.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        stops
    }

    /// Buses in name-lexicographic order.
    pub fn buses_sorted(&self) -> Vec<&Bus> {
        let mut buses: Vec<&Bus> = self.buses.iter().collect();
        buses.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        buses
    }

    /// Returns statistics for `name`, or `None` if no such bus exists.
    pub fn bus_stat(&self, name: &str) -> Option<BusStat> {
        let bus = self.bus(name)?;
        let stops_on_route = bus.route.len();
        let unique_stops = bus
            .route
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len();

        let mut route_length = 0.0;
        let mut great_circle_length = 0.0;
        for pair in bus.route.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            route_length += self.distance_by_index(a, b);
            let stop_a = &self.stops[a as usize];
            let stop_b = &self.stops[b as usize];
            great_circle_length += geo::great_circle_distance(&stop_a.coordinate, &stop_b.coordinate);
        }

        let curvature = if great_circle_length > 0.0 {
            route_length / great_circle_length
        } else {
            0.0
        };

        Some(BusStat {
            stops_on_route,
            unique_stops,
            route_length,
            curvature,
        })
    }

    /// Buses serving `name`, ordered by name, or `None` if the stop is never
    /// referenced by any route.
    pub fn buses_by_stop(&self, name: &str) -> Option<Vec<&Bus>> {
        let stop_index = self.stop_lookup.get(name)?;
        let bus_indices = self.stop_to_buses.get(stop_index)?;
        let mut buses: Vec<&Bus> = bus_indices
            .iter()
            .map(|&idx| &self.buses[idx as usize])
            .collect();
        buses.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Some(buses)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// All set distance entries, by stop index rather than name. Used by
    /// [`crate::persist`] to serialize the distance table.
    pub(crate) fn raw_distances(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        self.distances.iter().map(|(&(from, to), &meters)| (from, to, meters))
    }

    /// Inserts a bus with an already-computed stored route, bypassing the
    /// non-roundtrip mirroring and stop-existence validation that
    /// [`Catalogue::add_bus`] performs. Used when rehydrating a catalogue
    /// from a serialized artifact, where the route was mirrored once already
    /// at build time and the referenced stop ids are known to be valid.
    pub(crate) fn add_bus_raw(&mut self, name: &str, route: Vec<u32>, roundtrip: bool, final_stop: u32) -> u32 {
        let index = self.buses.len() as u32;
        let name: Arc<str> = Arc::from(name);

        let mut seen = std::collections::HashSet::new();
        for &stop_index in &route {
            if seen.insert(stop_index) {
                self.stop_to_buses.entry(stop_index).or_default().push(index);
            }
        }

        self.buses.push(Bus {
            index,
            name: name.clone(),
            route,
            roundtrip,
            final_stop,
        });
        self.bus_lookup.insert(name, index);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalogue {
        let mut c = Catalogue::new();
        c.add_stop("A", Coordinate::new(0.0, 0.0));
        c.add_stop("B", Coordinate::new(0.0, 1.0));
        c.add_stop("C", Coordinate::new(1.0, 1.0));
        c
    }

    #[test]
    fn add_stop_is_idempotent() {
        let mut c = sample();
        let first = c.add_stop("A", Coordinate::new(9.0, 9.0));
        assert_eq!(first, 0);
        assert_eq!(c.stop("A").unwrap().coordinate, Coordinate::new(0.0, 0.0));
    }

    #[test]
    fn distance_fallback() {
        let mut c = sample();
        c.set_distance("A", "B", 1000.0);
        assert_eq!(c.distance("A", "B"), 1000.0);
        assert_eq!(c.distance("B", "A"), 1000.0);

        c.set_distance("B", "A", 500.0);
        assert_eq!(c.distance("A", "B"), 1000.0);
        assert_eq!(c.distance("B", "A"), 500.0);
    }

    #[test]
    fn unknown_pair_is_zero() {
        let c = sample();
        assert_eq!(c.distance("A", "C"), 0.0);
    }

    #[test]
    fn non_roundtrip_expansion() {
        let mut c = sample();
        c.add_bus("1", &["A", "B", "C"], false).unwrap();
        let bus = c.bus("1").unwrap();
        assert_eq!(bus.route.len(), 5);
        let names: Vec<_> = bus
            .route
            .iter()
            .map(|&idx| c.stop_by_index(idx).name.to_string())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "B", "A"]);
    }

    #[test]
    fn non_roundtrip_final_stop_is_the_supplied_turnaround() {
        let mut c = sample();
        c.add_bus("1", &["A", "B", "C"], false).unwrap();
        let bus = c.bus("1").unwrap();
        assert_eq!(bus.final_stop, c.stop("C").unwrap().index);
        assert_ne!(bus.final_stop, bus.route[0]);
    }

    #[test]
    fn unknown_stop_in_route_errors() {
        let mut c = sample();
        let err = c.add_bus("1", &["A", "X"], true).unwrap_err();
        assert!(matches!(err, Error::UnknownStop(name) if name == "X"));
    }

    #[test]
    fn buses_by_stop_is_sorted() {
        let mut c = sample();
        c.add_bus("2", &["A", "B"], true).unwrap();
        c.add_bus("1", &["A", "C"], true).unwrap();
        let buses: Vec<_> = c
            .buses_by_stop("A")
            .unwrap()
            .into_iter()
            .map(|b| b.name.to_string())
            .collect();
        assert_eq!(buses, vec!["1", "2"]);
    }

    #[test]
    fn roundtrip_bus_stat() {
        let mut c = Catalogue::new();
        c.add_stop("A", Coordinate::new(0.0, 0.0));
        c.add_stop("B", Coordinate::new(0.0, 1.0));
        c.add_stop("C", Coordinate::new(1.0, 1.0));
        c.set_distance("A", "B", 100.0);
        c.set_distance("B", "C", 200.0);
        c.set_distance("C", "A", 300.0);
        c.add_bus("2", &["A", "B", "C", "A"], true).unwrap();

        let stat = c.bus_stat("2").unwrap();
        assert_eq!(stat.stops_on_route, 4);
        assert_eq!(stat.unique_stops, 3);
        assert_eq!(stat.route_length, 600.0);
    }
}
