use std::sync::Arc;

use crate::geo::Coordinate;

/// A named geographic point. Immutable once inserted into a [`crate::Catalogue`].
#[derive(Debug, Clone)]
pub struct Stop {
    /// Index into the catalogue's `stops` arena.
    pub index: u32,
    pub name: Arc<str>,
    pub coordinate: Coordinate,
}

/// A named, ordered sequence of stops.
///
/// `route` always holds the *stored* sequence: for a roundtrip bus this is the
/// caller-supplied stop list verbatim; for a non-roundtrip bus it is the
/// supplied list concatenated with its reverse, excluding the pivot, so it has
/// odd length and is symmetric around its midpoint.
#[derive(Debug, Clone)]
pub struct Bus {
    pub index: u32,
    pub name: Arc<str>,
    /// Stop indices, in stored (possibly mirrored) order.
    pub route: Vec<u32>,
    pub roundtrip: bool,
    /// Stop index of the line's turnaround.
    pub final_stop: u32,
}

/// Derived statistics for a bus, computed on demand by [`crate::Catalogue::bus_stat`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BusStat {
    pub stops_on_route: usize,
    pub unique_stops: usize,
    pub route_length: f64,
    pub curvature: f64,
}
