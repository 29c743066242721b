//! A directed weighted graph and a generic, edge-semantics-agnostic
//! shortest-path engine. [`crate::router`] layers transit-specific meaning on
//! top; this module knows nothing about stops or buses.

use thiserror::Error;

pub type VertexId = u32;
pub type EdgeId = u32;

#[derive(Error, Debug)]
pub enum Error {
    #[error("vertex {0} is out of range")]
    InvalidVertex(VertexId),
}

#[derive(Debug, Clone, Copy)]
pub struct Edge<W> {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: W,
}

/// A directed weighted graph with integer vertex and edge ids assigned in
/// insertion order.
#[derive(Debug, Clone)]
pub struct Graph<W> {
    vertex_count: u32,
    edges: Vec<Edge<W>>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl<W: Copy> Graph<W> {
    pub fn new(vertex_count: u32) -> Self {
        Self {
            vertex_count,
            edges: Vec::new(),
            adjacency: vec![Vec::new(); vertex_count as usize],
        }
    }

    /// Adds an edge, returning its id.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, weight: W) -> Result<EdgeId, Error> {
        if from >= self.vertex_count {
            return Err(Error::InvalidVertex(from));
        }
        if to >= self.vertex_count {
            return Err(Error::InvalidVertex(to));
        }
        let id = self.edges.len() as u32;
        self.edges.push(Edge { from, to, weight });
        self.adjacency[from as usize].push(id);
        Ok(id)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn edges(&self) -> &[Edge<W>] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> &Edge<W> {
        &self.edges[id as usize]
    }
}

/// A cell of the dense all-pairs table: the best known weight to reach a
/// vertex, plus the id of the last edge on that path (`None` only when the
/// cell is the source itself).
#[derive(Debug, Clone, Copy)]
pub struct RouteInternalData<W> {
    pub weight: W,
    pub prev_edge: Option<EdgeId>,
}

/// Row-major `[from][to]` table. Absent cells mean unreachable.
pub type Table<W> = Vec<Vec<Option<RouteInternalData<W>>>>;

/// All-pairs shortest paths over a [`Graph`], either computed from scratch or
/// accepted prebuilt (the path taken when rehydrating a serialized artifact).
pub struct ShortestPaths<W> {
    table: Table<W>,
}

impl<W> ShortestPaths<W>
where
    W: Copy + PartialOrd + std::ops::Add<Output = W> + Default,
{
    /// Runs per-source Dijkstra from every vertex. Weights are assumed
    /// nonnegative.
    pub fn build(graph: &Graph<W>) -> Self {
        let table = (0..graph.vertex_count())
            .map(|source| dijkstra_from(graph, source))
            .collect();
        Self { table }
    }

    /// Accepts an already-computed table, skipping computation. This is the
    /// path taken at load time: the artifact ships the table so query mode
    /// never recomputes it.
    pub fn from_table(table: Table<W>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table<W> {
        &self.table
    }

    pub fn weight(&self, from: VertexId, to: VertexId) -> Option<W> {
        self.table[from as usize][to as usize].map(|cell| cell.weight)
    }

    /// Reconstructs the edge sequence from `from` to `to` by walking
    /// `prev_edge` backward from the destination cell, reversing the
    /// collected edges.
    pub fn build_route(
        &self,
        graph: &Graph<W>,
        from: VertexId,
        to: VertexId,
    ) -> Option<(W, Vec<EdgeId>)> {
        let total_weight = self.table[from as usize][to as usize]?.weight;

        let mut edges = Vec::new();
        let mut current = to;
        while current != from {
            let cell = self.table[from as usize][current as usize]?;
            let edge_id = cell.prev_edge?;
            edges.push(edge_id);
            current = graph.edge(edge_id).from;
        }
        edges.reverse();
        Some((total_weight, edges))
    }
}

fn dijkstra_from<W>(graph: &Graph<W>, source: VertexId) -> Vec<Option<RouteInternalData<W>>>
where
    W: Copy + PartialOrd + std::ops::Add<Output = W> + Default,
{
    let n = graph.vertex_count() as usize;
    let mut dist: Vec<Option<W>> = vec![None; n];
    let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];
    let mut visited = vec![false; n];
    dist[source as usize] = Some(W::default());

    for _ in 0..n {
        let Some(u) = (0..n)
            .filter(|&v| !visited[v])
            .filter_map(|v| dist[v].map(|d| (v, d)))
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(v, _)| v)
        else {
            break;
        };
        visited[u] = true;

        let current_dist = dist[u].unwrap();
        for &edge_id in &graph.adjacency[u] {
            let edge = graph.edge(edge_id);
            let candidate = current_dist + edge.weight;
            let to = edge.to as usize;
            let better = match dist[to] {
                None => true,
                Some(existing) => candidate < existing,
            };
            if better {
                dist[to] = Some(candidate);
                prev_edge[to] = Some(edge_id);
            }
        }
    }

    (0..n)
        .map(|v| {
            dist[v].map(|weight| RouteInternalData {
                weight,
                prev_edge: prev_edge[v],
            })
        })
        .collect()
}
