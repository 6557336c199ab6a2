use std::cmp::Ordering;

use log::debug;
use petgraph::Undirected;
use petgraph::graphmap::GraphMap;
use rustworkx_core::connectivity::connected_components;
use serde::Serialize;

use super::device::DeviceIndex;
use super::scoring::ConflictEdge;


// Edge weight is the position of the edge in the analysed edge list.
type EdgeIndex   = usize;
type ConflictMap = GraphMap<DeviceIndex, EdgeIndex, Undirected>;


#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConflictCluster {
    members: Vec<DeviceIndex>,
    edges: Vec<ConflictEdge>,
    max_severity: f64,
    total_severity: f64,
}

impl ConflictCluster {
    fn new(mut members: Vec<DeviceIndex>, mut edges: Vec<ConflictEdge>) -> Self {
        members.sort_unstable();
        edges.sort_by_key(|edge| (edge.source, edge.target));

        let max_severity = edges
            .iter()
            .map(|edge| edge.severity)
            .fold(0.0, f64::max);
        let total_severity = edges
            .iter()
            .map(|edge| edge.severity)
            .sum();

        Self { members, edges, max_severity, total_severity }
    }

    // Sorted ascending.
    #[must_use]
    pub fn members(&self) -> &[DeviceIndex] {
        &self.members
    }

    #[must_use]
    pub fn edges(&self) -> &[ConflictEdge] {
        &self.edges
    }

    #[must_use]
    pub fn max_severity(&self) -> f64 {
        self.max_severity
    }

    #[must_use]
    pub fn total_severity(&self) -> f64 {
        self.total_severity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, device: DeviceIndex) -> bool {
        self.members.binary_search(&device).is_ok()
    }

    // Highest severity among the member's own edges.
    #[must_use]
    pub fn worst_severity_of(&self, device: DeviceIndex) -> f64 {
        self.edges
            .iter()
            .filter(|edge| edge.touches(device))
            .map(|edge| edge.severity)
            .fold(0.0, f64::max)
    }

    fn lowest_member(&self) -> DeviceIndex {
        self.members.first().copied().unwrap_or(DeviceIndex::MAX)
    }
}


#[derive(Clone, Debug, Default)]
pub struct ConflictGraph {
    graph_map: ConflictMap,
}

impl ConflictGraph {
    #[must_use]
    pub fn new() -> Self {
        Self { graph_map: GraphMap::new() }
    }

    #[must_use]
    pub fn from_edges(edges: &[ConflictEdge]) -> Self {
        let mut conflict_graph = Self::new();
        conflict_graph.update(edges);

        conflict_graph
    }

    pub fn update(&mut self, edges: &[ConflictEdge]) {
        self.graph_map.clear();

        for (edge_index, edge) in edges.iter().enumerate() {
            // Loops can not represent a conflict.
            if edge.source == edge.target {
                continue;
            }

            self.graph_map.add_edge(edge.source, edge.target, edge_index);
        }
    }

    // Connected components, each carrying its own edges.
    #[must_use]
    pub fn clusters(&self, edges: &[ConflictEdge]) -> Vec<ConflictCluster> {
        let mut clusters: Vec<ConflictCluster> = connected_components(&self.graph_map)
            .into_iter()
            .map(|component| {
                let members: Vec<DeviceIndex> = component.into_iter().collect();
                let cluster_edges = members
                    .iter()
                    .flat_map(|member| self.graph_map.edges(*member))
                    .filter(|(source, target, _)| source < target)
                    .filter_map(|(_, _, edge_index)| edges.get(*edge_index))
                    .copied()
                    .collect();

                ConflictCluster::new(members, cluster_edges)
            })
            .collect();

        clusters.sort_by(compare_clusters);

        clusters
    }
}

// Worst cluster first, then the one holding the lowest device identifier.
fn compare_clusters(cluster1: &ConflictCluster, cluster2: &ConflictCluster) -> Ordering {
    cluster2.max_severity
        .total_cmp(&cluster1.max_severity)
        .then_with(|| cluster1.lowest_member().cmp(&cluster2.lowest_member()))
}


/// Partitions materially scored edges into independent clusters.
#[must_use]
pub fn group(edges: &[ConflictEdge]) -> Vec<ConflictCluster> {
    let clusters = ConflictGraph::from_edges(edges).clusters(edges);

    debug!(
        "Grouped {} conflict edges into {} clusters",
        edges.len(),
        clusters.len()
    );

    clusters
}


#[cfg(test)]
mod tests {
    use crate::backend::propagation::PropagationEstimate;

    use super::*;


    fn edge(source: DeviceIndex, target: DeviceIndex, severity: f64) -> ConflictEdge {
        ConflictEdge {
            source,
            target,
            overlap_mhz: 20.0,
            propagation: PropagationEstimate {
                distance_km: 0.1,
                within_beam: true,
                reverse_within_beam: true,
                attenuation_db: 90.0,
                beam_coupling: 1.0,
                significant: true,
            },
            severity,
        }
    }

    fn sample_edges() -> Vec<ConflictEdge> {
        // Conflict graph:
        //
        //  0 -(0.3)- 1 -(0.5)- 2       3 -(0.9)- 4       5 -(0.5)- 7
        //
        vec![
            edge(0, 1, 0.3),
            edge(1, 2, 0.5),
            edge(3, 4, 0.9),
            edge(5, 7, 0.5),
        ]
    }


    #[test]
    fn clusters_are_connected_components() {
        let clusters = group(&sample_edges());

        assert_eq!(3, clusters.len());
        assert_eq!(&[3, 4], clusters[0].members());
        assert_eq!(&[0, 1, 2], clusters[1].members());
        assert_eq!(&[5, 7], clusters[2].members());
    }

    #[test]
    fn equal_severity_clusters_are_ordered_by_lowest_member() {
        let clusters = group(&sample_edges());

        assert_eq!(clusters[1].max_severity(), clusters[2].max_severity());
        assert!(clusters[1].members()[0] < clusters[2].members()[0]);
    }

    #[test]
    fn clusters_partition_the_edge_set() {
        let edges = sample_edges();
        let clusters = group(&edges);

        let mut seen_members: Vec<DeviceIndex> = clusters
            .iter()
            .flat_map(|cluster| cluster.members().to_vec())
            .collect();
        let member_count = seen_members.len();
        seen_members.sort_unstable();
        seen_members.dedup();

        assert_eq!(member_count, seen_members.len());

        let mut clustered_edges: Vec<(DeviceIndex, DeviceIndex)> = clusters
            .iter()
            .flat_map(|cluster| cluster.edges().to_vec())
            .map(|edge| (edge.source, edge.target))
            .collect();
        clustered_edges.sort_unstable();

        let mut all_edges: Vec<(DeviceIndex, DeviceIndex)> = edges
            .iter()
            .map(|edge| (edge.source, edge.target))
            .collect();
        all_edges.sort_unstable();

        assert_eq!(all_edges, clustered_edges);
    }

    #[test]
    fn cluster_statistics() {
        let clusters = group(&sample_edges());
        let chain = &clusters[1];

        assert_eq!(0.5, chain.max_severity());
        assert!((chain.total_severity() - 0.8).abs() < 1e-9);
        assert_eq!(0.5, chain.worst_severity_of(1));
        assert_eq!(0.3, chain.worst_severity_of(0));
        assert!(chain.contains(2));
        assert!(!chain.contains(3));
    }

    #[test]
    fn no_edges_no_clusters() {
        assert!(group(&[]).is_empty());
    }
}
