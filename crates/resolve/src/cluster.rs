use ingest::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::config::LinkageMode;
use crate::similarity::SimilarityEdge;

/// Records believed to denote one person, plus the edges that justified it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Sorted
    pub members: Vec<RecordId>,
    pub edges: Vec<SimilarityEdge>,
}

impl Cluster {
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Disjoint-set forest with union by rank and path halving
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct Clusterer {
    threshold: f64,
    linkage: LinkageMode,
}

impl Clusterer {
    pub fn new(threshold: f64, linkage: LinkageMode) -> Self {
        Self { threshold, linkage }
    }

    /// Partition `ids` using the edges scoring at least the threshold.
    ///
    /// Every id ends up in exactly one cluster; with no qualifying edges
    /// each record is its own singleton. Output is independent of edge order.
    pub fn cluster(&self, ids: &[RecordId], edges: &[SimilarityEdge]) -> Vec<Cluster> {
        let mut universe: Vec<RecordId> = ids.to_vec();
        universe.sort();
        universe.dedup();
        let position: HashMap<&RecordId, usize> =
            universe.iter().enumerate().map(|(i, id)| (id, i)).collect();

        // Resolve endpoints and order qualifying edges canonically
        let mut qualifying: Vec<(usize, usize, &SimilarityEdge)> = edges
            .iter()
            .filter(|edge| edge.score >= self.threshold)
            .filter_map(|edge| match (position.get(&edge.a), position.get(&edge.b)) {
                (Some(&a), Some(&b)) if a != b => Some((a.min(b), a.max(b), edge)),
                _ => {
                    debug!(a = %edge.a, b = %edge.b, "Ignoring edge outside the clustered universe");
                    None
                }
            })
            .collect();
        // Duplicate pairs keep their best score
        qualifying.sort_by(|x, y| {
            (x.0, x.1)
                .cmp(&(y.0, y.1))
                .then_with(|| y.2.score.total_cmp(&x.2.score))
        });
        qualifying.dedup_by(|x, y| (x.0, x.1) == (y.0, y.1));

        let group_of = match self.linkage {
            LinkageMode::ConnectedComponents => connected_components(universe.len(), &qualifying),
            LinkageMode::CompleteLinkage => complete_linkage(universe.len(), &qualifying),
        };

        let mut groups: BTreeMap<usize, Cluster> = BTreeMap::new();
        for (pos, id) in universe.iter().enumerate() {
            // Keyed by the smallest member so clusters come out sorted
            let cluster = groups.entry(group_of[pos]).or_insert_with(|| Cluster {
                members: Vec::new(),
                edges: Vec::new(),
            });
            cluster.members.push(id.clone());
        }
        for (a, b, edge) in &qualifying {
            if group_of[*a] == group_of[*b] {
                if let Some(cluster) = groups.get_mut(&group_of[*a]) {
                    cluster.edges.push((*edge).clone());
                }
            }
        }

        groups.into_values().collect()
    }
}

/// Group label per position: the smallest position in its component
fn connected_components(n: usize, edges: &[(usize, usize, &SimilarityEdge)]) -> Vec<usize> {
    let mut forest = UnionFind::new(n);
    for (a, b, _) in edges {
        forest.union(*a, *b);
    }

    let mut smallest: HashMap<usize, usize> = HashMap::new();
    let roots: Vec<usize> = (0..n).map(|i| forest.find(i)).collect();
    for (i, root) in roots.iter().enumerate() {
        smallest.entry(*root).or_insert(i);
    }
    roots.iter().map(|root| smallest[root]).collect()
}

/// Agglomerate along edges by descending score, merging two groups only if
/// every cross pair qualifies on its own.
fn complete_linkage(n: usize, edges: &[(usize, usize, &SimilarityEdge)]) -> Vec<usize> {
    let linked: HashSet<(usize, usize)> = edges.iter().map(|(a, b, _)| (*a, *b)).collect();

    let mut by_score: Vec<&(usize, usize, &SimilarityEdge)> = edges.iter().collect();
    by_score.sort_by(|x, y| {
        y.2.score
            .total_cmp(&x.2.score)
            .then_with(|| (x.0, x.1).cmp(&(y.0, y.1)))
    });

    let mut group_of: Vec<usize> = (0..n).collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    for (a, b, _) in by_score {
        let (ga, gb) = (group_of[*a], group_of[*b]);
        if ga == gb {
            continue;
        }
        let fully_linked = members[ga].iter().all(|&x| {
            members[gb]
                .iter()
                .all(|&y| linked.contains(&(x.min(y), x.max(y))))
        });
        if !fully_linked {
            continue;
        }

        let (keep, absorb) = if ga < gb { (ga, gb) } else { (gb, ga) };
        let moved = std::mem::take(&mut members[absorb]);
        for &m in &moved {
            group_of[m] = keep;
        }
        members[keep].extend(moved);
    }

    group_of
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<RecordId> {
        names.iter().map(|n| RecordId::from(*n)).collect()
    }

    fn edge(a: &str, b: &str, score: f64) -> SimilarityEdge {
        SimilarityEdge::new(RecordId::from(a), RecordId::from(b), score)
    }

    fn member_sets(clusters: &[Cluster]) -> Vec<Vec<&str>> {
        clusters
            .iter()
            .map(|c| c.members.iter().map(|m| m.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(4);
        assert!(uf.union(0, 1));
        assert!(uf.union(2, 3));
        assert!(!uf.union(1, 0));
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(2));
    }

    #[test]
    fn test_no_edges_gives_singletons() {
        let clusterer = Clusterer::new(0.8, LinkageMode::ConnectedComponents);
        let clusters = clusterer.cluster(&ids(&["c", "a", "b"]), &[edge("a", "b", 0.2)]);

        assert_eq!(member_sets(&clusters), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert!(clusters.iter().all(|c| c.edges.is_empty()));
    }

    #[test]
    fn test_transitive_chain_merges_under_connected_components() {
        let edges = [edge("a", "b", 0.85), edge("b", "c", 0.85), edge("a", "c", 0.3)];
        let clusterer = Clusterer::new(0.8, LinkageMode::ConnectedComponents);
        let clusters = clusterer.cluster(&ids(&["a", "b", "c"]), &edges);

        assert_eq!(member_sets(&clusters), vec![vec!["a", "b", "c"]]);
        assert_eq!(clusters[0].edges.len(), 2);
    }

    #[test]
    fn test_complete_linkage_refuses_chain() {
        let edges = [edge("a", "b", 0.85), edge("b", "c", 0.9), edge("a", "c", 0.3)];
        let clusterer = Clusterer::new(0.8, LinkageMode::CompleteLinkage);
        let clusters = clusterer.cluster(&ids(&["a", "b", "c"]), &edges);

        // b~c is the stronger link, so a stays alone
        assert_eq!(member_sets(&clusters), vec![vec!["a"], vec!["b", "c"]]);
    }

    #[test]
    fn test_complete_linkage_accepts_clique() {
        let edges = [edge("a", "b", 0.9), edge("b", "c", 0.9), edge("a", "c", 0.85)];
        let clusterer = Clusterer::new(0.8, LinkageMode::CompleteLinkage);
        let clusters = clusterer.cluster(&ids(&["a", "b", "c"]), &edges);

        assert_eq!(member_sets(&clusters), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_edge_order_does_not_matter() {
        let mut edges = vec![
            edge("a", "b", 0.9),
            edge("c", "d", 0.95),
            edge("b", "e", 0.81),
            edge("d", "e", 0.1),
        ];
        let universe = ids(&["a", "b", "c", "d", "e", "f"]);
        let clusterer = Clusterer::new(0.8, LinkageMode::ConnectedComponents);

        let forward = clusterer.cluster(&universe, &edges);
        edges.reverse();
        let backward = clusterer.cluster(&universe, &edges);

        assert_eq!(forward, backward);
        assert_eq!(
            member_sets(&forward),
            vec![vec!["a", "b", "e"], vec!["c", "d"], vec!["f"]]
        );
    }
}
