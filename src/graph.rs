//! Pure graph utilities over an already-built triple set.
//!
//! A triple `(subject, predicate, object)` is treated as a directed edge
//! from subject to object; these functions build the adjacency structures
//! the serializer needs to re-linearize a possibly cyclic graph. All maps
//! key on node value identity and iterate in insertion order, so results
//! are deterministic for a fixed input order.

use indexmap::{IndexMap, IndexSet};

use crate::error::{RdfError, Result};
use crate::parser::{Node, Triple};

/// Subject-to-object edges. Every subject and every object appears as a
/// key, even with an empty neighbor list.
pub fn adjacency_list(triples: &[Triple]) -> IndexMap<Node, Vec<Node>> {
    let mut adj: IndexMap<Node, Vec<Node>> = IndexMap::new();
    for triple in triples {
        adj.entry(triple.subject.clone())
            .or_insert_with(Vec::new)
            .push(triple.object.clone());
        adj.entry(triple.object.clone()).or_insert_with(Vec::new);
    }
    adj
}

/// Maps every node to the distinct triples where it appears as the subject.
/// Objects get a key too, with an empty list, so lookups never miss.
pub fn node_to_triples(triples: &[Triple]) -> IndexMap<Node, Vec<Triple>> {
    let mut map: IndexMap<Node, IndexSet<Triple>> = IndexMap::new();
    for triple in triples {
        map.entry(triple.subject.clone())
            .or_insert_with(IndexSet::new)
            .insert(triple.clone());
        map.entry(triple.object.clone()).or_insert_with(IndexSet::new);
    }
    map.into_iter()
        .map(|(node, set)| (node, set.into_iter().collect()))
        .collect()
}

/// Parent map over the triple edges: each triple records the subject as the
/// object's parent (last writer wins); subjects never seen as objects map
/// to `None`.
pub fn disjoint_set(triples: &[Triple]) -> IndexMap<Node, Option<Node>> {
    let mut parent: IndexMap<Node, Option<Node>> = IndexMap::new();
    for triple in triples {
        parent.insert(triple.object.clone(), Some(triple.subject.clone()));
        if !parent.contains_key(&triple.subject) {
            parent.insert(triple.subject.clone(), None);
        }
    }
    parent
}

/// Nodes with no recorded parent: one representative entry point per
/// weakly-connected component. A heuristic, not a guarantee of the "true"
/// root in a cyclic or multiply-rooted component.
pub fn root_nodes(triples: &[Triple]) -> Vec<Node> {
    disjoint_set(triples)
        .into_iter()
        .filter_map(|(node, parent)| parent.is_none().then_some(node))
        .collect()
}

/// DFS postorder over every key of `adj`. Visited nodes are never
/// re-descended, so cycles terminate; a neighbor absent from the key set is
/// an internal-consistency error.
pub fn topological_sort(adj: &IndexMap<Node, Vec<Node>>) -> Result<Vec<Node>> {
    let mut visited = IndexSet::with_capacity(adj.len());
    let mut result = Vec::with_capacity(adj.len());
    for node in adj.keys() {
        if !visited.contains(node) {
            topological_sort_helper(node, adj, &mut visited, &mut result)?;
        }
    }
    Ok(result)
}

fn topological_sort_helper(
    node: &Node,
    adj: &IndexMap<Node, Vec<Node>>,
    visited: &mut IndexSet<Node>,
    result: &mut Vec<Node>,
) -> Result<()> {
    let neighbors = adj.get(node).ok_or_else(|| {
        RdfError::Serialize(format!("node {node} doesn't exist in the adjacency list"))
    })?;
    if !visited.insert(node.clone()) {
        // already serviced; with a cycle this is where the walk stops
        return Ok(());
    }
    for neighbor in neighbors {
        if !visited.contains(neighbor) {
            topological_sort_helper(neighbor, adj, visited, result)?;
        }
    }
    result.push(node.clone());
    Ok(())
}

/// Orders `triples` so that each subject's triples appear at the subject's
/// topological position, preserving the original relative order among
/// same-subject triples.
pub fn topological_sort_triples(triples: &[Triple]) -> Result<Vec<Triple>> {
    let adj = adjacency_list(triples);
    let recovery = node_to_triples(triples);
    let sorted_nodes = topological_sort(&adj)?;

    let mut sorted = Vec::with_capacity(triples.len());
    for node in &sorted_nodes {
        if let Some(list) = recovery.get(node) {
            sorted.extend(list.iter().cloned());
        }
    }
    Ok(sorted)
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{
        adjacency_list, disjoint_set, node_to_triples, root_nodes, topological_sort,
        topological_sort_triples,
    };
    use crate::parser::{BlankNodeSeq, Node, Triple};

    // n blank nodes N1..Nn; tests use them for subjects, predicates and
    // objects alike since the algorithms only care about node identity
    fn blank_nodes(n: usize) -> Vec<Node> {
        let seq = BlankNodeSeq::new();
        (0..n).map(|_| seq.next()).collect()
    }

    #[test]
    fn adjacency_list_keys_every_node() {
        assert!(adjacency_list(&[]).is_empty());
        assert!(node_to_triples(&[]).is_empty());

        // N1 -(N2)-> N3, N1 -(N4)-> N5
        let nodes = blank_nodes(5);
        let triples = vec![
            Triple::new(nodes[0].clone(), nodes[1].clone(), nodes[2].clone()),
            Triple::new(nodes[0].clone(), nodes[3].clone(), nodes[4].clone()),
        ];

        let adj = adjacency_list(&triples);
        // subjects and objects are keyed, predicates are not
        assert_eq!(adj.len(), 3);
        assert_eq!(adj[&nodes[0]].len(), 2);
        assert!(adj[&nodes[2]].is_empty());
        assert!(adj[&nodes[4]].is_empty());
    }

    #[test]
    fn node_to_triples_deduplicates_per_subject() {
        let nodes = blank_nodes(3);
        let triple = Triple::new(nodes[0].clone(), nodes[1].clone(), nodes[2].clone());
        let triples = vec![triple.clone(), triple.clone()];

        let map = node_to_triples(&triples);
        assert_eq!(map[&nodes[0]], vec![triple]);
        assert!(map[&nodes[2]].is_empty());
    }

    #[test]
    fn disjoint_set_records_parents() {
        let nodes = blank_nodes(5);
        let triples = vec![
            Triple::new(nodes[0].clone(), nodes[1].clone(), nodes[2].clone()),
            Triple::new(nodes[0].clone(), nodes[3].clone(), nodes[4].clone()),
        ];

        let parent = disjoint_set(&triples);
        assert_eq!(parent[&nodes[2]], Some(nodes[0].clone()));
        assert_eq!(parent[&nodes[4]], Some(nodes[0].clone()));
        assert_eq!(parent[&nodes[0]], None);

        assert_eq!(root_nodes(&triples), vec![nodes[0].clone()]);
    }

    #[test]
    fn topological_sort_is_postorder() {
        let nodes = blank_nodes(3);

        // a neighbor missing from the key set is an inconsistency
        let mut adj: IndexMap<Node, Vec<Node>> = IndexMap::new();
        adj.insert(nodes[0].clone(), vec![nodes[2].clone()]);
        assert!(topological_sort(&adj).is_err());

        // N1 -> N3: the object comes out first
        adj.insert(nodes[2].clone(), vec![]);
        let sorted = topological_sort(&adj).unwrap();
        assert_eq!(sorted, vec![nodes[2].clone(), nodes[0].clone()]);
    }

    #[test]
    fn topological_sort_triples_orders_by_subject() {
        let nodes = blank_nodes(5);

        let triples = vec![Triple::new(
            nodes[0].clone(),
            nodes[1].clone(),
            nodes[2].clone(),
        )];
        let sorted = topological_sort_triples(&triples).unwrap();
        assert_eq!(sorted, triples);

        // cyclic graph: N1 -> N4 (twice, via different predicates), N4 -> N1
        let triples = vec![
            Triple::new(nodes[0].clone(), nodes[1].clone(), nodes[3].clone()),
            Triple::new(nodes[0].clone(), nodes[2].clone(), nodes[3].clone()),
            Triple::new(nodes[3].clone(), nodes[4].clone(), nodes[0].clone()),
        ];
        let sorted = topological_sort_triples(&triples).unwrap();
        assert_eq!(sorted.len(), 3);

        // the cycle admits two valid configurations; same-subject order is
        // preserved in both
        let n4_first = vec![triples[2].clone(), triples[0].clone(), triples[1].clone()];
        let n1_first = vec![triples[0].clone(), triples[1].clone(), triples[2].clone()];
        assert!(sorted == n4_first || sorted == n1_first);
    }
}
