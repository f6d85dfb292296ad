//! Order reconstruction from pairwise `follows` edges.
//!
//! The resource index only stores "B follows A" statements. This module
//! rebuilds the single path they describe and refuses to return anything
//! when the edges do not form exactly one path from the head.

use std::collections::{HashMap, HashSet};

use crate::error::{PartchainError, Result};
use crate::lookup::{Membership, RelationLookup};
use crate::model::{Chain, Edge, Predicate, ResourceId};
use crate::service::QueryService;

/// Request-scoped `predecessor -> successor` map, drained by the walk.
#[derive(Debug, Default)]
pub struct SuccessorMap {
    next: HashMap<ResourceId, ResourceId>,
}

impl SuccessorMap {
    /// Index edges by predecessor.
    ///
    /// Repeated identical edges collapse into one. A predecessor with two
    /// different successors fails with `AmbiguousSuccessor`.
    pub fn build(edges: Vec<Edge>) -> Result<Self> {
        let mut grouped: HashMap<ResourceId, Vec<ResourceId>> = HashMap::new();
        for edge in edges {
            let successors = grouped.entry(edge.predecessor).or_default();
            if successors.contains(&edge.successor) {
                log::debug!("Ignoring repeated edge to {}", edge.successor);
                continue;
            }
            successors.push(edge.successor);
        }

        let mut conflicts: Vec<_> = grouped.iter().filter(|(_, s)| s.len() > 1).collect();
        conflicts.sort_by(|a, b| a.0.cmp(b.0));
        if let Some((predecessor, successors)) = conflicts.first() {
            let mut successors = successors.to_vec();
            successors.sort();
            return Err(PartchainError::AmbiguousSuccessor {
                predecessor: (*predecessor).clone(),
                successors,
            });
        }

        let next = grouped
            .into_iter()
            .filter_map(|(prev, mut successors)| successors.pop().map(|s| (prev, s)))
            .collect();
        Ok(Self { next })
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    /// Predecessors that never appear as a successor.
    ///
    /// For a well-formed path this is exactly the first member, even when
    /// that member itself follows something outside the parent.
    pub fn structural_heads(&self) -> Vec<ResourceId> {
        let successors: HashSet<&ResourceId> = self.next.values().collect();
        let mut heads: Vec<ResourceId> = self
            .next
            .keys()
            .filter(|prev| !successors.contains(prev))
            .cloned()
            .collect();
        heads.sort();
        heads
    }

    /// Pick the head: the declared one if present, else the single structural head.
    pub fn resolve_head(&self, declared: Option<ResourceId>) -> Result<Option<ResourceId>> {
        if declared.is_some() || self.is_empty() {
            return Ok(declared);
        }

        let mut heads = self.structural_heads();
        match heads.len() {
            0 => Err(PartchainError::NoHead {
                unconsumed: self.remaining(),
            }),
            1 => {
                let head = heads.pop();
                if let Some(ref h) = head {
                    log::debug!("No declared first part; inferred {} from edge topology", h);
                }
                Ok(head)
            }
            _ => Err(PartchainError::MultipleHeads(heads)),
        }
    }

    /// Walk from `head`, consuming one edge per step.
    ///
    /// The walk never re-enters a visited member; an edge that would close
    /// a cycle is left in the map. Any edge left over fails with
    /// `BrokenChain`.
    pub fn walk(mut self, head: Option<ResourceId>) -> Result<Chain> {
        let mut members = Vec::with_capacity(self.next.len() + 1);
        let mut visited = HashSet::new();

        let mut current = head;
        while let Some(pid) = current.take() {
            visited.insert(pid.clone());
            if let Some(next) = self.next.remove(&pid) {
                if visited.contains(&next) {
                    self.next.insert(pid.clone(), next);
                } else {
                    current = Some(next);
                }
            }
            members.push(pid);
        }

        if !self.next.is_empty() {
            let unconsumed = self.remaining();
            for edge in &unconsumed {
                log::warn!("Unconsumed edge: {}", edge);
            }
            return Err(PartchainError::BrokenChain { unconsumed });
        }

        Ok(Chain::from_walk(members))
    }

    /// Edges not yet consumed, sorted for stable reporting.
    fn remaining(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .next
            .iter()
            .map(|(prev, next)| Edge::new(next.clone(), prev.clone()))
            .collect();
        edges.sort_by(|a, b| a.predecessor.cmp(&b.predecessor));
        edges
    }
}

/// Rebuild the order of `edges` starting at `declared_head`, or at the
/// structural head when none is declared.
pub fn reconstruct(edges: Vec<Edge>, declared_head: Option<ResourceId>) -> Result<Chain> {
    let map = SuccessorMap::build(edges)?;
    let head = map.resolve_head(declared_head)?;
    map.walk(head)
}

/// Retrieves the edges and declared head of a parent and orders its members.
pub struct OrderReconstructor<'a, S: QueryService + ?Sized> {
    lookup: RelationLookup<'a, S>,
}

impl<'a, S: QueryService + ?Sized> OrderReconstructor<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            lookup: RelationLookup::new(service),
        }
    }

    /// Members of `parent` in `follows` order.
    ///
    /// Works identically for both membership directions; only the shape of
    /// the membership pattern differs.
    pub async fn ordered_parts(
        &self,
        parent: &ResourceId,
        membership: &Membership,
        follows: &Predicate,
    ) -> Result<Chain> {
        let edges = self.lookup.edges_of(parent, membership, follows).await?;
        let edge_count = edges.len();
        let map = SuccessorMap::build(edges)?;

        let declared = self.lookup.find_head(parent, membership, follows).await?;
        let head = map.resolve_head(declared)?;
        let chain = map.walk(head)?;

        log::debug!(
            "Ordered {} part(s) of {} from {} edge(s)",
            chain.len(),
            parent,
            edge_count
        );
        Ok(chain)
    }
}
