//! Topological sorting and schedule-region assignment.
//!
//! A depth-first traversal orders the DAG, detects cycles, consults the
//! digest cache to mark up-to-date targets, and partitions the remaining
//! work into regions: targets within one region share no dependency path and
//! may run in parallel, while region boundaries are strict barriers.

use anyhow::Result;

use crate::builder::fingerprint;
use crate::core::target::{TargetGraph, TargetId};
use crate::util::diagnostic::BuildError;

/// The executor's work list: stale targets in region order.
#[derive(Debug, Default)]
pub struct BuildQueue {
    /// Stale targets, ordered by (region, output file).
    pub order: Vec<TargetId>,
    /// Start index of each region within `order`.
    pub region_starts: Vec<usize>,
    /// Number of targets skipped as up to date.
    pub skipped: usize,
}

impl BuildQueue {
    /// Iterate over the regions as slices of `order`.
    pub fn regions(&self) -> impl Iterator<Item = &[TargetId]> {
        RegionIter {
            queue: self,
            next: 0,
        }
    }

    /// Total number of stale targets.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing needs building.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct RegionIter<'a> {
    queue: &'a BuildQueue,
    next: usize,
}

impl<'a> Iterator for RegionIter<'a> {
    type Item = &'a [TargetId];

    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.queue.region_starts.get(self.next)?;
        let end = self
            .queue
            .region_starts
            .get(self.next + 1)
            .copied()
            .unwrap_or(self.queue.order.len());
        self.next += 1;
        Some(&self.queue.order[start..end])
    }
}

/// Sort the graph, mark skippable targets, and partition into regions.
pub fn schedule(graph: &mut TargetGraph) -> Result<BuildQueue> {
    // DFS from every node; roots (executables, top-level archives) dominate,
    // and starting everywhere also covers disconnected targets.
    let mut order: Vec<TargetId> = Vec::with_capacity(graph.len());
    for id in graph.ids() {
        visit(graph, id, &mut order)?;
    }

    assign_regions(graph, &order);

    let mut stale: Vec<TargetId> = graph.ids().filter(|id| !graph.target(*id).skip).collect();
    let skipped = graph.len() - stale.len();
    stale.sort_by(|a, b| {
        let ta = graph.target(*a);
        let tb = graph.target(*b);
        ta.schedule_region
            .cmp(&tb.schedule_region)
            .then_with(|| ta.output_file.cmp(&tb.output_file))
    });

    let mut region_starts = Vec::new();
    let mut current = usize::MAX;
    for (index, id) in stale.iter().enumerate() {
        let region = graph.target(*id).schedule_region;
        if region != current {
            region_starts.push(index);
            current = region;
        }
    }

    Ok(BuildQueue {
        order: stale,
        region_starts,
        skipped,
    })
}

/// Recursive DFS with cycle detection; marks skip on the way back up.
fn visit(graph: &mut TargetGraph, id: TargetId, order: &mut Vec<TargetId>) -> Result<()> {
    {
        let target = graph.target(id);
        if target.sorted {
            return Ok(());
        }
        if target.visiting {
            return Err(cycle_from(graph, id).into());
        }
    }

    graph.target_mut(id).visiting = true;

    let deps: Vec<TargetId> = graph.target(id).dependencies.iter().map(|d| d.target).collect();
    for dep in &deps {
        visit(graph, *dep, order)?;
    }

    // Fresh means: our own digest matches the cache, and every dependency
    // was also fresh. A rebuilt dependency always invalidates us.
    let fresh_here = {
        let target = graph.target(id);
        fingerprint::is_fresh(&target.output_file, target.digest_expected)
    };
    let deps_fresh = deps.iter().all(|dep| graph.target(*dep).skip);

    let target = graph.target_mut(id);
    target.digest_cached = fingerprint::read_digest(&target.output_file);
    target.skip = fresh_here && deps_fresh;
    target.visiting = false;
    target.sorted = true;
    order.push(id);

    Ok(())
}

/// A target's region is one past the deepest of its dependencies.
fn assign_regions(graph: &mut TargetGraph, order: &[TargetId]) {
    for &id in order {
        let region = graph
            .target(id)
            .dependencies
            .iter()
            .map(|d| graph.target(d.target).schedule_region + 1)
            .max()
            .unwrap_or(0);
        graph.target_mut(id).schedule_region = region;
    }
}

/// Reconstruct the cycle path for the error message.
fn cycle_from(graph: &TargetGraph, start: TargetId) -> BuildError {
    let mut names: Vec<String> = graph
        .ids()
        .filter(|id| graph.target(*id).visiting)
        .map(|id| graph.target(id).output_file.display().to_string())
        .collect();
    names.push(graph.target(start).output_file.display().to_string());
    BuildError::Cycle { names }
}
