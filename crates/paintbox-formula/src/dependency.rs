//! Dependency tracking for formula calculation
//!
//! Edges run both ways: a formula cell lists its *precedents* (the cells it
//! reads) and every cell lists its *dependents* (the formulas that read it).
//! Evaluation order comes from a strongly-connected-components pass over the
//! precedents, so cycles surface as whole components instead of as a stack
//! overflow or a silent partial order.

use ahash::{AHashMap, AHashSet};
use paintbox_core::CellKey;
use std::collections::VecDeque;

/// One unit of work in an evaluation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalStep {
    /// A cell whose precedents are all evaluated before it
    Cell(CellKey),
    /// Cells that depend on each other (sorted); none of them can be computed
    Cycle(Vec<CellKey>),
}

/// Dependency graph for formula cells
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellKey, AHashSet<CellKey>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellKey, AHashSet<CellKey>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: CellKey, dependent: CellKey) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Replace the precedents of a cell; its dependents are untouched
    pub fn set_precedents<I>(&mut self, cell: &CellKey, precedents: I)
    where
        I: IntoIterator<Item = CellKey>,
    {
        self.clear_precedents(cell);
        for precedent in precedents {
            self.add_dependency(precedent, cell.clone());
        }
    }

    /// Forget what a cell reads
    pub fn clear_precedents(&mut self, cell: &CellKey) {
        if let Some(precedents) = self.precedents.remove(cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(cell);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
    }

    /// Get cells that depend on the given cell
    pub fn get_dependents(&self, cell: &CellKey) -> impl Iterator<Item = &CellKey> + '_ {
        self.dependents.get(cell).into_iter().flatten()
    }

    /// Get cells that the given cell depends on
    pub fn get_precedents(&self, cell: &CellKey) -> impl Iterator<Item = &CellKey> + '_ {
        self.precedents.get(cell).into_iter().flatten()
    }

    /// Every cell that reads any of `changed`, directly or through other formulas
    ///
    /// The changed cells themselves are included only if they feed back into
    /// themselves through a cycle.
    pub fn dependents_transitive(&self, changed: &[CellKey]) -> AHashSet<CellKey> {
        let mut seen = AHashSet::new();
        let mut queue: VecDeque<&CellKey> = changed.iter().collect();

        while let Some(cell) = queue.pop_front() {
            for dependent in self.get_dependents(cell) {
                if seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }

        seen
    }

    /// Sorted precedents, so the order is the same on every run
    fn sorted_precedents(&self, cell: &CellKey) -> Vec<CellKey> {
        let mut precedents: Vec<CellKey> = self.get_precedents(cell).cloned().collect();
        precedents.sort_unstable();
        precedents
    }

    /// Order in which `roots` and everything they read must be evaluated
    ///
    /// Iterative Tarjan over the precedent edges: each component is emitted
    /// after every component it reads from. Multi-cell components and cells
    /// that read themselves come out as [`EvalStep::Cycle`].
    pub fn evaluation_order(&self, roots: &[CellKey]) -> Vec<EvalStep> {
        struct Frame {
            cell: CellKey,
            precedents: Vec<CellKey>,
            next: usize,
        }

        let mut order = Vec::new();
        let mut index_of: AHashMap<CellKey, usize> = AHashMap::new();
        let mut lowlink: AHashMap<CellKey, usize> = AHashMap::new();
        let mut on_stack: AHashSet<CellKey> = AHashSet::new();
        let mut stack: Vec<CellKey> = Vec::new();
        let mut next_index = 0usize;

        for root in roots {
            if index_of.contains_key(root) {
                continue;
            }

            let mut frames = Vec::new();
            index_of.insert(root.clone(), next_index);
            lowlink.insert(root.clone(), next_index);
            next_index += 1;
            stack.push(root.clone());
            on_stack.insert(root.clone());
            frames.push(Frame {
                cell: root.clone(),
                precedents: self.sorted_precedents(root),
                next: 0,
            });

            while let Some(frame) = frames.last_mut() {
                if let Some(precedent) = frame.precedents.get(frame.next).cloned() {
                    frame.next += 1;
                    let cell = frame.cell.clone();

                    let seen = index_of.get(&precedent).copied();
                    match seen {
                        None => {
                            index_of.insert(precedent.clone(), next_index);
                            lowlink.insert(precedent.clone(), next_index);
                            next_index += 1;
                            stack.push(precedent.clone());
                            on_stack.insert(precedent.clone());
                            let precedents = self.sorted_precedents(&precedent);
                            frames.push(Frame {
                                cell: precedent,
                                precedents,
                                next: 0,
                            });
                        }
                        Some(index) if on_stack.contains(&precedent) => {
                            if let Some(low) = lowlink.get_mut(&cell) {
                                *low = (*low).min(index);
                            }
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                // All precedents visited: close the frame
                let cell = frame.cell.clone();
                frames.pop();
                let low = lowlink.get(&cell).copied().unwrap_or(usize::MAX);
                if let Some(parent) = frames.last() {
                    if let Some(parent_low) = lowlink.get_mut(&parent.cell) {
                        *parent_low = (*parent_low).min(low);
                    }
                }

                if index_of.get(&cell) == Some(&low) {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack.remove(&member);
                        let done = member == cell;
                        component.push(member);
                        if done {
                            break;
                        }
                    }

                    let self_loop = self
                        .precedents
                        .get(&cell)
                        .map_or(false, |p| p.contains(&cell));
                    if component.len() == 1 && !self_loop {
                        order.push(EvalStep::Cell(cell));
                    } else {
                        component.sort_unstable();
                        order.push(EvalStep::Cycle(component));
                    }
                }
            }
        }

        order
    }

    /// Clear all dependencies
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}
