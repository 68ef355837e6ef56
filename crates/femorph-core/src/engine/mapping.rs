use crate::core::io::overrides::IsotopeOverrideMap;
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::mapping::{AtomMapEntry, AtomMapping};
use crate::core::models::molecule::MoleculeGraph;
use crate::engine::error::MorphError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Computes the atom correspondence between two ligand structures.
///
/// The correspondence is a maximum common induced connected substructure
/// under element and isotope-tag compatibility, found by a backtracking
/// search bounded by `timeout`. If the search does not finish within the
/// budget, the best correspondence found so far is returned and a warning
/// is logged; a degraded mapping is acceptable, running out of budget is
/// not a failure.
///
/// User overrides take precedence over the automatic search: each pair is
/// pinned by tagging both atoms with a matching isotope so the search can
/// only ever map them onto each other, and any pair the search still missed
/// is forced into the result afterwards. An override naming an atom that
/// does not exist fails with [`MorphError::Mapping`].
///
/// # Return
///
/// The morph seed molecule (initial atoms in source order followed by the
/// final-only atoms, positions of the latter unset) and the ordered
/// [`AtomMapping`] whose ordinals index the seed. Input graphs are not
/// mutated.
pub fn map_atoms(
    initial: &MoleculeGraph,
    final_state: &MoleculeGraph,
    timeout: Duration,
    overrides: &IsotopeOverrideMap,
) -> Result<(MoleculeGraph, AtomMapping), MorphError> {
    if initial.atom_count() == 0 || final_state.atom_count() == 0 {
        return Err(MorphError::Mapping(format!(
            "cannot map empty structure ('{}': {} atoms, '{}': {} atoms)",
            initial.name(),
            initial.atom_count(),
            final_state.name(),
            final_state.atom_count()
        )));
    }

    let forced = resolve_overrides(initial, final_state, overrides)?;

    // Pinning happens on private clones so the inputs stay untouched.
    let mut pinned_initial = initial.clone();
    let mut pinned_final = final_state.clone();
    for (tag, &(initial_id, final_id)) in forced.iter().enumerate() {
        let tag = (tag + 1) as u16;
        pinned_initial.atom_mut(initial_id).unwrap().isotope = tag;
        pinned_final.atom_mut(final_id).unwrap().isotope = tag;
    }

    // One interner for both graphs so element keys are comparable across them.
    let mut interner: HashMap<String, usize> = HashMap::new();
    let view_a = GraphView::build(&pinned_initial, &mut interner);
    let view_b = GraphView::build(&pinned_final, &mut interner);

    let mut search = McsSearch::new(&view_a, &view_b, Instant::now() + timeout);
    search.run();
    if search.timed_out {
        warn!(
            matched = search.best.len(),
            "MCS search for '{}' -> '{}' ran out of budget; using best correspondence found so far",
            initial.name(),
            final_state.name()
        );
    }
    let mut pairs = search.best;

    // Force any override pair the bounded search did not reach.
    for &(initial_id, final_id) in &forced {
        let i = initial.index_of(initial_id).unwrap();
        let j = final_state.index_of(final_id).unwrap();
        if !pairs.contains(&(i, j)) {
            pairs.retain(|&(pi, pj)| pi != i && pj != j);
            pairs.push((i, j));
        }
    }
    pairs.sort_unstable();

    if pairs.is_empty() {
        return Err(MorphError::Mapping(format!(
            "no common substructure between '{}' and '{}'",
            initial.name(),
            final_state.name()
        )));
    }
    debug!(matched = pairs.len(), "Atom correspondence computed");

    Ok(assemble(initial, final_state, &pairs))
}

fn resolve_overrides(
    initial: &MoleculeGraph,
    final_state: &MoleculeGraph,
    overrides: &IsotopeOverrideMap,
) -> Result<Vec<(AtomId, AtomId)>, MorphError> {
    overrides
        .pairs()
        .iter()
        .map(|(initial_name, final_name)| {
            let initial_id = initial.atom_by_name(initial_name).ok_or_else(|| {
                MorphError::Mapping(format!(
                    "override atom '{}' not found in initial structure '{}'",
                    initial_name,
                    initial.name()
                ))
            })?;
            let final_id = final_state.atom_by_name(final_name).ok_or_else(|| {
                MorphError::Mapping(format!(
                    "override atom '{}' not found in final structure '{}'",
                    final_name,
                    final_state.name()
                ))
            })?;
            Ok((initial_id, final_id))
        })
        .collect()
}

fn assemble(
    initial: &MoleculeGraph,
    final_state: &MoleculeGraph,
    pairs: &[(usize, usize)],
) -> (MoleculeGraph, AtomMapping) {
    let matched_initial: HashMap<usize, usize> = pairs.iter().copied().collect();
    let matched_final: HashMap<usize, usize> =
        pairs.iter().map(|&(i, j)| (j, i)).collect();

    let mut seed = MoleculeGraph::new(&format!("{}~{}", initial.name(), final_state.name()));
    let mut entries = Vec::with_capacity(
        initial.atom_count() + final_state.atom_count() - pairs.len(),
    );

    for (ordinal, (initial_id, atom)) in initial.atoms_iter().enumerate() {
        let morph_id = seed.add_atom(atom.clone());
        match matched_initial.get(&ordinal) {
            Some(&j) => {
                let final_id = final_state.atom_id_at(j).unwrap();
                entries.push(AtomMapEntry::shared(morph_id, initial_id, final_id));
            }
            None => entries.push(AtomMapEntry::initial_only(morph_id, initial_id)),
        }
    }

    for (ordinal, (final_id, atom)) in final_state.atoms_iter().enumerate() {
        if matched_final.contains_key(&ordinal) {
            continue;
        }
        let morph_id = seed.add_atom(Atom::new(&atom.name, &atom.element, None));
        entries.push(AtomMapEntry::final_only(morph_id, final_id));
    }

    (seed, AtomMapping::new(entries))
}

/// Index-based view of a molecule for the correspondence search.
struct GraphView {
    /// Compatibility key per atom: interned element plus isotope tag.
    keys: Vec<(usize, u16)>,
    degrees: Vec<usize>,
    adjacency: Vec<Vec<usize>>,
    /// Dense bond-presence matrix, row-major.
    bond_matrix: Vec<bool>,
    size: usize,
}

impl GraphView {
    fn build(graph: &MoleculeGraph, interner: &mut HashMap<String, usize>) -> Self {
        let size = graph.atom_count();
        let mut keys = Vec::with_capacity(size);
        let mut degrees = Vec::with_capacity(size);
        let mut adjacency = Vec::with_capacity(size);
        let mut bond_matrix = vec![false; size * size];

        for (id, atom) in graph.atoms_iter() {
            let next_key = interner.len();
            let element_key = *interner.entry(atom.element.clone()).or_insert(next_key);
            keys.push((element_key, atom.isotope));

            let neighbors: Vec<usize> = graph
                .bonded_neighbors(id)
                .unwrap_or(&[])
                .iter()
                .map(|&n| graph.index_of(n).unwrap())
                .collect();
            degrees.push(neighbors.len());
            adjacency.push(neighbors);
        }

        for bond in graph.bonds() {
            let i = graph.index_of(bond.atom1_id).unwrap();
            let j = graph.index_of(bond.atom2_id).unwrap();
            bond_matrix[i * size + j] = true;
            bond_matrix[j * size + i] = true;
        }

        Self {
            keys,
            degrees,
            adjacency,
            bond_matrix,
            size,
        }
    }

    #[inline]
    fn bonded(&self, i: usize, j: usize) -> bool {
        self.bond_matrix[i * self.size + j]
    }
}

/// Branch-and-bound enumeration of common induced connected substructures.
///
/// At every node the lowest-ordinal frontier atom of the initial graph is
/// either mapped to each feasible partner in turn or excluded for the rest
/// of the branch, so each correspondence is visited once and candidate
/// order is deterministic. The deadline is checked cooperatively at every
/// node.
struct McsSearch<'a> {
    a: &'a GraphView,
    b: &'a GraphView,
    deadline: Instant,
    timed_out: bool,

    assigned_a: Vec<Option<usize>>,
    used_b: Vec<bool>,
    current: Vec<(usize, usize)>,

    best: Vec<(usize, usize)>,
    best_exact: usize,
    best_sorted: Vec<(usize, usize)>,
}

impl<'a> McsSearch<'a> {
    fn new(a: &'a GraphView, b: &'a GraphView, deadline: Instant) -> Self {
        Self {
            a,
            b,
            deadline,
            timed_out: false,
            assigned_a: vec![None; a.size],
            used_b: vec![false; b.size],
            current: Vec::new(),
            best: Vec::new(),
            best_exact: 0,
            best_sorted: Vec::new(),
        }
    }

    fn run(&mut self) {
        let mut excluded = vec![false; self.a.size];
        self.extend(&mut excluded);
    }

    fn extend(&mut self, excluded: &mut [bool]) {
        if self.timed_out {
            return;
        }
        if Instant::now() >= self.deadline {
            self.timed_out = true;
            return;
        }

        // Bound: even mapping every remaining atom cannot beat the best.
        let unassigned = (0..self.a.size)
            .filter(|&i| self.assigned_a[i].is_none() && !excluded[i])
            .count();
        let remaining_b = self.used_b.iter().filter(|&&u| !u).count();
        if self.current.len() + unassigned.min(remaining_b) < self.best.len() {
            return;
        }

        let pick = self.pick_frontier(excluded);
        let Some(i) = pick else {
            return;
        };

        for j in 0..self.b.size {
            if self.used_b[j] || !self.feasible(i, j) {
                continue;
            }

            self.assigned_a[i] = Some(j);
            self.used_b[j] = true;
            self.current.push((i, j));
            self.consider_current();

            self.extend(excluded);

            self.current.pop();
            self.used_b[j] = false;
            self.assigned_a[i] = None;

            if self.timed_out {
                return;
            }
        }

        excluded[i] = true;
        self.extend(excluded);
        excluded[i] = false;
    }

    /// Lowest unmapped, unexcluded atom adjacent to the mapped core (any
    /// atom while the core is empty).
    fn pick_frontier(&self, excluded: &[bool]) -> Option<usize> {
        (0..self.a.size).find(|&i| {
            if self.assigned_a[i].is_some() || excluded[i] {
                return false;
            }
            self.current.is_empty()
                || self.a.adjacency[i]
                    .iter()
                    .any(|&n| self.assigned_a[n].is_some())
        })
    }

    fn feasible(&self, i: usize, j: usize) -> bool {
        if self.a.keys[i] != self.b.keys[j] {
            return false;
        }
        // Induced consistency: bond presence must agree for every mapped pair.
        for &(i2, j2) in &self.current {
            if self.a.bonded(i, i2) != self.b.bonded(j, j2) {
                return false;
            }
        }
        true
    }

    fn consider_current(&mut self) {
        if self.current.len() < self.best.len() {
            return;
        }

        let exact = self
            .current
            .iter()
            .filter(|&&(i, j)| self.a.degrees[i] == self.b.degrees[j])
            .count();

        if self.current.len() > self.best.len() {
            self.record_best(exact);
            return;
        }

        // Equal size: prefer more exact (element, degree) pairs, then the
        // lexicographically smallest ordinal sequence for reproducibility.
        if exact > self.best_exact {
            self.record_best(exact);
            return;
        }
        if exact == self.best_exact {
            let mut sorted = self.current.clone();
            sorted.sort_unstable();
            if sorted < self.best_sorted {
                self.best = self.current.clone();
                self.best_exact = exact;
                self.best_sorted = sorted;
            }
        }
    }

    fn record_best(&mut self, exact: usize) {
        self.best = self.current.clone();
        self.best_exact = exact;
        let mut sorted = self.best.clone();
        sorted.sort_unstable();
        self.best_sorted = sorted;
    }
}
