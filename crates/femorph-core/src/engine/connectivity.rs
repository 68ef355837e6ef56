use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::MoleculeGraph;
use crate::engine::error::MorphError;
use std::collections::HashMap;
use tracing::debug;

/// The merged bonded topology of a morph and the dummy-atom bookkeeping
/// derived from it.
///
/// All indices are morph ordinals. `final_bonds` records which merged bonds
/// exist in the final state; `direct_anchors` and `zz_anchors` drive the
/// two coordinate-synthesis passes: a direct dummy sits one bond from a
/// real atom, a zz dummy reaches its nearest real atom only through a
/// bridging dummy.
#[derive(Debug, Clone, Default)]
pub struct MorphConnectivity {
    /// Ordinals mapped in both end-states.
    pub shared: Vec<usize>,
    /// Ordinals present only in the initial state (dummies in the final view).
    pub initial_only: Vec<usize>,
    /// Ordinals present only in the final state (dummies in the initial view).
    pub final_only: Vec<usize>,
    /// Ordinal pairs bonded in the final state, remapped into morph ordinals.
    pub final_bonds: Vec<(usize, usize)>,
    /// Dummy ordinal -> real anchor ordinal one bond away.
    pub direct_anchors: HashMap<usize, usize>,
    /// Dummy ordinal -> (bridging dummy ordinal, real anchor two bonds away).
    pub zz_anchors: HashMap<usize, (usize, usize)>,
}

impl MorphConnectivity {
    /// The zz-atom set in ascending ordinal order.
    pub fn zz_atoms(&self) -> Vec<usize> {
        let mut atoms: Vec<usize> = self.zz_anchors.keys().copied().collect();
        atoms.sort_unstable();
        atoms
    }
}

/// Builds the merged bonded topology for the morph molecule.
///
/// A bond exists in the morph if it exists in the initial state or in the
/// final state (remapped through the mapping); bonds between two dummies of
/// the same side are retained so that side's fragment stays chemically
/// valid. Returns a new morph version carrying the merged bonds together
/// with the classification and anchor records.
///
/// # Errors
///
/// Returns [`MorphError::Connectivity`] if a dummy atom has no real anchor
/// within two bonds (its fragment is disconnected from the mapped core).
pub fn resolve_connectivity(
    morph: &MoleculeGraph,
    mapping: &AtomMapping,
    initial: &MoleculeGraph,
    final_state: &MoleculeGraph,
) -> Result<(MoleculeGraph, MorphConnectivity), MorphError> {
    let mut merged = morph.clone();
    let mut connectivity = MorphConnectivity::default();

    for (ordinal, entry) in mapping.entries().iter().enumerate() {
        if entry.is_shared() {
            connectivity.shared.push(ordinal);
        } else if entry.is_dummy_in_final() {
            connectivity.initial_only.push(ordinal);
        } else {
            connectivity.final_only.push(ordinal);
        }
    }

    // Initial-state bonds carry over ordinal-for-ordinal: the morph seed
    // lists the initial atoms first, in source order.
    for bond in initial.bonds() {
        let i1 = initial.index_of(bond.atom1_id).unwrap();
        let i2 = initial.index_of(bond.atom2_id).unwrap();
        let id1 = merged.atom_id_at(i1).unwrap();
        let id2 = merged.atom_id_at(i2).unwrap();
        merged.add_bond(id1, id2, bond.order);
    }

    for bond in final_state.bonds() {
        let o1 = mapping.reverse_ordinal(bond.atom1_id).unwrap();
        let o2 = mapping.reverse_ordinal(bond.atom2_id).unwrap();
        let id1 = merged.atom_id_at(o1).unwrap();
        let id2 = merged.atom_id_at(o2).unwrap();
        merged.add_bond(id1, id2, bond.order);
        connectivity
            .final_bonds
            .push((o1.min(o2), o1.max(o2)));
    }
    connectivity.final_bonds.sort_unstable();

    resolve_anchors(&mut connectivity, mapping, final_state, &merged)?;

    debug!(
        shared = connectivity.shared.len(),
        initial_only = connectivity.initial_only.len(),
        final_only = connectivity.final_only.len(),
        zz = connectivity.zz_anchors.len(),
        "Morph connectivity resolved"
    );

    Ok((merged, connectivity))
}

/// Finds a placement anchor for every dummy of the initial-state view.
///
/// Anchors are searched in the final state, where the dummies are real:
/// the lowest-ordinal real neighbor at distance 1, or failing that the
/// lowest (bridge, anchor) pair at distance 2.
fn resolve_anchors(
    connectivity: &mut MorphConnectivity,
    mapping: &AtomMapping,
    final_state: &MoleculeGraph,
    merged: &MoleculeGraph,
) -> Result<(), MorphError> {
    for &dummy in &connectivity.final_only {
        let entry = mapping.entry(dummy).unwrap();
        let final_id = entry.final_atom.unwrap();

        let mut real_neighbors = Vec::new();
        let mut dummy_neighbors = Vec::new();
        for &neighbor in final_state.bonded_neighbors(final_id).unwrap_or(&[]) {
            let ordinal = mapping.reverse_ordinal(neighbor).unwrap();
            if mapping.entry(ordinal).unwrap().is_shared() {
                real_neighbors.push(ordinal);
            } else {
                dummy_neighbors.push(ordinal);
            }
        }
        real_neighbors.sort_unstable();
        dummy_neighbors.sort_unstable();

        if let Some(&anchor) = real_neighbors.first() {
            connectivity.direct_anchors.insert(dummy, anchor);
            continue;
        }

        let mut zz_anchor = None;
        'bridges: for &bridge in &dummy_neighbors {
            let bridge_final = mapping.entry(bridge).unwrap().final_atom.unwrap();
            let mut bridge_reals: Vec<usize> = final_state
                .bonded_neighbors(bridge_final)
                .unwrap_or(&[])
                .iter()
                .map(|&n| mapping.reverse_ordinal(n).unwrap())
                .filter(|&o| mapping.entry(o).unwrap().is_shared())
                .collect();
            bridge_reals.sort_unstable();
            if let Some(&anchor) = bridge_reals.first() {
                zz_anchor = Some((bridge, anchor));
                break 'bridges;
            }
        }

        match zz_anchor {
            Some(pair) => {
                connectivity.zz_anchors.insert(dummy, pair);
            }
            None => {
                let name = merged
                    .atom_id_at(dummy)
                    .and_then(|id| merged.atom(id))
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| format!("#{}", dummy));
                return Err(MorphError::Connectivity {
                    atom: name,
                    message: "dummy fragment is disconnected from the mapped core".to_string(),
                });
            }
        }
    }

    Ok(())
}
