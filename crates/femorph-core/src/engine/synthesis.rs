use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::MoleculeGraph;
use crate::core::utils::geometry::fit_alignment;
use crate::engine::connectivity::MorphConnectivity;
use crate::engine::error::MorphError;
use nalgebra::Point3;
use tracing::debug;

/// Fills in coordinates for every atom of the morph molecule.
///
/// Atoms present in the initial state copy their position verbatim from
/// `reference`, a structure whose atoms are ordered exactly like the
/// initial structure (the vacuum initial ligand during setup, the solvated
/// ligand afterwards). Dummy atoms are reconstructed from their native
/// final-state geometry: the local frame around the anchor is rigidly
/// aligned onto the morph frame and the dummy's native position is carried
/// through that transform, preserving its native bond length and, where
/// the anchor environment determines them, its native angles. Direct
/// dummies are placed first; zz dummies afterwards, against the
/// then-finalized bridge positions.
///
/// The result is a new molecule version; the input morph is not modified.
/// The procedure is a pure function of its inputs, so re-running it with
/// the same reference yields bit-identical positions.
///
/// # Errors
///
/// Returns [`MorphError::CountMismatch`] if the reference atom count does
/// not equal the number of initial-state atoms in the mapping, and
/// [`MorphError::Geometry`] if any atom cannot be placed.
pub fn synthesize_coordinates(
    morph: &MoleculeGraph,
    mapping: &AtomMapping,
    connectivity: &MorphConnectivity,
    final_state: &MoleculeGraph,
    reference: &MoleculeGraph,
) -> Result<MoleculeGraph, MorphError> {
    let expected = mapping.len() - mapping.dummy_indices().len();
    if reference.atom_count() != expected {
        return Err(MorphError::CountMismatch {
            expected,
            found: reference.atom_count(),
        });
    }

    let mut placed = morph.clone();

    // Initial-side atoms take the reference coordinates verbatim; dummy
    // positions are cleared so every run starts from the same state.
    for ordinal in 0..mapping.len() {
        let morph_id = placed.atom_id_at(ordinal).unwrap();
        if ordinal < expected {
            let reference_id = reference.atom_id_at(ordinal).unwrap();
            let reference_atom = reference.atom(reference_id).unwrap();
            let position = reference_atom.position.ok_or_else(|| MorphError::Geometry {
                atom: reference_atom.name.clone(),
                message: "reference atom has no coordinates".to_string(),
            })?;
            placed.atom_mut(morph_id).unwrap().position = Some(position);
        } else {
            placed.atom_mut(morph_id).unwrap().position = None;
        }
    }

    let mut direct: Vec<(usize, usize)> = connectivity
        .direct_anchors
        .iter()
        .map(|(&d, &a)| (d, a))
        .collect();
    direct.sort_unstable();
    for (dummy, anchor) in direct {
        let position = reconstruct(&placed, mapping, final_state, dummy, anchor, None)?;
        let morph_id = placed.atom_id_at(dummy).unwrap();
        placed.atom_mut(morph_id).unwrap().position = Some(position);
    }

    let mut indirect: Vec<(usize, (usize, usize))> = connectivity
        .zz_anchors
        .iter()
        .map(|(&d, &pair)| (d, pair))
        .collect();
    indirect.sort_unstable();
    for (dummy, (bridge, anchor)) in indirect {
        let position = reconstruct(&placed, mapping, final_state, dummy, bridge, Some(anchor))?;
        let morph_id = placed.atom_id_at(dummy).unwrap();
        placed.atom_mut(morph_id).unwrap().position = Some(position);
    }

    for (_, atom) in placed.atoms_iter() {
        if atom.is_unplaced() {
            return Err(MorphError::Geometry {
                atom: atom.name.clone(),
                message: "no anchor resolved the atom after both passes".to_string(),
            });
        }
    }

    debug!(atoms = placed.atom_count(), "Morph coordinates synthesized");
    Ok(placed)
}

/// Places one dummy relative to `frame_center` (its anchor, or its bridge
/// for zz dummies) by aligning the center's native final-state frame onto
/// the morph frame.
///
/// The paired points are the center itself plus every neighbor of the
/// center that already has a morph position (`extra` forces the two-hop
/// anchor into the set even though it is not adjacent to the dummy).
fn reconstruct(
    placed: &MoleculeGraph,
    mapping: &AtomMapping,
    final_state: &MoleculeGraph,
    dummy: usize,
    frame_center: usize,
    extra: Option<usize>,
) -> Result<Point3<f64>, MorphError> {
    let native_dummy = native_position(mapping, final_state, dummy)?;
    let mut from_points = vec![native_position(mapping, final_state, frame_center)?];
    let mut to_points = vec![morph_position(placed, frame_center, "anchor")?];

    let center_final = mapping.entry(frame_center).unwrap().final_atom.unwrap();
    let mut support: Vec<usize> = final_state
        .bonded_neighbors(center_final)
        .unwrap_or(&[])
        .iter()
        .map(|&n| mapping.reverse_ordinal(n).unwrap())
        .filter(|&o| o != dummy)
        .collect();
    if let Some(anchor) = extra {
        if !support.contains(&anchor) {
            support.push(anchor);
        }
    }
    support.sort_unstable();

    for ordinal in support {
        let morph_id = placed.atom_id_at(ordinal).unwrap();
        let Some(position) = placed.atom(morph_id).unwrap().position else {
            continue;
        };
        from_points.push(native_position(mapping, final_state, ordinal)?);
        to_points.push(position);
    }

    let transform = fit_alignment(&from_points, &to_points);
    Ok(transform.apply(&native_dummy))
}

fn native_position(
    mapping: &AtomMapping,
    final_state: &MoleculeGraph,
    ordinal: usize,
) -> Result<Point3<f64>, MorphError> {
    let final_id = mapping.entry(ordinal).unwrap().final_atom.unwrap();
    let atom = final_state.atom(final_id).unwrap();
    atom.position.ok_or_else(|| MorphError::Geometry {
        atom: atom.name.clone(),
        message: "final-state atom has no coordinates".to_string(),
    })
}

fn morph_position(
    placed: &MoleculeGraph,
    ordinal: usize,
    role: &str,
) -> Result<Point3<f64>, MorphError> {
    let id = placed.atom_id_at(ordinal).unwrap();
    let atom = placed.atom(id).unwrap();
    atom.position.ok_or_else(|| MorphError::Geometry {
        atom: atom.name.clone(),
        message: format!("{} has not been placed yet", role),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::overrides::IsotopeOverrideMap;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::BondOrder;
    use crate::engine::connectivity::resolve_connectivity;
    use crate::engine::mapping::map_atoms;
    use nalgebra::{Rotation3, Vector3};
    use std::time::Duration;

    struct Prepared {
        initial: MoleculeGraph,
        final_state: MoleculeGraph,
        morph: MoleculeGraph,
        mapping: AtomMapping,
        connectivity: MorphConnectivity,
    }

    fn chain(name: &str, atoms: &[(&str, &str, [f64; 3])]) -> MoleculeGraph {
        let mut graph = MoleculeGraph::new(name);
        let mut previous = None;
        for (atom_name, element, position) in atoms {
            let id = graph.add_atom(Atom::new(
                atom_name,
                element,
                Some(Point3::from(*position)),
            ));
            if let Some(prev) = previous {
                graph.add_bond(prev, id, BondOrder::Single).unwrap();
            }
            previous = Some(id);
        }
        graph
    }

    fn prepare(initial: MoleculeGraph, final_state: MoleculeGraph) -> Prepared {
        let (seed, mapping) = map_atoms(
            &initial,
            &final_state,
            Duration::from_secs(30),
            &IsotopeOverrideMap::new(),
        )
        .unwrap();
        let (morph, connectivity) =
            resolve_connectivity(&seed, &mapping, &initial, &final_state).unwrap();
        Prepared {
            initial,
            final_state,
            morph,
            mapping,
            connectivity,
        }
    }

    fn position(graph: &MoleculeGraph, ordinal: usize) -> Point3<f64> {
        graph
            .atom(graph.atom_id_at(ordinal).unwrap())
            .unwrap()
            .position
            .unwrap()
    }

    fn hydroxyl_growth() -> Prepared {
        // Initial ethane fragment; final grows a hydroxyl: C1-C2-O1-H1.
        let initial = chain(
            "a",
            &[("C1", "C", [0.0, 0.0, 0.0]), ("C2", "C", [1.5, 0.0, 0.0])],
        );
        let final_state = chain(
            "b",
            &[
                ("C1", "C", [0.0, 0.0, 0.0]),
                ("C2", "C", [1.5, 0.0, 0.0]),
                ("O1", "O", [2.1, 1.2, 0.0]),
                ("H1", "H", [3.1, 1.3, 0.2]),
            ],
        );
        prepare(initial, final_state)
    }

    #[test]
    fn shared_atoms_copy_reference_coordinates_verbatim() {
        let prepared = hydroxyl_growth();
        let reference = chain(
            "ref",
            &[
                ("C1", "C", [10.125, -3.5, 0.875]),
                ("C2", "C", [11.625, -3.5, 0.875]),
            ],
        );

        let placed = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();

        assert_eq!(position(&placed, 0), Point3::new(10.125, -3.5, 0.875));
        assert_eq!(position(&placed, 1), Point3::new(11.625, -3.5, 0.875));
    }

    #[test]
    fn direct_dummy_preserves_native_bond_length() {
        let prepared = hydroxyl_growth();

        // Reference frame rigidly moved with respect to the native frame.
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7);
        let shift = Vector3::new(5.0, -2.0, 3.0);
        let mut reference = prepared.initial.clone();
        for id in reference.atoms().to_vec() {
            let atom = reference.atom_mut(id).unwrap();
            let p = atom.position.unwrap();
            atom.position = Some(rotation * p + shift);
        }

        let placed = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();

        let native_len = (position(&prepared.final_state, 2) - position(&prepared.final_state, 1))
            .norm();
        let morph_len = (position(&placed, 2) - position(&placed, 1)).norm();
        assert!((native_len - morph_len).abs() < 1e-9);
    }

    #[test]
    fn dummy_position_is_reconstructed_not_copied() {
        let prepared = hydroxyl_growth();
        let reference = chain(
            "ref",
            &[
                ("C1", "C", [20.0, 0.0, 0.0]),
                ("C2", "C", [21.5, 0.0, 0.0]),
            ],
        );

        let placed = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();

        let native = position(&prepared.final_state, 2);
        let synthesized = position(&placed, 2);
        assert!((native - synthesized).norm() > 1.0);
    }

    #[test]
    fn zz_dummy_is_placed_relative_to_its_bridge() {
        let prepared = hydroxyl_growth();
        let reference = prepared.initial.clone();

        let placed = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();

        assert_eq!(prepared.connectivity.zz_atoms(), vec![3]);

        let native_oh = (position(&prepared.final_state, 3) - position(&prepared.final_state, 2))
            .norm();
        let morph_oh = (position(&placed, 3) - position(&placed, 2)).norm();
        assert!((native_oh - morph_oh).abs() < 1e-9);
    }

    #[test]
    fn synthesis_is_idempotent() {
        let prepared = hydroxyl_growth();
        let reference = chain(
            "ref",
            &[
                ("C1", "C", [0.33, 0.71, -1.2]),
                ("C2", "C", [1.81, 0.74, -1.3]),
            ],
        );

        let first = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();
        let second = synthesize_coordinates(
            &first,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        )
        .unwrap();

        for ordinal in 0..prepared.mapping.len() {
            assert_eq!(position(&first, ordinal), position(&second, ordinal));
        }
    }

    #[test]
    fn identity_morph_only_copies_coordinates() {
        let initial = chain(
            "a",
            &[
                ("C1", "C", [0.0, 0.0, 0.0]),
                ("C2", "C", [1.5, 0.0, 0.0]),
                ("O1", "O", [2.1, 1.2, 0.0]),
            ],
        );
        let final_state = initial.clone();
        let prepared = prepare(initial, final_state);

        let placed = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &prepared.initial,
        )
        .unwrap();

        for ordinal in 0..3 {
            assert_eq!(
                position(&placed, ordinal),
                position(&prepared.initial, ordinal)
            );
        }
    }

    #[test]
    fn wrong_reference_count_is_rejected() {
        let prepared = hydroxyl_growth();
        let reference = chain("ref", &[("C1", "C", [0.0, 0.0, 0.0])]);

        let result = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &reference,
        );

        assert!(matches!(
            result,
            Err(MorphError::CountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn missing_final_state_coordinates_fail_with_geometry_error() {
        let mut prepared = hydroxyl_growth();
        let o1 = prepared.final_state.atom_by_name("O1").unwrap();
        prepared.final_state.atom_mut(o1).unwrap().position = None;

        let result = synthesize_coordinates(
            &prepared.morph,
            &prepared.mapping,
            &prepared.connectivity,
            &prepared.final_state,
            &prepared.initial,
        );

        match result {
            Err(MorphError::Geometry { atom, .. }) => assert_eq!(atom, "O1"),
            other => panic!("expected GeometryError, got {:?}", other.map(|_| ())),
        }
    }
}
