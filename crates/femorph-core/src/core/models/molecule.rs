use super::atom::Atom;
use super::ids::AtomId;
use super::topology::{Bond, BondOrder};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

/// Represents one molecule as an ordered set of atoms plus a bond relation.
///
/// This struct is the central data structure of the morph pipeline. Atoms
/// are stored in a slot map for stable IDs, while `order` preserves the
/// source-file atom order; the ordinal position of an atom in that order is
/// the index used by the atom mapping and by every perturbation topology
/// format. Bond connectivity is cached as an adjacency list for fast
/// neighbor walks.
///
/// An `AtomId` is only meaningful within the graph that issued it, which
/// makes exclusive atom ownership a structural property.
#[derive(Debug, Clone, Default)]
pub struct MoleculeGraph {
    /// The molecule name from the source structure.
    name: String,
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Atom IDs in source order; the position in this vector is the ordinal.
    order: Vec<AtomId>,
    /// List of all bonds in the molecule.
    bonds: Vec<Bond>,
    /// Cached adjacency list, indexed by atom ID.
    adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
    /// Ordinal of each atom in `order`.
    ordinals: SecondaryMap<AtomId, usize>,
    /// Lookup from atom name to the first atom bearing it.
    name_map: HashMap<String, AtomId>,
}

impl MoleculeGraph {
    /// Creates a new, empty molecule graph.
    ///
    /// # Arguments
    ///
    /// * `name` - The molecule name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Returns the molecule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends an atom to the molecule.
    ///
    /// The atom is assigned the next ordinal. If its name is not taken yet
    /// it becomes resolvable through [`MoleculeGraph::atom_by_name`].
    ///
    /// # Arguments
    ///
    /// * `atom` - The atom to add.
    ///
    /// # Return
    ///
    /// The ID of the newly added atom.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.adjacency.insert(atom_id, Vec::new());
        self.ordinals.insert(atom_id, self.order.len());
        self.order.push(atom_id);
        self.name_map.entry(name).or_insert(atom_id);
        atom_id
    }

    /// Adds a bond between two atoms.
    ///
    /// This method is idempotent; adding an existing bond succeeds without
    /// creating duplicates.
    ///
    /// # Arguments
    ///
    /// * `atom1_id` - ID of the first atom.
    /// * `atom2_id` - ID of the second atom.
    /// * `order` - The order of the bond.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if successful, otherwise `None` (e.g., if either
    /// atom does not exist or the endpoints are the same atom).
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id {
            return None;
        }
        if !self.atoms.contains_key(atom1_id) || !self.atoms.contains_key(atom2_id) {
            return None;
        }

        if let Some(neighbors) = self.adjacency.get(atom1_id) {
            if neighbors.contains(&atom2_id) {
                return Some(());
            }
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.adjacency[atom1_id].push(atom2_id);
        self.adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// Retrieves an immutable reference to an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns the atom IDs in source order.
    pub fn atoms(&self) -> &[AtomId] {
        &self.order
    }

    /// Returns an iterator over `(AtomId, &Atom)` pairs in source order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.order.iter().map(move |&id| (id, &self.atoms[id]))
    }

    /// Returns the ordinal of an atom in the source order.
    pub fn index_of(&self, id: AtomId) -> Option<usize> {
        self.ordinals.get(id).copied()
    }

    /// Returns the atom ID at a given ordinal.
    pub fn atom_id_at(&self, ordinal: usize) -> Option<AtomId> {
        self.order.get(ordinal).copied()
    }

    /// Finds the first atom with the given name.
    pub fn atom_by_name(&self, name: &str) -> Option<AtomId> {
        self.name_map.get(name).copied()
    }

    /// Returns a slice of all bonds in the molecule.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Retrieves the bonded neighbors of an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(&[AtomId])` if the atom exists, otherwise `None`.
    pub fn bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Returns the bond between two atoms, if one exists.
    pub fn bond_between(&self, atom1_id: AtomId, atom2_id: AtomId) -> Option<&Bond> {
        self.bonds
            .iter()
            .find(|b| b.contains(atom1_id) && b.contains(atom2_id))
    }

    /// Returns the number of atoms.
    pub fn atom_count(&self) -> usize {
        self.order.len()
    }

    /// Returns the number of bonds.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn ethanol_heavy_atoms() -> (MoleculeGraph, Vec<AtomId>) {
        let mut graph = MoleculeGraph::new("ethanol");
        let c1 = graph.add_atom(Atom::new("C1", "C", Some(Point3::new(0.0, 0.0, 0.0))));
        let c2 = graph.add_atom(Atom::new("C2", "C", Some(Point3::new(1.5, 0.0, 0.0))));
        let o1 = graph.add_atom(Atom::new("O1", "O", Some(Point3::new(2.2, 1.2, 0.0))));
        graph.add_bond(c1, c2, BondOrder::Single).unwrap();
        graph.add_bond(c2, o1, BondOrder::Single).unwrap();
        (graph, vec![c1, c2, o1])
    }

    #[test]
    fn add_atom_preserves_source_order() {
        let (graph, ids) = ethanol_heavy_atoms();
        assert_eq!(graph.atom_count(), 3);
        assert_eq!(graph.atoms(), ids.as_slice());
        for (ordinal, &id) in ids.iter().enumerate() {
            assert_eq!(graph.index_of(id), Some(ordinal));
            assert_eq!(graph.atom_id_at(ordinal), Some(id));
        }
    }

    #[test]
    fn atom_by_name_resolves_first_occurrence() {
        let mut graph = MoleculeGraph::new("dup");
        let h1 = graph.add_atom(Atom::new("H", "H", None));
        let _h2 = graph.add_atom(Atom::new("H", "H", None));
        assert_eq!(graph.atom_by_name("H"), Some(h1));
        assert_eq!(graph.atom_by_name("C"), None);
    }

    #[test]
    fn add_bond_is_idempotent() {
        let (mut graph, ids) = ethanol_heavy_atoms();
        assert_eq!(graph.bond_count(), 2);
        graph.add_bond(ids[1], ids[0], BondOrder::Single).unwrap();
        assert_eq!(graph.bond_count(), 2);
        assert_eq!(graph.bonded_neighbors(ids[0]).unwrap(), &[ids[1]]);
    }

    #[test]
    fn add_bond_rejects_self_bonds_and_foreign_atoms() {
        let (mut graph, ids) = ethanol_heavy_atoms();
        assert!(graph.add_bond(ids[0], ids[0], BondOrder::Single).is_none());

        let mut other = MoleculeGraph::new("other");
        let foreign = other.add_atom(Atom::new("N1", "N", None));
        assert!(graph.add_bond(ids[0], foreign, BondOrder::Single).is_none());
    }

    #[test]
    fn bonded_neighbors_returns_all_partners() {
        let (graph, ids) = ethanol_heavy_atoms();
        let c2_neighbors = graph.bonded_neighbors(ids[1]).unwrap();
        assert_eq!(c2_neighbors.len(), 2);
        assert!(c2_neighbors.contains(&ids[0]));
        assert!(c2_neighbors.contains(&ids[2]));
    }

    #[test]
    fn bond_between_finds_existing_bonds_only() {
        let (graph, ids) = ethanol_heavy_atoms();
        assert!(graph.bond_between(ids[0], ids[1]).is_some());
        assert!(graph.bond_between(ids[0], ids[2]).is_none());
    }

    #[test]
    fn atoms_iter_yields_atoms_in_order() {
        let (graph, _) = ethanol_heavy_atoms();
        let names: Vec<&str> = graph.atoms_iter().map(|(_, a)| a.name.as_str()).collect();
        assert_eq!(names, vec!["C1", "C2", "O1"]);
    }

    #[test]
    fn clone_produces_independent_graph() {
        let (graph, ids) = ethanol_heavy_atoms();
        let mut copy = graph.clone();
        copy.atom_mut(copy.atoms()[0]).unwrap().position = None;
        assert!(graph.atom(ids[0]).unwrap().position.is_some());
    }
}
