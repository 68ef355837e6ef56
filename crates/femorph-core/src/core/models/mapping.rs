use super::ids::AtomId;
use std::collections::HashMap;

/// One record of the atom correspondence between the two end-states.
///
/// `morph` is the atom in the combined morph molecule; `initial_atom` and
/// `final_atom` are its counterparts in the initial and final structures.
/// At least one side is always present: the only constructors are
/// [`AtomMapEntry::shared`], [`AtomMapEntry::initial_only`] and
/// [`AtomMapEntry::final_only`], so a record with both sides absent cannot
/// be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomMapEntry {
    /// The atom in the morph molecule.
    pub morph: AtomId,
    /// The corresponding atom in the initial structure, if present there.
    pub initial_atom: Option<AtomId>,
    /// The corresponding atom in the final structure, if present there.
    pub final_atom: Option<AtomId>,
}

impl AtomMapEntry {
    /// Creates an entry for an atom present in both end-states.
    pub fn shared(morph: AtomId, initial_atom: AtomId, final_atom: AtomId) -> Self {
        Self {
            morph,
            initial_atom: Some(initial_atom),
            final_atom: Some(final_atom),
        }
    }

    /// Creates an entry for an atom present only in the initial state
    /// (a dummy in the final-state view).
    pub fn initial_only(morph: AtomId, initial_atom: AtomId) -> Self {
        Self {
            morph,
            initial_atom: Some(initial_atom),
            final_atom: None,
        }
    }

    /// Creates an entry for an atom present only in the final state
    /// (a dummy in the initial-state view).
    pub fn final_only(morph: AtomId, final_atom: AtomId) -> Self {
        Self {
            morph,
            initial_atom: None,
            final_atom: Some(final_atom),
        }
    }

    /// Returns `true` if the atom is present in both end-states.
    pub fn is_shared(&self) -> bool {
        self.initial_atom.is_some() && self.final_atom.is_some()
    }

    /// Returns `true` if the atom exists only in the final state.
    pub fn is_dummy_in_initial(&self) -> bool {
        self.initial_atom.is_none()
    }

    /// Returns `true` if the atom exists only in the initial state.
    pub fn is_dummy_in_final(&self) -> bool {
        self.final_atom.is_none()
    }
}

/// The ordered atom correspondence for one morph pair.
///
/// The ordinal of an entry equals the ordinal of its atom in the morph
/// molecule. A reverse index from final-structure atoms to entry ordinals
/// is derived at construction and kept consistent by making the entry list
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct AtomMapping {
    entries: Vec<AtomMapEntry>,
    reverse: HashMap<AtomId, usize>,
}

impl AtomMapping {
    /// Builds a mapping from an ordered list of entries.
    ///
    /// # Arguments
    ///
    /// * `entries` - The entries in morph atom order.
    pub fn new(entries: Vec<AtomMapEntry>) -> Self {
        let reverse = entries
            .iter()
            .enumerate()
            .filter_map(|(ordinal, entry)| entry.final_atom.map(|id| (id, ordinal)))
            .collect();
        Self { entries, reverse }
    }

    /// Returns the entries in morph atom order.
    pub fn entries(&self) -> &[AtomMapEntry] {
        &self.entries
    }

    /// Returns the entry at a morph ordinal.
    pub fn entry(&self, ordinal: usize) -> Option<&AtomMapEntry> {
        self.entries.get(ordinal)
    }

    /// Returns the number of entries (= morph atom count).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the mapping holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the morph ordinals of atoms absent from the initial state.
    ///
    /// These are the atoms that must be synthesized as dummies in the
    /// initial-state coordinate frame.
    pub fn dummy_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_dummy_in_initial())
            .map(|(ordinal, _)| ordinal)
            .collect()
    }

    /// Resolves a final-structure atom to its mapping entry.
    pub fn reverse(&self, final_atom: AtomId) -> Option<&AtomMapEntry> {
        self.reverse.get(&final_atom).map(|&ordinal| &self.entries[ordinal])
    }

    /// Resolves a final-structure atom to its morph ordinal.
    pub fn reverse_ordinal(&self, final_atom: AtomId) -> Option<usize> {
        self.reverse.get(&final_atom).copied()
    }
}
