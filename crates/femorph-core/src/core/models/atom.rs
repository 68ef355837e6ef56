use crate::core::utils::elements;
use nalgebra::Point3;

/// Represents an atom in a ligand structure.
///
/// This struct carries the identity and physical properties the morph
/// pipeline needs: the atom name from the source structure, the normalized
/// element symbol, an isotope tag used to pin user-forced correspondences
/// during mapping, the 3D position (absent for dummy atoms that have not
/// been placed yet), and the atomic mass.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom in its source structure (e.g., "C1", "H41").
    pub name: String,
    /// The normalized element symbol (e.g., "C", "Cl").
    pub element: String,
    /// Isotope tag; 0 means the natural isotope. Matching nonzero tags on a
    /// pair of atoms pin them to each other during mapping.
    pub isotope: u16,
    /// The 3D coordinates in Angstroms, or `None` for an unplaced dummy.
    pub position: Option<Point3<f64>>,
    /// The atomic mass in unified atomic mass units.
    pub mass: f64,
}

impl Atom {
    /// Creates a new `Atom` with the natural isotope tag.
    ///
    /// The mass is filled in from the element table; unknown elements get a
    /// mass of zero.
    ///
    /// # Arguments
    ///
    /// * `name` - The atom name.
    /// * `element` - The normalized element symbol.
    /// * `position` - The 3D coordinates, or `None` for an unplaced dummy.
    pub fn new(name: &str, element: &str, position: Option<Point3<f64>>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_string(),
            isotope: 0,
            position,
            mass: elements::mass_of(element).unwrap_or(0.0),
        }
    }

    /// Returns `true` if this atom has no assigned position yet.
    pub fn is_unplaced(&self) -> bool {
        self.position.is_none()
    }
}
