use phf::{Map, phf_map};

/// Standard atomic masses in unified atomic mass units, keyed by element symbol.
///
/// Covers the elements that occur in drug-like ligands plus the `Du` marker
/// used for dummy atoms in interchange files.
static ATOMIC_MASSES: Map<&'static str, f64> = phf_map! {
    "H" => 1.008,
    "B" => 10.811,
    "C" => 12.011,
    "N" => 14.007,
    "O" => 15.999,
    "F" => 18.998,
    "Na" => 22.990,
    "Mg" => 24.305,
    "Si" => 28.086,
    "P" => 30.974,
    "S" => 32.06,
    "Cl" => 35.453,
    "K" => 39.098,
    "Ca" => 40.078,
    "Fe" => 55.845,
    "Zn" => 65.38,
    "Se" => 78.971,
    "Br" => 79.904,
    "I" => 126.904,
    "Du" => 0.0,
};

/// Looks up the standard atomic mass for an element symbol.
///
/// # Arguments
///
/// * `symbol` - The element symbol (e.g., "C", "Cl").
///
/// # Return
///
/// Returns `Some(mass)` if the element is known, otherwise `None`.
pub fn mass_of(symbol: &str) -> Option<f64> {
    ATOMIC_MASSES.get(symbol).copied()
}

/// Extracts the element symbol from a SYBYL atom type.
///
/// SYBYL types qualify the element with a hybridization or environment
/// suffix after a dot (e.g., `C.3`, `N.ar`, `O.co2`); the element is the
/// part before the dot. The symbol is normalized to the conventional
/// capitalization (`CL` -> `Cl`).
///
/// # Arguments
///
/// * `sybyl_type` - The SYBYL atom type string.
///
/// # Return
///
/// The normalized element symbol.
pub fn element_from_sybyl(sybyl_type: &str) -> String {
    let raw = sybyl_type.split('.').next().unwrap_or(sybyl_type);
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => {
            let mut symbol = first.to_ascii_uppercase().to_string();
            symbol.extend(chars.map(|c| c.to_ascii_lowercase()));
            symbol
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_of_returns_known_masses() {
        assert_eq!(mass_of("C"), Some(12.011));
        assert_eq!(mass_of("Cl"), Some(35.453));
        assert_eq!(mass_of("Du"), Some(0.0));
    }

    #[test]
    fn mass_of_returns_none_for_unknown_symbol() {
        assert_eq!(mass_of("Xx"), None);
        assert_eq!(mass_of(""), None);
    }

    #[test]
    fn element_from_sybyl_strips_hybridization_suffix() {
        assert_eq!(element_from_sybyl("C.3"), "C");
        assert_eq!(element_from_sybyl("N.ar"), "N");
        assert_eq!(element_from_sybyl("O.co2"), "O");
    }

    #[test]
    fn element_from_sybyl_normalizes_capitalization() {
        assert_eq!(element_from_sybyl("CL"), "Cl");
        assert_eq!(element_from_sybyl("br"), "Br");
        assert_eq!(element_from_sybyl("Du"), "Du");
    }

    #[test]
    fn element_from_sybyl_handles_bare_symbols() {
        assert_eq!(element_from_sybyl("S"), "S");
        assert_eq!(element_from_sybyl(""), "");
    }
}
