//! # Perturbation Topology Module
//!
//! Emission strategies for the method-specific hybrid topology artifact.
//! The free energy method is a closed set of variants selected by a string
//! tag at morph construction time; each variant consumes the finished
//! mapping, connectivity and coordinates and writes its own artifact
//! files, preserving the atom ordering established by the mapper.

pub mod pertfile;
pub mod sander;

use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::MoleculeGraph;
use crate::engine::connectivity::MorphConnectivity;
use crate::engine::error::MorphError;
use std::path::Path;
use std::str::FromStr;

/// The free energy methods a morph can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreeEnergyMethod {
    /// A generic perturbation-file format consumed by lambda-scheduling codes.
    Pertfile,
    /// End-point topologies with explicit dummy atoms for sander.
    SanderDummy,
    /// End-point topologies with a softcore perturbed-atom mask for sander.
    SanderSoftcore,
}

impl FreeEnergyMethod {
    /// The canonical tag of this method.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Pertfile => "pertfile",
            Self::SanderDummy => "sander/dummy",
            Self::SanderSoftcore => "sander/softcore",
        }
    }

    /// The per-method subdirectory below the morph workspace root.
    pub fn workdir_name(&self) -> &'static str {
        match self {
            Self::Pertfile => "sire",
            Self::SanderDummy => "sander-dummy",
            Self::SanderSoftcore => "sander-softcore",
        }
    }

    /// Resolves the method to its emission strategy.
    pub fn resolve(&self) -> Box<dyn PertTopology> {
        match self {
            Self::Pertfile => Box::new(pertfile::PertfileTopology),
            Self::SanderDummy => Box::new(sander::SanderTopology::dummy()),
            Self::SanderSoftcore => Box::new(sander::SanderTopology::softcore()),
        }
    }
}

impl FromStr for FreeEnergyMethod {
    type Err = MorphError;

    /// Parses a method tag of the form `method` or `method/subtype`.
    ///
    /// The historical aliases `Sire`, `AMBER` and `AMBER/softcore` are
    /// accepted for compatibility with existing workflow configurations.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "pertfile" | "Sire" => Ok(Self::Pertfile),
            "sander/dummy" | "sander" | "AMBER" => Ok(Self::SanderDummy),
            "sander/softcore" | "AMBER/softcore" => Ok(Self::SanderSoftcore),
            _ => Err(MorphError::Configuration(tag.to_string())),
        }
    }
}

/// Everything a variant needs to write its setup artifact.
pub struct PertContext<'a> {
    /// The morph workspace (also the process working directory during the call).
    pub workdir: &'a Path,
    /// The finished morph molecule with merged bonds and all coordinates.
    pub morph: &'a MoleculeGraph,
    pub mapping: &'a AtomMapping,
    pub connectivity: &'a MorphConnectivity,
    pub initial: &'a MoleculeGraph,
    pub final_state: &'a MoleculeGraph,
    /// Opaque preparation-tool directives, recorded verbatim.
    pub cmd1: &'a str,
    pub cmd2: &'a str,
}

/// Everything a variant needs to write a coordinate update for one
/// solvated target system.
pub struct PertCoordsContext<'a> {
    pub workdir: &'a Path,
    /// Per-system subdirectory below the workspace.
    pub system_dir: &'a Path,
    /// The morph with coordinates from the solvated reference.
    pub morph: &'a MoleculeGraph,
    pub mapping: &'a AtomMapping,
    /// The environment structure written alongside, if the system has one.
    pub environment_file: Option<&'a Path>,
    pub cmd1: &'a str,
    pub cmd2: &'a str,
}

/// A free-energy-method-specific topology emitter.
///
/// `setup` writes the hybrid-topology artifact from the finalized mapping
/// and connectivity; `create_coords` writes a coordinate-only update
/// consistent with that artifact's atom ordering.
pub trait PertTopology {
    fn setup(&self, ctx: &PertContext) -> Result<(), MorphError>;
    fn create_coords(&self, ctx: &PertCoordsContext) -> Result<(), MorphError>;
}

/// MOL2 side-table for writing the morph structure: SYBYL types collapse
/// to the bare element and all atoms sit in one MOR substructure.
pub(crate) fn morph_metadata(morph: &MoleculeGraph) -> crate::core::io::mol2::Mol2Metadata {
    let mut metadata = crate::core::io::mol2::Mol2Metadata::default();
    for (_, atom) in morph.atoms_iter() {
        metadata.atom_types.push(atom.element.clone());
        metadata.substructure_ids.push(1);
        metadata.substructure_names.push("MOR".to_string());
    }
    metadata
}
