//! # Core I/O Module
//!
//! Structure file input/output for the morph pipeline. The pipeline itself
//! consumes structures only through [`traits::StructureFile`]; the concrete
//! format here is TRIPOS MOL2, the interchange format the surrounding
//! preparation tooling produces per ligand.

pub mod mol2;
pub mod overrides;
pub mod traits;
