use crate::core::models::molecule::MoleculeGraph;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A ligand structure format the morph pipeline can read and write.
///
/// The pipeline never interprets format details itself; it consumes
/// structures only through this seam. Format-specific information that the
/// graph model does not carry (atom types, substructure assignments,
/// comments) travels in the associated `Metadata` side-table so a structure
/// can be written back without loss.
pub trait StructureFile {
    /// Side-table of format details preserved across a read/write cycle.
    type Metadata;

    /// Error produced by parsing or serialization.
    type Error: Error + From<io::Error>;

    /// Parses one molecule from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed input or an underlying I/O failure.
    fn read_from(reader: &mut impl BufRead) -> Result<(MoleculeGraph, Self::Metadata), Self::Error>;

    /// Serializes a molecule and its metadata side-table.
    ///
    /// # Errors
    ///
    /// Returns an error when the molecule cannot be represented in the
    /// format or the writer fails.
    fn write_to(
        molecule: &MoleculeGraph,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Convenience wrapper: open `path` and [`read_from`](Self::read_from) it.
    fn read_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<(MoleculeGraph, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Convenience wrapper: create `path` and [`write_to`](Self::write_to) it.
    fn write_to_path<P: AsRef<Path>>(
        molecule: &MoleculeGraph,
        metadata: &Self::Metadata,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(molecule, metadata, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
