use crate::core::io::traits::StructureFile;
use crate::core::models::atom::Atom;
use crate::core::models::molecule::MoleculeGraph;
use crate::core::models::topology::BondOrder;
use crate::core::utils::elements;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Side-table of MOL2 information the graph model does not carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mol2Metadata {
    /// Comment lines preceding the first section.
    pub comments: Vec<String>,
    /// SYBYL atom type per atom ordinal.
    pub atom_types: Vec<String>,
    /// Substructure ID per atom ordinal (1 when the file omits it).
    pub substructure_ids: Vec<usize>,
    /// Substructure name per atom ordinal.
    pub substructure_names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum Mol2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: Mol2ParseErrorKind,
    },
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum Mol2ParseErrorKind {
    #[error("Invalid integer in field '{field}' (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid float in field '{field}' (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("ATOM record requires at least 6 fields, found {found}")]
    ShortAtomRecord { found: usize },
    #[error("BOND record requires at least 4 fields, found {found}")]
    ShortBondRecord { found: usize },
    #[error("Unknown bond type '{value}'")]
    UnknownBondType { value: String },
    #[error("Bond references unknown atom id {id}")]
    UnknownBondAtom { id: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Molecule,
    Atom,
    Bond,
    Other,
}

fn parse_usize(
    token: &str,
    field: &'static str,
    line: usize,
) -> Result<usize, Mol2Error> {
    token.parse().map_err(|_| Mol2Error::Parse {
        line,
        kind: Mol2ParseErrorKind::InvalidInt {
            field,
            value: token.to_string(),
        },
    })
}

fn parse_f64(token: &str, field: &'static str, line: usize) -> Result<f64, Mol2Error> {
    token.parse().map_err(|_| Mol2Error::Parse {
        line,
        kind: Mol2ParseErrorKind::InvalidFloat {
            field,
            value: token.to_string(),
        },
    })
}

/// Reader/writer for the TRIPOS MOL2 interchange format.
///
/// Only the MOLECULE, ATOM and BOND sections are interpreted; other
/// sections are skipped. Atom order in the file defines the graph ordinal
/// order that the morph pipeline relies on.
pub struct Mol2File;

impl StructureFile for Mol2File {
    type Metadata = Mol2Metadata;
    type Error = Mol2Error;

    fn read_from(reader: &mut impl BufRead) -> Result<(MoleculeGraph, Self::Metadata), Self::Error> {
        let mut metadata = Mol2Metadata::default();
        let mut section = Section::Preamble;
        let mut mol_name: Option<String> = None;
        let mut molecule_lines_seen = 0usize;
        let mut graph: Option<MoleculeGraph> = None;
        // MOL2 atom ids are 1-based and not necessarily dense.
        let mut id_map = std::collections::HashMap::new();
        let mut pending_bonds: Vec<(usize, usize, BondOrder, usize)> = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();

            if let Some(section_name) = trimmed.strip_prefix("@<TRIPOS>") {
                section = match section_name {
                    "MOLECULE" => Section::Molecule,
                    "ATOM" => Section::Atom,
                    "BOND" => Section::Bond,
                    _ => Section::Other,
                };
                if section == Section::Molecule {
                    molecule_lines_seen = 0;
                }
                continue;
            }

            if trimmed.is_empty() {
                continue;
            }

            match section {
                Section::Preamble => {
                    if let Some(comment) = trimmed.strip_prefix('#') {
                        metadata.comments.push(comment.trim().to_string());
                    }
                }
                Section::Molecule => {
                    molecule_lines_seen += 1;
                    if molecule_lines_seen == 1 {
                        mol_name = Some(trimmed.to_string());
                        graph = Some(MoleculeGraph::new(trimmed));
                    }
                    // Counts and type lines are redundant with the records.
                }
                Section::Atom => {
                    let graph = graph
                        .as_mut()
                        .ok_or(Mol2Error::MissingSection("MOLECULE"))?;
                    let fields: Vec<&str> = trimmed.split_whitespace().collect();
                    if fields.len() < 6 {
                        return Err(Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::ShortAtomRecord {
                                found: fields.len(),
                            },
                        });
                    }

                    let file_id = parse_usize(fields[0], "atom_id", line_num)?;
                    let name = fields[1];
                    let x = parse_f64(fields[2], "x", line_num)?;
                    let y = parse_f64(fields[3], "y", line_num)?;
                    let z = parse_f64(fields[4], "z", line_num)?;
                    let sybyl_type = fields[5];
                    let subst_id = if fields.len() > 6 {
                        parse_usize(fields[6], "subst_id", line_num)?
                    } else {
                        1
                    };
                    let subst_name = if fields.len() > 7 { fields[7] } else { "" };

                    let element = elements::element_from_sybyl(sybyl_type);
                    let atom = Atom::new(name, &element, Some(Point3::new(x, y, z)));
                    let atom_id = graph.add_atom(atom);
                    id_map.insert(file_id, atom_id);

                    metadata.atom_types.push(sybyl_type.to_string());
                    metadata.substructure_ids.push(subst_id);
                    metadata.substructure_names.push(subst_name.to_string());
                }
                Section::Bond => {
                    let fields: Vec<&str> = trimmed.split_whitespace().collect();
                    if fields.len() < 4 {
                        return Err(Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::ShortBondRecord {
                                found: fields.len(),
                            },
                        });
                    }
                    let a1 = parse_usize(fields[1], "origin_atom_id", line_num)?;
                    let a2 = parse_usize(fields[2], "target_atom_id", line_num)?;
                    let order: BondOrder =
                        fields[3].parse().map_err(|_| Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::UnknownBondType {
                                value: fields[3].to_string(),
                            },
                        })?;
                    pending_bonds.push((a1, a2, order, line_num));
                }
                Section::Other => {}
            }
        }

        if mol_name.is_none() {
            return Err(Mol2Error::MissingSection("MOLECULE"));
        }
        let mut graph = graph.ok_or(Mol2Error::MissingSection("MOLECULE"))?;
        if graph.atom_count() == 0 {
            return Err(Mol2Error::MissingSection("ATOM"));
        }

        for (a1, a2, order, line_num) in pending_bonds {
            let id1 = *id_map.get(&a1).ok_or(Mol2Error::Parse {
                line: line_num,
                kind: Mol2ParseErrorKind::UnknownBondAtom { id: a1 },
            })?;
            let id2 = *id_map.get(&a2).ok_or(Mol2Error::Parse {
                line: line_num,
                kind: Mol2ParseErrorKind::UnknownBondAtom { id: a2 },
            })?;
            graph.add_bond(id1, id2, order);
        }

        Ok((graph, metadata))
    }

    fn write_to(
        molecule: &MoleculeGraph,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for comment in &metadata.comments {
            writeln!(writer, "# {}", comment)?;
        }

        writeln!(writer, "@<TRIPOS>MOLECULE")?;
        writeln!(writer, "{}", molecule.name())?;
        writeln!(
            writer,
            "{:>5} {:>5} {:>5}",
            molecule.atom_count(),
            molecule.bond_count(),
            1
        )?;
        writeln!(writer, "SMALL")?;
        writeln!(writer, "NO_CHARGES")?;

        writeln!(writer, "@<TRIPOS>ATOM")?;
        for (ordinal, (_, atom)) in molecule.atoms_iter().enumerate() {
            let position = atom.position.ok_or_else(|| {
                Mol2Error::Inconsistency(format!("atom '{}' has no coordinates", atom.name))
            })?;
            let sybyl_type = metadata
                .atom_types
                .get(ordinal)
                .cloned()
                .unwrap_or_else(|| atom.element.clone());
            let subst_id = metadata.substructure_ids.get(ordinal).copied().unwrap_or(1);
            let subst_name = metadata
                .substructure_names
                .get(ordinal)
                .map(String::as_str)
                .unwrap_or("MOL");
            writeln!(
                writer,
                "{:>7} {:<8} {:>10.4} {:>10.4} {:>10.4} {:<8} {:>3} {:<8}",
                ordinal + 1,
                atom.name,
                position.x,
                position.y,
                position.z,
                sybyl_type,
                subst_id,
                subst_name,
            )?;
        }

        writeln!(writer, "@<TRIPOS>BOND")?;
        for (bond_num, bond) in molecule.bonds().iter().enumerate() {
            let i1 = molecule.index_of(bond.atom1_id).ok_or_else(|| {
                Mol2Error::Inconsistency("bond references an atom not in the molecule".to_string())
            })?;
            let i2 = molecule.index_of(bond.atom2_id).ok_or_else(|| {
                Mol2Error::Inconsistency("bond references an atom not in the molecule".to_string())
            })?;
            writeln!(
                writer,
                "{:>6} {:>5} {:>5} {:<2}",
                bond_num + 1,
                i1 + 1,
                i2 + 1,
                bond.order,
            )?;
        }

        Ok(())
    }
}

/// Splits a solvated system into the first substructure (the ligand) and
/// the remaining environment.
///
/// The split is by MOL2 substructure ID: atoms of the lowest ID form the
/// ligand, everything else the environment. Bonds crossing the split are
/// dropped (there are none in a solvated ligand system).
pub fn split_first_substructure(
    system: &MoleculeGraph,
    metadata: &Mol2Metadata,
) -> (MoleculeGraph, Mol2Metadata, MoleculeGraph, Mol2Metadata) {
    let ligand_subst = metadata
        .substructure_ids
        .iter()
        .copied()
        .min()
        .unwrap_or(1);

    let mut ligand = MoleculeGraph::new(system.name());
    let mut ligand_meta = Mol2Metadata::default();
    let mut environment = MoleculeGraph::new("environment");
    let mut environment_meta = Mol2Metadata::default();
    let mut ligand_ids = std::collections::HashMap::new();
    let mut environment_ids = std::collections::HashMap::new();

    for (ordinal, (id, atom)) in system.atoms_iter().enumerate() {
        let subst_id = metadata
            .substructure_ids
            .get(ordinal)
            .copied()
            .unwrap_or(1);
        let atom_type = metadata
            .atom_types
            .get(ordinal)
            .cloned()
            .unwrap_or_else(|| atom.element.clone());
        let subst_name = metadata
            .substructure_names
            .get(ordinal)
            .cloned()
            .unwrap_or_default();

        if subst_id == ligand_subst {
            let new_id = ligand.add_atom(atom.clone());
            ligand_ids.insert(id, new_id);
            ligand_meta.atom_types.push(atom_type);
            ligand_meta.substructure_ids.push(subst_id);
            ligand_meta.substructure_names.push(subst_name);
        } else {
            let new_id = environment.add_atom(atom.clone());
            environment_ids.insert(id, new_id);
            environment_meta.atom_types.push(atom_type);
            environment_meta.substructure_ids.push(subst_id);
            environment_meta.substructure_names.push(subst_name);
        }
    }

    for bond in system.bonds() {
        if let (Some(&id1), Some(&id2)) = (
            ligand_ids.get(&bond.atom1_id),
            ligand_ids.get(&bond.atom2_id),
        ) {
            ligand.add_bond(id1, id2, bond.order);
        } else if let (Some(&id1), Some(&id2)) = (
            environment_ids.get(&bond.atom1_id),
            environment_ids.get(&bond.atom2_id),
        ) {
            environment.add_bond(id1, id2, bond.order);
        }
    }

    (ligand, ligand_meta, environment, environment_meta)
}
