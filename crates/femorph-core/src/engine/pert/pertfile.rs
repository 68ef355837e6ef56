use super::{PertContext, PertCoordsContext, PertTopology, morph_metadata};
use crate::core::io::mol2::Mol2File;
use crate::core::io::traits::StructureFile;
use crate::engine::error::MorphError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;

const PERT_FILE_NAME: &str = "MORPH.pert";
const MORPH_MOL2_NAME: &str = "morph.mol2";

/// The generic perturbation-file variant.
///
/// Emits `MORPH.pert`, a line-based description of every morph atom with
/// its initial- and final-state identity (`du` on the dummy side) and every
/// merged bond with its per-state presence, plus the morph structure as
/// `morph.mol2`. Row order is the morph atom order.
pub struct PertfileTopology;

impl PertTopology for PertfileTopology {
    fn setup(&self, ctx: &PertContext) -> Result<(), MorphError> {
        let pert_path = ctx.workdir.join(PERT_FILE_NAME);
        let file = File::create(&pert_path).map_err(|e| {
            MorphError::collaborator(format!("creating '{}'", pert_path.display()), e)
        })?;
        let mut writer = BufWriter::new(file);
        write_pert(&mut writer, ctx).map_err(|e| {
            MorphError::collaborator(format!("writing '{}'", pert_path.display()), e)
        })?;
        writer.flush().map_err(|e| {
            MorphError::collaborator(format!("writing '{}'", pert_path.display()), e)
        })?;

        let mol2_path = ctx.workdir.join(MORPH_MOL2_NAME);
        Mol2File::write_to_path(ctx.morph, &morph_metadata(ctx.morph), &mol2_path)
            .map_err(|e| MorphError::collaborator(format!("writing '{}'", mol2_path.display()), e))?;

        info!(path = %pert_path.display(), "Wrote perturbation topology");
        Ok(())
    }

    fn create_coords(&self, ctx: &PertCoordsContext) -> Result<(), MorphError> {
        let mol2_path = ctx.system_dir.join(MORPH_MOL2_NAME);
        Mol2File::write_to_path(ctx.morph, &morph_metadata(ctx.morph), &mol2_path)
            .map_err(|e| MorphError::collaborator(format!("writing '{}'", mol2_path.display()), e))?;
        info!(path = %mol2_path.display(), "Wrote morph coordinates");
        Ok(())
    }
}

fn write_pert(writer: &mut impl Write, ctx: &PertContext) -> io::Result<()> {
    writeln!(writer, "version 1")?;
    writeln!(writer, "molecule {}", ctx.morph.name())?;

    writeln!(writer, "atoms {}", ctx.mapping.len())?;
    for (ordinal, entry) in ctx.mapping.entries().iter().enumerate() {
        let atom = ctx.morph.atom(entry.morph).expect("entry atom in morph");
        let initial_name = entry
            .initial_atom
            .map(|id| ctx.initial.atom(id).unwrap().name.as_str())
            .unwrap_or("du");
        let final_name = entry
            .final_atom
            .map(|id| ctx.final_state.atom(id).unwrap().name.as_str())
            .unwrap_or("du");
        writeln!(
            writer,
            "  atom {:>4} {:<6} {:<2} {:<6} {:<6}",
            ordinal + 1,
            atom.name,
            atom.element,
            initial_name,
            final_name,
        )?;
    }

    writeln!(writer, "bonds {}", ctx.morph.bond_count())?;
    for bond in ctx.morph.bonds() {
        let o1 = ctx.morph.index_of(bond.atom1_id).expect("bond atom in morph");
        let o2 = ctx.morph.index_of(bond.atom2_id).expect("bond atom in morph");
        let key = (o1.min(o2), o1.max(o2));

        let in_final = ctx.connectivity.final_bonds.binary_search(&key).is_ok();
        let in_initial = in_initial_state(ctx, o1, o2);

        writeln!(
            writer,
            "  bond {:>4} {:>4} {:<2} {} {}",
            key.0 + 1,
            key.1 + 1,
            bond.order,
            u8::from(in_initial),
            u8::from(in_final),
        )?;
    }

    Ok(())
}

fn in_initial_state(ctx: &PertContext, o1: usize, o2: usize) -> bool {
    let initial1 = ctx.mapping.entry(o1).and_then(|e| e.initial_atom);
    let initial2 = ctx.mapping.entry(o2).and_then(|e| e.initial_atom);
    match (initial1, initial2) {
        (Some(id1), Some(id2)) => ctx.initial.bond_between(id1, id2).is_some(),
        _ => false,
    }
}
