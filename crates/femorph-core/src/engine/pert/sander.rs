use super::{PertContext, PertCoordsContext, PertTopology, morph_metadata};
use crate::core::io::mol2::Mol2File;
use crate::core::io::traits::StructureFile;
use crate::engine::error::MorphError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

const STATE0_NAME: &str = "state0.mol2";
const STATE1_NAME: &str = "state1.mol2";
const PREP_SCRIPT_NAME: &str = "prep.in";
const MASK_NAME: &str = "softcore.mask";
const MORPH_MOL2_NAME: &str = "morph.mol2";

/// The sander end-point variant, in its dummy and softcore flavors.
///
/// Both flavors write the two end-state structures with the full morph
/// atom set (so the atom counts agree between the states) and a `prep.in`
/// script that records the caller's preparation directives verbatim. The
/// softcore flavor additionally writes the perturbed-atom mask.
pub struct SanderTopology {
    softcore: bool,
}

impl SanderTopology {
    pub fn dummy() -> Self {
        Self { softcore: false }
    }

    pub fn softcore() -> Self {
        Self { softcore: true }
    }
}

impl PertTopology for SanderTopology {
    fn setup(&self, ctx: &PertContext) -> Result<(), MorphError> {
        let metadata = morph_metadata(ctx.morph);
        for name in [STATE0_NAME, STATE1_NAME] {
            let path = ctx.workdir.join(name);
            Mol2File::write_to_path(ctx.morph, &metadata, &path).map_err(|e| {
                MorphError::collaborator(format!("writing '{}'", path.display()), e)
            })?;
        }

        write_prep_script(&ctx.workdir.join(PREP_SCRIPT_NAME), ctx.cmd1, ctx.cmd2, None)?;

        if self.softcore {
            let mask_path = ctx.workdir.join(MASK_NAME);
            let file = File::create(&mask_path).map_err(|e| {
                MorphError::collaborator(format!("creating '{}'", mask_path.display()), e)
            })?;
            let mut writer = BufWriter::new(file);
            write_mask(&mut writer, ctx).map_err(|e| {
                MorphError::collaborator(format!("writing '{}'", mask_path.display()), e)
            })?;
            writer.flush().map_err(|e| {
                MorphError::collaborator(format!("writing '{}'", mask_path.display()), e)
            })?;
        }

        info!(
            workdir = %ctx.workdir.display(),
            softcore = self.softcore,
            "Wrote sander end-point topologies"
        );
        Ok(())
    }

    fn create_coords(&self, ctx: &PertCoordsContext) -> Result<(), MorphError> {
        let mol2_path = ctx.system_dir.join(MORPH_MOL2_NAME);
        Mol2File::write_to_path(ctx.morph, &morph_metadata(ctx.morph), &mol2_path)
            .map_err(|e| MorphError::collaborator(format!("writing '{}'", mol2_path.display()), e))?;

        write_prep_script(
            &ctx.system_dir.join(PREP_SCRIPT_NAME),
            ctx.cmd1,
            ctx.cmd2,
            ctx.environment_file,
        )?;
        info!(path = %mol2_path.display(), "Wrote morph coordinates");
        Ok(())
    }
}

/// Records the opaque preparation directives; they are never executed here.
fn write_prep_script(
    path: &Path,
    cmd1: &str,
    cmd2: &str,
    environment_file: Option<&Path>,
) -> Result<(), MorphError> {
    let write = |path: &Path| -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "# preparation directives recorded by femorph")?;
        if let Some(environment) = environment_file {
            writeln!(writer, "# environment: {}", environment.display())?;
        }
        for cmd in [cmd1, cmd2] {
            if !cmd.is_empty() {
                writeln!(writer, "{}", cmd)?;
            }
        }
        writer.flush()
    };
    write(path).map_err(|e| MorphError::collaborator(format!("writing '{}'", path.display()), e))
}

fn write_mask(writer: &mut impl Write, ctx: &PertContext) -> io::Result<()> {
    writeln!(writer, "# 1-based morph atom ordinals in the softcore region")?;

    let vanishing: Vec<String> = ctx
        .connectivity
        .initial_only
        .iter()
        .map(|&o| (o + 1).to_string())
        .collect();
    writeln!(writer, "vanishing {}", vanishing.join(" "))?;

    let appearing: Vec<String> = ctx
        .connectivity
        .final_only
        .iter()
        .map(|&o| (o + 1).to_string())
        .collect();
    writeln!(writer, "appearing {}", appearing.join(" "))?;

    Ok(())
}
