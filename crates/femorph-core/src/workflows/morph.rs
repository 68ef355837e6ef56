use crate::core::io::mol2::{Mol2File, split_first_substructure};
use crate::core::io::overrides::read_override_map;
use crate::core::io::traits::StructureFile;
use crate::core::models::mapping::AtomMapping;
use crate::core::models::molecule::MoleculeGraph;
use crate::engine::config::MorphConfig;
use crate::engine::connectivity::{MorphConnectivity, resolve_connectivity};
use crate::engine::error::MorphError;
use crate::engine::mapping::map_atoms;
use crate::engine::pert::{FreeEnergyMethod, PertContext, PertCoordsContext, PertTopology};
use crate::engine::progress::{MorphPhase, Progress, ProgressReporter};
use crate::engine::synthesis::synthesize_coordinates;
use crate::engine::workspace::ScopedDir;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Separator between the two ligand names in morph and complex directory names.
pub const MORPH_SEP: &str = "~";

const LIGAND_WORKDIR: &str = "ligands";
const COMPLEX_WORKDIR: &str = "complexes";
const MORPH_WORKDIR: &str = "morphs";
const VACUUM_STRUCTURE: &str = "vacuum.mol2";
const SOLVATED_STRUCTURE: &str = "solvated.mol2";
const ENVIRONMENT_FILE: &str = "environment.mol2";
const OVERRIDE_EXT: &str = "map";

/// The solvated target system a coordinate set is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSystem {
    /// The ligand alone in solvent.
    SolvatedLigand,
    /// The ligand bound to a protein, in solvent.
    SolvatedComplex { protein: String },
}

impl TargetSystem {
    /// The per-system subdirectory below the morph workspace.
    pub fn workdir_name(&self) -> &'static str {
        match self {
            Self::SolvatedLigand => "ligand",
            Self::SolvatedComplex { .. } => "complex",
        }
    }

    /// The solvated reference structure for this system, rooted at the
    /// project workspace. The ligand inside it is always the initial-state
    /// ligand; the morph only rewrites its coordinates.
    fn structure_path(&self, root: &Path, initial_name: &str) -> PathBuf {
        match self {
            Self::SolvatedLigand => root
                .join(LIGAND_WORKDIR)
                .join(initial_name)
                .join(SOLVATED_STRUCTURE),
            Self::SolvatedComplex { protein } => root
                .join(COMPLEX_WORKDIR)
                .join(format!("{}{}{}", protein, MORPH_SEP, initial_name))
                .join(SOLVATED_STRUCTURE),
        }
    }
}

/// Everything `setup` derives and `create_coords` reuses.
struct MappedState {
    initial: MoleculeGraph,
    final_state: MoleculeGraph,
    mapping: AtomMapping,
    connectivity: MorphConnectivity,
    morph: MoleculeGraph,
}

/// One morph pair: the aggregate root of the construction pipeline.
///
/// A `Morph` is created once per (initial, final, method) tuple. Its
/// free energy method is resolved at construction time, so an unknown tag
/// fails before any mapping work is spent. [`Morph::setup`] must run
/// exactly once; [`Morph::create_coords`] may then run once per solvated
/// target system. A failed `setup` leaves the morph unmapped and can be
/// retried.
pub struct Morph {
    config: MorphConfig,
    method: FreeEnergyMethod,
    topology: Box<dyn PertTopology>,
    initial_name: String,
    final_name: String,
    name: String,
    workspace: PathBuf,
    state: Option<MappedState>,
}

impl Morph {
    /// Creates a morph and its workspace directory.
    ///
    /// # Errors
    ///
    /// Returns [`MorphError::Configuration`] for an unknown method tag and
    /// [`MorphError::Collaborator`] if the workspace cannot be created.
    pub fn new(
        config: MorphConfig,
        initial_name: &str,
        final_name: &str,
    ) -> Result<Self, MorphError> {
        let method: FreeEnergyMethod = config.method.parse()?;
        let topology = method.resolve();

        let name = format!("{}{}{}", initial_name, MORPH_SEP, final_name);
        let workspace = config
            .workspace_root
            .join(MORPH_WORKDIR)
            .join(method.workdir_name())
            .join(&name);
        fs::create_dir_all(&workspace).map_err(|e| {
            MorphError::collaborator(format!("creating directory '{}'", workspace.display()), e)
        })?;
        // Absolute from here on: artifact paths must stay valid while the
        // process working directory is switched into the workspace.
        let workspace = workspace.canonicalize().map_err(|e| {
            MorphError::collaborator(format!("resolving '{}'", workspace.display()), e)
        })?;
        debug!(workspace = %workspace.display(), "Morph workspace ready");

        Ok(Self {
            config,
            method,
            topology,
            initial_name: initial_name.to_string(),
            final_name: final_name.to_string(),
            name,
            workspace,
            state: None,
        })
    }

    /// The morph pair name, `initial~final`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The workspace directory all artifacts are written into.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Whether `setup` has completed.
    pub fn is_mapped(&self) -> bool {
        self.state.is_some()
    }

    /// The atom mapping, once `setup` has completed.
    pub fn mapping(&self) -> Option<&AtomMapping> {
        self.state.as_ref().map(|s| &s.mapping)
    }

    /// The finished morph molecule, once `setup` has completed.
    pub fn morph_molecule(&self) -> Option<&MoleculeGraph> {
        self.state.as_ref().map(|s| &s.morph)
    }

    /// Computes the atom mapping, the merged connectivity and the vacuum
    /// coordinates, then writes the method's hybrid topology artifact.
    ///
    /// Must be the first operation on the morph and completes at most once;
    /// a second call fails with [`MorphError::Sequencing`]. Reads the
    /// vacuum-phase structures of both ligands and the optional override
    /// map from the project workspace. `cmd1`/`cmd2` are opaque directives
    /// handed through to the topology variant.
    #[instrument(skip_all, name = "morph_setup", fields(morph = %self.name))]
    pub fn setup(
        &mut self,
        cmd1: &str,
        cmd2: &str,
        reporter: &ProgressReporter,
    ) -> Result<(), MorphError> {
        if self.state.is_some() {
            return Err(MorphError::Sequencing(
                "setup() may only be called once per morph",
            ));
        }

        reporter.report(Progress::PhaseStart(MorphPhase::Mapping));

        let root = self.config.workspace_root.clone();
        let initial_path = root
            .join(LIGAND_WORKDIR)
            .join(&self.initial_name)
            .join(VACUUM_STRUCTURE);
        let final_path = root
            .join(LIGAND_WORKDIR)
            .join(&self.final_name)
            .join(VACUUM_STRUCTURE);

        let (initial, _) = Mol2File::read_from_path(&initial_path).map_err(|e| {
            MorphError::collaborator(format!("reading '{}'", initial_path.display()), e)
        })?;
        let (final_state, _) = Mol2File::read_from_path(&final_path).map_err(|e| {
            MorphError::collaborator(format!("reading '{}'", final_path.display()), e)
        })?;

        let override_path = root
            .join(LIGAND_WORKDIR)
            .join(&self.initial_name)
            .join(format!("{}.{}", self.name, OVERRIDE_EXT));
        let overrides = read_override_map(&override_path).map_err(|e| {
            MorphError::collaborator(format!("reading '{}'", override_path.display()), e)
        })?;
        if !overrides.is_empty() {
            info!(
                count = overrides.len(),
                path = %override_path.display(),
                "Applying user mapping overrides"
            );
        }

        let (seed, mapping) = map_atoms(
            &initial,
            &final_state,
            self.config.mcs_timeout(),
            &overrides,
        )?;
        log_mapping_table(&mapping, &initial, &final_state);
        reporter.report(Progress::PhaseFinish(MorphPhase::Mapping));

        reporter.report(Progress::PhaseStart(MorphPhase::Connectivity));
        let (merged, connectivity) =
            resolve_connectivity(&seed, &mapping, &initial, &final_state)?;
        reporter.report(Progress::PhaseFinish(MorphPhase::Connectivity));

        reporter.report(Progress::PhaseStart(MorphPhase::Coordinates));
        let morph =
            synthesize_coordinates(&merged, &mapping, &connectivity, &final_state, &initial)?;
        reporter.report(Progress::PhaseFinish(MorphPhase::Coordinates));

        reporter.report(Progress::PhaseStart(MorphPhase::Topology));
        info!("Writing pert topology for {}", self.method.tag());
        {
            let _guard = ScopedDir::enter(&self.workspace).map_err(|e| {
                MorphError::collaborator(
                    format!("entering '{}'", self.workspace.display()),
                    e,
                )
            })?;
            let ctx = PertContext {
                workdir: &self.workspace,
                morph: &morph,
                mapping: &mapping,
                connectivity: &connectivity,
                initial: &initial,
                final_state: &final_state,
                cmd1,
                cmd2,
            };
            self.topology.setup(&ctx)?;
        }
        reporter.report(Progress::PhaseFinish(MorphPhase::Topology));

        self.state = Some(MappedState {
            initial,
            final_state,
            mapping,
            connectivity,
            morph,
        });
        Ok(())
    }

    /// Re-derives the morph coordinates from a solvated reference structure
    /// and writes the method's coordinate artifact for `system`.
    ///
    /// Requires a completed [`Morph::setup`]; only atom positions are
    /// updated, the mapping and connectivity computed during setup are
    /// reused as-is. May be called once per target system.
    ///
    /// # Errors
    ///
    /// Returns [`MorphError::Sequencing`] before setup and
    /// [`MorphError::CountMismatch`] when the reference ligand atom count
    /// disagrees with the mapping.
    #[instrument(skip_all, name = "morph_create_coords", fields(morph = %self.name))]
    pub fn create_coords(
        &mut self,
        system: &TargetSystem,
        cmd1: &str,
        cmd2: &str,
        reporter: &ProgressReporter,
    ) -> Result<(), MorphError> {
        let state = self.state.as_mut().ok_or(MorphError::Sequencing(
            "create_coords() must run after setup()",
        ))?;

        reporter.report(Progress::PhaseStart(MorphPhase::Coordinates));

        let path = system.structure_path(&self.config.workspace_root, &self.initial_name);
        let (solvated, metadata) = Mol2File::read_from_path(&path)
            .map_err(|e| MorphError::collaborator(format!("reading '{}'", path.display()), e))?;
        info!(path = %path.display(), "Using reference structure for coordinate creation");

        let (ligand, _, environment, environment_meta) =
            split_first_substructure(&solvated, &metadata);

        let expected = state.mapping.len() - state.mapping.dummy_indices().len();
        if ligand.atom_count() != expected {
            return Err(MorphError::CountMismatch {
                expected,
                found: ligand.atom_count(),
            });
        }

        let system_dir = self.workspace.join(system.workdir_name());
        fs::create_dir_all(&system_dir).map_err(|e| {
            MorphError::collaborator(format!("creating directory '{}'", system_dir.display()), e)
        })?;

        let environment_file = if environment.atom_count() > 0 {
            let environment_path = system_dir.join(ENVIRONMENT_FILE);
            Mol2File::write_to_path(&environment, &environment_meta, &environment_path).map_err(
                |e| {
                    MorphError::collaborator(
                        format!("writing '{}'", environment_path.display()),
                        e,
                    )
                },
            )?;
            Some(environment_path)
        } else {
            None
        };

        state.morph = synthesize_coordinates(
            &state.morph,
            &state.mapping,
            &state.connectivity,
            &state.final_state,
            &ligand,
        )?;
        reporter.report(Progress::PhaseFinish(MorphPhase::Coordinates));

        reporter.report(Progress::PhaseStart(MorphPhase::Topology));
        {
            let _guard = ScopedDir::enter(&self.workspace).map_err(|e| {
                MorphError::collaborator(
                    format!("entering '{}'", self.workspace.display()),
                    e,
                )
            })?;
            let ctx = PertCoordsContext {
                workdir: &self.workspace,
                system_dir: &system_dir,
                morph: &state.morph,
                mapping: &state.mapping,
                environment_file: environment_file.as_deref(),
                cmd1,
                cmd2,
            };
            self.topology.create_coords(&ctx)?;
        }
        reporter.report(Progress::PhaseFinish(MorphPhase::Topology));

        Ok(())
    }
}

fn log_mapping_table(
    mapping: &AtomMapping,
    initial: &MoleculeGraph,
    final_state: &MoleculeGraph,
) {
    info!("Atom mapping between initial and final states:");
    for entry in mapping.entries() {
        let initial_name = entry
            .initial_atom
            .map(|id| initial.atom(id).unwrap().name.as_str())
            .unwrap_or("du");
        let final_name = entry
            .final_atom
            .map(|id| final_state.atom(id).unwrap().name.as_str())
            .unwrap_or("du");
        info!("{} <--> {}", initial_name, final_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::MorphConfigBuilder;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{TempDir, tempdir};

    const LIG0_VACUUM: &str = "\
@<TRIPOS>MOLECULE
lig0
 3 2 1
SMALL
NO_CHARGES
@<TRIPOS>ATOM
      1 C1     0.0000     0.0000     0.0000 C.3      1 LIG
      2 C2     1.5000     0.0000     0.0000 C.3      1 LIG
      3 N1     2.2000     1.2000     0.0000 N.3      1 LIG
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
";

    const LIG1_VACUUM: &str = "\
@<TRIPOS>MOLECULE
lig1
 3 2 1
SMALL
NO_CHARGES
@<TRIPOS>ATOM
      1 C1     0.0000     0.0000     0.0000 C.3      1 LIG
      2 C2     1.5000     0.0000     0.0000 C.3      1 LIG
      3 O1     2.1000     1.2000     0.0000 O.3      1 LIG
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
";

    const LIG0_SOLVATED: &str = "\
@<TRIPOS>MOLECULE
lig0_solvated
 6 4 2
SMALL
NO_CHARGES
@<TRIPOS>ATOM
      1 C1    10.0000    10.0000    10.0000 C.3      1 LIG
      2 C2    11.5000    10.0000    10.0000 C.3      1 LIG
      3 N1    12.2000    11.2000    10.0000 N.3      1 LIG
      4 O     20.0000    20.0000    20.0000 O.3      2 HOH
      5 H1    20.9000    20.0000    20.0000 H        2 HOH
      6 H2    19.7000    20.9000    20.0000 H        2 HOH
@<TRIPOS>BOND
     1     1     2 1
     2     2     3 1
     3     4     5 1
     4     4     6 1
";

    const LIG0_SOLVATED_SHORT: &str = "\
@<TRIPOS>MOLECULE
lig0_solvated
 2 1 1
SMALL
NO_CHARGES
@<TRIPOS>ATOM
      1 C1    10.0000    10.0000    10.0000 C.3      1 LIG
      2 C2    11.5000    10.0000    10.0000 C.3      1 LIG
@<TRIPOS>BOND
     1     1     2 1
";

    struct Project {
        root: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let project = Self {
                root: tempdir().unwrap(),
            };
            project.write_ligand_file("lig0", VACUUM_STRUCTURE, LIG0_VACUUM);
            project.write_ligand_file("lig1", VACUUM_STRUCTURE, LIG1_VACUUM);
            project
        }

        fn write_ligand_file(&self, ligand: &str, file: &str, content: &str) {
            let dir = self.root.path().join(LIGAND_WORKDIR).join(ligand);
            fs::create_dir_all(&dir).unwrap();
            let mut f = fs::File::create(dir.join(file)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }

        fn morph(&self, method: &str) -> Morph {
            let config = MorphConfigBuilder::new()
                .workspace_root(self.root.path().to_path_buf())
                .method(method)
                .mcs_timeout_s(30.0)
                .build()
                .unwrap();
            Morph::new(config, "lig0", "lig1").unwrap()
        }
    }

    fn reporter() -> ProgressReporter<'static> {
        ProgressReporter::new()
    }

    #[test]
    #[serial(cwd)]
    fn setup_builds_mapping_and_writes_artifacts() {
        let project = Project::new();
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();

        assert!(morph.is_mapped());
        let mapping = morph.mapping().unwrap();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping.dummy_indices().len(), 1);
        assert_eq!(
            morph.morph_molecule().unwrap().atom_count(),
            mapping.len()
        );

        assert!(morph.workspace().join("MORPH.pert").exists());
        assert!(morph.workspace().join("morph.mol2").exists());
        assert!(
            morph
                .workspace()
                .ends_with(PathBuf::from("morphs/sire/lig0~lig1"))
        );
    }

    #[test]
    #[serial(cwd)]
    fn setup_twice_is_a_sequencing_error() {
        let project = Project::new();
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();
        let result = morph.setup("", "", &reporter());
        assert!(matches!(result, Err(MorphError::Sequencing(_))));
    }

    #[test]
    fn create_coords_before_setup_is_a_sequencing_error() {
        let project = Project::new();
        let mut morph = project.morph("pertfile");

        let result = morph.create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter());
        assert!(matches!(result, Err(MorphError::Sequencing(_))));
    }

    #[test]
    #[serial(cwd)]
    fn create_coords_updates_coordinates_from_solvated_reference() {
        let project = Project::new();
        project.write_ligand_file("lig0", SOLVATED_STRUCTURE, LIG0_SOLVATED);
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();
        let vacuum_positions: Vec<_> = {
            let m = morph.morph_molecule().unwrap();
            m.atoms_iter().map(|(_, a)| a.position.unwrap()).collect()
        };

        morph
            .create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter())
            .unwrap();

        let system_dir = morph.workspace().join("ligand");
        assert!(system_dir.join("morph.mol2").exists());
        assert!(system_dir.join(ENVIRONMENT_FILE).exists());

        // Shared atoms now carry the solvated coordinates.
        let morphed = morph.morph_molecule().unwrap();
        let first = morphed
            .atom(morphed.atom_id_at(0).unwrap())
            .unwrap()
            .position
            .unwrap();
        assert_ne!(first, vacuum_positions[0]);
        assert_eq!(first, nalgebra::Point3::new(10.0, 10.0, 10.0));

        // Topology is untouched: same atom and bond counts as after setup.
        assert_eq!(morphed.atom_count(), 4);
    }

    #[test]
    #[serial(cwd)]
    fn create_coords_may_run_repeatedly() {
        let project = Project::new();
        project.write_ligand_file("lig0", SOLVATED_STRUCTURE, LIG0_SOLVATED);
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();
        morph
            .create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter())
            .unwrap();
        morph
            .create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter())
            .unwrap();
    }

    #[test]
    #[serial(cwd)]
    fn create_coords_rejects_wrong_ligand_atom_count() {
        let project = Project::new();
        project.write_ligand_file("lig0", SOLVATED_STRUCTURE, LIG0_SOLVATED_SHORT);
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();
        let result = morph.create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter());

        assert!(matches!(
            result,
            Err(MorphError::CountMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    #[serial(cwd)]
    fn failed_override_leaves_workspace_empty_and_morph_unmapped() {
        let project = Project::new();
        project.write_ligand_file("lig0", "lig0~lig1.map", "C1 C9\n");
        let mut morph = project.morph("pertfile");

        let result = morph.setup("", "", &reporter());

        assert!(matches!(result, Err(MorphError::Mapping(_))));
        assert!(!morph.is_mapped());
        let written: Vec<_> = fs::read_dir(morph.workspace()).unwrap().collect();
        assert!(written.is_empty(), "no file may be written on mapping failure");
    }

    #[test]
    #[serial(cwd)]
    fn override_redirects_the_mapping() {
        let project = Project::new();
        project.write_ligand_file("lig0", "lig0~lig1.map", "C1 C2\n");
        let mut morph = project.morph("pertfile");

        morph.setup("", "", &reporter()).unwrap();

        let mapping = morph.mapping().unwrap();
        let entry = mapping.entry(0).unwrap();
        assert!(entry.is_shared());
        // C1 of lig0 is pinned onto C2 of lig1.
        let pert = fs::read_to_string(morph.workspace().join("MORPH.pert")).unwrap();
        assert!(pert.lines().any(|l| {
            let fields: Vec<&str> = l.split_whitespace().collect();
            fields.len() == 6 && fields[2] == "C1" && fields[5] == "C2"
        }));
    }

    #[test]
    fn unknown_method_fails_at_construction() {
        let project = Project::new();
        let config = MorphConfigBuilder::new()
            .workspace_root(project.root.path().to_path_buf())
            .method("gromacs/bar")
            .build()
            .unwrap();

        let result = Morph::new(config, "lig0", "lig1");
        match result {
            Err(MorphError::Configuration(tag)) => assert_eq!(tag, "gromacs/bar"),
            _ => panic!("expected ConfigurationError"),
        }
    }

    #[test]
    #[serial(cwd)]
    fn working_directory_is_restored_after_both_phases() {
        let project = Project::new();
        project.write_ligand_file("lig0", SOLVATED_STRUCTURE, LIG0_SOLVATED);
        let before = std::env::current_dir().unwrap();
        let mut morph = project.morph("sander/softcore");

        morph.setup("", "", &reporter()).unwrap();
        assert_eq!(std::env::current_dir().unwrap(), before);

        morph
            .create_coords(&TargetSystem::SolvatedLigand, "", "", &reporter())
            .unwrap();
        assert_eq!(std::env::current_dir().unwrap(), before);

        assert!(morph.workspace().join("softcore.mask").exists());
    }

    #[test]
    fn target_system_paths_follow_project_conventions() {
        let root = Path::new("/project");
        assert_eq!(
            TargetSystem::SolvatedLigand.structure_path(root, "lig0"),
            PathBuf::from("/project/ligands/lig0/solvated.mol2")
        );
        assert_eq!(
            TargetSystem::SolvatedComplex {
                protein: "prot".to_string()
            }
            .structure_path(root, "lig0"),
            PathBuf::from("/project/complexes/prot~lig0/solvated.mol2")
        );
        assert_eq!(TargetSystem::SolvatedLigand.workdir_name(), "ligand");
    }
}
