//! # Engine Module
//!
//! This module implements the morph construction steps and their shared
//! infrastructure.
//!
//! ## Architecture
//!
//! - **Atom Mapping** ([`mapping`]) - Maximum-common-substructure search
//!   with user overrides and a bounded wall-clock budget
//! - **Connectivity** ([`connectivity`]) - Merged bonded topology and
//!   dummy/zz classification
//! - **Coordinate Synthesis** ([`synthesis`]) - Two-pass dummy placement
//!   from native end-state geometry
//! - **Topology Emission** ([`pert`]) - Method-specific perturbation
//!   topology variants behind a closed registry
//! - **Configuration** ([`config`]) - Run parameters and TOML loading
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Workspace** ([`workspace`]) - Scoped working-directory switching
//! - **Error Handling** ([`error`]) - The morph error taxonomy

pub mod config;
pub mod connectivity;
pub mod error;
pub mod mapping;
pub mod pert;
pub mod progress;
pub mod synthesis;
pub mod workspace;
