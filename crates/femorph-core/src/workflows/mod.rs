//! # Workflows Module
//!
//! This module provides the high-level entry point that orchestrates a
//! complete morph construction.
//!
//! ## Overview
//!
//! Workflows tie the `engine` and `core` layers together: reading the two
//! ligand end-states, computing the atom mapping, resolving the merged
//! connectivity, synthesizing dummy coordinates, and delegating to the
//! selected perturbation-topology variant, with progress reporting and a
//! workspace directory scoped to the morph pair.
//!
//! - **Morph Workflow** ([`morph`]) - The two-phase `setup` /
//!   `create_coords` protocol for one (initial, final) ligand pair.

pub mod morph;
