//! Floodgrid is the grid hierarchy manager of a block-structured adaptive
//! mesh refinement (AMR) solver for the shallow water equations. Grid
//! patches live on a stack of refinement levels in the style of
//! Berger-Oliger AMR: every level is a set of disjoint rectangular patches,
//! and each level is nested inside the one below it with a buffer of at
//! least one coarse cell.
//!
//! The crate owns the memory of all patches (a single workspace arena), the
//! per-level patch lists, the domain masks and flagging pipeline that decide
//! where finer patches go, and a conservation diagnostic. Solving the PDE,
//! the time stepping loop and the physical error criterion are supplied by
//! the caller.

pub mod arena;
pub mod checkpoint;
pub mod cluster;
pub mod config;
pub mod conservation;
pub mod error;
pub mod flagging;
pub mod grid;
pub mod hierarchy;
pub mod index_space;
pub mod mask;
pub mod regrid;

pub use crate::config::{HierarchyConfig, Region};
pub use crate::error::{Error, Result};
pub use crate::hierarchy::GridHierarchy;
