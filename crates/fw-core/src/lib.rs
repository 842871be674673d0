// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Core data structures of the FlowWeave refinement engine.
//!
//! A *flow table* is a square matrix of monetary flows between
//! (sector, region) pairs of a multi-regional input-output table. The
//! [`IndexSet`] owns the hierarchical taxonomy of both axes — super members
//! from the base table, sub members created by splitting — and hands out the
//! dense leaf indices that address the [`Table`] storage. Splitting a sector
//! or region grows the matrix in place, distributing every affected flow
//! equally over the new finer cells so that all base aggregates survive.

pub mod error;
pub mod index;
pub mod table;

pub use error::{Axis, Error, Result};
pub use index::{IndexSet, RegionId, SectorId, SuperIndex, TotalIndex, NOT_GIVEN};
pub use table::{Table, Value};
