// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Proxy evidence and the refinement driver.
//!
//! A *proxy* is a piece of external evidence — population counts, production
//! shares, trade statistics — shaped as a dense tensor over typed axes, with
//! *applications* naming which of the four flow indices (source sector `i`,
//! source region `r`, destination sector `j`, destination region `s`) the
//! tensor constrains. An axis may speak a foreign vocabulary, bridged to the
//! table's own taxonomy by a many-to-many mapping.
//!
//! The [`Refiner`] drives the iterative loop: every proxy, in declared order,
//! first *approximates* the finer cells of each affected super-cell from its
//! shares of the previous iteration's flows, then *adjusts* so every
//! super-cell re-sums to its base-table aggregate.

pub mod application;
pub mod error;
pub mod mapping;
pub mod passes;
pub mod proxy;
pub mod refine;

pub use application::{Application, FlowPosition, FullIndex};
pub use error::{Error, Result};
pub use proxy::{AxisKind, Proxy, ProxyAxis};
pub use refine::{Refiner, Split};
