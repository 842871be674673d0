// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use thiserror::Error;

use crate::application::FlowPosition;
use crate::proxy::AxisKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building proxies or running the refinement passes.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] fw_core::Error),
    /// A proxy needs at least one index axis.
    #[error("proxies must not be empty")]
    Empty,
    /// Proxy values are shares of a non-negative quantity.
    #[error("invalid proxy value {value}")]
    NegativeValue { value: f64 },
    /// A mapping or tensor entry referenced a table member at the wrong level.
    #[error("'{name}' is not a {kind}")]
    LevelMismatch { kind: AxisKind, name: String },
    /// Sector-typed axes can only drive `i`/`j`, region-typed only `r`/`s`.
    #[error("cannot apply {kind} column to flow index {position}")]
    PositionKind {
        kind: AxisKind,
        position: FlowPosition,
    },
    /// Two axes of one application were assigned to the same flow index.
    #[error("flow index {position} assigned twice in application")]
    PositionTaken { position: FlowPosition },
    /// Every application has to assign each of the proxy's index axes.
    #[error("application uses {given} indices but the proxy declares {declared}")]
    AxisCount { given: usize, declared: usize },
    /// Two matching applications disagreed on an axis assignment.
    #[error("applications cannot be combined")]
    Combine,
    /// At most two applications of one proxy may match a super-cell.
    #[error("more than two applications apply to {cell}")]
    TooManyApplications { cell: String },
}
