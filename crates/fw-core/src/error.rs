// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two table axes an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Sector,
    Region,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Sector => f.write_str("sector"),
            Axis::Region => f.write_str("region"),
        }
    }
}

/// Domain errors raised by the index set and the flow table.
#[derive(Debug, Error)]
pub enum Error {
    /// A (sector, region) pair was admitted twice.
    #[error("combination of sector '{sector}' and region '{region}' already given")]
    DuplicateIndex { sector: String, region: String },
    /// New axis members cannot be added once the axis has been split.
    #[error("cannot add new {axis} '{name}' when already disaggregated")]
    AxisFrozen { axis: Axis, name: String },
    /// The named axis member does not exist.
    #[error("unknown {axis} '{name}'")]
    Unknown { axis: Axis, name: String },
    /// The named axis member is a sub part, not a super.
    #[error("'{name}' is not a super {axis}")]
    NotSuper { axis: Axis, name: String },
    /// The named super has already been split.
    #[error("{axis} '{name}' already has sub parts")]
    AlreadySplit { axis: Axis, name: String },
    /// A sub-part name collides with an existing axis member.
    #[error("{axis} name '{name}' already in use")]
    DuplicateName { axis: Axis, name: String },
    /// A split needs at least one sub-part name.
    #[error("no sub parts given for {axis} '{name}'")]
    EmptySplit { axis: Axis, name: String },
}
