// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Axis → flow-index assignments of a proxy.
//!
//! An application names which of the four flow indices each proxy axis
//! drives. It *applies to* a super-cell when the sub/super type of every
//! assigned axis matches whether the corresponding super is split. Two
//! applications matching the same super-cell combine by set-union of their
//! assignments; disagreeing on an axis is a configuration error.

use std::fmt;

use fw_core::{IndexSet, RegionId, SectorId, Table, Value};

use crate::error::{Error, Result};
use crate::proxy::ProxyAxis;

/// One of the four flow indices: source sector/region, destination
/// sector/region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowPosition {
    I,
    R,
    J,
    S,
}

impl FlowPosition {
    pub const ALL: [FlowPosition; 4] = [
        FlowPosition::I,
        FlowPosition::R,
        FlowPosition::J,
        FlowPosition::S,
    ];

    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            FlowPosition::I => 0,
            FlowPosition::R => 1,
            FlowPosition::J => 2,
            FlowPosition::S => 3,
        }
    }

    /// Whether this position indexes the sector axis of the table.
    pub fn is_sector(self) -> bool {
        matches!(self, FlowPosition::I | FlowPosition::J)
    }
}

impl fmt::Display for FlowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowPosition::I => f.write_str("i"),
            FlowPosition::R => f.write_str("r"),
            FlowPosition::J => f.write_str("j"),
            FlowPosition::S => f.write_str("s"),
        }
    }
}

/// One flow 4-tuple. Super-cells carry supers, leaf tuples carry leaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FullIndex {
    pub i: SectorId,
    pub r: RegionId,
    pub j: SectorId,
    pub s: RegionId,
}

impl FullIndex {
    pub(crate) fn describe(&self, set: &IndexSet) -> String {
        format!(
            "{}:{} -> {}:{}",
            set.sector(self.i).name(),
            set.region(self.r).name(),
            set.sector(self.j).name(),
            set.region(self.s).name()
        )
    }
}

/// Assignment of proxy axes to flow indices.
#[derive(Clone, Debug, Default)]
pub struct Application {
    /// Flow position → axis index into the proxy's axis list.
    by_position: [Option<usize>; 4],
    /// Axis index → assigned flow position. Empty for combined applications,
    /// which are only ever used for flow aggregation.
    by_axis: Vec<FlowPosition>,
}

impl Application {
    pub(crate) fn new(by_position: [Option<usize>; 4], by_axis: Vec<FlowPosition>) -> Self {
        Self {
            by_position,
            by_axis,
        }
    }

    /// The axis driving the given flow position, if any.
    pub fn axis_for(&self, position: FlowPosition) -> Option<usize> {
        self.by_position[position.slot()]
    }

    /// The flow position the given axis drives.
    pub(crate) fn position_of_axis(&self, axis: usize) -> FlowPosition {
        self.by_axis[axis]
    }

    /// Whether this application matches the sub/super pattern of a super-cell.
    pub fn applies_to(&self, axes: &[ProxyAxis], set: &IndexSet, cell: FullIndex) -> bool {
        for position in FlowPosition::ALL {
            let Some(axis) = self.by_position[position.slot()] else {
                continue;
            };
            let split = match position {
                FlowPosition::I => set.sector(cell.i).has_sub(),
                FlowPosition::R => set.region(cell.r).has_sub(),
                FlowPosition::J => set.sector(cell.j).has_sub(),
                FlowPosition::S => set.region(cell.s).has_sub(),
            };
            if axes[axis].kind().is_sub() != split {
                return false;
            }
        }
        true
    }

    /// Set-union of two applications' assignments.
    pub fn combined(first: &Self, second: &Self) -> Result<Self> {
        let mut by_position = first.by_position;
        for slot in 0..4 {
            match (first.by_position[slot], second.by_position[slot]) {
                (Some(a), Some(b)) if a != b => return Err(Error::Combine),
                (None, Some(b)) => by_position[slot] = Some(b),
                _ => {}
            }
        }
        Ok(Self {
            by_position,
            by_axis: Vec::new(),
        })
    }

    /// Flow numerator: the previous-iteration flow over the aggregation the
    /// proxy directly targets — the leaf itself where unassigned or
    /// super-typed, the leaf's parent where the axis is sub-typed.
    pub(crate) fn flow<V: Value>(
        &self,
        axes: &[ProxyAxis],
        table: &Table<V>,
        leaf: FullIndex,
    ) -> V {
        let set = table.index_set();
        let i = match self.by_position[FlowPosition::I.slot()] {
            Some(axis) if axes[axis].kind().is_sub() => set.sector_super(leaf.i),
            _ => leaf.i,
        };
        let r = match self.by_position[FlowPosition::R.slot()] {
            Some(axis) if axes[axis].kind().is_sub() => set.region_super(leaf.r),
            _ => leaf.r,
        };
        let j = match self.by_position[FlowPosition::J.slot()] {
            Some(axis) if axes[axis].kind().is_sub() => set.sector_super(leaf.j),
            _ => leaf.j,
        };
        let s = match self.by_position[FlowPosition::S.slot()] {
            Some(axis) if axes[axis].kind().is_sub() => set.region_super(leaf.s),
            _ => leaf.s,
        };
        table.sum(Some(i), Some(r), Some(j), Some(s))
    }

    /// Flow denominator: the previous-iteration total over exactly the width
    /// this application redistributes — the super where assigned, a full
    /// wildcard where not.
    pub(crate) fn denominator<V: Value>(&self, table: &Table<V>, leaf: FullIndex) -> V {
        let set = table.index_set();
        let i = self.by_position[FlowPosition::I.slot()].map(|_| set.sector_super(leaf.i));
        let r = self.by_position[FlowPosition::R.slot()].map(|_| set.region_super(leaf.r));
        let j = self.by_position[FlowPosition::J.slot()].map(|_| set.sector_super(leaf.j));
        let s = self.by_position[FlowPosition::S.slot()].map(|_| set.region_super(leaf.s));
        table.sum(i, r, j, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(slots: [Option<usize>; 4]) -> Application {
        Application::new(slots, Vec::new())
    }

    #[test]
    fn combination_unions_disjoint_assignments() {
        let first = app([Some(0), Some(1), None, None]);
        let second = app([Some(0), None, None, Some(1)]);
        let combo = Application::combined(&first, &second).unwrap();
        assert_eq!(combo.axis_for(FlowPosition::I), Some(0));
        assert_eq!(combo.axis_for(FlowPosition::R), Some(1));
        assert_eq!(combo.axis_for(FlowPosition::J), None);
        assert_eq!(combo.axis_for(FlowPosition::S), Some(1));
    }

    #[test]
    fn combination_rejects_conflicts() {
        let first = app([Some(0), None, None, None]);
        let second = app([Some(1), None, None, None]);
        assert!(matches!(
            Application::combined(&first, &second),
            Err(Error::Combine)
        ));
    }
}
