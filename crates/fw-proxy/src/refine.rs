// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The refinement driver.
//!
//! A [`Refiner`] captures an immutable base table, applies the split
//! instructions to a working copy (values equi-distributed), and then takes
//! proxies one at a time: snapshot the working table, run the approximation
//! pass, run the adjustment pass. After every step the working table is a
//! valid refinement under all proxies applied so far, so a host may stop
//! between proxies without violating any aggregate.

use rand::seq::SliceRandom;
use tracing::{debug, info};

use fw_core::{IndexSet, Table, Value};

use crate::application::FullIndex;
use crate::error::Result;
use crate::passes::{adjust, approximate};
use crate::proxy::Proxy;

/// One split instruction, applied in declared order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Split {
    Sector { id: String, into: Vec<String> },
    Region { id: String, into: Vec<String> },
}

/// All super-cells with at least one split axis; only these have finer
/// structure to distribute.
fn collect_full_indices(set: &IndexSet) -> Vec<FullIndex> {
    let mut out = Vec::new();
    for from in set.super_indices() {
        let from_split =
            set.sector(from.sector).has_sub() || set.region(from.region).has_sub();
        for to in set.super_indices() {
            let to_split = set.sector(to.sector).has_sub() || set.region(to.region).has_sub();
            if from_split || to_split {
                out.push(FullIndex {
                    i: from.sector,
                    r: from.region,
                    j: to.sector,
                    s: to.region,
                });
            }
        }
    }
    out
}

/// Stateful driver of the iterative approximation + adjustment loop.
pub struct Refiner<'a, V> {
    basetable: &'a Table<V>,
    table: Table<V>,
    last: Table<V>,
    quality: Table<usize>,
    full_indices: Vec<FullIndex>,
    step: usize,
}

impl<'a, V: Value> Refiner<'a, V> {
    /// Copies the base table and applies the split instructions in order.
    pub fn new(basetable: &'a Table<V>, splits: &[Split]) -> Result<Self> {
        let mut table = basetable.clone();
        for split in splits {
            match split {
                Split::Sector { id, into } => table.insert_subsectors(id, into)?,
                Split::Region { id, into } => table.insert_subregions(id, into)?,
            }
        }
        info!(
            base_size = basetable.index_set().size(),
            refined_size = table.index_set().size(),
            "applied split instructions"
        );

        let last = Table::new(table.index_set().clone(), V::zero());
        let quality = Table::new(table.index_set().clone(), 0usize);
        let mut full_indices = collect_full_indices(table.index_set());
        // order only affects load balance and float associativity
        let mut rng = weave_config::determinism::config().rng_for("full-indices");
        full_indices.shuffle(&mut rng);

        Ok(Self {
            basetable,
            table,
            last,
            quality,
            full_indices,
            step: 0,
        })
    }

    /// The split index set; proxies must be built against this.
    pub fn index_set(&self) -> &IndexSet {
        self.table.index_set()
    }

    /// Current state of the working table.
    pub fn table(&self) -> &Table<V> {
        &self.table
    }

    /// Per-cell priority of the proxy that wrote it last (0 = none yet).
    pub fn quality(&self) -> &Table<usize> {
        &self.quality
    }

    /// Runs one proxy iteration: snapshot, approximate, adjust.
    pub fn apply(&mut self, proxy: &Proxy<V>) -> Result<()> {
        self.step += 1;
        debug!(
            step = self.step,
            cells = self.full_indices.len(),
            "starting proxy iteration"
        );
        self.last.copy_data_from(&self.table);
        approximate(
            proxy,
            &self.full_indices,
            &mut self.table,
            &mut self.quality,
            &self.last,
            self.step,
        )?;
        adjust(
            &self.full_indices,
            &mut self.table,
            &self.quality,
            self.basetable,
            self.step,
        );
        Ok(())
    }

    /// Number of proxy iterations applied so far.
    pub fn steps(&self) -> usize {
        self.step
    }

    /// Hands out the refined table.
    pub fn finish(self) -> Table<V> {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_indices_cover_split_cells_once() {
        let mut set = IndexSet::new();
        for region in ["X", "Y"] {
            for sector in ["A", "B"] {
                set.add_index(sector, region).unwrap();
            }
        }
        set.rebuild_indices();
        let mut table = Table::<f64>::new(set, 1.0);
        table
            .insert_subsectors("A", &["A1".into(), "A2".into()])
            .unwrap();
        let cells = collect_full_indices(table.index_set());
        // 4 super pairs; rows with sector A (2) pair with everything (8),
        // other rows (2) only with the 2 split columns
        assert_eq!(cells.len(), 2 * 4 + 2 * 2);
        let set = table.index_set();
        let unique: std::collections::HashSet<String> =
            cells.iter().map(|cell| cell.describe(set)).collect();
        assert_eq!(unique.len(), cells.len());
    }
}
