// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The two data-parallel passes of one proxy iteration.
//!
//! Both passes map over the list of affected super-cells. Every task reads
//! only the previous-iteration snapshot (approximation) or the current state
//! of its own super-cell (adjustment) and produces the write-set for exactly
//! that super-cell; the sets are disjoint by construction, so they are
//! committed after the parallel map without any locking.

use rayon::prelude::*;

use fw_core::{IndexSet, Table, Value, NOT_GIVEN};

use crate::application::{Application, FullIndex};
use crate::error::{Error, Result};
use crate::proxy::Proxy;

/// One pending cell write at leaf resolution.
struct CellWrite<V> {
    from: usize,
    to: usize,
    value: V,
}

/// Every leaf 4-tuple within a super-cell.
fn leaf_tuples(set: &IndexSet, cell: FullIndex) -> Vec<FullIndex> {
    let mut out = Vec::new();
    for i in set.sector_leaves(cell.i) {
        for r in set.region_leaves(cell.r) {
            for j in set.sector_leaves(cell.j) {
                for s in set.region_leaves(cell.s) {
                    out.push(FullIndex { i, r, j, s });
                }
            }
        }
    }
    out
}

/// Approximation: fill the finer cells of every affected super-cell from the
/// proxy's shares of the previous iteration's flows, stamping the quality
/// table with the proxy's priority `d`.
pub fn approximate<V: Value>(
    proxy: &Proxy<V>,
    full_indices: &[FullIndex],
    table: &mut Table<V>,
    quality: &mut Table<usize>,
    last: &Table<V>,
    d: usize,
) -> Result<()> {
    let writes: Result<Vec<Vec<CellWrite<V>>>> = full_indices
        .par_iter()
        .map(|&cell| approximate_cell(proxy, last, cell))
        .collect();
    for write in writes?.into_iter().flatten() {
        table.set(write.from, write.to, write.value);
        quality.set(write.from, write.to, d);
    }
    Ok(())
}

fn approximate_cell<V: Value>(
    proxy: &Proxy<V>,
    last: &Table<V>,
    cell: FullIndex,
) -> Result<Vec<CellWrite<V>>> {
    let set = last.index_set();

    let mut first: Option<&Application> = None;
    let mut second: Option<&Application> = None;
    for application in proxy.applications() {
        if application.applies_to(proxy.axes(), set, cell) {
            if first.is_none() {
                first = Some(application);
            } else if second.is_none() {
                second = Some(application);
            } else {
                return Err(Error::TooManyApplications {
                    cell: cell.describe(set),
                });
            }
        }
    }
    let Some(first) = first else {
        return Ok(Vec::new());
    };

    let mut writes = Vec::new();
    match second {
        None => {
            let denominator = first.denominator(last, cell);
            if denominator > V::zero() && denominator.is_finite() {
                for leaf in leaf_tuples(set, cell) {
                    let share = proxy.mapped_value(first, last, leaf) / denominator;
                    if !share.is_finite() {
                        continue;
                    }
                    let value = first.flow(proxy.axes(), last, leaf) * share;
                    if value.is_finite() {
                        writes.push(CellWrite {
                            from: set.at(leaf.i, leaf.r),
                            to: set.at(leaf.j, leaf.s),
                            value,
                        });
                    }
                }
            }
        }
        Some(second) => {
            let denominator1 = first.denominator(last, cell);
            if denominator1 > V::zero() && denominator1.is_finite() {
                let denominator2 = second.denominator(last, cell);
                if denominator2 > V::zero() && denominator2.is_finite() {
                    let combined = Application::combined(first, second)?;
                    for leaf in leaf_tuples(set, cell) {
                        let share1 = proxy.mapped_value(first, last, leaf) / denominator1;
                        let share2 = proxy.mapped_value(second, last, leaf) / denominator2;
                        let value = if !share1.is_finite() {
                            if !share2.is_finite() {
                                continue;
                            }
                            second.flow(proxy.axes(), last, leaf) * share2
                        } else if !share2.is_finite() {
                            first.flow(proxy.axes(), last, leaf) * share1
                        } else {
                            combined.flow(proxy.axes(), last, leaf) * share1 * share2
                        };
                        if value.is_finite() {
                            writes.push(CellWrite {
                                from: set.at(leaf.i, leaf.r),
                                to: set.at(leaf.j, leaf.s),
                                value,
                            });
                        }
                    }
                }
            }
        }
    }
    Ok(writes)
}

/// Adjustment: rescale every affected super-cell so its leaves re-sum to the
/// base-table aggregate. Cells the current proxy wrote exactly (quality `d`)
/// keep their value as long as the remainder can absorb the difference.
pub fn adjust<V: Value>(
    full_indices: &[FullIndex],
    table: &mut Table<V>,
    quality: &Table<usize>,
    basetable: &Table<V>,
    d: usize,
) {
    let writes: Vec<Vec<CellWrite<V>>> = {
        let snapshot: &Table<V> = table;
        full_indices
            .par_iter()
            .map(|&cell| adjust_cell(snapshot, quality, basetable, cell, d))
            .collect()
    };
    for write in writes.into_iter().flatten() {
        table.set(write.from, write.to, write.value);
    }
}

fn adjust_cell<V: Value>(
    table: &Table<V>,
    quality: &Table<usize>,
    basetable: &Table<V>,
    cell: FullIndex,
    d: usize,
) -> Vec<CellWrite<V>> {
    let set = table.index_set();
    let base = basetable.base(
        set.sector(cell.i).level_index(),
        set.region(cell.r).level_index(),
        set.sector(cell.j).level_index(),
        set.region(cell.s).level_index(),
    );
    if base <= V::zero() {
        return Vec::new();
    }

    let leaves = leaf_tuples(set, cell);
    let mut sum_exact = V::zero();
    let mut sum_non_exact = V::zero();
    for leaf in &leaves {
        let from = set.at(leaf.i, leaf.r);
        let to = set.at(leaf.j, leaf.s);
        debug_assert!(from != NOT_GIVEN && to != NOT_GIVEN);
        if quality.get(from, to) == d {
            sum_exact = sum_exact + table.get(from, to);
        } else {
            sum_non_exact = sum_non_exact + table.get(from, to);
        }
    }

    let mut writes = Vec::with_capacity(leaves.len());
    if base > sum_exact && sum_non_exact > V::zero() {
        let scale = (base - sum_exact) / sum_non_exact;
        for leaf in &leaves {
            let from = set.at(leaf.i, leaf.r);
            let to = set.at(leaf.j, leaf.s);
            if quality.get(from, to) != d {
                writes.push(CellWrite {
                    from,
                    to,
                    value: table.get(from, to) * scale,
                });
            }
        }
    } else {
        let correction = base / (sum_exact + sum_non_exact);
        if correction.is_finite() && correction != V::one() {
            for leaf in &leaves {
                let from = set.at(leaf.i, leaf.r);
                let to = set.at(leaf.j, leaf.s);
                writes.push(CellWrite {
                    from,
                    to,
                    value: table.get(from, to) * correction,
                });
            }
        }
    }
    writes
}
