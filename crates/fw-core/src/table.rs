// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Dense N×N flow storage addressed through an [`IndexSet`].
//!
//! Rows are source (sector, region) leaves, columns destination leaves, both
//! in the index set's canonical total order. The aggregation query [`Table::sum`]
//! accepts, per argument, a concrete leaf, a super (summing its sub children)
//! or a wildcard, and always respects the existence relation: combinations
//! the index set does not admit contribute zero.
//!
//! Splitting rewrites the storage by expanding every old leaf cell into its
//! block of finer cells with the value distributed equally, so each original
//! super-cell keeps its aggregate.

use num_traits::Float;

use crate::error::{Axis, Error, Result};
use crate::index::{IndexSet, RegionId, SectorId, NOT_GIVEN};

/// Scalar type of a flow table. Implemented for `f32` and `f64`.
pub trait Value:
    Float + Send + Sync + std::fmt::Debug + std::fmt::Display + 'static
{
}

impl Value for f32 {}
impl Value for f64 {}

/// Where one old leaf cell lands in the grown storage: `count` copies spaced
/// `stride` apart starting at `start`.
#[derive(Clone, Copy, Debug)]
struct Expansion {
    start: usize,
    stride: usize,
    count: usize,
}

impl Expansion {
    fn positions(self) -> impl Iterator<Item = usize> {
        (0..self.count).map(move |m| self.start + m * self.stride)
    }
}

// NumCast from a cell count to a float type cannot fail; the fallback is
// never taken.
#[inline]
fn count_to_value<V: Value>(count: usize) -> V {
    V::from(count).unwrap_or_else(V::one)
}

/// Dense square table of per-cell values over an [`IndexSet`].
#[derive(Clone, Debug)]
pub struct Table<V> {
    data: Vec<V>,
    index_set: IndexSet,
}

impl<V: Copy> Table<V> {
    /// Builds a table filled with `default` over the given index set.
    pub fn new(index_set: IndexSet, default: V) -> Self {
        let size = index_set.size();
        Self {
            data: vec![default; size * size],
            index_set,
        }
    }

    pub fn index_set(&self) -> &IndexSet {
        &self.index_set
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> V {
        self.data[from * self.index_set.size() + to]
    }

    #[inline]
    pub fn set(&mut self, from: usize, to: usize, value: V) {
        let size = self.index_set.size();
        self.data[from * size + to] = value;
    }

    /// Value of one admitted leaf cell.
    pub fn at(&self, i: SectorId, r: RegionId, j: SectorId, s: RegionId) -> V {
        let from = self.index_set.at(i, r);
        let to = self.index_set.at(j, s);
        debug_assert!(from != NOT_GIVEN && to != NOT_GIVEN);
        self.get(from, to)
    }

    pub fn set_at(&mut self, i: SectorId, r: RegionId, j: SectorId, s: RegionId, value: V) {
        let from = self.index_set.at(i, r);
        let to = self.index_set.at(j, s);
        debug_assert!(from != NOT_GIVEN && to != NOT_GIVEN);
        self.set(from, to, value);
    }

    /// Overwrites this table's cells from another table of the same shape.
    pub fn copy_data_from(&mut self, other: &Table<V>) {
        debug_assert_eq!(self.data.len(), other.data.len());
        self.data.copy_from_slice(&other.data);
    }

    pub fn raw_data(&self) -> &[V] {
        &self.data
    }
}

impl<V: Value> Table<V> {
    /// Sum over all admitted leaf 4-tuples consistent with the query. `None`
    /// is a wildcard; a super with sub children expands to them.
    pub fn sum(
        &self,
        i: Option<SectorId>,
        r: Option<RegionId>,
        j: Option<SectorId>,
        s: Option<RegionId>,
    ) -> V {
        let set = &self.index_set;
        let Some(i) = i else {
            return set
                .supersectors()
                .iter()
                .fold(V::zero(), |acc, &i_| acc + self.sum(Some(i_), r, j, s));
        };
        if set.sector(i).has_sub() {
            return set
                .sector(i)
                .sub()
                .iter()
                .fold(V::zero(), |acc, &i_| acc + self.sum(Some(i_), r, j, s));
        }
        let Some(r) = r else {
            return set
                .admitted_regions(i)
                .iter()
                .fold(V::zero(), |acc, &r_| acc + self.sum(Some(i), Some(r_), j, s));
        };
        if set.region(r).has_sub() {
            return set
                .region(r)
                .sub()
                .iter()
                .fold(V::zero(), |acc, &r_| acc + self.sum(Some(i), Some(r_), j, s));
        }
        let Some(j) = j else {
            return set
                .supersectors()
                .iter()
                .fold(V::zero(), |acc, &j_| {
                    acc + self.sum(Some(i), Some(r), Some(j_), s)
                });
        };
        if set.sector(j).has_sub() {
            return set
                .sector(j)
                .sub()
                .iter()
                .fold(V::zero(), |acc, &j_| {
                    acc + self.sum(Some(i), Some(r), Some(j_), s)
                });
        }
        let Some(s) = s else {
            return set
                .admitted_regions(j)
                .iter()
                .fold(V::zero(), |acc, &s_| {
                    acc + self.sum(Some(i), Some(r), Some(j), Some(s_))
                });
        };
        if set.region(s).has_sub() {
            return set
                .region(s)
                .sub()
                .iter()
                .fold(V::zero(), |acc, &s_| {
                    acc + self.sum(Some(i), Some(r), Some(j), Some(s_))
                });
        }
        let from = set.at(i, r);
        let to = set.at(j, s);
        if from == NOT_GIVEN || to == NOT_GIVEN {
            V::zero()
        } else {
            self.get(from, to)
        }
    }

    /// Value at super resolution, addressed by super level indices. Intended
    /// for the captured base table, queried from a split descendant of its
    /// index set.
    pub fn base(&self, i: usize, r: usize, j: usize, s: usize) -> V {
        let from = self.index_set.base(i, r);
        let to = self.index_set.base(j, s);
        if from == NOT_GIVEN || to == NOT_GIVEN {
            V::zero()
        } else {
            self.get(from, to)
        }
    }

    /// Wildcard sum at super resolution, the [`Table::base`] analogue of
    /// [`Table::sum`].
    pub fn basesum(
        &self,
        i: Option<usize>,
        r: Option<usize>,
        j: Option<usize>,
        s: Option<usize>,
    ) -> V {
        let set = &self.index_set;
        let Some(i) = i else {
            return (0..set.supersectors().len())
                .fold(V::zero(), |acc, i_| acc + self.basesum(Some(i_), r, j, s));
        };
        let Some(r) = r else {
            let sector = set.supersectors()[i];
            return set
                .sector(sector)
                .regions()
                .iter()
                .fold(V::zero(), |acc, &r_| {
                    acc + self.basesum(Some(i), Some(set.region(r_).level_index()), j, s)
                });
        };
        let Some(j) = j else {
            return (0..set.supersectors().len()).fold(V::zero(), |acc, j_| {
                acc + self.basesum(Some(i), Some(r), Some(j_), s)
            });
        };
        let Some(s) = s else {
            let sector = set.supersectors()[j];
            return set
                .sector(sector)
                .regions()
                .iter()
                .fold(V::zero(), |acc, &s_| {
                    acc + self.basesum(
                        Some(i),
                        Some(r),
                        Some(j),
                        Some(set.region(s_).level_index()),
                    )
                });
        };
        self.base(i, r, j, s)
    }

    /// Splits the named super sector, blowing the storage up with equal
    /// distribution over the new sub sectors.
    pub fn insert_subsectors(&mut self, name: &str, subsectors: &[String]) -> Result<()> {
        let id = self.index_set.require_sector(name)?;
        if self.index_set.sector(id).is_sub() {
            return Err(Error::NotSuper {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        if self.index_set.sector(id).has_sub() {
            return Err(Error::AlreadySplit {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        let old_size = self.index_set.size();
        let expansions = self.sector_split_expansions(id, subsectors.len());
        self.index_set.insert_subsectors(name, subsectors)?;
        self.rebuild_storage(old_size, &expansions);
        Ok(())
    }

    /// Splits the named super region, blowing the storage up with equal
    /// distribution over the new sub regions.
    pub fn insert_subregions(&mut self, name: &str, subregions: &[String]) -> Result<()> {
        let id = self.index_set.require_region(name)?;
        if self.index_set.region(id).is_sub() {
            return Err(Error::NotSuper {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        if self.index_set.region(id).has_sub() {
            return Err(Error::AlreadySplit {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        let old_size = self.index_set.size();
        let expansions = self.region_split_expansions(id, subregions.len());
        self.index_set.insert_subregions(name, subregions)?;
        self.rebuild_storage(old_size, &expansions);
        Ok(())
    }

    /// A split sector expands each of its leaf cells into `k` consecutive
    /// rows/columns.
    fn sector_split_expansions(&self, target: SectorId, k: usize) -> Vec<Expansion> {
        let set = &self.index_set;
        let mut out = Vec::with_capacity(set.size());
        let mut cursor = 0;
        for cell in set.total_indices() {
            if cell.sector == target {
                out.push(Expansion {
                    start: cursor,
                    stride: 1,
                    count: k,
                });
                cursor += k;
            } else {
                out.push(Expansion {
                    start: cursor,
                    stride: 1,
                    count: 1,
                });
                cursor += 1;
            }
        }
        out
    }

    /// A split region replicates its whole contiguous block of sector leaves
    /// once per sub region, so copies of one leaf are spaced a block width
    /// apart.
    fn region_split_expansions(&self, target: RegionId, k: usize) -> Vec<Expansion> {
        let set = &self.index_set;
        let width = set
            .total_indices()
            .filter(|cell| cell.region == target)
            .count();
        let mut out = Vec::with_capacity(set.size());
        let mut cursor = 0;
        let mut offset = 0;
        for cell in set.total_indices() {
            if cell.region == target {
                out.push(Expansion {
                    start: cursor + offset,
                    stride: width,
                    count: k,
                });
                offset += 1;
                if offset == width {
                    cursor += k * width;
                    offset = 0;
                }
            } else {
                out.push(Expansion {
                    start: cursor,
                    stride: 1,
                    count: 1,
                });
                cursor += 1;
            }
        }
        out
    }

    fn rebuild_storage(&mut self, old_size: usize, expansions: &[Expansion]) {
        let new_size = self.index_set.size();
        let mut data = vec![V::zero(); new_size * new_size];
        for x in 0..old_size {
            let ex = expansions[x];
            for y in 0..old_size {
                let ey = expansions[y];
                let value =
                    self.data[x * old_size + y] / count_to_value::<V>(ex.count * ey.count);
                for nx in ex.positions() {
                    for ny in ey.positions() {
                        data[nx * new_size + ny] = value;
                    }
                }
            }
        }
        self.data = data;
    }
}
