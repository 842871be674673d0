// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Hierarchical (sector, region) taxonomy with dense leaf addressing.
//!
//! Both axes are stored as flat arenas of node records; every reference is an
//! integer id into the owning arena, so the set can be cloned and snapshotted
//! freely. A node is either a *super* (present in the base table, possibly
//! carrying sub children) or a *sub* (created by a split, pointing back at
//! its parent). The bipartite existence relation — which (super sector,
//! super region) pairs the base table actually admits — lives on the super
//! nodes; sub leaves inherit it from their parents.
//!
//! The canonical row order of every flow table is the *total* order: super
//! regions in insertion order, each replaced by its sub regions when split,
//! and within each region leaf the region's admitted sectors, each replaced
//! by its sub sectors when split. [`IndexSet::rebuild_indices`] assigns
//! consecutive integers in exactly that order.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Axis, Error, Result};

/// Sentinel for (sector, region) combinations that are not part of the table.
pub const NOT_GIVEN: usize = usize::MAX;

/// Arena id of a sector node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectorId(u32);

/// Arena id of a region node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RegionId(u32);

impl SectorId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl RegionId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One sector node. Supers carry their sub children and the regions they are
/// admitted with; subs carry the back reference to their parent.
#[derive(Clone, Debug)]
pub struct Sector {
    name: String,
    total_index: usize,
    level_index: usize,
    parent: Option<SectorId>,
    subindex: usize,
    sub: Vec<SectorId>,
    regions: Vec<RegionId>,
}

/// One region node, symmetric to [`Sector`].
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    total_index: usize,
    level_index: usize,
    parent: Option<RegionId>,
    subindex: usize,
    sub: Vec<RegionId>,
    sectors: Vec<SectorId>,
}

macro_rules! node_accessors {
    ($node:ident, $id:ident, $children:ident, $opposite:ident, $opposite_id:ident) => {
        impl $node {
            pub fn name(&self) -> &str {
                &self.name
            }

            /// Position among all leaves of this axis.
            pub fn total_index(&self) -> usize {
                self.total_index
            }

            /// Position within the node's own level (supers among supers,
            /// subs among subs).
            pub fn level_index(&self) -> usize {
                self.level_index
            }

            pub fn parent(&self) -> Option<$id> {
                self.parent
            }

            /// Rank within the parent, for sub nodes.
            pub fn subindex(&self) -> usize {
                self.subindex
            }

            pub fn is_sub(&self) -> bool {
                self.parent.is_some()
            }

            pub fn has_sub(&self) -> bool {
                !self.sub.is_empty()
            }

            pub fn sub(&self) -> &[$id] {
                &self.sub
            }

            /// Admitted members of the opposite axis (super level only).
            pub fn $opposite(&self) -> &[$opposite_id] {
                &self.$children
            }
        }
    };
}

node_accessors!(Sector, SectorId, regions, regions, RegionId);
node_accessors!(Region, RegionId, sectors, sectors, SectorId);

/// One admitted (super sector, super region) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuperIndex {
    pub sector: SectorId,
    pub region: RegionId,
}

/// One leaf cell of the table in canonical row order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TotalIndex {
    pub sector: SectorId,
    pub region: RegionId,
    pub index: usize,
}

/// Iterates a node's leaves: the sub children when split, the node itself
/// otherwise.
#[derive(Clone)]
pub enum Leaves<'a, T: Copy> {
    One(std::iter::Once<T>),
    Sub(std::iter::Copied<std::slice::Iter<'a, T>>),
}

impl<T: Copy> Iterator for Leaves<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            Leaves::One(it) => it.next(),
            Leaves::Sub(it) => it.next(),
        }
    }
}

/// Owner of both axis arenas, the existence relation and the dense lookup.
#[derive(Clone, Debug, Default)]
pub struct IndexSet {
    sectors: Vec<Sector>,
    regions: Vec<Region>,
    sector_names: HashMap<String, SectorId>,
    region_names: HashMap<String, RegionId>,
    supersectors: Vec<SectorId>,
    superregions: Vec<RegionId>,
    subsectors: Vec<SectorId>,
    subregions: Vec<RegionId>,
    indices: Vec<usize>,
    size: usize,
    total_sectors_count: usize,
    total_regions_count: usize,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of admitted leaf cells; the row/column count of any table over
    /// this set.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_sectors_count(&self) -> usize {
        self.total_sectors_count
    }

    pub fn total_regions_count(&self) -> usize {
        self.total_regions_count
    }

    pub fn sector(&self, id: SectorId) -> &Sector {
        &self.sectors[id.index()]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn sector_named(&self, name: &str) -> Option<SectorId> {
        self.sector_names.get(name).copied()
    }

    pub fn region_named(&self, name: &str) -> Option<RegionId> {
        self.region_names.get(name).copied()
    }

    pub fn require_sector(&self, name: &str) -> Result<SectorId> {
        self.sector_named(name).ok_or_else(|| Error::Unknown {
            axis: Axis::Sector,
            name: name.to_owned(),
        })
    }

    pub fn require_region(&self, name: &str) -> Result<RegionId> {
        self.region_named(name).ok_or_else(|| Error::Unknown {
            axis: Axis::Region,
            name: name.to_owned(),
        })
    }

    pub fn supersectors(&self) -> &[SectorId] {
        &self.supersectors
    }

    pub fn superregions(&self) -> &[RegionId] {
        &self.superregions
    }

    pub fn subsectors(&self) -> &[SectorId] {
        &self.subsectors
    }

    pub fn subregions(&self) -> &[RegionId] {
        &self.subregions
    }

    /// The super a sector leaf belongs to (the leaf itself when unsplit).
    pub fn sector_super(&self, id: SectorId) -> SectorId {
        self.sectors[id.index()].parent.unwrap_or(id)
    }

    /// The super a region leaf belongs to (the leaf itself when unsplit).
    pub fn region_super(&self, id: RegionId) -> RegionId {
        self.regions[id.index()].parent.unwrap_or(id)
    }

    pub fn sector_leaves(&self, id: SectorId) -> Leaves<'_, SectorId> {
        let node = &self.sectors[id.index()];
        if node.has_sub() {
            Leaves::Sub(node.sub.iter().copied())
        } else {
            Leaves::One(std::iter::once(id))
        }
    }

    pub fn region_leaves(&self, id: RegionId) -> Leaves<'_, RegionId> {
        let node = &self.regions[id.index()];
        if node.has_sub() {
            Leaves::Sub(node.sub.iter().copied())
        } else {
            Leaves::One(std::iter::once(id))
        }
    }

    /// Admitted super sectors of the region leaf's super.
    pub fn admitted_sectors(&self, id: RegionId) -> &[SectorId] {
        let node = &self.regions[id.index()];
        match node.parent {
            Some(parent) => &self.regions[parent.index()].sectors,
            None => &node.sectors,
        }
    }

    /// Admitted super regions of the sector leaf's super.
    pub fn admitted_regions(&self, id: SectorId) -> &[RegionId] {
        let node = &self.sectors[id.index()];
        match node.parent {
            Some(parent) => &self.sectors[parent.index()].regions,
            None => &node.regions,
        }
    }

    /// Registers a super sector, returning the existing id when the name is
    /// already known. Fails once the sector axis has been split.
    pub fn add_sector(&mut self, name: &str) -> Result<SectorId> {
        if !self.subsectors.is_empty() {
            return Err(Error::AxisFrozen {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        if let Some(id) = self.sector_named(name) {
            return Ok(id);
        }
        let id = SectorId(self.sectors.len() as u32);
        let level = self.supersectors.len();
        self.sectors.push(Sector {
            name: name.to_owned(),
            total_index: level,
            level_index: level,
            parent: None,
            subindex: 0,
            sub: Vec::new(),
            regions: Vec::new(),
        });
        self.supersectors.push(id);
        self.sector_names.insert(name.to_owned(), id);
        self.total_sectors_count += 1;
        Ok(id)
    }

    /// Registers a super region, returning the existing id when the name is
    /// already known. Fails once the region axis has been split.
    pub fn add_region(&mut self, name: &str) -> Result<RegionId> {
        if !self.subregions.is_empty() {
            return Err(Error::AxisFrozen {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        if let Some(id) = self.region_named(name) {
            return Ok(id);
        }
        let id = RegionId(self.regions.len() as u32);
        let level = self.superregions.len();
        self.regions.push(Region {
            name: name.to_owned(),
            total_index: level,
            level_index: level,
            parent: None,
            subindex: 0,
            sub: Vec::new(),
            sectors: Vec::new(),
        });
        self.superregions.push(id);
        self.region_names.insert(name.to_owned(), id);
        self.total_regions_count += 1;
        Ok(id)
    }

    /// Admits a (super sector, super region) pair, creating either member on
    /// first sight. Duplicate admission is an error.
    pub fn add_index(&mut self, sector_name: &str, region_name: &str) -> Result<()> {
        let sector = self.add_sector(sector_name)?;
        let region = self.add_region(region_name)?;
        if self.regions[region.index()].sectors.contains(&sector) {
            return Err(Error::DuplicateIndex {
                sector: sector_name.to_owned(),
                region: region_name.to_owned(),
            });
        }
        self.regions[region.index()].sectors.push(sector);
        self.sectors[sector.index()].regions.push(region);
        self.size += 1;
        Ok(())
    }

    /// Recomputes the dense leaf lookup in canonical total order. Must be
    /// called after admissions; splits call it themselves.
    pub fn rebuild_indices(&mut self) {
        let order: Vec<(usize, usize)> = self
            .total_indices()
            .map(|cell| {
                (
                    self.sector(cell.sector).total_index,
                    self.region(cell.region).total_index,
                )
            })
            .collect();
        debug_assert_eq!(order.len(), self.size);
        let columns = self.total_regions_count;
        self.indices = vec![NOT_GIVEN; self.total_sectors_count * columns];
        for (index, (sector_total, region_total)) in order.into_iter().enumerate() {
            self.indices[sector_total * columns + region_total] = index;
        }
    }

    /// Dense lookup of a leaf pair; [`NOT_GIVEN`] when the combination is not
    /// admitted.
    #[inline]
    pub fn at(&self, sector: SectorId, region: RegionId) -> usize {
        let sector = &self.sectors[sector.index()];
        let region = &self.regions[region.index()];
        debug_assert!(!sector.has_sub());
        debug_assert!(!region.has_sub());
        self.indices[sector.total_index * self.total_regions_count + region.total_index]
    }

    /// Lookup by super level indices, for addressing a base-resolution table
    /// from a split descendant of its index set.
    #[inline]
    pub fn base(&self, sector_level: usize, region_level: usize) -> usize {
        self.indices[sector_level * self.superregions.len() + region_level]
    }

    /// All admitted (super sector, super region) pairs, region-major.
    pub fn super_indices(&self) -> impl Iterator<Item = SuperIndex> + '_ {
        self.superregions.iter().flat_map(move |&region| {
            self.regions[region.index()]
                .sectors
                .iter()
                .map(move |&sector| SuperIndex { sector, region })
        })
    }

    /// Every leaf cell in canonical row order, with its flat index.
    pub fn total_indices(&self) -> impl Iterator<Item = TotalIndex> + '_ {
        self.superregions
            .iter()
            .flat_map(move |&region| self.region_leaves(region))
            .flat_map(move |region| {
                self.admitted_sectors(region)
                    .iter()
                    .flat_map(move |&sector| self.sector_leaves(sector))
                    .map(move |sector| (sector, region))
            })
            .enumerate()
            .map(|(index, (sector, region))| TotalIndex {
                sector,
                region,
                index,
            })
    }

    /// Splits the named super sector into the given sub sectors and refreshes
    /// the dense lookup.
    pub fn insert_subsectors(&mut self, name: &str, subsectors: &[String]) -> Result<()> {
        let id = self.require_sector(name)?;
        if subsectors.is_empty() {
            return Err(Error::EmptySplit {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        if self.sectors[id.index()].is_sub() {
            return Err(Error::NotSuper {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        if self.sectors[id.index()].has_sub() {
            return Err(Error::AlreadySplit {
                axis: Axis::Sector,
                name: name.to_owned(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for sub_name in subsectors {
            if self.sector_names.contains_key(sub_name) || !seen.insert(sub_name) {
                return Err(Error::DuplicateName {
                    axis: Axis::Sector,
                    name: sub_name.clone(),
                });
            }
        }

        let base_total = self.sectors[id.index()].total_index;
        for (subindex, sub_name) in subsectors.iter().enumerate() {
            let sub_id = SectorId(self.sectors.len() as u32);
            self.sector_names.insert(sub_name.clone(), sub_id);
            self.sectors.push(Sector {
                name: sub_name.clone(),
                total_index: base_total + subindex,
                level_index: self.subsectors.len(),
                parent: Some(id),
                subindex,
                sub: Vec::new(),
                regions: Vec::new(),
            });
            self.subsectors.push(sub_id);
            self.sectors[id.index()].sub.push(sub_id);
        }

        let shift = subsectors.len() - 1;
        if shift > 0 {
            for oi in 0..self.supersectors.len() {
                let other = self.supersectors[oi];
                if other == id || self.sectors[other.index()].total_index <= base_total {
                    continue;
                }
                self.sectors[other.index()].total_index += shift;
                for ci in 0..self.sectors[other.index()].sub.len() {
                    let child = self.sectors[other.index()].sub[ci];
                    self.sectors[child.index()].total_index += shift;
                }
            }
        }

        let region_leaf_count: usize = self.sectors[id.index()]
            .regions
            .iter()
            .map(|&region| {
                let node = &self.regions[region.index()];
                if node.has_sub() {
                    node.sub.len()
                } else {
                    1
                }
            })
            .sum();
        self.total_sectors_count += shift;
        self.size += shift * region_leaf_count;
        self.rebuild_indices();
        debug!(sector = name, subs = subsectors.len(), size = self.size, "split sector");
        Ok(())
    }

    /// Splits the named super region into the given sub regions and refreshes
    /// the dense lookup.
    pub fn insert_subregions(&mut self, name: &str, subregions: &[String]) -> Result<()> {
        let id = self.require_region(name)?;
        if subregions.is_empty() {
            return Err(Error::EmptySplit {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        if self.regions[id.index()].is_sub() {
            return Err(Error::NotSuper {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        if self.regions[id.index()].has_sub() {
            return Err(Error::AlreadySplit {
                axis: Axis::Region,
                name: name.to_owned(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for sub_name in subregions {
            if self.region_names.contains_key(sub_name) || !seen.insert(sub_name) {
                return Err(Error::DuplicateName {
                    axis: Axis::Region,
                    name: sub_name.clone(),
                });
            }
        }

        let base_total = self.regions[id.index()].total_index;
        for (subindex, sub_name) in subregions.iter().enumerate() {
            let sub_id = RegionId(self.regions.len() as u32);
            self.region_names.insert(sub_name.clone(), sub_id);
            self.regions.push(Region {
                name: sub_name.clone(),
                total_index: base_total + subindex,
                level_index: self.subregions.len(),
                parent: Some(id),
                subindex,
                sub: Vec::new(),
                sectors: Vec::new(),
            });
            self.subregions.push(sub_id);
            self.regions[id.index()].sub.push(sub_id);
        }

        let shift = subregions.len() - 1;
        if shift > 0 {
            for oi in 0..self.superregions.len() {
                let other = self.superregions[oi];
                if other == id || self.regions[other.index()].total_index <= base_total {
                    continue;
                }
                self.regions[other.index()].total_index += shift;
                for ci in 0..self.regions[other.index()].sub.len() {
                    let child = self.regions[other.index()].sub[ci];
                    self.regions[child.index()].total_index += shift;
                }
            }
        }

        let sector_leaf_count: usize = self.regions[id.index()]
            .sectors
            .iter()
            .map(|&sector| {
                let node = &self.sectors[sector.index()];
                if node.has_sub() {
                    node.sub.len()
                } else {
                    1
                }
            })
            .sum();
        self.total_regions_count += shift;
        self.size += shift * sector_leaf_count;
        self.rebuild_indices();
        debug!(region = name, subs = subregions.len(), size = self.size, "split region");
        Ok(())
    }
}
