// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! The proxy tensor and its per-cell value query.
//!
//! Tensor storage is dense and row-major over the declared axis order,
//! initialised to NaN ("not given"). The mapped value of one leaf flow tuple
//! is computed in two steps: sum the tensor over the Cartesian product of the
//! foreign clusters standing in for each mapped native leaf, then multiply by
//! the leaf's share of the previous flows within each native cluster. A
//! singleton native cluster contributes share 1 without touching the flow
//! table.

use std::fmt;

use ndarray::{ArrayD, IxDyn};
use num_traits::ToPrimitive;

use fw_core::{IndexSet, Table, Value};

use crate::application::{Application, FlowPosition, FullIndex};
use crate::error::{Error, Result};
use crate::mapping::Mapping;

/// Level and axis a proxy dimension is typed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisKind {
    Sector,
    Subsector,
    Region,
    Subregion,
}

impl AxisKind {
    /// Whether this kind addresses sub leaves rather than supers.
    pub fn is_sub(self) -> bool {
        matches!(self, AxisKind::Subsector | AxisKind::Subregion)
    }

    /// Whether this kind lives on the sector axis of the table.
    pub fn is_sector_axis(self) -> bool {
        matches!(self, AxisKind::Sector | AxisKind::Subsector)
    }

    /// Whether this kind may drive the given flow position.
    pub fn compatible(self, position: FlowPosition) -> bool {
        self.is_sector_axis() == position.is_sector()
    }

    /// Number of table members at this level.
    pub fn level_count(self, set: &IndexSet) -> usize {
        match self {
            AxisKind::Sector => set.supersectors().len(),
            AxisKind::Subsector => set.subsectors().len(),
            AxisKind::Region => set.superregions().len(),
            AxisKind::Subregion => set.subregions().len(),
        }
    }

    /// Resolves a table member name to its level index, rejecting names at
    /// the wrong level.
    pub fn native_level(self, set: &IndexSet, name: &str) -> Result<usize> {
        let (is_sub, level) = if self.is_sector_axis() {
            let node = set.sector(set.require_sector(name)?);
            (node.is_sub(), node.level_index())
        } else {
            let node = set.region(set.require_region(name)?);
            (node.is_sub(), node.level_index())
        };
        if is_sub != self.is_sub() {
            return Err(Error::LevelMismatch {
                kind: self,
                name: name.to_owned(),
            });
        }
        Ok(level)
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Sector => f.write_str("sector"),
            AxisKind::Subsector => f.write_str("subsector"),
            AxisKind::Region => f.write_str("region"),
            AxisKind::Subregion => f.write_str("subregion"),
        }
    }
}

/// One declared proxy dimension.
#[derive(Clone, Debug)]
pub struct ProxyAxis {
    kind: AxisKind,
    mapping: Option<Mapping>,
    size: usize,
}

impl ProxyAxis {
    /// An axis whose domain is the table's own level members.
    pub fn unmapped(kind: AxisKind, set: &IndexSet) -> Self {
        Self {
            kind,
            mapping: None,
            size: kind.level_count(set),
        }
    }

    /// An axis speaking a foreign vocabulary, bridged by the given relation
    /// rows. Unknown or wrong-level native names are an error.
    pub fn mapped<L>(kind: AxisKind, set: &IndexSet, links: L) -> Result<Self>
    where
        L: IntoIterator<Item = (String, String)>,
    {
        let mut mapping = Mapping::new(kind.level_count(set));
        for (foreign_name, native_name) in links {
            let native = kind.native_level(set, &native_name)?;
            let foreign = mapping.intern_foreign(&foreign_name);
            mapping.link(foreign, native);
        }
        mapping.build_clusters();
        let size = mapping.foreign_count();
        Ok(Self {
            kind,
            mapping: Some(mapping),
            size,
        })
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    /// Tensor dimension of this axis: foreign count when mapped, native level
    /// count otherwise.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.mapping.as_ref()
    }
}

/// Per-axis coordinate choice while summing the tensor for one flow tuple.
enum Choice<'a> {
    Single(usize),
    Cluster(&'a [usize]),
}

/// External evidence: typed axes, a dense NaN-initialised tensor and the
/// applications that bind it to flow indices.
#[derive(Clone, Debug)]
pub struct Proxy<V> {
    axes: Vec<ProxyAxis>,
    data: ArrayD<V>,
    applications: Vec<Application>,
}

impl<V: Value> Proxy<V> {
    /// Builds an empty proxy over the declared axes.
    pub fn new(axes: Vec<ProxyAxis>) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::Empty);
        }
        let shape: Vec<usize> = axes.iter().map(ProxyAxis::size).collect();
        Ok(Self {
            axes,
            data: ArrayD::from_elem(IxDyn(&shape), V::nan()),
            applications: Vec::new(),
        })
    }

    pub fn axes(&self) -> &[ProxyAxis] {
        &self.axes
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    /// Stores one tensor value; proxy evidence must be non-negative.
    pub fn set(&mut self, coords: &[usize], value: V) -> Result<()> {
        if value < V::zero() {
            return Err(Error::NegativeValue {
                value: value.to_f64().unwrap_or(f64::NAN),
            });
        }
        self.data[IxDyn(coords)] = value;
        Ok(())
    }

    /// Declares an application assigning every axis to a compatible flow
    /// position.
    pub fn add_application(&mut self, positions: &[FlowPosition]) -> Result<()> {
        if positions.len() != self.axes.len() {
            return Err(Error::AxisCount {
                given: positions.len(),
                declared: self.axes.len(),
            });
        }
        let mut by_position = [None; 4];
        for (axis, &position) in positions.iter().enumerate() {
            if !self.axes[axis].kind().compatible(position) {
                return Err(Error::PositionKind {
                    kind: self.axes[axis].kind(),
                    position,
                });
            }
            if by_position[position.slot()].is_some() {
                return Err(Error::PositionTaken { position });
            }
            by_position[position.slot()] = Some(axis);
        }
        self.applications
            .push(Application::new(by_position, positions.to_vec()));
        Ok(())
    }

    /// The proxy's contribution to one leaf flow tuple under an application:
    /// foreign-cluster tensor sum times the native share factors. NaN when
    /// the tuple is outside the evidence.
    pub(crate) fn mapped_value(
        &self,
        application: &Application,
        table: &Table<V>,
        leaf: FullIndex,
    ) -> V {
        let set = table.index_set();
        let mut value = self.foreign_sum(application, set, leaf);
        if value.is_nan() {
            return value;
        }
        for position in FlowPosition::ALL {
            let Some(axis_index) = application.axis_for(position) else {
                continue;
            };
            let axis = &self.axes[axis_index];
            let Some(mapping) = axis.mapping() else {
                continue;
            };
            let level = level_of(set, axis.kind(), leaf, position);
            let Some(cluster) = mapping.native[level].native_cluster.as_ref() else {
                return V::nan();
            };
            if cluster.len() <= 1 {
                // singleton cluster: the leaf is the whole native side
                continue;
            }
            let mut cluster_flow = V::zero();
            for &member in cluster.iter() {
                cluster_flow = cluster_flow + member_flow(set, axis.kind(), table, leaf, position, member);
            }
            value = value * table.at(leaf.i, leaf.r, leaf.j, leaf.s) / cluster_flow;
        }
        value
    }

    /// Sums the tensor over the Cartesian product of the foreign clusters
    /// standing in for each mapped axis; unmapped axes contribute their
    /// single native coordinate.
    fn foreign_sum(&self, application: &Application, set: &IndexSet, leaf: FullIndex) -> V {
        let mut choices = Vec::with_capacity(self.axes.len());
        for (axis_index, axis) in self.axes.iter().enumerate() {
            let position = application.position_of_axis(axis_index);
            let level = level_of(set, axis.kind(), leaf, position);
            match axis.mapping() {
                Some(mapping) => match mapping.native[level].foreign_cluster.as_ref() {
                    None => return V::nan(),
                    Some(cluster) => choices.push(Choice::Cluster(cluster.as_slice())),
                },
                None => choices.push(Choice::Single(level)),
            }
        }
        let mut coords = Vec::with_capacity(choices.len());
        product_sum(&self.data, &choices, &mut coords)
    }
}

fn product_sum<V: Value>(data: &ArrayD<V>, choices: &[Choice<'_>], coords: &mut Vec<usize>) -> V {
    let depth = coords.len();
    if depth == choices.len() {
        return data[IxDyn(coords)];
    }
    match &choices[depth] {
        Choice::Single(coord) => {
            coords.push(*coord);
            let value = product_sum(data, choices, coords);
            coords.pop();
            value
        }
        Choice::Cluster(cluster) => {
            let mut acc = V::zero();
            for &coord in *cluster {
                coords.push(coord);
                acc = acc + product_sum(data, choices, coords);
                coords.pop();
            }
            acc
        }
    }
}

/// Level index of the leaf standing at the given flow position.
fn level_of(set: &IndexSet, kind: AxisKind, leaf: FullIndex, position: FlowPosition) -> usize {
    debug_assert!(kind.compatible(position));
    match position {
        FlowPosition::I => set.sector(leaf.i).level_index(),
        FlowPosition::J => set.sector(leaf.j).level_index(),
        FlowPosition::R => set.region(leaf.r).level_index(),
        FlowPosition::S => set.region(leaf.s).level_index(),
    }
}

/// Previous flow of the tuple with one native cluster member substituted at
/// the given position. Combinations the index set does not admit count zero.
fn member_flow<V: Value>(
    set: &IndexSet,
    kind: AxisKind,
    table: &Table<V>,
    leaf: FullIndex,
    position: FlowPosition,
    member: usize,
) -> V {
    match position {
        FlowPosition::I => {
            let sector = sector_at_level(set, kind, member);
            table.sum(Some(sector), Some(leaf.r), Some(leaf.j), Some(leaf.s))
        }
        FlowPosition::J => {
            let sector = sector_at_level(set, kind, member);
            table.sum(Some(leaf.i), Some(leaf.r), Some(sector), Some(leaf.s))
        }
        FlowPosition::R => {
            let region = region_at_level(set, kind, member);
            table.sum(Some(leaf.i), Some(region), Some(leaf.j), Some(leaf.s))
        }
        FlowPosition::S => {
            let region = region_at_level(set, kind, member);
            table.sum(Some(leaf.i), Some(leaf.r), Some(leaf.j), Some(region))
        }
    }
}

fn sector_at_level(set: &IndexSet, kind: AxisKind, level: usize) -> fw_core::SectorId {
    if kind.is_sub() {
        set.subsectors()[level]
    } else {
        set.supersectors()[level]
    }
}

fn region_at_level(set: &IndexSet, kind: AxisKind, level: usize) -> fw_core::RegionId {
    if kind.is_sub() {
        set.subregions()[level]
    } else {
        set.superregions()[level]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn one_region_table() -> Table<f64> {
        let mut set = IndexSet::new();
        set.add_index("A", "X").unwrap();
        set.add_index("B", "X").unwrap();
        set.rebuild_indices();
        let mut table = Table::new(set, 0.0);
        let set = table.index_set().clone();
        let a = set.sector_named("A").unwrap();
        let b = set.sector_named("B").unwrap();
        let x = set.region_named("X").unwrap();
        table.set_at(a, x, a, x, 1.0);
        table.set_at(b, x, a, x, 3.0);
        table.set_at(a, x, b, x, 2.0);
        table.set_at(b, x, b, x, 4.0);
        table
    }

    fn leaf(table: &Table<f64>, i: &str, j: &str) -> FullIndex {
        let set = table.index_set();
        FullIndex {
            i: set.sector_named(i).unwrap(),
            r: set.region_named("X").unwrap(),
            j: set.sector_named(j).unwrap(),
            s: set.region_named("X").unwrap(),
        }
    }

    #[test]
    fn foreign_sum_combines_codes_of_one_cluster() {
        let table = one_region_table();
        // f1, f2 both stand for A; f3 stands for B; two separate clusters
        let axis = ProxyAxis::mapped(
            AxisKind::Sector,
            table.index_set(),
            vec![
                ("f1".to_owned(), "A".to_owned()),
                ("f2".to_owned(), "A".to_owned()),
                ("f3".to_owned(), "B".to_owned()),
            ],
        )
        .unwrap();
        let mut proxy = Proxy::new(vec![axis]).unwrap();
        proxy.set(&[0], 10.0).unwrap();
        proxy.set(&[1], 20.0).unwrap();
        proxy.set(&[2], 30.0).unwrap();
        proxy.add_application(&[FlowPosition::I]).unwrap();
        let application = &proxy.applications()[0];

        // singleton native clusters: share factor is 1
        let value = proxy.mapped_value(application, &table, leaf(&table, "A", "A"));
        assert_relative_eq!(value, 30.0);
        let value = proxy.mapped_value(application, &table, leaf(&table, "B", "A"));
        assert_relative_eq!(value, 30.0);
    }

    #[test]
    fn native_share_divides_by_cluster_flow() {
        let table = one_region_table();
        // f1 links A and B into one cluster of two native sectors
        let axis = ProxyAxis::mapped(
            AxisKind::Sector,
            table.index_set(),
            vec![
                ("f1".to_owned(), "A".to_owned()),
                ("f2".to_owned(), "A".to_owned()),
                ("f3".to_owned(), "B".to_owned()),
                ("f1".to_owned(), "B".to_owned()),
            ],
        )
        .unwrap();
        let mut proxy = Proxy::new(vec![axis]).unwrap();
        proxy.set(&[0], 10.0).unwrap();
        proxy.set(&[1], 20.0).unwrap();
        proxy.set(&[2], 30.0).unwrap();
        proxy.add_application(&[FlowPosition::I]).unwrap();
        let application = &proxy.applications()[0];

        // foreign sum covers the whole cluster; A's share of the flows into
        // (A, X) is 1 / (1 + 3)
        let value = proxy.mapped_value(application, &table, leaf(&table, "A", "A"));
        assert_relative_eq!(value, 60.0 * 1.0 / 4.0);
        // B's share of the same column is 3 / 4
        let value = proxy.mapped_value(application, &table, leaf(&table, "B", "A"));
        assert_relative_eq!(value, 60.0 * 3.0 / 4.0);
    }

    #[test]
    fn members_outside_the_mapping_read_nan() {
        let table = one_region_table();
        let axis = ProxyAxis::mapped(
            AxisKind::Sector,
            table.index_set(),
            vec![("f1".to_owned(), "A".to_owned())],
        )
        .unwrap();
        let mut proxy = Proxy::new(vec![axis]).unwrap();
        proxy.set(&[0], 10.0).unwrap();
        proxy.add_application(&[FlowPosition::I]).unwrap();
        let application = &proxy.applications()[0];
        let value = proxy.mapped_value(application, &table, leaf(&table, "B", "A"));
        assert!(value.is_nan());
    }

    #[test]
    fn negative_values_are_rejected() {
        let table = one_region_table();
        let axis = ProxyAxis::unmapped(AxisKind::Sector, table.index_set());
        let mut proxy = Proxy::new(vec![axis]).unwrap();
        assert!(matches!(
            proxy.set(&[0], -1.0),
            Err(Error::NegativeValue { .. })
        ));
    }

    #[test]
    fn applications_validate_axis_compatibility() {
        let table = one_region_table();
        let axis = ProxyAxis::unmapped(AxisKind::Sector, table.index_set());
        let mut proxy = Proxy::<f64>::new(vec![axis]).unwrap();
        assert!(matches!(
            proxy.add_application(&[FlowPosition::R]),
            Err(Error::PositionKind { .. })
        ));
        assert!(matches!(
            proxy.add_application(&[]),
            Err(Error::AxisCount { .. })
        ));
    }
}
