// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2026 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of FlowWeave — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! End-to-end refinement scenarios over small hand-checkable tables.

use approx::assert_relative_eq;

use fw_core::{IndexSet, Table};
use fw_proxy::{AxisKind, FlowPosition, Proxy, ProxyAxis, Refiner, Split};

/// 2×2 base: sectors {A, B} × regions {X, Y}, all pairs admitted, all flows 1.
fn base_2x2() -> Table<f64> {
    let mut set = IndexSet::new();
    for region in ["X", "Y"] {
        for sector in ["A", "B"] {
            set.add_index(sector, region).unwrap();
        }
    }
    set.rebuild_indices();
    Table::new(set, 1.0)
}

fn split_region_x() -> Vec<Split> {
    vec![Split::Region {
        id: "X".into(),
        into: vec!["X0".into(), "X1".into()],
    }]
}

/// Every admitted super-cell of the refined table re-sums to its base value.
fn assert_conserved(refined: &Table<f64>, base: &Table<f64>) {
    let set = refined.index_set();
    for from in set.super_indices() {
        for to in set.super_indices() {
            let aggregate = refined.sum(
                Some(from.sector),
                Some(from.region),
                Some(to.sector),
                Some(to.region),
            );
            let expected = base.base(
                set.sector(from.sector).level_index(),
                set.region(from.region).level_index(),
                set.sector(to.sector).level_index(),
                set.region(to.region).level_index(),
            );
            assert_relative_eq!(aggregate, expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn equi_split_without_proxies_conserves_aggregates() {
    let base = base_2x2();
    let refiner = Refiner::new(
        &base,
        &[Split::Sector {
            id: "A".into(),
            into: vec!["A0".into(), "A1".into()],
        }],
    )
    .unwrap();
    let refined = refiner.finish();
    assert_eq!(refined.index_set().size(), 6);
    assert_conserved(&refined, &base);
    // every refined value is non-negative
    assert!(refined.raw_data().iter().all(|&v| v >= 0.0));
}

#[test]
fn population_proxy_splits_region_three_to_one() {
    let base = base_2x2();
    let mut refiner = Refiner::new(&base, &split_region_x()).unwrap();

    let axis = ProxyAxis::unmapped(AxisKind::Subregion, refiner.index_set());
    let mut proxy = Proxy::new(vec![axis]).unwrap();
    let set = refiner.index_set();
    let x0 = set
        .region(set.region_named("X0").unwrap())
        .level_index();
    let x1 = set
        .region(set.region_named("X1").unwrap())
        .level_index();
    proxy.set(&[x0], 3.0).unwrap();
    proxy.set(&[x1], 1.0).unwrap();
    proxy.add_application(&[FlowPosition::R]).unwrap();

    refiner.apply(&proxy).unwrap();
    let refined = refiner.finish();
    assert_conserved(&refined, &base);

    let set = refined.index_set();
    let x0 = set.region_named("X0").unwrap();
    let x1 = set.region_named("X1").unwrap();
    for sector in ["A", "B"] {
        let i = set.sector_named(sector).unwrap();
        for to in set.super_indices() {
            let high = refined.sum(Some(i), Some(x0), Some(to.sector), Some(to.region));
            let low = refined.sum(Some(i), Some(x1), Some(to.sector), Some(to.region));
            assert_relative_eq!(high / low, 3.0, epsilon = 1e-9);
            assert_relative_eq!(high + low, 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn two_applications_combine_on_doubly_split_cells() {
    let base = base_2x2();
    let splits = vec![
        Split::Sector {
            id: "A".into(),
            into: vec!["A0".into(), "A1".into()],
        },
        Split::Region {
            id: "X".into(),
            into: vec!["X0".into(), "X1".into()],
        },
    ];
    let mut refiner = Refiner::new(&base, &splits).unwrap();

    let set = refiner.index_set();
    let sector_axis = ProxyAxis::unmapped(AxisKind::Subsector, set);
    let region_axis = ProxyAxis::unmapped(AxisKind::Subregion, set);
    let mut proxy = Proxy::new(vec![sector_axis, region_axis]).unwrap();
    // tensor over (sub sector, sub region)
    let weights = [[3.0, 1.0], [1.0, 3.0]];
    for (k, row) in weights.iter().enumerate() {
        for (m, &value) in row.iter().enumerate() {
            proxy.set(&[k, m], value).unwrap();
        }
    }
    proxy
        .add_application(&[FlowPosition::I, FlowPosition::R])
        .unwrap();
    proxy
        .add_application(&[FlowPosition::I, FlowPosition::S])
        .unwrap();

    refiner.apply(&proxy).unwrap();
    let quality = refiner.quality().clone();
    let refined = refiner.finish();
    assert_conserved(&refined, &base);

    let set = refined.index_set();
    let a0 = set.sector_named("A0").unwrap();
    let a1 = set.sector_named("A1").unwrap();
    let b = set.sector_named("B").unwrap();
    let x0 = set.region_named("X0").unwrap();
    let y = set.region_named("Y").unwrap();

    // single-application block (A, X, B, Y): leaves proportional to the
    // tensor, e.g. weight(A0, X0) / weight(A1, X0) = 3
    let high = refined.at(a0, x0, b, y);
    let low = refined.at(a1, x0, b, y);
    assert_relative_eq!(high / low, 3.0, epsilon = 1e-9);

    // doubly-split block (A, X, A, X): both applications constrain the source
    // sector, so their shares multiply: weight(A0,X0)² vs weight(A1,X0)²
    let both = refined.at(a0, x0, a0, x0);
    let mixed = refined.at(a1, x0, a0, x0);
    assert_relative_eq!(both / mixed, 9.0, epsilon = 1e-9);
    // the destination region is driven by the second application alone
    let x1 = set.region_named("X1").unwrap();
    let shifted = refined.at(a0, x0, a0, x1);
    assert_relative_eq!(both / shifted, 3.0, epsilon = 1e-9);

    // approximation stamped the whole doubly-split block as exact
    let from = set.at(a0, x0);
    let to = set.at(a1, x0);
    assert_eq!(quality.get(from, to), 1);
}

#[test]
fn nan_cells_keep_previous_values_and_adjustment_balances() {
    let base = base_2x2();
    let mut refiner = Refiner::new(&base, &split_region_x()).unwrap();

    let axis = ProxyAxis::unmapped(AxisKind::Subregion, refiner.index_set());
    let mut proxy = Proxy::new(vec![axis]).unwrap();
    let set = refiner.index_set();
    let x0_level = set
        .region(set.region_named("X0").unwrap())
        .level_index();
    // X1 stays NaN: half the tensor is "not given"
    proxy.set(&[x0_level], 3.0).unwrap();
    proxy.add_application(&[FlowPosition::R]).unwrap();

    refiner.apply(&proxy).unwrap();
    let refined = refiner.finish();
    assert_conserved(&refined, &base);

    let set = refined.index_set();
    let a = set.sector_named("A").unwrap();
    let x0 = set.region_named("X0").unwrap();
    let x1 = set.region_named("X1").unwrap();
    let y = set.region_named("Y").unwrap();
    // the written X0 cell: share 3/8 of the X-block total (8) times the
    // targeted flow sum(A, X, A, Y) = 1
    assert_relative_eq!(refined.at(a, x0, a, y), 0.375, epsilon = 1e-9);
    // the NaN X1 cell kept its equi-distributed 0.5, then absorbed the
    // remainder of the base aggregate: 0.5 * (1 - 0.375) / 0.5
    assert_relative_eq!(refined.at(a, x1, a, y), 0.625, epsilon = 1e-9);
}

#[test]
fn all_nan_proxy_leaves_table_bitwise_unchanged() {
    let base = base_2x2();
    let mut refiner = Refiner::new(&base, &split_region_x()).unwrap();
    let before = refiner.table().raw_data().to_vec();

    let axis = ProxyAxis::unmapped(AxisKind::Subregion, refiner.index_set());
    let mut proxy = Proxy::new(vec![axis]).unwrap();
    proxy.add_application(&[FlowPosition::R]).unwrap();
    refiner.apply(&proxy).unwrap();

    assert_eq!(refiner.table().raw_data(), &before[..]);
}

#[test]
fn quality_stamps_are_monotone_across_iterations() {
    let base = base_2x2();
    let mut refiner = Refiner::new(&base, &split_region_x()).unwrap();
    let set = refiner.index_set().clone();

    let make_proxy = |values: Option<(f64, f64)>| {
        let axis = ProxyAxis::unmapped(AxisKind::Subregion, &set);
        let mut proxy = Proxy::new(vec![axis]).unwrap();
        if let Some((high, low)) = values {
            proxy.set(&[0], high).unwrap();
            proxy.set(&[1], low).unwrap();
        }
        proxy.add_application(&[FlowPosition::R]).unwrap();
        proxy
    };

    refiner.apply(&make_proxy(Some((3.0, 1.0)))).unwrap();
    let after_first = refiner.quality().raw_data().to_vec();
    // an all-NaN proxy writes nothing
    refiner.apply(&make_proxy(None)).unwrap();
    let after_second = refiner.quality().raw_data().to_vec();
    refiner.apply(&make_proxy(Some((1.0, 1.0)))).unwrap();
    let after_third = refiner.quality().raw_data().to_vec();

    assert_eq!(after_first, after_second);
    for ((&first, &second), &third) in after_first
        .iter()
        .zip(after_second.iter())
        .zip(after_third.iter())
    {
        assert!(second >= first);
        assert!(third >= second);
    }
}

#[test]
fn more_than_two_matching_applications_fail() {
    let base = base_2x2();
    let mut refiner = Refiner::new(&base, &split_region_x()).unwrap();

    let set = refiner.index_set().clone();
    let mut proxy = Proxy::new(vec![ProxyAxis::unmapped(AxisKind::Subregion, &set)]).unwrap();
    proxy.set(&[0], 1.0).unwrap();
    proxy.set(&[1], 1.0).unwrap();
    for _ in 0..3 {
        proxy.add_application(&[FlowPosition::R]).unwrap();
    }

    let err = refiner.apply(&proxy).unwrap_err();
    assert!(matches!(
        err,
        fw_proxy::Error::TooManyApplications { .. }
    ));
}
