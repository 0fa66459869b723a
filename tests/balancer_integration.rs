//! Integration tests for the balancer control loop.

mod common;

use std::thread;

use hybrid_balancer::balance::{Balancer, SharedBalancer, SnapshotStatus, Strategy};
use hybrid_balancer::config::{LogInterval, SiteConfig};
use hybrid_balancer::demand::EnergyDemand;
use hybrid_balancer::io::export::write_csv;
use hybrid_balancer::sources::SourceKind;

use common::EPS;

fn run_day(balancer: &mut Balancer) -> Vec<(f64, f64, f64, f64, f64)> {
    (0..24)
        .map(|hour| {
            let r = balancer.balance_at(None, Some(hour)).expect("balance");
            (
                r.allocated_w(SourceKind::Grid),
                r.allocated_w(SourceKind::Battery),
                r.allocated_w(SourceKind::Solar),
                r.allocated_w(SourceKind::Wind),
                r.deficit_w,
            )
        })
        .collect()
}

#[test]
fn same_seed_reproduces_a_day() {
    let cfg = SiteConfig::baseline();
    let mut a = Balancer::from_config(&cfg).expect("baseline");
    let mut b = Balancer::from_config(&cfg).expect("baseline");
    assert_eq!(run_day(&mut a), run_day(&mut b));
}

#[test]
fn different_seed_changes_wind() {
    let mut cfg = SiteConfig::baseline();
    let mut a = Balancer::from_config(&cfg).expect("baseline");
    cfg.balancer.seed = 7;
    let mut b = Balancer::from_config(&cfg).expect("seed 7");
    let wind = |day: &[(f64, f64, f64, f64, f64)]| day.iter().map(|d| d.3).collect::<Vec<_>>();
    assert_ne!(wind(&run_day(&mut a)), wind(&run_day(&mut b)));
}

#[test]
fn renewable_first_uses_solar_by_day_and_grid_by_night() {
    let mut cfg = SiteConfig::baseline();
    cfg.wind.mean_w = 0.0;
    cfg.wind.std_dev_w = 0.0;
    let mut b = Balancer::from_config(&cfg).expect("calm baseline");

    let noon = b.balance_at(None, Some(12)).expect("noon");
    assert!((noon.allocated_w(SourceKind::Solar) - 384.0).abs() < EPS);
    assert_eq!(noon.renewable_percent().map(|p| (p - 80.0).abs() < EPS), Some(true));

    let night = b.balance_at(None, Some(2)).expect("night");
    assert_eq!(night.allocated_w(SourceKind::Solar), 0.0);
    assert!(night.allocated_w(SourceKind::Grid) > 0.0);
    assert!(night.is_fully_served());
    assert_eq!(night.renewable_percent(), Some(0.0));
}

#[test]
fn off_grid_cabin_drains_battery_overnight() {
    let mut cfg = SiteConfig::off_grid_cabin();
    cfg.balancer.cycle_minutes = 60.0;
    let mut b = Balancer::from_config(&cfg).expect("cabin");
    let start = b.battery().remaining_wh();
    assert!((start - 200.0).abs() < EPS);

    let first = b.balance_at(None, Some(0)).expect("midnight");
    assert!((first.allocated_w(SourceKind::Battery) - 200.0).abs() < EPS);
    assert!(b.battery().remaining_wh() < EPS);
    assert_eq!(first.emergency_grid_used(), Some(true));

    let second = b.balance_at(None, Some(1)).expect("1am");
    assert_eq!(second.allocated_w(SourceKind::Battery), 0.0);
    assert_eq!(second.battery_remaining_wh().map(|wh| wh < EPS), Some(true));
}

#[test]
fn deficit_is_data_not_error() {
    let mut b = common::fixed_balancer(Strategy::OffGrid, 0.0, 0.0);
    b.update_source(SourceKind::Grid, 0.0, false).expect("grid down");
    let demand = EnergyDemand::flat(1000.0, 0.0);
    let result = b.balance_at(Some(&demand), Some(0)).expect("deficit is not an error");
    assert!(!result.is_fully_served());
    assert!((result.deficit_w - 850.0).abs() < EPS);
    assert_eq!(result.allocated_w(SourceKind::Grid), 0.0);
    // Demand was still unmet after battery and renewables.
    assert_eq!(result.emergency_grid_used(), Some(true));
}

#[test]
fn off_grid_with_nothing_left_reports_full_deficit() {
    let mut b = common::fixed_balancer(Strategy::OffGrid, 0.0, 0.0);
    b.update_source(SourceKind::Battery, 0.0, true).expect("battery empty");
    b.update_source(SourceKind::Grid, 0.0, false).expect("grid down");
    let result = b.balance_at(None, Some(0)).expect("balance");
    assert!(result.sources.is_empty());
    assert!((result.deficit_w - 480.0).abs() < EPS);
    assert_eq!(result.emergency_grid_used(), Some(true));
}

#[test]
fn pv_marked_unavailable_is_not_drawn() {
    let mut b = common::fixed_balancer(Strategy::RenewableFirst, 600.0, 0.0);
    b.update_source(SourceKind::Solar, 0.0, false).expect("pv offline");
    for hour in [10, 12, 14] {
        let result = b.balance_at(None, Some(hour)).expect("balance");
        assert_eq!(result.allocated_w(SourceKind::Solar), 0.0, "hour {hour}");
        assert!(result.is_fully_served());
    }
    assert!(!b.registry().get(SourceKind::Solar).is_available);
}

#[test]
fn strategy_swap_applies_to_next_call() {
    let mut b = common::fixed_balancer(Strategy::GridPriority, 300.0, 50.0);
    let first = b.balance_at(None, Some(12)).expect("first");
    b.set_strategy(Strategy::OffGrid);
    let second = b.balance_at(None, Some(12)).expect("second");
    assert_eq!(first.strategy, Strategy::GridPriority);
    assert_eq!(second.strategy, Strategy::OffGrid);
    assert!(first.cost_estimate_uah_per_hour().is_some());
    assert!(second.emergency_grid_used().is_some());
}

#[test]
fn summary_covers_allocations_since_previous() {
    let mut b = common::fixed_balancer(Strategy::GridPriority, 0.0, 0.0)
        .with_history_len(4)
        .with_log_interval(LogInterval::Count(10));
    for _ in 0..10 {
        b.balance_at(None, Some(12)).expect("balance");
    }
    // Window bounded by retention.
    let summary = b.last_summary().cloned().expect("summary after 10");
    assert_eq!(summary.allocations, 4);
    assert_eq!(b.log().len(), 4);
}

#[test]
fn shared_balancer_snapshot_while_balancing() {
    let shared = SharedBalancer::new(common::fixed_balancer(Strategy::RenewableFirst, 200.0, 40.0));
    assert_eq!(shared.snapshot().status, SnapshotStatus::Collecting);

    let worker = {
        let s = shared.clone();
        thread::spawn(move || {
            for hour in 0..24 {
                s.balance_at(None, Some(hour)).expect("balance");
            }
        })
    };
    for _ in 0..10 {
        let snap = shared.snapshot();
        assert!(snap.history.len() <= 30);
        if let Some(current) = snap.current {
            assert_eq!(Some(&current), snap.history.last());
        }
    }
    worker.join().expect("worker");

    let snap = shared.snapshot();
    assert_eq!(snap.status, SnapshotStatus::Running);
    assert_eq!(snap.history.len(), 24);
    assert_eq!(snap.current.map(|r| r.hour), Some(23));
}

#[test]
fn shared_balancer_rejects_unknown_strategy() {
    let shared = SharedBalancer::new(common::fixed_balancer(Strategy::GridPriority, 0.0, 0.0));
    let err = shared.set_strategy_by_name("MAX_PROFIT").expect_err("unknown");
    assert!(err.is_configuration());
    assert_eq!(shared.with_lock(|b| b.strategy()), Strategy::GridPriority);
}

#[test]
fn csv_export_of_log() {
    let mut b = common::fixed_balancer(Strategy::GridPriority, 0.0, 0.0);
    for hour in 0..5 {
        b.balance_at(None, Some(hour)).expect("balance");
    }
    let mut buf = Vec::new();
    write_csv(b.log().iter(), &mut buf).expect("csv");
    let text = String::from_utf8(buf).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[1].contains(",GRID_PRIORITY,480.00,480.00,"));
}
