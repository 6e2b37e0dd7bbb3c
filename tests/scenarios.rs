use rstest::rstest;
use unit_commitment::{
    CostCurve, DemandProfile, FailureReason, GeneratingUnit, OptimizerConfig, SchedulingMode,
    Solution, SolutionValidator, UnitCommitmentError, UnitCommitmentOptimizer,
};

fn optimizer(mode: SchedulingMode) -> UnitCommitmentOptimizer {
    let config = OptimizerConfig {
        mode,
        ..OptimizerConfig::default()
    };
    UnitCommitmentOptimizer::from_config(&config).unwrap()
}

fn solve(mode: SchedulingMode, units: &[GeneratingUnit], demand: Vec<f64>) -> Solution {
    let demand = DemandProfile::new(demand).unwrap();
    optimizer(mode).optimize(units, &demand).unwrap()
}

fn scenario_a_unit() -> GeneratingUnit {
    GeneratingUnit::new("g1", 10.0, 100.0, CostCurve::new(50.0, 2.0, 0.01))
        .with_transition_costs(20.0, 0.0)
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_scenario_a_single_unit(#[case] mode: SchedulingMode) {
    let running = solve(mode, &[scenario_a_unit().initially_on(50.0)], vec![50.0]);
    assert!(running.success);
    assert!((running.power(0, 0).unwrap() - 50.0).abs() < 1e-6);
    assert!((running.total_cost - 175.0).abs() < 1e-6);

    let cold = solve(mode, &[scenario_a_unit()], vec![50.0]);
    assert!((cold.total_cost - 195.0).abs() < 1e-6);
    assert_eq!(cold.summary.total_startups, 1);
}

#[test]
fn test_scenario_a_dispatch_single() {
    let solution = optimizer(SchedulingMode::BeamSearch)
        .dispatch_single(&[scenario_a_unit()], 50.0)
        .unwrap();
    assert!((solution.total_cost - 195.0).abs() < 1e-6);
    assert_eq!(solution.periods[0].startup_cost, 20.0);
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_scenario_b_insufficient_capacity(#[case] mode: SchedulingMode) {
    let units = vec![
        GeneratingUnit::new("a", 0.0, 100.0, CostCurve::new(0.0, 1.0, 0.0)),
        GeneratingUnit::new("b", 0.0, 50.0, CostCurve::new(0.0, 2.0, 0.0)),
    ];
    let solution = solve(mode, &units, vec![100.0, 200.0, 120.0]);

    assert!(!solution.success);
    match solution.failure_reason() {
        Some(FailureReason::InsufficientCapacity {
            period,
            required_mw,
            available_mw,
        }) => {
            assert_eq!(*period, 1);
            assert_eq!(*required_mw, 200.0);
            assert_eq!(*available_mw, 150.0);
        }
        other => panic!("expected insufficient capacity, got {other:?}"),
    }
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_scenario_c_merit_order_unit_chosen(#[case] mode: SchedulingMode) {
    let units = vec![
        GeneratingUnit::new("mid", 10.0, 100.0, CostCurve::new(0.0, 25.0, 0.0)),
        GeneratingUnit::new("dear", 10.0, 100.0, CostCurve::new(0.0, 40.0, 0.0)),
        GeneratingUnit::new("cheap", 10.0, 100.0, CostCurve::new(0.0, 12.0, 0.0)),
    ];
    let solution = solve(mode, &units, vec![50.0]);

    assert!(solution.success);
    let committed: Vec<&str> = (0..3)
        .filter(|&i| solution.is_committed(i, 0) == Some(true))
        .map(|i| solution.unit_ids[i].as_str())
        .collect();
    assert_eq!(committed, vec!["cheap"]);
    assert!((solution.total_cost - 600.0).abs() < 1e-6);
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_scenario_d_min_uptime_forces_commitment(#[case] mode: SchedulingMode) {
    let units = vec![
        GeneratingUnit::new("cheap", 0.0, 60.0, CostCurve::new(0.0, 1.0, 0.0)).initially_on(50.0),
        GeneratingUnit::new("peaker", 10.0, 100.0, CostCurve::new(0.0, 20.0, 0.0))
            .with_ramp_rates(100.0, 100.0)
            .with_min_times(2, 1),
    ];
    let solution = solve(mode, &units, vec![100.0, 30.0, 30.0]);

    assert!(solution.success);
    let peaker = solution.unit_index("peaker").unwrap();
    assert_eq!(solution.commitment[peaker], vec![true, true, false]);
    // locked on in period 1, so it runs at its minimum instead of shutting down
    assert!((solution.power(peaker, 1).unwrap() - 10.0).abs() < 1e-6);
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_scenario_e_zero_demand(#[case] mode: SchedulingMode) {
    let units = vec![
        GeneratingUnit::new("a", 10.0, 100.0, CostCurve::new(30.0, 1.0, 0.0)),
        GeneratingUnit::new("b", 0.0, 50.0, CostCurve::new(5.0, 2.0, 0.0)),
    ];
    let solution = solve(mode, &units, vec![0.0, 0.0]);

    assert!(solution.success);
    assert_eq!(solution.total_cost, 0.0);
    assert_eq!(solution.summary.units_ever_committed, 0);
    assert_eq!(solution.summary.average_units_online, 0.0);
}

#[test]
fn test_locked_on_unit_makes_zero_demand_infeasible() {
    let unit = GeneratingUnit::new("g", 10.0, 100.0, CostCurve::new(0.0, 1.0, 0.0))
        .with_min_times(3, 1)
        .initially_on(40.0)
        .with_initial_status_periods(1);
    let solution = solve(SchedulingMode::BeamSearch, &[unit], vec![0.0, 20.0]);

    assert!(!solution.success);
    assert_eq!(solution.infeasible_periods().collect::<Vec<_>>(), vec![0]);
    match solution.failure_reason() {
        Some(FailureReason::InfeasiblePeriod {
            period,
            achievable_min_mw,
            ..
        }) => {
            assert_eq!(*period, 0);
            assert_eq!(*achievable_min_mw, 10.0);
        }
        other => panic!("expected infeasible period, got {other:?}"),
    }
    // best-effort output keeps the unit at its floor and the run continues
    assert_eq!(solution.is_committed(0, 0), Some(true));
    assert!((solution.power(0, 0).unwrap() - 10.0).abs() < 1e-6);
    assert!(solution.periods[1].feasible);
}

#[rstest]
#[case::beam(SchedulingMode::BeamSearch)]
#[case::sequential(SchedulingMode::Sequential)]
fn test_locked_on_unit_at_zero_floor_serves_zero_demand(#[case] mode: SchedulingMode) {
    let unit = GeneratingUnit::new("g", 0.0, 100.0, CostCurve::new(5.0, 1.0, 0.0))
        .with_min_times(3, 1)
        .initially_on(0.0005)
        .with_initial_status_periods(1);
    let solution = solve(mode, &[unit], vec![0.0, 0.0]);

    assert!(solution.success, "{:?}", solution.failures);
    assert_eq!(solution.commitment[0], vec![true, true]);
    assert_eq!(solution.power_mw[0], vec![0.0, 0.0]);
    assert_eq!(solution.total_cost, 0.0);
}

#[test]
fn test_beam_search_beats_sequential_on_lookahead() {
    let units = vec![
        GeneratingUnit::new("base", 0.0, 100.0, CostCurve::new(0.0, 1.0, 0.0))
            .with_transition_costs(500.0, 0.0),
        GeneratingUnit::new("peaker", 0.0, 100.0, CostCurve::new(0.0, 10.0, 0.0))
            .initially_on(30.0),
    ];
    let demand = vec![30.0, 100.0, 100.0, 100.0];

    let beam = solve(SchedulingMode::BeamSearch, &units, demand.clone());
    let sequential = solve(SchedulingMode::Sequential, &units, demand);

    assert_eq!(beam.strategy, "beam_search");
    assert_eq!(sequential.strategy, "sequential");
    assert!((beam.total_cost - 830.0).abs() < 1e-6, "beam {}", beam.total_cost);
    assert!((sequential.total_cost - 1100.0).abs() < 1e-6, "sequential {}", sequential.total_cost);
    assert_eq!(beam.is_committed(0, 0), Some(true));
    assert_eq!(sequential.is_committed(0, 0), Some(false));
}

#[test]
fn test_period_reports_add_up() {
    let units = vec![
        GeneratingUnit::new("a", 20.0, 80.0, CostCurve::new(10.0, 3.0, 0.01))
            .with_transition_costs(40.0, 10.0),
        GeneratingUnit::new("b", 10.0, 60.0, CostCurve::new(5.0, 6.0, 0.02))
            .with_transition_costs(15.0, 5.0),
    ];
    let demand = vec![30.0, 110.0, 70.0, 15.0];
    let solution = solve(SchedulingMode::BeamSearch, &units, demand.clone());

    assert!(solution.success);
    let reported: f64 = solution.periods.iter().map(|p| p.total_cost()).sum();
    assert!((reported - solution.total_cost).abs() < 1e-9);
    for (t, d) in demand.iter().enumerate() {
        assert!((solution.total_generation(t) - d).abs() < 1e-3);
        assert!((solution.periods[t].generation_mw - d).abs() < 1e-3);
    }

    let profile = DemandProfile::new(demand).unwrap();
    assert!(SolutionValidator::default().validate(&units, &profile, &solution).is_ok());
    assert_eq!(solution.summary.peak_demand_mw, 110.0);
    assert_eq!(solution.summary.total_demand_mw, 225.0);
}

#[test]
fn test_invalid_inputs_fail_before_search() {
    let optimizer = optimizer(SchedulingMode::BeamSearch);
    let demand = DemandProfile::new(vec![10.0]).unwrap();

    let err = optimizer.optimize(&[], &demand).unwrap_err();
    assert!(matches!(err, UnitCommitmentError::InvalidUnit { .. }));

    let twins = vec![scenario_a_unit(), scenario_a_unit()];
    assert!(matches!(
        optimizer.optimize(&twins, &demand),
        Err(UnitCommitmentError::InvalidUnit { .. })
    ));

    assert!(matches!(
        DemandProfile::new(vec![5.0, -1.0]),
        Err(UnitCommitmentError::InvalidDemand(_))
    ));
    assert!(matches!(DemandProfile::new(vec![]), Err(UnitCommitmentError::InvalidDemand(_))));
}

#[test]
fn test_solution_serializes_for_callers() {
    let solution = solve(SchedulingMode::BeamSearch, &[scenario_a_unit()], vec![50.0, 60.0]);
    let json = serde_json::to_value(&solution).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["unit_ids"][0], "g1");
    assert_eq!(json["commitment"][0][1], true);
    assert!(json["failures"].as_array().unwrap().is_empty());
}
