//! Fixtures for tests

use crate::input::InputTables;
use crate::input::connection::Connection;
use crate::input::fuel::Fuel;
use crate::input::power_plant::{Constraints, Costs, Performance, PowerPlant, PowerPlantTables};
use crate::input::system::{
    DemandRow, DemandTimeOfDay, EmissionLimitRow, GlobalDiscountRate, RepresentativeDay,
    ReserveMarginRow, SystemTables, TimeOfDay,
};
use crate::input::{ExistingCapacityRow, RawTable};
use crate::scenario::{ScenarioContext, Toggles};
use indexmap::indexmap;
use itertools::iproduct;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The folder containing the bundled demo
#[fixture]
pub fn demo_dir() -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "demos", "simple"].iter().collect()
}

#[fixture]
pub fn demo_inputs_dir(demo_dir: PathBuf) -> PathBuf {
    demo_dir.join("inputs")
}

#[fixture]
pub fn demo_scenario_dir(demo_dir: PathBuf) -> PathBuf {
    demo_dir.join("scenarios")
}

#[fixture]
pub fn demo_sensitivity_dir(demo_dir: PathBuf) -> PathBuf {
    demo_dir.join("sensitivity")
}

#[fixture]
pub fn system_tables() -> SystemTables {
    let days = ["summer", "winter"];
    let times = ["day", "night"];

    SystemTables {
        representative_days: days
            .iter()
            .map(|&day| RepresentativeDay {
                representative_day: day.into(),
                time_frac: 0.5,
                dmd_frac: 0.5,
            })
            .collect(),
        times_of_day: times
            .iter()
            .map(|&time| TimeOfDay {
                time_of_day: time.into(),
                time_frac: 0.5,
            })
            .collect(),
        demand: [(2020, 100.0, 0.1), (2030, 110.0, 0.2), (2040, 120.0, 0.3)]
            .into_iter()
            .map(|(year, demand, rps)| DemandRow {
                year,
                demand,
                rps: Some(rps),
            })
            .collect(),
        demand_tod: iproduct!(days, times)
            .map(|(day, time)| DemandTimeOfDay {
                representative_day: day.into(),
                time_of_day: time.into(),
                dmd_frac: 0.5,
            })
            .collect(),
        discount_rate_global: vec![GlobalDiscountRate {
            discount_rate: Some(0.05),
        }],
        discount_rate_tech: RawTable::default(),
        emission: vec![EmissionLimitRow {
            periods: 2020,
            emis_comm: "CO2".into(),
            emis_limit: 1000.0,
            emis_limit_units: "kt".into(),
            emis_limit_notes: String::new(),
        }],
        reserve_margin: vec![ReserveMarginRow {
            reserve_margin: Some(0.15),
        }],
        capacity_factor_tod: Vec::new(),
        min_capacity: Vec::new(),
        reference: RawTable::default(),
    }
}

#[fixture]
pub fn power_plant_tables() -> PowerPlantTables {
    PowerPlantTables {
        plants: indexmap! {
            "GAS_PP".into() => PowerPlant {
                name: "GAS_PP".into(),
                fuel: "NATGAS".into(),
                output: "ELC".into(),
                baseload: false,
                reserve: true,
                new_builds: true,
                renewable: false,
                storage: false,
                capacity_credit: Some(0.9),
                storage_duration: None,
            }
        },
        performance: indexmap! {
            "GAS_PP".into() => Performance {
                name: "GAS_PP".into(),
                efficiency: Some(40.0),
                heat_rate: Some(8530.0),
                expected_lifetime: Some(30.0),
                capacity_factor: Some(60.0),
            }
        },
        costs: indexmap! {
            "GAS_PP".into() => Costs {
                name: "GAS_PP".into(),
                cost_invest: Some(1000.0),
                cost_fixed: Some(10.0),
                cost_variable: Some(2.0),
                cost_invest_incr: None,
                cost_fixed_incr: None,
                cost_variable_incr: None,
                discount_rate: Some(0.05),
                ref_discount_rate: Some("EIA".into()),
            }
        },
        constraints: indexmap! {
            "GAS_PP".into() => Constraints {
                name: "GAS_PP".into(),
                max_capacity: None,
                max_activity: None,
                ramp_rate: None,
                first_build: None,
                last_build: None,
            }
        },
        existing: vec![ExistingCapacityRow {
            name: "GAS_PP".into(),
            year_installed: 2010,
            capacity: 500.0,
        }],
    }
}

/// A small model with one power plant, one fuel and one connection
#[fixture]
pub fn input_tables(
    system_tables: SystemTables,
    power_plant_tables: PowerPlantTables,
) -> InputTables {
    InputTables {
        system: system_tables,
        power_plants: power_plant_tables,
        fuels: indexmap! {
            "NATGAS".into() => Fuel {
                name: "NATGAS".into(),
                lifetime: Some(100.0),
                emission_activity: Some(50.0),
                cost_invest: None,
                cost_variable: Some(4.0),
                cost_invest_incr: None,
                cost_variable_incr: None,
                max_activity: None,
                retirement: None,
                first_build: None,
                last_build: None,
            }
        },
        fuels_existing: Vec::new(),
        connections: indexmap! {
            "ELC_TX".into() => Connection {
                name: "ELC_TX".into(),
                input: "ELC".into(),
                output: "ELC_DMD".into(),
                loss: Some(5.0),
                lifetime: Some(50.0),
                emission_activity: None,
                cost_invest: None,
                cost_variable: None,
                cost_invest_incr: None,
                cost_variable_incr: None,
                first_build: None,
                last_build: None,
            }
        },
        connections_existing: Vec::new(),
    }
}

/// A scenario including everything in [`input_tables`] with every constraint switched on
#[fixture]
pub fn scenario() -> ScenarioContext {
    ScenarioContext {
        name: "A".into(),
        toggles: Toggles {
            baseload: true,
            reserve_margin: true,
            ramping: true,
            growth_limit: true,
            rps: true,
            emission_limit: true,
            min_capacity_limit: true,
        },
        max_growth_rate: Some(20.0),
        min_growth_seed: Some(100.0),
        max_loan_years: Some(20.0),
        plants: vec!["GAS_PP".into()],
        fuels: vec!["NATGAS".into()],
        connections: vec!["ELC_TX".into()],
    }
}
