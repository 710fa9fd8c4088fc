//! System-wide rows: time slices, periods, demand and global constraints.
use super::{
    DEMAND_COMMODITY, DUMMY_COMMODITY, EMISSION_COMMODITY, FUTURE_PERIOD_FLAG, ModelBuilder, NOTE,
    PHYSICAL_FLAG,
};
use crate::relation::{Relation, row};
use anyhow::Result;
use log::warn;

impl ModelBuilder<'_> {
    /// Add the system-wide rows.
    ///
    /// This must be the first stage of assembly, as it registers the model periods and the
    /// commodities which technologies refer to.
    pub fn process_system(&mut self) -> Result<()> {
        let inputs = self.inputs;
        let system = &inputs.system;
        let toggles = self.scenario.toggles;
        let periods = self.periods.clone();

        for &year in &periods.future {
            self.push(Relation::TimePeriods, row![year, FUTURE_PERIOD_FLAG])?;
        }

        for day in &system.representative_days {
            self.push(Relation::TimeSeason, row![day.representative_day.as_str()])?;
        }
        for time in &system.times_of_day {
            self.push(Relation::TimeOfDay, row![time.time_of_day.as_str()])?;
        }

        for day in &system.representative_days {
            for time in &system.times_of_day {
                self.push(
                    Relation::SegFrac,
                    row![
                        day.representative_day.as_str(),
                        time.time_of_day.as_str(),
                        day.time_frac * time.time_frac,
                        NOTE
                    ],
                )?;
            }
        }

        for (&period, demand) in periods.active_future.iter().zip(&system.demand) {
            self.push(
                Relation::Demand,
                row![period, DEMAND_COMMODITY, demand.demand, "PJ", NOTE],
            )?;
        }

        for day in &system.representative_days {
            for time in system
                .demand_tod
                .iter()
                .filter(|time| time.representative_day == day.representative_day)
            {
                self.push(
                    Relation::DemandSpecificDistribution,
                    row![
                        day.representative_day.as_str(),
                        time.time_of_day.as_str(),
                        DEMAND_COMMODITY,
                        day.dmd_frac * time.dmd_frac,
                        NOTE
                    ],
                )?;
            }
        }

        self.register_commodity(DUMMY_COMMODITY, PHYSICAL_FLAG, "dummy variable")?;
        self.register_commodity(DEMAND_COMMODITY, "d", "demand variable")?;
        self.register_commodity(EMISSION_COMMODITY, "e", "emission")?;

        if let Some(rate) = system.global_discount_rate() {
            self.push(Relation::GlobalDiscountRate, row![rate])?;
        }

        if toggles.emission_limit {
            for limit in &system.emission {
                self.push(
                    Relation::EmissionLimit,
                    row![
                        limit.periods,
                        limit.emis_comm.as_str(),
                        limit.emis_limit,
                        limit.emis_limit_units.as_str(),
                        limit.emis_limit_notes.as_str()
                    ],
                )?;
            }
        }

        if toggles.reserve_margin {
            match system.reserve_margin() {
                Some(margin) => {
                    self.push(Relation::ReserveMargin, row![DEMAND_COMMODITY, margin])?;
                }
                None => warn!("Reserve margin is enabled but no reserve margin is given"),
            }
        }

        if toggles.rps {
            for (&period, demand) in periods.active_future.iter().zip(&system.demand) {
                if let Some(rps) = demand.rps {
                    self.push(
                        Relation::MinGenGroupOfTechnologiesData,
                        row![period, "RPS", rps],
                    )?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{input_tables, scenario};
    use crate::input::InputTables;
    use crate::relation::{Cell, RelationSet};
    use crate::scenario::ScenarioContext;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn system_relations(inputs: &InputTables, scenario: &ScenarioContext) -> RelationSet {
        let mut builder = ModelBuilder::new(inputs, scenario).unwrap();
        builder.process_system().unwrap();
        builder.finish()
    }

    #[rstest]
    fn test_process_system(input_tables: InputTables, scenario: ScenarioContext) {
        let relations = system_relations(&input_tables, &scenario);

        assert_eq!(relations.rows(Relation::TimePeriods).len(), 3);
        assert_eq!(relations.rows(Relation::TimeSeason).len(), 2);
        assert_eq!(relations.rows(Relation::TimeOfDay).len(), 2);
        assert_eq!(relations.rows(Relation::SegFrac).len(), 4);
        assert_eq!(relations.rows(Relation::DemandSpecificDistribution).len(), 4);
        assert_eq!(relations.rows(Relation::Commodities).len(), 3);
        assert_eq!(relations.rows(Relation::GlobalDiscountRate).len(), 1);
        assert_eq!(relations.rows(Relation::ReserveMargin).len(), 1);
        assert_eq!(relations.rows(Relation::EmissionLimit).len(), 1);

        // Demand is only given for periods open for investment
        let demand = relations.rows(Relation::Demand);
        assert_eq!(demand.len(), 2);
        assert_eq!(demand[0][0], Cell::Integer(2020));
        assert_eq!(demand[1][0], Cell::Integer(2030));
        assert_eq!(relations.rows(Relation::MinGenGroupOfTechnologiesData).len(), 2);

        let total: f64 = relations
            .rows(Relation::SegFrac)
            .iter()
            .map(|row| match row[2] {
                Cell::Real(value) => value,
                _ => panic!("SegFrac value should be a real number"),
            })
            .sum();
        assert_approx_eq!(f64, total, 1.0);
    }

    #[rstest]
    fn test_process_system_toggles_off(input_tables: InputTables, mut scenario: ScenarioContext) {
        scenario.toggles = crate::scenario::Toggles::default();
        let relations = system_relations(&input_tables, &scenario);
        assert!(relations.rows(Relation::ReserveMargin).is_empty());
        assert!(relations.rows(Relation::EmissionLimit).is_empty());
        assert!(relations.rows(Relation::MinGenGroupOfTechnologiesData).is_empty());
    }

    #[rstest]
    fn test_process_system_no_discount_rate(
        mut input_tables: InputTables,
        scenario: ScenarioContext,
    ) {
        input_tables.system.discount_rate_global[0].discount_rate = None;
        let relations = system_relations(&input_tables, &scenario);
        assert!(relations.rows(Relation::GlobalDiscountRate).is_empty());
    }
}
