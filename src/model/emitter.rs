//! Rows describing a single technology: costs, capacity, efficiency, emissions and constraints.
use super::{CAPACITY_TO_ACTIVITY, EMISSION_COMMODITY, ModelBuilder, NOTE};
use crate::id::TechID;
use crate::relation::{Relation, row};
use crate::schedule::{BuildSchedule, compute_schedule, in_service_at_start};
use crate::technology::{Sector, Technology};
use crate::value::OptionalValue;
use anyhow::Result;
use log::warn;

/// Group name for technologies counting towards the renewable portfolio standard
const RPS_GROUP: &str = "RPS";

/// Apply a constant yearly percentage increase to a cost
fn escalate(cost: f64, yearly_increase: Option<f64>, years: u32) -> f64 {
    yearly_increase
        .present()
        .map_or(cost, |rate| cost * (1.0 + rate / 100.0).powf(f64::from(years)))
}

/// Whether capacity of the given vintage is operating in the given period
fn is_operating(period: u32, vintage: u32, lifetime: Option<f64>) -> bool {
    vintage <= period && lifetime.is_some_and(|lifetime| f64::from(period - vintage) < lifetime)
}

/// Loan lifetime: the technology lifetime, capped at the maximum loan period if one is given
pub fn loan_lifetime(lifetime: f64, max_loan_years: Option<f64>) -> f64 {
    max_loan_years
        .present()
        .map_or(lifetime, |max_loan| max_loan.min(lifetime))
}

/// Maximum activity in each constraint period.
///
/// A retirement year forces activity to zero from that year on, taking precedence over any
/// configured maximum.
pub fn max_activity_limits(
    max_activity: Option<f64>,
    retirement: Option<f64>,
    periods: &[u32],
) -> Vec<(u32, f64)> {
    let is_retired = |period: u32| retirement.is_some_and(|year| f64::from(period) >= year);
    periods
        .iter()
        .filter_map(|&period| {
            if is_retired(period) {
                Some((period, 0.0))
            } else {
                max_activity.map(|limit| (period, limit))
            }
        })
        .collect()
}

/// Clamp a capacity factor to lie between 0 and 1, warning if it was out of range
fn clamp_capacity_factor(value: f64, tech: &TechID, day: &str, time_of_day: &str) -> f64 {
    if value < 0.0 {
        warn!("Capacity factor less than 0.0, set to 0.0: {tech} {day} {time_of_day}");
        0.0
    } else if value > 1.0 {
        warn!("Capacity factor greater than 1.0, set to 1.0: {tech} {day} {time_of_day}");
        1.0
    } else {
        value
    }
}

impl ModelBuilder<'_> {
    /// Add every row describing a technology.
    ///
    /// Rows which would need an absent value are left out.
    pub fn add_technology(&mut self, tech: &Technology) -> Result<()> {
        let schedule = compute_schedule(
            &tech.build_policy(),
            &tech.existing_years(),
            &self.periods.active_future,
            &self.all_time_periods,
        );
        self.add_legacy_periods(&schedule.legacy_periods)?;

        self.add_capacity_rows(tech)?;
        self.add_cost_rows(tech, &schedule)?;
        self.add_flow_rows(tech, &schedule)?;
        let existing_capacity = self.add_existing_capacity(tech)?;
        self.add_lifetime_rows(tech)?;
        self.add_classification_rows(tech)?;
        self.add_constraint_rows(tech, &schedule)?;
        self.add_growth_rows(tech, existing_capacity)?;
        self.add_ramping_rows(tech)
    }

    /// Capacity credit, capacity-to-activity conversion and capacity factors
    fn add_capacity_rows(&mut self, tech: &Technology) -> Result<()> {
        if let Some(credit) = tech.capacity_credit.present() {
            self.push(Relation::CapacityCredit, row![&tech.name, credit])?;
        }

        if tech.capacity_to_activity {
            self.push(
                Relation::CapacityToActivity,
                row![&tech.name, CAPACITY_TO_ACTIVITY, "GW to PJ"],
            )?;
        }

        let Some(capacity_factor) = tech.capacity_factor.present() else {
            return Ok(());
        };
        if tech.sector != Sector::Electric {
            return Ok(());
        }

        let system = &self.inputs.system;
        let mut rows = Vec::new();
        if system.has_capacity_factor_profile(tech.input.as_str()) {
            for profile in system
                .capacity_factor_tod
                .iter()
                .filter(|profile| profile.fuel == tech.input.as_str())
            {
                let value = clamp_capacity_factor(
                    profile.capacity_factor * capacity_factor,
                    &tech.name,
                    &profile.representative_day,
                    &profile.time_of_day,
                );
                rows.push(row![
                    profile.representative_day.as_str(),
                    profile.time_of_day.as_str(),
                    &tech.name,
                    value,
                    NOTE
                ]);
            }
        } else {
            for day in &system.representative_days {
                for time in &system.times_of_day {
                    rows.push(row![
                        day.representative_day.as_str(),
                        time.time_of_day.as_str(),
                        &tech.name,
                        capacity_factor,
                        NOTE
                    ]);
                }
            }
        }

        for row in rows {
            self.push(Relation::CapacityFactorTech, row)?;
        }

        Ok(())
    }

    /// Fixed, investment and variable costs, and the technology discount rate
    fn add_cost_rows(&mut self, tech: &Technology, schedule: &BuildSchedule) -> Result<()> {
        let start_year = self.periods.start_year();
        let active_future = self.periods.active_future.clone();
        let lifetime = tech.lifetime.present();

        if let Some(cost) = tech.cost_fixed.present() {
            for &period in &active_future {
                for &vintage in &schedule.build_years {
                    if is_operating(period, vintage, lifetime) {
                        let value = escalate(cost, tech.cost_fixed_incr, period - start_year);
                        self.push(
                            Relation::CostFixed,
                            row![period, &tech.name, vintage, value, "M USD/GW", NOTE],
                        )?;
                    }
                }
            }
        }

        if let Some(cost) = tech.cost_invest.present() {
            for &vintage in &schedule.future_build_years {
                let value = escalate(cost, tech.cost_invest_incr, vintage - start_year);
                self.push(
                    Relation::CostInvest,
                    row![&tech.name, vintage, value, "M USD/GW", NOTE],
                )?;
            }
        }

        if let Some(cost) = tech.cost_variable.present() {
            for &period in &active_future {
                for &vintage in &schedule.build_years {
                    if is_operating(period, vintage, lifetime) {
                        let value = escalate(cost, tech.cost_variable_incr, period - start_year);
                        self.push(
                            Relation::CostVariable,
                            row![period, &tech.name, vintage, value, "M USD/PJ", NOTE],
                        )?;
                    }
                }
            }
        }

        if let Some(rate) = tech.discount_rate.present() {
            let note = tech.ref_discount_rate.clone().unwrap_or_default();
            for &vintage in &schedule.build_years {
                self.push(
                    Relation::DiscountRate,
                    row![&tech.name, vintage, rate, note.as_str()],
                )?;
            }
        }

        Ok(())
    }

    /// Efficiency and emissions for every vintage
    fn add_flow_rows(&mut self, tech: &Technology, schedule: &BuildSchedule) -> Result<()> {
        if let Some(efficiency) = tech.efficiency.present() {
            for &vintage in &schedule.build_years {
                self.push(
                    Relation::Efficiency,
                    row![
                        &tech.input,
                        &tech.name,
                        vintage,
                        &tech.output,
                        efficiency,
                        NOTE
                    ],
                )?;
            }
        }

        if let Some(emission) = tech.emission_activity.present() {
            for &vintage in &schedule.build_years {
                self.push(
                    Relation::EmissionActivity,
                    row![
                        EMISSION_COMMODITY,
                        &tech.input,
                        &tech.name,
                        vintage,
                        &tech.output,
                        emission,
                        "kt/PJout",
                        NOTE
                    ],
                )?;
            }
        }

        Ok(())
    }

    /// Existing capacity still in service at the start of the model.
    ///
    /// Returns the total existing capacity in GW.
    fn add_existing_capacity(&mut self, tech: &Technology) -> Result<f64> {
        let start_year = self.periods.start_year();
        let lifetime = tech.lifetime.present();

        let mut total = 0.0;
        for unit in &tech.existing {
            if in_service_at_start(unit.year, start_year, lifetime) {
                self.push(
                    Relation::ExistingCapacity,
                    row![&tech.name, unit.year, unit.capacity, "GW", NOTE],
                )?;
                total += unit.capacity;
            }
        }

        Ok(total)
    }

    /// Technology lifetime, loan lifetime and storage duration
    fn add_lifetime_rows(&mut self, tech: &Technology) -> Result<()> {
        if let Some(lifetime) = tech.lifetime.present() {
            self.push(Relation::LifetimeTech, row![&tech.name, lifetime, NOTE])?;
            let loan = loan_lifetime(lifetime, self.scenario.max_loan_years);
            self.push(Relation::LifetimeLoanTech, row![&tech.name, loan, NOTE])?;
        }

        if tech.storage {
            match tech.storage_duration.present() {
                Some(hours) => {
                    self.push(
                        Relation::StorageDuration,
                        row![&tech.name, hours, "hours"],
                    )?;
                }
                None => warn!("Storage technology {} has no storage duration", tech.name),
            }
        }

        Ok(())
    }

    /// The technology registry entry and group memberships
    fn add_classification_rows(&mut self, tech: &Technology) -> Result<()> {
        let toggles = self.scenario.toggles;
        let sector: &str = tech.sector.into();
        let (flag, category) = match tech.sector {
            Sector::Supply => ("r", "fuels"),
            Sector::Transport => ("p", "connections"),
            Sector::Electric if toggles.baseload && tech.baseload => {
                self.push(Relation::TechBaseload, row![&tech.name])?;
                ("pb", "baseload")
            }
            Sector::Electric if tech.storage => ("ps", "storage"),
            Sector::Electric => ("p", "powerplant"),
        };
        self.push(
            Relation::Technologies,
            row![&tech.name, flag, sector, category, NOTE],
        )?;

        if toggles.reserve_margin && tech.reserve {
            self.push(Relation::TechReserve, row![&tech.name])?;
        }

        if toggles.rps && tech.renewable {
            self.push(
                Relation::MinGenGroupOfTechnologies,
                row![&tech.name, RPS_GROUP, 1.0, ""],
            )?;
        }

        Ok(())
    }

    /// Maximum and minimum capacity, and maximum activity including retirement
    fn add_constraint_rows(&mut self, tech: &Technology, schedule: &BuildSchedule) -> Result<()> {
        let periods = &schedule.constraint_periods;

        if let Some(max_capacity) = tech.max_capacity.present() {
            for &period in periods {
                self.push(
                    Relation::MaxCapacity,
                    row![period, &tech.name, max_capacity, "GW", NOTE],
                )?;
            }
        }

        if self.scenario.toggles.min_capacity_limit {
            let inputs = self.inputs;
            for limit in inputs
                .system
                .min_capacity
                .iter()
                .filter(|limit| limit.technology == tech.name.as_str())
                .filter(|limit| periods.contains(&limit.year))
            {
                self.push(
                    Relation::MinCapacity,
                    row![
                        limit.year,
                        &tech.name,
                        limit.min_capacity / 1000.0,
                        "GW",
                        NOTE
                    ],
                )?;
            }
        }

        let limits = max_activity_limits(
            tech.max_activity.present(),
            tech.retirement.present(),
            periods,
        );
        for (period, limit) in limits {
            self.push(
                Relation::MaxActivity,
                row![period, &tech.name, limit, "PJ", NOTE],
            )?;
        }

        Ok(())
    }

    /// Limits on how fast new capacity can grow.
    ///
    /// Only applies to power plants which can be built.
    fn add_growth_rows(&mut self, tech: &Technology, existing_capacity: f64) -> Result<()> {
        let scenario = self.scenario;
        if !(scenario.toggles.growth_limit && tech.new_builds && tech.sector == Sector::Electric)
        {
            return Ok(());
        }

        if let Some(rate) = scenario.max_growth_rate.present() {
            self.push(
                Relation::GrowthRateMax,
                row![&tech.name, rate / 100.0, "Global Growth Limit - Fraction"],
            )?;
        }

        if let Some(min_seed) = scenario.min_growth_seed.present() {
            let seed = (min_seed / 1000.0).max(existing_capacity);
            self.push(
                Relation::GrowthRateSeed,
                row![&tech.name, seed, "GW", "Global Growth Limit"],
            )?;
        }

        Ok(())
    }

    /// Ramp rates. The same rate limits ramping up and down.
    fn add_ramping_rows(&mut self, tech: &Technology) -> Result<()> {
        if !self.scenario.toggles.ramping {
            return Ok(());
        }

        if let Some(rate) = tech.ramp_rate.present() {
            self.push(Relation::TechRamping, row![&tech.name])?;
            self.push(Relation::RampUp, row![&tech.name, rate])?;
            self.push(Relation::RampDown, row![&tech.name, rate])?;
        }

        Ok(())
    }
}
