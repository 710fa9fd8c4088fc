//! Calculation of the years in which a technology can be built and is constrained.
use indexmap::IndexSet;
use itertools::Itertools;

/// The parts of a technology definition which determine when it can be built
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BuildPolicy {
    /// Whether new capacity can be built
    pub new_builds: bool,
    /// Lifetime in years
    pub lifetime: Option<f64>,
    /// First year in which new capacity can be built
    pub first_build: Option<f64>,
    /// Last year in which new capacity can be built
    pub last_build: Option<f64>,
}

/// The years relevant to one technology in one model.
///
/// All sequences are sorted in ascending order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildSchedule {
    /// Every vintage of the technology: existing capacity still in service plus new builds
    pub build_years: Vec<u32>,
    /// Vintages of new construction only
    pub future_build_years: Vec<u32>,
    /// Periods in which capacity and activity constraints apply
    pub constraint_periods: Vec<u32>,
    /// Vintages of existing capacity which are not yet model periods, in the order found
    pub legacy_periods: Vec<u32>,
}

/// Whether capacity built in `vintage` is still in service in `start_year`.
///
/// Capacity with no known lifetime is never in service.
pub fn in_service_at_start(vintage: u32, start_year: u32, lifetime: Option<f64>) -> bool {
    lifetime.is_some_and(|lifetime| (f64::from(start_year) - f64::from(vintage)) < lifetime)
}

/// Whether `year` is at or before `end` plus the lifetime
fn within_lifetime_of(year: u32, end: f64, lifetime: Option<f64>) -> bool {
    lifetime.is_some_and(|lifetime| f64::from(year) <= end + lifetime)
}

/// Compute the build schedule for a technology.
///
/// # Arguments
///
/// * `policy` - Whether and when the technology can be built, and its lifetime
/// * `existing_years` - Installation years of existing capacity
/// * `active_future_periods` - Model periods open for investment, in ascending order
/// * `known_periods` - Every period the model already has
pub fn compute_schedule(
    policy: &BuildPolicy,
    existing_years: &[u32],
    active_future_periods: &[u32],
    known_periods: &IndexSet<u32>,
) -> BuildSchedule {
    let (Some(&first_period), Some(&last_period)) =
        (active_future_periods.first(), active_future_periods.last())
    else {
        return BuildSchedule::default();
    };

    let mut build_years = IndexSet::new();
    let mut future_build_years = Vec::new();
    let mut constraint_periods = IndexSet::new();

    if policy.new_builds {
        let window_start = policy.first_build.unwrap_or(f64::from(first_period));
        let window_end = policy.last_build.unwrap_or(f64::from(last_period));
        for &year in active_future_periods {
            let year_f = f64::from(year);
            if window_start <= year_f && year_f <= window_end {
                build_years.insert(year);
                future_build_years.push(year);
            }
            if window_start <= year_f && within_lifetime_of(year, window_end, policy.lifetime) {
                constraint_periods.insert(year);
            }
        }
    }

    let mut legacy_periods = IndexSet::new();
    for &vintage in existing_years {
        if !in_service_at_start(vintage, first_period, policy.lifetime) {
            continue;
        }

        build_years.insert(vintage);
        if !known_periods.contains(&vintage) {
            legacy_periods.insert(vintage);
        }
    }

    if let Some(&latest_vintage) = existing_years.iter().max() {
        for &year in active_future_periods {
            if within_lifetime_of(year, f64::from(latest_vintage), policy.lifetime) {
                constraint_periods.insert(year);
            }
        }
    }

    BuildSchedule {
        build_years: build_years.into_iter().sorted().collect(),
        future_build_years: future_build_years.into_iter().sorted().collect(),
        constraint_periods: constraint_periods.into_iter().sorted().collect(),
        legacy_periods: legacy_periods.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn periods() -> Vec<u32> {
        vec![2020, 2025, 2030, 2035]
    }

    fn known(periods: &[u32]) -> IndexSet<u32> {
        periods.iter().copied().collect()
    }

    fn policy(lifetime: f64) -> BuildPolicy {
        BuildPolicy {
            new_builds: true,
            lifetime: Some(lifetime),
            first_build: None,
            last_build: None,
        }
    }

    #[rstest]
    fn test_no_builds_no_existing(periods: Vec<u32>) {
        let policy = BuildPolicy {
            new_builds: false,
            lifetime: Some(30.0),
            ..Default::default()
        };
        let schedule = compute_schedule(&policy, &[], &periods, &known(&periods));
        assert_eq!(schedule, BuildSchedule::default());
    }

    #[rstest]
    fn test_default_window(periods: Vec<u32>) {
        let schedule = compute_schedule(&policy(30.0), &[], &periods, &known(&periods));
        assert_eq!(schedule.build_years, periods);
        assert_eq!(schedule.future_build_years, periods);
        assert_eq!(schedule.constraint_periods, periods);
        assert!(schedule.legacy_periods.is_empty());
    }

    #[rstest]
    fn test_restricted_window(periods: Vec<u32>) {
        let policy = BuildPolicy {
            first_build: Some(2025.0),
            last_build: Some(2025.0),
            ..policy(5.0)
        };
        let schedule = compute_schedule(&policy, &[], &periods, &known(&periods));
        assert_eq!(schedule.future_build_years, [2025]);
        assert_eq!(schedule.constraint_periods, [2025, 2030]);
    }

    #[rstest]
    fn test_existing_capacity(periods: Vec<u32>) {
        let policy = BuildPolicy {
            new_builds: false,
            ..policy(20.0)
        };

        // 1990 has retired by 2020, 2010 has not
        let schedule = compute_schedule(&policy, &[2010, 1990, 2010], &periods, &known(&periods));
        assert_eq!(schedule.build_years, [2010]);
        assert!(schedule.future_build_years.is_empty());
        assert_eq!(schedule.legacy_periods, [2010]);
        assert_eq!(schedule.constraint_periods, [2020, 2025, 2030]);
    }

    #[rstest]
    fn test_existing_vintage_already_known(periods: Vec<u32>) {
        let mut known_periods = known(&periods);
        known_periods.insert(2015);
        let schedule = compute_schedule(&policy(30.0), &[2015], &periods, &known_periods);
        assert_eq!(schedule.build_years, [2015, 2020, 2025, 2030, 2035]);
        assert!(schedule.legacy_periods.is_empty());
    }

    #[rstest]
    fn test_missing_lifetime(periods: Vec<u32>) {
        let policy = BuildPolicy {
            lifetime: None,
            ..policy(0.0)
        };
        let schedule = compute_schedule(&policy, &[2015], &periods, &known(&periods));
        assert_eq!(schedule.future_build_years, periods);
        assert!(schedule.constraint_periods.is_empty());
        assert!(!schedule.build_years.contains(&2015));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[2000])]
    #[case(&[2015, 2018])]
    fn test_future_builds_subset_of_builds(periods: Vec<u32>, #[case] existing: &[u32]) {
        for new_builds in [false, true] {
            let policy = BuildPolicy {
                new_builds,
                ..policy(10.0)
            };
            let schedule = compute_schedule(&policy, existing, &periods, &known(&periods));
            assert!(
                schedule
                    .future_build_years
                    .iter()
                    .all(|year| schedule.build_years.contains(year))
            );
            assert!(schedule.build_years.is_sorted());
            assert!(schedule.constraint_periods.is_sorted());
        }
    }

    #[rstest]
    #[case(2010, 2020, Some(20.0), true)]
    #[case(2000, 2020, Some(20.0), false)]
    #[case(2030, 2020, Some(5.0), true)]
    #[case(2010, 2020, None, false)]
    fn test_in_service_at_start(
        #[case] vintage: u32,
        #[case] start: u32,
        #[case] lifetime: Option<f64>,
        #[case] expected: bool,
    ) {
        assert_eq!(in_service_at_start(vintage, start, lifetime), expected);
    }
}
