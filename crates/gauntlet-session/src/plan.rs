use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use gauntlet_challenge::ChallengeGenerator;
use gauntlet_types::{ChallengeRecord, DayPlan};

use crate::config::GauntletConfig;

const SECONDS_PER_DAY: i64 = 86_400;

/// Build the full multi-day challenge plan for one session.
///
/// Each day draws a challenge count within the configured band and a uniform
/// delivery time inside that day's window. Sorted times are then grouped
/// into bursts: a fixed-size group shares its earliest timestamp so its
/// challenges are dispatched together. The distribution is the contract;
/// both RNGs are injected so tests can pin it down.
pub fn build_plan<G: Rng, S: Rng>(
    config: &GauntletConfig,
    start: DateTime<Utc>,
    generator: &mut ChallengeGenerator<G>,
    sched_rng: &mut S,
) -> Vec<DayPlan> {
    let day_counts: Vec<u32> = (0..config.verification_days)
        .map(|_| {
            sched_rng.gen_range(config.min_challenges_per_day..=config.max_challenges_per_day)
        })
        .collect();
    let total: usize = day_counts.iter().map(|c| *c as usize).sum();

    let mut challenges = generator.generate_verification_batch(total).into_iter();
    let mut plan = Vec::with_capacity(day_counts.len());

    for (day_index, count) in day_counts.iter().enumerate() {
        let day_start = start + Duration::days(day_index as i64);

        let mut offsets: Vec<i64> = (0..*count)
            .map(|_| sched_rng.gen_range(0..SECONDS_PER_DAY))
            .collect();
        offsets.sort_unstable();

        let mut records = Vec::with_capacity(*count as usize);
        for group in offsets.chunks(config.burst_size as usize) {
            let scheduled_for = day_start + Duration::seconds(group[0]);
            let burst_size = group.len() as u32;
            for position in 0..group.len() {
                let Some(challenge) = challenges.next() else {
                    break;
                };
                records.push(ChallengeRecord::new(
                    challenge,
                    scheduled_for,
                    position as u32 + 1,
                    burst_size,
                ));
            }
        }

        plan.push(DayPlan {
            day: day_index as u32 + 1,
            challenges: records,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn build(seed: u64) -> (GauntletConfig, Vec<DayPlan>, DateTime<Utc>) {
        let config = GauntletConfig::default();
        let start = Utc::now();
        let mut generator = ChallengeGenerator::with_rng(StdRng::seed_from_u64(seed));
        let mut sched_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        let plan = build_plan(&config, start, &mut generator, &mut sched_rng);
        (config, plan, start)
    }

    #[test]
    fn test_three_days_within_band() {
        let (config, plan, _) = build(7);
        assert_eq!(plan.len(), 3);
        for (i, day) in plan.iter().enumerate() {
            assert_eq!(day.day, i as u32 + 1);
            let count = day.challenges.len() as u32;
            assert!(count >= config.min_challenges_per_day);
            assert!(count <= config.max_challenges_per_day);
        }
    }

    #[test]
    fn test_schedule_falls_inside_each_day_window() {
        let (_, plan, start) = build(11);
        for day in &plan {
            let day_start = start + Duration::days(i64::from(day.day) - 1);
            let day_end = day_start + Duration::days(1);
            for record in &day.challenges {
                assert!(record.scheduled_for >= day_start);
                assert!(record.scheduled_for < day_end);
            }
        }
    }

    #[test]
    fn test_bursts_share_timestamps_in_groups() {
        for seed in 0..20 {
            let (config, plan, _) = build(seed);
            for day in &plan {
                let mut groups: BTreeMap<DateTime<Utc>, Vec<&ChallengeRecord>> = BTreeMap::new();
                for record in &day.challenges {
                    groups.entry(record.scheduled_for).or_default().push(record);
                }
                for group in groups.values() {
                    assert!(group.len() <= config.burst_size as usize);
                    for (i, record) in group.iter().enumerate() {
                        assert_eq!(record.burst_index, i as u32 + 1);
                        assert_eq!(record.burst_size, group.len() as u32);
                    }
                }
                // full-size bursts come first; only the tail group may be short
                let sizes: Vec<usize> = groups.values().map(|g| g.len()).collect();
                for size in &sizes[..sizes.len().saturating_sub(1)] {
                    assert_eq!(*size, config.burst_size as usize);
                }
            }
        }
    }

    #[test]
    fn test_total_challenges_match_day_counts() {
        let (_, plan, _) = build(3);
        let total: usize = plan.iter().map(|d| d.challenges.len()).sum();
        assert!((9..=15).contains(&total));
        // ids unique across the whole plan
        let mut ids: Vec<&str> = plan
            .iter()
            .flat_map(|d| d.challenges.iter().map(|r| r.challenge.id.as_str()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
