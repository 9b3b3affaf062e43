use std::collections::HashMap;

use tracing::{debug, warn};

use crate::db::SubmissionStore;
use crate::error::{MalformedRecordError, StatsError};
use crate::models::{Metric, SubmissionRecord, TeamSummary};

/// What to do with a submission that is missing a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Fail the whole aggregation.
    #[default]
    Reject,
    /// Drop the submission and keep going.
    Skip,
}

struct TeamTotals<'a> {
    team_number: &'a str,
    team_name: &'a str,
    count: usize,
    totals: [i64; Metric::COUNT],
}

impl<'a> TeamTotals<'a> {
    fn new(submission: &'a SubmissionRecord) -> Self {
        Self {
            team_number: &submission.team_number,
            team_name: &submission.team_name,
            count: 0,
            totals: [0; Metric::COUNT],
        }
    }

    fn add(&mut self, values: &[i64; Metric::COUNT]) {
        for (total, value) in self.totals.iter_mut().zip(values) {
            *total += value;
        }
        self.count += 1;
    }

    fn into_summary(self) -> TeamSummary {
        let count = self.count;
        let [auto_specimens, auto_samples, teleop_specimens, teleop_samples, ascent] =
            self.totals.map(|total| rounded_mean(total, count));

        TeamSummary {
            team_number: self.team_number.to_string(),
            team_name: self.team_name.to_string(),
            avg_auto_specimens: auto_specimens,
            avg_auto_samples: auto_samples,
            avg_teleop_specimens: teleop_specimens,
            avg_teleop_samples: teleop_samples,
            avg_ascent: ascent,
            submissions: count,
        }
    }
}

fn metric_values(
    submission: &SubmissionRecord,
) -> Result<[i64; Metric::COUNT], MalformedRecordError> {
    let mut values = [0; Metric::COUNT];
    for (slot, metric) in values.iter_mut().zip(Metric::ALL) {
        let value = submission
            .metric(metric)
            .ok_or_else(|| MalformedRecordError::new(&submission.team_number, metric))?;
        *slot = i64::from(value);
    }
    Ok(values)
}

/// Mean rounded half away from zero.
pub fn rounded_mean(total: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as i64
}

/// Averages every metric per team number, rejecting incomplete submissions.
///
/// Summaries come back in the order their team number first appears. The
/// team name is the one on that first submission.
pub fn aggregate(
    submissions: &[SubmissionRecord],
) -> Result<Vec<TeamSummary>, MalformedRecordError> {
    aggregate_with_policy(submissions, MalformedPolicy::Reject)
}

pub fn aggregate_with_policy(
    submissions: &[SubmissionRecord],
    policy: MalformedPolicy,
) -> Result<Vec<TeamSummary>, MalformedRecordError> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut teams: Vec<TeamTotals<'_>> = Vec::new();

    for submission in submissions {
        let values = match metric_values(submission) {
            Ok(values) => values,
            Err(err) if policy == MalformedPolicy::Skip => {
                warn!(
                    submission_id = %submission.id,
                    team_number = %err.team_number,
                    field = %err.field,
                    "skipping malformed submission"
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        let position = *positions
            .entry(submission.team_number.as_str())
            .or_insert_with(|| {
                teams.push(TeamTotals::new(submission));
                teams.len() - 1
            });
        teams[position].add(&values);
    }

    Ok(teams.into_iter().map(TeamTotals::into_summary).collect())
}

/// Reads the full submissions snapshot from `store` and aggregates it.
pub async fn load_team_stats(
    store: &dyn SubmissionStore,
    policy: MalformedPolicy,
) -> Result<Vec<TeamSummary>, StatsError> {
    let submissions = store.fetch_all().await?;
    debug!(count = submissions.len(), "fetched submissions");

    let summaries = aggregate_with_policy(&submissions, policy)?;
    debug!(teams = summaries.len(), "aggregated team statistics");
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::db::testing::MemoryStore;

    fn submission(team_number: &str, team_name: &str, metrics: [i32; 5]) -> SubmissionRecord {
        SubmissionRecord {
            id: Uuid::new_v4(),
            team_name: team_name.to_string(),
            team_number: team_number.to_string(),
            specimens_autonomous: Some(metrics[0]),
            samples_autonomous: Some(metrics[1]),
            specimens_teleop: Some(metrics[2]),
            samples_teleop: Some(metrics[3]),
            ascent: Some(metrics[4]),
            park_specimen_auto: false,
            park_teleop_auto: false,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn averages_two_submissions_and_rounds_half_up() {
        let submissions = vec![
            submission("100", "Alpha", [4, 2, 10, 8, 2]),
            submission("100", "Alpha", [6, 4, 12, 10, 1]),
        ];

        let summaries = aggregate(&submissions).unwrap();
        assert_eq!(
            summaries,
            vec![TeamSummary {
                team_number: "100".to_string(),
                team_name: "Alpha".to_string(),
                avg_auto_specimens: 5,
                avg_auto_samples: 3,
                avg_teleop_specimens: 11,
                avg_teleop_samples: 9,
                avg_ascent: 2,
                submissions: 2,
            }]
        );
    }

    #[test]
    fn single_submissions_pass_through_unchanged() {
        let submissions = vec![
            submission("100", "Alpha", [4, 2, 10, 8, 2]),
            submission("200", "Bravo", [7, 1, 15, 3, 3]),
        ];

        let summaries = aggregate(&submissions).unwrap();
        assert_eq!(summaries.len(), 2);

        let bravo = summaries.iter().find(|s| s.team_number == "200").unwrap();
        assert_eq!(bravo.team_name, "Bravo");
        assert_eq!(
            Metric::ALL.map(|metric| bravo.average(metric)),
            [7, 1, 15, 3, 3]
        );
        assert_eq!(bravo.submissions, 1);
    }

    #[test]
    fn empty_input_yields_no_summaries() {
        assert!(aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn missing_metric_fails_without_partial_output() {
        let mut broken = submission("100", "Alpha", [4, 2, 10, 8, 2]);
        broken.samples_teleop = None;
        let submissions = vec![submission("200", "Bravo", [1, 1, 1, 1, 1]), broken];

        let err = aggregate(&submissions).unwrap_err();
        assert_eq!(err, MalformedRecordError::new("100", Metric::SamplesTeleop));
    }

    #[test]
    fn skip_policy_drops_only_malformed_submissions() {
        let mut broken = submission("100", "Alpha", [9, 9, 9, 9, 9]);
        broken.ascent = None;
        let mut lonely = submission("300", "Charlie", [1, 1, 1, 1, 1]);
        lonely.specimens_autonomous = None;
        let submissions = vec![
            submission("100", "Alpha", [4, 2, 10, 8, 2]),
            broken,
            lonely,
        ];

        let summaries = aggregate_with_policy(&submissions, MalformedPolicy::Skip).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].team_number, "100");
        assert_eq!(summaries[0].avg_auto_specimens, 4);
        assert_eq!(summaries[0].submissions, 1);
    }

    #[test]
    fn first_seen_team_name_wins() {
        let submissions = vec![
            submission("100", "Alpha", [1, 1, 1, 1, 1]),
            submission("100", "Alpha Robotics", [1, 1, 1, 1, 1]),
        ];

        let summaries = aggregate(&submissions).unwrap();
        assert_eq!(summaries[0].team_name, "Alpha");
    }

    #[test]
    fn team_numbers_are_compared_as_text() {
        let submissions = vec![
            submission("0100", "Leading Zero", [2, 2, 2, 2, 2]),
            submission("100", "Alpha", [4, 4, 4, 4, 4]),
        ];

        let summaries = aggregate(&submissions).unwrap();
        assert_eq!(summaries.len(), 2);
    }

    #[test]
    fn duplicate_submissions_each_count() {
        let repeated = submission("100", "Alpha", [2, 2, 2, 2, 1]);
        let submissions = vec![
            repeated.clone(),
            repeated,
            submission("100", "Alpha", [5, 5, 5, 5, 3]),
        ];

        let summaries = aggregate(&submissions).unwrap();
        assert_eq!(summaries[0].submissions, 3);
        // (2 + 2 + 5) / 3 = 3.0, (1 + 1 + 3) / 3 = 1.67
        assert_eq!(summaries[0].avg_auto_specimens, 3);
        assert_eq!(summaries[0].avg_ascent, 2);
    }

    #[test]
    fn summary_count_matches_distinct_team_numbers() {
        let numbers = ["100", "200", "100", "300", "200", "400", "100"];
        let submissions: Vec<_> = numbers
            .iter()
            .enumerate()
            .map(|(i, number)| {
                let v = i as i32 + 1;
                submission(number, "Team", [v, v * 2, v * 3, v, v % 3 + 1])
            })
            .collect();

        let summaries = aggregate(&submissions).unwrap();
        let distinct: HashSet<_> = numbers.iter().collect();
        assert_eq!(summaries.len(), distinct.len());

        for summary in &summaries {
            let group: Vec<_> = submissions
                .iter()
                .filter(|s| s.team_number == summary.team_number)
                .collect();
            for metric in Metric::ALL {
                let total: i64 = group
                    .iter()
                    .map(|s| i64::from(s.metric(metric).unwrap()))
                    .sum();
                let expected = (total as f64 / group.len() as f64).round() as i64;
                assert_eq!(
                    summary.average(metric),
                    expected,
                    "{metric} for {}",
                    summary.team_number
                );
            }
        }
    }

    #[test]
    fn aggregation_is_deterministic_and_leaves_input_untouched() {
        let submissions = vec![
            submission("200", "Bravo", [3, 4, 5, 6, 1]),
            submission("100", "Alpha", [4, 2, 10, 8, 2]),
            submission("200", "Bravo", [4, 4, 6, 6, 2]),
        ];
        let before = submissions.clone();

        let first = aggregate(&submissions).unwrap();
        let second = aggregate(&submissions).unwrap();
        assert_eq!(first, second);
        assert_eq!(submissions, before);
        assert_eq!(first[0].team_number, "200");
    }

    #[test]
    fn rounded_mean_rounds_half_away_from_zero() {
        assert_eq!(rounded_mean(3, 2), 2);
        assert_eq!(rounded_mean(5, 2), 3);
        assert_eq!(rounded_mean(4, 3), 1);
        assert_eq!(rounded_mean(-3, 2), -2);
        assert_eq!(rounded_mean(0, 0), 0);
    }

    #[tokio::test]
    async fn empty_store_is_not_an_error() {
        let summaries = load_team_stats(&MemoryStore::default(), MalformedPolicy::Reject)
            .await
            .unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn retrieval_failure_is_reported_as_retrieval() {
        let err = load_team_stats(&MemoryStore::unreachable(), MalformedPolicy::Reject)
            .await
            .unwrap_err();
        assert!(err.is_retrieval());
    }

    #[tokio::test]
    async fn malformed_rows_from_store_fail_the_load() {
        let mut broken = submission("100", "Alpha", [1, 1, 1, 1, 1]);
        broken.samples_teleop = None;

        let store = MemoryStore::with_rows(vec![broken]);

        let err = load_team_stats(&store, MalformedPolicy::Reject)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StatsError::Malformed(MalformedRecordError {
                ref team_number,
                field: Metric::SamplesTeleop,
            }) if team_number == "100"
        ));
    }
}
