use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// One numeric field averaged per team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    SpecimensAutonomous,
    SamplesAutonomous,
    SpecimensTeleop,
    SamplesTeleop,
    Ascent,
}

impl Metric {
    pub const COUNT: usize = 5;

    /// Every metric, in the order summaries report them.
    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::SpecimensAutonomous,
        Metric::SamplesAutonomous,
        Metric::SpecimensTeleop,
        Metric::SamplesTeleop,
        Metric::Ascent,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            Metric::SpecimensAutonomous => "specimensAutonomous",
            Metric::SamplesAutonomous => "samplesAutonomous",
            Metric::SpecimensTeleop => "specimensTeleop",
            Metric::SamplesTeleop => "samplesTeleop",
            Metric::Ascent => "ascent",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Metric::SpecimensAutonomous => "specimens_autonomous",
            Metric::SamplesAutonomous => "samples_autonomous",
            Metric::SpecimensTeleop => "specimens_teleop",
            Metric::SamplesTeleop => "samples_teleop",
            Metric::Ascent => "ascent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::SpecimensAutonomous => "Auto Specimens",
            Metric::SamplesAutonomous => "Auto Samples",
            Metric::SpecimensTeleop => "Teleop Specimens",
            Metric::SamplesTeleop => "Teleop Samples",
            Metric::Ascent => "Ascent",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// A stored row of the `scouting_data` table.
///
/// Metrics are optional because the store does not guarantee them; the
/// aggregator rejects rows where any are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub team_name: String,
    pub team_number: String,
    pub specimens_autonomous: Option<i32>,
    pub samples_autonomous: Option<i32>,
    pub specimens_teleop: Option<i32>,
    pub samples_teleop: Option<i32>,
    pub ascent: Option<i32>,
    #[serde(default)]
    pub park_specimen_auto: bool,
    #[serde(default)]
    pub park_teleop_auto: bool,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn metric(&self, metric: Metric) -> Option<i32> {
        match metric {
            Metric::SpecimensAutonomous => self.specimens_autonomous,
            Metric::SamplesAutonomous => self.samples_autonomous,
            Metric::SpecimensTeleop => self.specimens_teleop,
            Metric::SamplesTeleop => self.samples_teleop,
            Metric::Ascent => self.ascent,
        }
    }
}

/// A scouting form submission before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub team_name: String,
    pub team_number: String,
    pub specimens_autonomous: i32,
    pub samples_autonomous: i32,
    pub specimens_teleop: i32,
    pub samples_teleop: i32,
    pub ascent: i32,
    pub park_specimen_auto: bool,
    pub park_teleop_auto: bool,
}

impl NewSubmission {
    /// Presence checks only; metric ranges belong to the form controls.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.team_name.trim().is_empty() {
            return Err(ValidationError::MissingField("teamName"));
        }
        if self.team_number.trim().is_empty() {
            return Err(ValidationError::MissingField("teamNumber"));
        }
        Ok(())
    }

    pub fn into_record(self, id: Uuid, submitted_at: DateTime<Utc>) -> SubmissionRecord {
        SubmissionRecord {
            id,
            team_name: self.team_name.trim().to_string(),
            team_number: self.team_number.trim().to_string(),
            specimens_autonomous: Some(self.specimens_autonomous),
            samples_autonomous: Some(self.samples_autonomous),
            specimens_teleop: Some(self.specimens_teleop),
            samples_teleop: Some(self.samples_teleop),
            ascent: Some(self.ascent),
            park_specimen_auto: self.park_specimen_auto,
            park_teleop_auto: self.park_teleop_auto,
            submitted_at,
        }
    }
}

/// Per-team averages derived from every submission for that team number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_number: String,
    pub team_name: String,
    pub avg_auto_specimens: i64,
    pub avg_auto_samples: i64,
    pub avg_teleop_specimens: i64,
    pub avg_teleop_samples: i64,
    pub avg_ascent: i64,
    pub submissions: usize,
}

impl TeamSummary {
    pub fn average(&self, metric: Metric) -> i64 {
        match metric {
            Metric::SpecimensAutonomous => self.avg_auto_specimens,
            Metric::SamplesAutonomous => self.avg_auto_samples,
            Metric::SpecimensTeleop => self.avg_teleop_specimens,
            Metric::SamplesTeleop => self.avg_teleop_samples,
            Metric::Ascent => self.avg_ascent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(team_name: &str, team_number: &str) -> NewSubmission {
        NewSubmission {
            team_name: team_name.to_string(),
            team_number: team_number.to_string(),
            specimens_autonomous: 3,
            samples_autonomous: 2,
            specimens_teleop: 9,
            samples_teleop: 7,
            ascent: 2,
            park_specimen_auto: true,
            park_teleop_auto: false,
        }
    }

    #[test]
    fn blank_team_name_is_rejected() {
        let err = form("   ", "100").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("teamName"));
    }

    #[test]
    fn blank_team_number_is_rejected() {
        let err = form("Alpha", "").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("teamNumber"));
    }

    #[test]
    fn into_record_trims_identity_and_keeps_metrics() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let record = form(" Alpha ", " 0100 ").into_record(id, now);

        assert_eq!(record.id, id);
        assert_eq!(record.team_name, "Alpha");
        assert_eq!(record.team_number, "0100");
        assert_eq!(record.metric(Metric::SpecimensTeleop), Some(9));
        assert_eq!(record.metric(Metric::Ascent), Some(2));
        assert!(record.park_specimen_auto);
        assert_eq!(record.submitted_at, now);
    }

    #[test]
    fn summary_serializes_with_camel_case_names() {
        let summary = TeamSummary {
            team_number: "100".to_string(),
            team_name: "Alpha".to_string(),
            avg_auto_specimens: 5,
            avg_auto_samples: 3,
            avg_teleop_specimens: 11,
            avg_teleop_samples: 9,
            avg_ascent: 2,
            submissions: 2,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["teamNumber"], "100");
        assert_eq!(value["avgTeleopSpecimens"], 11);
        assert_eq!(value["avgAscent"], 2);
    }

    #[test]
    fn record_deserializes_missing_metric_as_none() {
        let json = r#"{
            "id": "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2",
            "team_name": "Alpha",
            "team_number": "100",
            "specimens_autonomous": 4,
            "samples_autonomous": 2,
            "specimens_teleop": 10,
            "ascent": 2,
            "submitted_at": "2026-02-02T12:00:00Z"
        }"#;
        let record: SubmissionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.samples_teleop, None);
        assert!(!record.park_teleop_auto);
    }
}
