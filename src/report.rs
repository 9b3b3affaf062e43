use std::cmp::Ordering;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{Metric, SubmissionRecord, TeamSummary};

/// All-digit team numbers sort first and numerically, the rest as text.
pub fn compare_team_numbers(a: &str, b: &str) -> Ordering {
    let numeric =
        |value: &str| !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit());

    match (numeric(a), numeric(b)) {
        (true, true) => {
            let (a_digits, b_digits) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
            a_digits
                .len()
                .cmp(&b_digits.len())
                .then_with(|| a_digits.cmp(b_digits))
                .then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

pub fn sort_for_display(summaries: &mut [TeamSummary]) {
    summaries.sort_by(|a, b| compare_team_numbers(&a.team_number, &b.team_number));
}

fn teleop_total(summary: &TeamSummary) -> i64 {
    summary.avg_teleop_specimens + summary.avg_teleop_samples
}

pub fn render_table(summaries: &[TeamSummary]) -> String {
    let number_width = summaries
        .iter()
        .map(|s| s.team_number.chars().count())
        .chain(std::iter::once("Team Number".len()))
        .max()
        .unwrap_or_default();
    let name_width = summaries
        .iter()
        .map(|s| s.team_name.chars().count())
        .chain(std::iter::once("Name".len()))
        .max()
        .unwrap_or_default();

    let mut output = String::new();
    let _ = write!(output, "{:<number_width$}  {:<name_width$}", "Team Number", "Name");
    for metric in Metric::ALL {
        let _ = write!(output, "  {:>width$}", metric.label(), width = metric.label().len());
    }
    let _ = writeln!(output);

    for summary in summaries {
        let _ = write!(
            output,
            "{:<number_width$}  {:<name_width$}",
            summary.team_number, summary.team_name
        );
        for metric in Metric::ALL {
            let _ = write!(
                output,
                "  {:>width$}",
                summary.average(metric),
                width = metric.label().len()
            );
        }
        let _ = writeln!(output);
    }

    output
}

pub fn build_report(
    summaries: &[TeamSummary],
    submissions: &[SubmissionRecord],
    generated_at: DateTime<Utc>,
) -> String {
    let mut teams = summaries.to_vec();
    sort_for_display(&mut teams);

    let mut output = String::new();
    let _ = writeln!(output, "# Scouting Report");
    let _ = writeln!(
        output,
        "Generated {} from {} submissions across {} teams",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        submissions.len(),
        teams.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Averages");

    if teams.is_empty() {
        let _ = writeln!(output, "No submissions recorded yet.");
    } else {
        let _ = write!(output, "| Team Number | Name |");
        for metric in Metric::ALL {
            let _ = write!(output, " {} |", metric.label());
        }
        let _ = writeln!(output, " Submissions |");
        let _ = writeln!(output, "|---|---|{}---|", "---|".repeat(Metric::COUNT));

        for team in &teams {
            let _ = write!(output, "| {} | {} |", team.team_number, team.team_name);
            for metric in Metric::ALL {
                let _ = write!(output, " {} |", team.average(metric));
            }
            let _ = writeln!(output, " {} |", team.submissions);
        }
    }

    let mut by_teleop = teams.clone();
    by_teleop.sort_by(|a, b| {
        teleop_total(b)
            .cmp(&teleop_total(a))
            .then_with(|| compare_team_numbers(&a.team_number, &b.team_number))
    });
    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Teleop");

    if by_teleop.is_empty() {
        let _ = writeln!(output, "No teams scouted yet.");
    } else {
        for team in by_teleop.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) averages {} teleop elements, ascent level {}",
                team.team_name,
                team.team_number,
                teleop_total(team),
                team.avg_ascent
            );
        }
    }

    let mut recent = submissions.to_vec();
    recent.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Submissions");

    if recent.is_empty() {
        let _ = writeln!(output, "No submissions recorded yet.");
    } else {
        for submission in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}{}",
                submission.team_name,
                submission.team_number,
                submission.submitted_at.format("%Y-%m-%d %H:%M"),
                park_note(submission)
            );
        }
    }

    output
}

fn park_note(submission: &SubmissionRecord) -> &'static str {
    match (submission.park_specimen_auto, submission.park_teleop_auto) {
        (true, true) => ", parked in both autos",
        (true, false) => ", parked in specimen auto",
        (false, true) => ", parked in teleop auto",
        (false, false) => "",
    }
}
