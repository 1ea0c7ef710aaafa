//! Finalized run records with JSON persistence and a markdown summary.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Course;
use crate::results::ReportRecord;
use crate::statistics::{
    aggregate_by_experiment, aggregate_by_student, course_totals, score_distribution,
    ExperimentStat, ScoreHistogram, StudentStat,
};

/// Summary of one finished batch run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunRecord {
    /// Run identifier.
    pub id: String,
    pub course_id: String,
    pub course_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of reports processed.
    pub total: usize,
    pub avg_score: f64,
    /// Fraction of reports scoring >= 60.
    pub pass_rate: f64,
    /// Fraction of reports scoring >= 85.
    pub excellent_rate: f64,
    pub by_experiment: Vec<ExperimentStat>,
    #[serde(default)]
    pub by_student: Vec<StudentStat>,
    #[serde(default)]
    pub distribution: ScoreHistogram,
}

/// Compute every statistic for the records of `run_id` and bundle them.
///
/// Records of other runs in `records` are ignored. Run totals are the
/// weighted course totals over the per-experiment stats.
pub fn finalize_run(
    run_id: &str,
    course: &Course,
    records: &[ReportRecord],
    started_at: DateTime<Utc>,
) -> TaskRunRecord {
    let items: Vec<ReportRecord> = records
        .iter()
        .filter(|r| r.run_id == run_id)
        .cloned()
        .collect();
    let by_experiment = aggregate_by_experiment(&items, &course.experiments);
    let totals = course_totals(&by_experiment);

    TaskRunRecord {
        id: run_id.to_string(),
        course_id: course.id.clone(),
        course_name: course.name.clone(),
        started_at,
        finished_at: Utc::now(),
        total: totals.total,
        avg_score: totals.avg,
        pass_rate: totals.pass_rate,
        excellent_rate: totals.excellent_rate,
        by_experiment,
        by_student: aggregate_by_student(&items),
        distribution: score_distribution(&items),
    }
}

impl TaskRunRecord {
    /// Wall-clock duration of the run.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Save the record as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize run record")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write run record to {}", path.display()))?;
        Ok(())
    }

    /// Load a record from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run record from {}", path.display()))?;
        let record: TaskRunRecord =
            serde_json::from_str(&content).context("failed to parse run record JSON")?;
        Ok(record)
    }

    /// Format the run as a markdown report. `course` supplies declared report
    /// counts for completion rates; without it completion is shown as `-`.
    pub fn to_markdown(&self, course: Option<&Course>) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {} review run `{}`\n\n", self.course_name, self.id));
        md.push_str(&format!(
            "**Overview:** {} reports processed, average score {:.1}, pass rate {:.1}%, excellent rate {:.1}%\n\n",
            self.total,
            self.avg_score,
            self.pass_rate * 100.0,
            self.excellent_rate * 100.0
        ));

        md.push_str("### Experiments\n\n");
        md.push_str("| Experiment | Reviewed | Completion | Average | Pass rate |\n");
        md.push_str("|------------|----------|------------|---------|-----------|\n");
        for exp in &self.by_experiment {
            let declared = course
                .and_then(|c| c.experiment(&exp.id))
                .map(|e| e.report_count())
                .unwrap_or(0);
            let completion = if exp.total > 0 && declared > 0 {
                format!("{:.1}%", exp.total as f64 * 100.0 / f64::from(declared))
            } else {
                "-".to_string()
            };
            let (avg, pass) = if exp.total > 0 {
                (
                    format!("{:.1}", exp.avg),
                    format!("{:.1}%", exp.pass_rate * 100.0),
                )
            } else {
                ("-".to_string(), "-".to_string())
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                exp.name, exp.total, completion, avg, pass
            ));
        }
        md.push('\n');

        md.push_str("### Score distribution\n\n");
        md.push_str("| Range | Count | Share |\n");
        md.push_str("|-------|-------|-------|\n");
        for (label, count, pct) in self.distribution.rows() {
            md.push_str(&format!("| {label} | {count} | {pct:.1}% |\n"));
        }

        if !self.by_student.is_empty() {
            md.push_str("\n### Students\n\n");
            md.push_str("| Student | Submissions | Average | Max | Min | Excellent | Pass rate |\n");
            md.push_str("|---------|-------------|---------|-----|-----|-----------|-----------|\n");
            for s in &self.by_student {
                md.push_str(&format!(
                    "| {} | {} | {:.1} | {} | {} | {} | {:.1}% |\n",
                    s.name,
                    s.submissions,
                    s.avg_score,
                    s.max_score,
                    s.min_score,
                    s.excellent_count,
                    s.pass_rate
                ));
            }
        }

        md
    }
}
