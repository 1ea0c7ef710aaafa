//! Aggregate statistics over scored report records.
//!
//! Everything here is a pure function of a record slice: per-experiment and
//! course rollups, per-student rollups, and fixed-bucket score histograms.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Course, Experiment, ReportType};
use crate::results::{ReportRecord, EXCELLENT_SCORE, PASS_SCORE};

/// Group key used for records that carry no student id.
pub const UNKNOWN_STUDENT_ID: &str = "unknown";

/// Display name for the unknown-student group.
pub const UNKNOWN_STUDENT_NAME: &str = "Unknown student";

/// Running sums over a set of scores. Averages and rates are derived from
/// the sums, so combining summaries always yields weighted results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    pub count: usize,
    pub sum: u64,
    pub passed: usize,
    pub excellent: usize,
    pub max: Option<u32>,
    pub min: Option<u32>,
}

impl ScoreSummary {
    pub fn from_scores(scores: impl IntoIterator<Item = u32>) -> Self {
        let mut summary = Self::default();
        for score in scores {
            summary.push(score);
        }
        summary
    }

    pub fn push(&mut self, score: u32) {
        self.count += 1;
        self.sum += u64::from(score);
        if score >= PASS_SCORE {
            self.passed += 1;
        }
        if score >= EXCELLENT_SCORE {
            self.excellent += 1;
        }
        self.max = Some(self.max.map_or(score, |m| m.max(score)));
        self.min = Some(self.min.map_or(score, |m| m.min(score)));
    }

    /// Merge two summaries as if their scores had been pushed into one.
    pub fn combine(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            passed: self.passed + other.passed,
            excellent: self.excellent + other.excellent,
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
            min: match (self.min, other.min) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }

    /// Mean score, 0 when empty.
    pub fn mean(&self) -> f64 {
        ratio(self.sum as f64, self.count)
    }

    /// Fraction of scores >= 60, 0 when empty.
    pub fn pass_rate(&self) -> f64 {
        ratio(self.passed as f64, self.count)
    }

    /// Fraction of scores >= 85, 0 when empty.
    pub fn excellent_rate(&self) -> f64 {
        ratio(self.excellent as f64, self.count)
    }
}

fn ratio(numerator: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        numerator / count as f64
    }
}

// ---------------------------------------------------------------------------
// Experiment and course rollups
// ---------------------------------------------------------------------------

/// Statistics for one experiment within a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStat {
    pub id: String,
    pub name: String,
    pub total: usize,
    pub avg: f64,
    /// Fraction in `[0, 1]`.
    pub pass_rate: f64,
    /// Fraction in `[0, 1]`.
    pub excellent_rate: f64,
    #[serde(default)]
    pub score_sum: u64,
    #[serde(default)]
    pub passed: usize,
    #[serde(default)]
    pub excellent: usize,
}

impl ExperimentStat {
    fn new(experiment: &Experiment, summary: ScoreSummary) -> Self {
        Self {
            id: experiment.id.clone(),
            name: experiment.name.clone(),
            total: summary.count,
            avg: summary.mean(),
            pass_rate: summary.pass_rate(),
            excellent_rate: summary.excellent_rate(),
            score_sum: summary.sum,
            passed: summary.passed,
            excellent: summary.excellent,
        }
    }

    fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            count: self.total,
            sum: self.score_sum,
            passed: self.passed,
            excellent: self.excellent,
            max: None,
            min: None,
        }
    }
}

/// One entry per declared experiment, in catalog order. Records for
/// experiments the list does not declare are ignored.
pub fn aggregate_by_experiment(
    records: &[ReportRecord],
    experiments: &[Experiment],
) -> Vec<ExperimentStat> {
    let mut per_experiment: HashMap<&str, ScoreSummary> = HashMap::new();
    for r in records {
        per_experiment
            .entry(r.experiment_id.as_str())
            .or_default()
            .push(r.score);
    }

    experiments
        .iter()
        .map(|exp| {
            let summary = per_experiment
                .get(exp.id.as_str())
                .copied()
                .unwrap_or_default();
            ExperimentStat::new(exp, summary)
        })
        .collect()
}

/// Course-level totals derived from per-experiment stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTotals {
    pub total: usize,
    pub avg: f64,
    pub pass_rate: f64,
    pub excellent_rate: f64,
}

/// Weighted totals: the average is `sum(scores) / sum(counts)` across all
/// experiments, never the mean of per-experiment averages.
pub fn course_totals(stats: &[ExperimentStat]) -> CourseTotals {
    let summary = stats
        .iter()
        .map(ExperimentStat::summary)
        .fold(ScoreSummary::default(), ScoreSummary::combine);
    CourseTotals {
        total: summary.count,
        avg: summary.mean(),
        pass_rate: summary.pass_rate(),
        excellent_rate: summary.excellent_rate(),
    }
}

// ---------------------------------------------------------------------------
// Student rollups
// ---------------------------------------------------------------------------

/// Statistics for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStat {
    pub student_id: String,
    pub name: String,
    pub submissions: usize,
    pub avg_score: f64,
    pub max_score: u32,
    pub min_score: u32,
    pub excellent_count: usize,
    /// Percentage in `[0, 100]`.
    pub pass_rate: f64,
}

/// Group records by student, sorted by descending average score.
///
/// Records without a student id land in the [`UNKNOWN_STUDENT_ID`] group.
/// Students with equal averages keep the order in which they were first seen.
pub fn aggregate_by_student(records: &[ReportRecord]) -> Vec<StudentStat> {
    let mut order: Vec<(String, String, ScoreSummary)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for r in records {
        let id = r
            .student_id
            .clone()
            .unwrap_or_else(|| UNKNOWN_STUDENT_ID.to_string());
        let slot = *index.entry(id.clone()).or_insert_with(|| {
            let name = r
                .student_name
                .clone()
                .unwrap_or_else(|| fallback_student_name(&id));
            order.push((id, name, ScoreSummary::default()));
            order.len() - 1
        });
        order[slot].2.push(r.score);
    }

    let mut stats: Vec<StudentStat> = order
        .into_iter()
        .map(|(student_id, name, s)| StudentStat {
            student_id,
            name,
            submissions: s.count,
            avg_score: s.mean(),
            max_score: s.max.unwrap_or(0),
            min_score: s.min.unwrap_or(0),
            excellent_count: s.excellent,
            pass_rate: s.pass_rate() * 100.0,
        })
        .collect();

    // sort_by is stable, so ties keep discovery order
    stats.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    stats
}

fn fallback_student_name(id: &str) -> String {
    match id.split_once('_') {
        Some((_, suffix)) if !suffix.is_empty() => format!("Student {suffix}"),
        _ if id == UNKNOWN_STUDENT_ID => UNKNOWN_STUDENT_NAME.to_string(),
        _ => format!("Student {id}"),
    }
}

// ---------------------------------------------------------------------------
// Score distribution
// ---------------------------------------------------------------------------

/// Labels of the five histogram buckets.
pub const BUCKET_LABELS: [&str; 5] = ["0-59", "60-69", "70-79", "80-89", "90-100"];

/// Index of the bucket containing `score`.
///
/// Buckets are `[0,60) [60,70) [70,80) [80,90) [90,100]`; anything above 100
/// is counted in the top bucket.
pub fn bucket_index(score: u32) -> usize {
    match score {
        0..=59 => 0,
        60..=69 => 1,
        70..=79 => 2,
        80..=89 => 3,
        _ => 4,
    }
}

/// Five-bucket score histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    pub counts: [usize; 5],
    pub total: usize,
}

impl ScoreHistogram {
    pub fn from_scores(scores: impl IntoIterator<Item = u32>) -> Self {
        let mut hist = Self::default();
        for score in scores {
            hist.counts[bucket_index(score)] += 1;
            hist.total += 1;
        }
        hist
    }

    /// Share of each bucket in percent, all zero when empty.
    pub fn percentages(&self) -> [f64; 5] {
        let mut out = [0.0; 5];
        if self.total > 0 {
            for (pct, &count) in out.iter_mut().zip(self.counts.iter()) {
                *pct = count as f64 * 100.0 / self.total as f64;
            }
        }
        out
    }

    /// `(label, count, percent)` rows in bucket order.
    pub fn rows(&self) -> Vec<(&'static str, usize, f64)> {
        let pct = self.percentages();
        BUCKET_LABELS
            .iter()
            .zip(self.counts.iter())
            .zip(pct.iter())
            .map(|((label, &count), &p)| (*label, count, p))
            .collect()
    }
}

/// Histogram over the scores of `records`.
pub fn score_distribution(records: &[ReportRecord]) -> ScoreHistogram {
    ScoreHistogram::from_scores(records.iter().map(|r| r.score))
}

/// Coarse grade bands used for the summary pie chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeBand {
    Excellent,
    Good,
    Pass,
    Fail,
}

impl GradeBand {
    pub const ALL: [GradeBand; 4] = [
        GradeBand::Excellent,
        GradeBand::Good,
        GradeBand::Pass,
        GradeBand::Fail,
    ];

    pub fn from_score(score: u32) -> Self {
        if score >= EXCELLENT_SCORE {
            GradeBand::Excellent
        } else if score >= 70 {
            GradeBand::Good
        } else if score >= PASS_SCORE {
            GradeBand::Pass
        } else {
            GradeBand::Fail
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GradeBand::Excellent => "Excellent (85-100)",
            GradeBand::Good => "Good (70-84)",
            GradeBand::Pass => "Pass (60-69)",
            GradeBand::Fail => "Fail (0-59)",
        }
    }
}

/// Record counts per grade band, in [`GradeBand::ALL`] order.
pub fn grade_band_counts(records: &[ReportRecord]) -> [(GradeBand, usize); 4] {
    let mut counts = GradeBand::ALL.map(|band| (band, 0usize));
    for r in records {
        let band = GradeBand::from_score(r.score);
        if let Some(entry) = counts.iter_mut().find(|(b, _)| *b == band) {
            entry.1 += 1;
        }
    }
    counts
}

// ---------------------------------------------------------------------------
// Course summary
// ---------------------------------------------------------------------------

/// Review coverage and quality of one experiment against its catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentCoverage {
    pub id: String,
    pub name: String,
    pub declared: u32,
    pub reviewed: usize,
    /// `None` when nothing was reviewed.
    pub avg: Option<f64>,
    pub excellent_rate: Option<f64>,
    pub word_count: u32,
    pub dify_count: u32,
}

impl ExperimentCoverage {
    /// Reviewed share of the declared reports, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.declared == 0 {
            0.0
        } else {
            self.reviewed as f64 * 100.0 / f64::from(self.declared)
        }
    }
}

/// Summary of everything reviewed so far for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: String,
    pub course_name: String,
    pub declared_reports: u32,
    pub reviewed: usize,
    pub avg: Option<f64>,
    pub excellent_rate: Option<f64>,
    pub experiments: Vec<ExperimentCoverage>,
}

/// Summarise the records of `course` (records of other courses are skipped).
pub fn course_summary(course: &Course, records: &[ReportRecord]) -> CourseSummary {
    let mine: Vec<ReportRecord> = records
        .iter()
        .filter(|r| r.course_id == course.id)
        .cloned()
        .collect();
    let overall = ScoreSummary::from_scores(mine.iter().map(|r| r.score));

    let experiments = course
        .experiments
        .iter()
        .map(|exp| {
            let s = ScoreSummary::from_scores(
                mine.iter()
                    .filter(|r| r.experiment_id == exp.id)
                    .map(|r| r.score),
            );
            ExperimentCoverage {
                id: exp.id.clone(),
                name: exp.name.clone(),
                declared: exp.report_count(),
                reviewed: s.count,
                avg: (s.count > 0).then(|| s.mean()),
                excellent_rate: (s.count > 0).then(|| s.excellent_rate()),
                word_count: exp.counts.count_of(ReportType::Word),
                dify_count: exp.counts.count_of(ReportType::Dify),
            }
        })
        .collect();

    CourseSummary {
        course_id: course.id.clone(),
        course_name: course.name.clone(),
        declared_reports: course.total_reports(),
        reviewed: overall.count,
        avg: (overall.count > 0).then(|| overall.mean()),
        excellent_rate: (overall.count > 0).then(|| overall.excellent_rate()),
        experiments,
    }
}
