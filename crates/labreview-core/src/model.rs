//! Core data model types for labreview.
//!
//! Courses, experiments and the report slots they declare. These are static
//! catalog data: the engine reads them but never produces them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First student number handed out to report slot 0 of every experiment.
pub const FIRST_STUDENT_NUMBER: u32 = 2021001;

/// The kind of document a student submitted for an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// A Word document lab report.
    Word,
    /// A Dify YAML workflow export (structured template).
    Dify,
}

impl ReportType {
    /// Stable lowercase name, also used as part of the score hash key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Word => "word",
            ReportType::Dify => "dify",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::Word => "Word",
            ReportType::Dify => "Dify YAML",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "word" | "docx" => Ok(ReportType::Word),
            "dify" | "yaml" | "dify yaml" | "dify-yaml" => Ok(ReportType::Dify),
            other => Err(format!("unknown report type: {other}")),
        }
    }
}

/// How many reports an experiment declares.
///
/// Catalog entries either fix a single report type, or split their reports
/// between Word and Dify submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExperimentCountSpec {
    Single {
        #[serde(rename = "reportType", alias = "report_type")]
        report_type: ReportType,
        count: u32,
    },
    Split {
        #[serde(rename = "wordCount", alias = "word_count", default)]
        word_count: u32,
        #[serde(rename = "difyCount", alias = "dify_count", default)]
        dify_count: u32,
    },
}

impl ExperimentCountSpec {
    /// Total number of report slots.
    pub fn report_count(&self) -> u32 {
        match *self {
            ExperimentCountSpec::Single { count, .. } => count,
            ExperimentCountSpec::Split {
                word_count,
                dify_count,
            } => word_count.saturating_add(dify_count),
        }
    }

    /// The dominant report type. Split experiments favour Word on ties.
    pub fn primary_report_type(&self) -> ReportType {
        match *self {
            ExperimentCountSpec::Single { report_type, .. } => report_type,
            ExperimentCountSpec::Split {
                word_count,
                dify_count,
            } => {
                if word_count >= dify_count {
                    ReportType::Word
                } else {
                    ReportType::Dify
                }
            }
        }
    }

    /// Number of slots of the given type.
    pub fn count_of(&self, ty: ReportType) -> u32 {
        match *self {
            ExperimentCountSpec::Single { report_type, count } => {
                if report_type == ty {
                    count
                } else {
                    0
                }
            }
            ExperimentCountSpec::Split {
                word_count,
                dify_count,
            } => match ty {
                ReportType::Word => word_count,
                ReportType::Dify => dify_count,
            },
        }
    }

    /// Report type of slot `index`. Split experiments list Word slots first.
    pub fn type_of_slot(&self, index: u32) -> ReportType {
        match *self {
            ExperimentCountSpec::Single { report_type, .. } => report_type,
            ExperimentCountSpec::Split { word_count, .. } => {
                if index < word_count {
                    ReportType::Word
                } else {
                    ReportType::Dify
                }
            }
        }
    }

    /// Whether the experiment only accepts one report type.
    pub fn is_single_type(&self) -> bool {
        matches!(self, ExperimentCountSpec::Single { .. })
    }
}

/// A catalog entry for one lab experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub counts: ExperimentCountSpec,
}

impl Experiment {
    pub fn report_count(&self) -> u32 {
        self.counts.report_count()
    }

    pub fn primary_report_type(&self) -> ReportType {
        self.counts.primary_report_type()
    }

    /// Every report slot this experiment declares, in index order.
    pub fn slots(&self) -> Vec<ReportSlot> {
        (0..self.report_count())
            .filter_map(|index| self.slot(index))
            .collect()
    }

    /// The slot at `index`, if the experiment declares it.
    pub fn slot(&self, index: u32) -> Option<ReportSlot> {
        (index < self.report_count()).then(|| ReportSlot {
            experiment_id: self.id.clone(),
            report_type: self.counts.type_of_slot(index),
            index,
            student: Some(StudentIdentity::for_index(index)),
        })
    }
}

/// A course and the experiments it runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

impl Course {
    pub fn experiment(&self, id: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.id == id)
    }

    /// Sum of declared report counts across all experiments.
    pub fn total_reports(&self) -> u32 {
        self.experiments
            .iter()
            .map(Experiment::report_count)
            .fold(0, u32::saturating_add)
    }

    /// All slots of all experiments, experiment by experiment.
    pub fn all_slots(&self) -> Vec<ReportSlot> {
        self.experiments.iter().flat_map(Experiment::slots).collect()
    }
}

/// The student a report slot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub id: String,
    pub name: String,
}

impl StudentIdentity {
    /// Roster entry for slot `index`: numbering is shared by every experiment,
    /// so slot 3 of each experiment belongs to the same student.
    pub fn for_index(index: u32) -> Self {
        Self {
            id: (u64::from(FIRST_STUDENT_NUMBER) + u64::from(index)).to_string(),
            name: format!("Student {}", u64::from(index) + 1),
        }
    }
}

/// One simulated submission before it is scored.
///
/// Identity is `(experiment_id, report_type, index)`; the student is carried
/// along for per-student rollups but does not affect the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSlot {
    pub experiment_id: String,
    pub report_type: ReportType,
    pub index: u32,
    #[serde(default)]
    pub student: Option<StudentIdentity>,
}

impl ReportSlot {
    pub fn new(experiment_id: impl Into<String>, report_type: ReportType, index: u32) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            report_type,
            index,
            student: None,
        }
    }

    pub fn with_student(mut self, student: StudentIdentity) -> Self {
        self.student = Some(student);
        self
    }
}
