//! Per-student feedback: submission history and likely deduction points.
//!
//! Deductions are guessed from the score range alone; there is no report
//! content to inspect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Course;
use crate::results::ReportRecord;
use crate::statistics::ScoreSummary;

/// A typical reason for losing points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deduction {
    WrongApproach,
    MissingResults,
    SevereFormatting,
    IncompleteResults,
    ImplementationErrors,
    MissingComments,
    ShallowAnalysis,
    UnhandledEdgeCases,
    FormattingPolish,
    CommentsPolish,
    ImplementationPolish,
}

impl Deduction {
    /// Likely deductions for a score.
    pub fn for_score(score: u32) -> &'static [Deduction] {
        use Deduction::*;
        match score {
            0..=59 => &[WrongApproach, MissingResults, SevereFormatting],
            60..=69 => &[IncompleteResults, ImplementationErrors, MissingComments],
            70..=84 => &[ShallowAnalysis, UnhandledEdgeCases, FormattingPolish],
            85..=94 => &[CommentsPolish, ImplementationPolish],
            _ => &[],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Deduction::WrongApproach => "Incorrect experimental approach",
            Deduction::MissingResults => "Results missing or wrong",
            Deduction::SevereFormatting => "Formatting seriously non-standard",
            Deduction::IncompleteResults => "Results incomplete",
            Deduction::ImplementationErrors => "Errors in implementation details",
            Deduction::MissingComments => "Missing necessary comments or explanation",
            Deduction::ShallowAnalysis => "Analysis not deep enough",
            Deduction::UnhandledEdgeCases => "Edge cases not handled",
            Deduction::FormattingPolish => "Wording or formatting could improve",
            Deduction::CommentsPolish => "Comments could be strengthened",
            Deduction::ImplementationPolish => "Implementation details could be refined",
        }
    }

    /// Short improvement advice for the deduction.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Deduction::WrongApproach => {
                "Clarify the experiment goal and method first, then fill in the missing steps."
            }
            Deduction::MissingResults => {
                "Make sure the output is complete, with explanation and screenshots or sample output."
            }
            Deduction::SevereFormatting | Deduction::FormattingPolish => {
                "Check document structure and formatting; keep naming and code block style consistent."
            }
            Deduction::ImplementationErrors | Deduction::ImplementationPolish => {
                "Watch boundary conditions and error handling, and describe the core implementation."
            }
            Deduction::MissingComments | Deduction::CommentsPolish => {
                "Add comments explaining the key steps and what each parameter means."
            }
            Deduction::ShallowAnalysis => {
                "Discuss causes, comparisons and possible improvements in the result analysis."
            }
            Deduction::IncompleteResults | Deduction::UnhandledEdgeCases => {
                "Strengthen the description and implementation of this part to improve accuracy."
            }
        }
    }
}

/// One scored submission of a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSubmission {
    pub index: u32,
    pub score: u32,
    pub run_id: String,
    pub deductions: Vec<Deduction>,
}

/// How often a deduction applied within one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionCount {
    pub deduction: Deduction,
    pub count: usize,
}

/// A student's submissions for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentExperimentDetail {
    pub experiment_id: String,
    pub experiment_name: String,
    pub submissions: Vec<StudentSubmission>,
    pub avg: f64,
    /// Most frequent first.
    pub deductions: Vec<DeductionCount>,
}

/// Everything recorded for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub student: String,
    pub total_submissions: usize,
    pub experiments: Vec<StudentExperimentDetail>,
}

/// Detail for the student whose id or name equals `student`, restricted to
/// records of `course`. Returns `None` when the student has no records.
pub fn student_detail(
    course: &Course,
    records: &[ReportRecord],
    student: &str,
) -> Option<StudentDetail> {
    let matched: Vec<&ReportRecord> = records
        .iter()
        .filter(|r| r.course_id == course.id)
        .filter(|r| {
            r.student_id.as_deref() == Some(student) || r.student_name.as_deref() == Some(student)
        })
        .collect();
    if matched.is_empty() {
        return None;
    }

    let mut experiments: Vec<StudentExperimentDetail> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    for r in &matched {
        let slot = *position.entry(r.experiment_id.as_str()).or_insert_with(|| {
            let experiment_name = course
                .experiment(&r.experiment_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| r.experiment_id.clone());
            experiments.push(StudentExperimentDetail {
                experiment_id: r.experiment_id.clone(),
                experiment_name,
                submissions: Vec::new(),
                avg: 0.0,
                deductions: Vec::new(),
            });
            experiments.len() - 1
        });
        experiments[slot].submissions.push(StudentSubmission {
            index: r.index,
            score: r.score,
            run_id: r.run_id.clone(),
            deductions: Deduction::for_score(r.score).to_vec(),
        });
    }

    for detail in &mut experiments {
        detail.avg = ScoreSummary::from_scores(detail.submissions.iter().map(|s| s.score)).mean();
        let mut counts: Vec<DeductionCount> = Vec::new();
        for d in detail.submissions.iter().flat_map(|s| s.deductions.iter()) {
            match counts.iter_mut().find(|c| c.deduction == *d) {
                Some(c) => c.count += 1,
                None => counts.push(DeductionCount {
                    deduction: *d,
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        detail.deductions = counts;
    }

    Some(StudentDetail {
        student: student.to_string(),
        total_submissions: matched.len(),
        experiments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Experiment, ExperimentCountSpec, ReportType};

    fn course() -> Course {
        Course {
            id: "c1".into(),
            name: "Course".into(),
            experiments: vec![Experiment {
                id: "a".into(),
                name: "Experiment A".into(),
                counts: ExperimentCountSpec::Split {
                    word_count: 3,
                    dify_count: 0,
                },
            }],
        }
    }

    fn record(exp: &str, idx: u32, score: u32) -> ReportRecord {
        ReportRecord {
            course_id: "c1".into(),
            experiment_id: exp.into(),
            report_type: ReportType::Word,
            index: idx,
            run_id: "r1".into(),
            score,
            student_id: Some("2021001".into()),
            student_name: Some("Student 1".into()),
        }
    }

    #[test]
    fn deductions_follow_score_ranges() {
        assert_eq!(Deduction::for_score(40).len(), 3);
        assert_eq!(Deduction::for_score(65)[0], Deduction::IncompleteResults);
        assert_eq!(Deduction::for_score(84)[0], Deduction::ShallowAnalysis);
        assert_eq!(Deduction::for_score(90).len(), 2);
        assert!(Deduction::for_score(95).is_empty());
    }

    #[test]
    fn detail_groups_by_experiment_and_counts_deductions() {
        let records = vec![record("a", 0, 72), record("a", 0, 78), record("zzz", 0, 91)];
        let detail = student_detail(&course(), &records, "Student 1").unwrap();
        assert_eq!(detail.total_submissions, 3);
        assert_eq!(detail.experiments.len(), 2);

        let a = &detail.experiments[0];
        assert_eq!(a.experiment_name, "Experiment A");
        assert!((a.avg - 75.0).abs() < f64::EPSILON);
        assert_eq!(a.deductions[0].count, 2);
        assert_eq!(a.deductions[0].deduction, Deduction::ShallowAnalysis);

        // unknown experiment falls back to its id
        assert_eq!(detail.experiments[1].experiment_name, "zzz");
    }

    #[test]
    fn detail_matches_by_id_and_misses_unknown_student() {
        let records = vec![record("a", 0, 60)];
        assert!(student_detail(&course(), &records, "2021001").is_some());
        assert!(student_detail(&course(), &records, "nobody").is_none());
    }
}
