//! Scored report records and the score thresholds used throughout labreview.

use serde::{Deserialize, Serialize};

use crate::model::{ReportSlot, ReportType};

/// Lowest passing score.
pub const PASS_SCORE: u32 = 60;

/// Lowest score counted as excellent.
pub const EXCELLENT_SCORE: u32 = 85;

/// One simulated submission once scored.
///
/// Records are created exactly once by the review engine and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub course_id: String,
    #[serde(rename = "expId")]
    pub experiment_id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(rename = "idx")]
    pub index: u32,
    pub run_id: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

impl ReportRecord {
    /// Build the record for a scored slot.
    pub fn from_slot(course_id: &str, run_id: &str, slot: &ReportSlot, score: u32) -> Self {
        Self {
            course_id: course_id.to_string(),
            experiment_id: slot.experiment_id.clone(),
            report_type: slot.report_type,
            index: slot.index,
            run_id: run_id.to_string(),
            score,
            student_id: slot.student.as_ref().map(|s| s.id.clone()),
            student_name: slot.student.as_ref().map(|s| s.name.clone()),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.score >= PASS_SCORE
    }

    pub fn is_excellent(&self) -> bool {
        self.score >= EXCELLENT_SCORE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StudentIdentity;

    #[test]
    fn record_from_slot_carries_student() {
        let slot = ReportSlot::new("exp1", ReportType::Word, 4)
            .with_student(StudentIdentity::for_index(4));
        let record = ReportRecord::from_slot("c1", "run-1", &slot, 88);
        assert_eq!(record.student_id.as_deref(), Some("2021005"));
        assert_eq!(record.student_name.as_deref(), Some("Student 5"));
        assert!(record.is_pass());
        assert!(record.is_excellent());
    }

    #[test]
    fn record_uses_dashboard_field_names() {
        let slot = ReportSlot::new("exp1", ReportType::Dify, 0);
        let record = ReportRecord::from_slot("c1", "run-1", &slot, 59);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["expId"], "exp1");
        assert_eq!(json["type"], "dify");
        assert_eq!(json["idx"], 0);
        assert_eq!(json["runId"], "run-1");
        assert!(json.get("studentId").is_none());
        assert!(!record.is_pass());
    }
}
