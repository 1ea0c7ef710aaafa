//! Application state shared by the review engine and the aggregator.
//!
//! The state has a single owner. The engine mutates it through `&mut` while
//! a run is active; everything else reads snapshots through accessors.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::Course;
use crate::results::ReportRecord;

/// The run currently being driven by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

/// Selected course, active run, and the ordered list of scored records.
#[derive(Debug, Default)]
pub struct AppState {
    current_course: Option<Course>,
    active_run: Option<ActiveRun>,
    records: Vec<ReportRecord>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(course: Course) -> Self {
        Self {
            current_course: Some(course),
            ..Self::default()
        }
    }

    /// Select the course subsequent runs operate on.
    pub fn select_course(&mut self, course: Course) {
        tracing::debug!("selected course {}", course.id);
        self.current_course = Some(course);
    }

    pub fn current_course(&self) -> Option<&Course> {
        self.current_course.as_ref()
    }

    pub fn active_run(&self) -> Option<&ActiveRun> {
        self.active_run.as_ref()
    }

    /// Every record scored so far, in processing order.
    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    pub(crate) fn push_record(&mut self, record: ReportRecord) {
        self.records.push(record);
    }

    /// Start a new run for `course_id` and return its id.
    pub(crate) fn begin_run(&mut self, course_id: &str) -> ActiveRun {
        let run = ActiveRun {
            run_id: new_run_id(course_id),
            started_at: Utc::now(),
        };
        self.active_run = Some(run.clone());
        run
    }

    pub(crate) fn end_run(&mut self) {
        self.active_run = None;
    }
}

/// Run ids are the course id followed by a random suffix.
pub fn new_run_id(course_id: &str) -> String {
    format!("{course_id}-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportSlot, ReportType};

    fn course(id: &str) -> Course {
        Course {
            id: id.into(),
            name: id.into(),
            experiments: vec![],
        }
    }

    #[test]
    fn run_ids_are_unique_and_prefixed() {
        let a = new_run_id("hadoop");
        let b = new_run_id("hadoop");
        assert!(a.starts_with("hadoop-"));
        assert_ne!(a, b);
    }

    #[test]
    fn records_keep_processing_order() {
        let mut state = AppState::with_course(course("c1"));
        let slot = ReportSlot::new("e", ReportType::Word, 0);
        state.push_record(ReportRecord::from_slot("c1", "r1", &slot, 70));
        state.push_record(ReportRecord::from_slot("c2", "r2", &slot, 80));
        state.push_record(ReportRecord::from_slot("c1", "r2", &slot, 90));

        let scores: Vec<u32> = state.records().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![70, 80, 90]);
    }

    #[test]
    fn begin_and_end_run() {
        let mut state = AppState::new();
        assert!(state.current_course().is_none());
        state.select_course(course("c1"));
        assert_eq!(state.current_course().unwrap().id, "c1");

        let run = state.begin_run("c1");
        assert_eq!(state.active_run(), Some(&run));
        state.end_run();
        assert!(state.active_run().is_none());
    }
}
