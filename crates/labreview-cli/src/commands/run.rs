//! The `labreview run` command.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use labreview_core::engine::{stop_channel, ProgressEvent, ReviewEngine, RunOutcome};
use labreview_core::error::ReviewError;
use labreview_core::feedback::student_detail;
use labreview_core::model::{Course, ReportSlot};
use labreview_core::report::TaskRunRecord;
use labreview_core::state::AppState;
use labreview_core::statistics::{course_summary, grade_band_counts};
use labreview_core::traits::ProgressReporter;
use labreview_report::html::write_html_report;

use super::Workspace;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                run_id,
                course_id,
                total,
            } => {
                eprintln!("Reviewing {total} report(s) of {course_id} (run {run_id})\n");
            }
            ProgressEvent::ReportScored {
                record,
                progress,
                experiment,
            } => {
                eprintln!(
                    "  [{}/{}] {} {} #{} -> {} ({}%, ~{} min left)",
                    progress.completed,
                    progress.total,
                    record.experiment_id,
                    record.report_type,
                    record.index + 1,
                    record.score,
                    progress.percent,
                    progress.remaining_minutes,
                );
                if experiment.is_complete() {
                    eprintln!(
                        "  Done: {} ({}/{})",
                        experiment.name, experiment.done, experiment.total
                    );
                }
            }
            ProgressEvent::Finished {
                completed,
                persisted,
                ..
            } => {
                eprintln!("\nComplete: {completed} report(s) reviewed");
                if !persisted {
                    eprintln!("Warning: the run record could not be saved");
                }
            }
            ProgressEvent::Stopped {
                completed, total, ..
            } => {
                eprintln!("\nStopped after {completed}/{total} report(s); nothing was saved");
            }
        }
    }
}

/// Slots of the selected experiments, at most `limit` per experiment.
/// Repeated experiment ids are selected once.
fn select_slots(
    course: &Course,
    experiments: &[String],
    limit: Option<usize>,
) -> Result<Vec<ReportSlot>, ReviewError> {
    let mut selected: Vec<&str> = Vec::new();
    if experiments.is_empty() {
        selected.extend(course.experiments.iter().map(|e| e.id.as_str()));
    } else {
        for id in experiments {
            if !selected.contains(&id.as_str()) {
                selected.push(id);
            }
        }
    }

    let mut slots = Vec::new();
    for id in selected {
        let exp = course
            .experiment(id)
            .ok_or_else(|| ReviewError::UnknownExperiment {
                course_id: course.id.clone(),
                experiment_id: id.to_string(),
            })?;
        let take = limit.unwrap_or(usize::MAX);
        slots.extend(exp.slots().into_iter().take(take));
    }
    Ok(slots)
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    course_id: String,
    experiments: Vec<String>,
    limit: Option<usize>,
    tick_ms: Option<u64>,
    allow_unconfigured: bool,
    student: Option<String>,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let ws = Workspace::load(config_path)?;
    let course = ws.course(&course_id)?.clone();
    let slots = select_slots(&course, &experiments, limit)?;

    let mut engine_config = ws.config.engine_config();
    if let Some(ms) = tick_ms {
        engine_config.tick_interval = Duration::from_millis(ms);
    }
    if allow_unconfigured {
        engine_config.require_prompts = false;
    }
    let engine = ReviewEngine::new(ws.store.clone(), engine_config);

    let mut state = AppState::new();
    state.select_course(course.clone());

    let (handle, signal) = stop_channel();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping...");
            handle.stop();
        }
    });

    let outcome = engine
        .run_with_reporter(&mut state, slots, &ConsoleReporter, signal)
        .await;
    ctrl_c.abort();

    let record = match outcome? {
        RunOutcome::Completed { record, .. } => record,
        RunOutcome::Stopped { .. } => return Ok(()),
    };

    print_summary(&record);
    print_course_summary(&course, &state);

    if let Some(student) = &student {
        print_student_detail(&course, &state, student);
    }

    if let Some(dir) = output {
        write_outputs(&record, &course, &dir, &format)?;
    }

    Ok(())
}

fn print_summary(record: &TaskRunRecord) {
    let mut table = Table::new();
    table.set_header(vec![
        "Experiment",
        "Reviewed",
        "Average",
        "Pass %",
        "Excellent %",
    ]);

    for exp in record.by_experiment.iter().filter(|e| e.total > 0) {
        table.add_row(vec![
            Cell::new(&exp.name),
            Cell::new(exp.total),
            Cell::new(format!("{:.1}", exp.avg)),
            Cell::new(format!("{:.1}%", exp.pass_rate * 100.0)),
            Cell::new(format!("{:.1}%", exp.excellent_rate * 100.0)),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "Overall: {} report(s), average {:.1}, pass {:.1}%, excellent {:.1}%",
        record.total,
        record.avg_score,
        record.pass_rate * 100.0,
        record.excellent_rate * 100.0
    );
}

fn print_course_summary(course: &Course, state: &AppState) {
    let summary = course_summary(course, state.records());
    eprintln!(
        "\n{}: {}/{} report(s) reviewed",
        summary.course_name, summary.reviewed, summary.declared_reports
    );
    for exp in &summary.experiments {
        eprintln!(
            "  {:<40} {:>3}/{:<3} ({:.1}%)",
            exp.name,
            exp.reviewed,
            exp.declared,
            exp.progress_percent()
        );
    }

    let bands: Vec<String> = grade_band_counts(state.records())
        .iter()
        .map(|(band, count)| format!("{} {count}", band.label()))
        .collect();
    eprintln!("Grades: {}", bands.join(", "));
}

fn print_student_detail(course: &Course, state: &AppState, student: &str) {
    let Some(detail) = student_detail(course, state.records(), student) else {
        eprintln!("\nNo submissions found for student '{student}'");
        return;
    };

    eprintln!(
        "\nStudent {}: {} submission(s)",
        detail.student, detail.total_submissions
    );
    for exp in &detail.experiments {
        let scores: Vec<String> = exp.submissions.iter().map(|s| s.score.to_string()).collect();
        eprintln!(
            "  {}: average {:.1} (scores {})",
            exp.experiment_name,
            exp.avg,
            scores.join(", ")
        );
        for d in &exp.deductions {
            eprintln!(
                "    - {} (x{}): {}",
                d.deduction.description(),
                d.count,
                d.deduction.suggestion()
            );
        }
    }
}

fn write_outputs(record: &TaskRunRecord, course: &Course, dir: &Path, format: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let formats: Vec<&str> = if format == "all" {
        vec!["json", "html", "md"]
    } else {
        format.split(',').map(str::trim).collect()
    };

    for fmt in &formats {
        match *fmt {
            "json" => {
                let path = dir.join(format!("run-{}.json", record.id));
                record.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = dir.join(format!("run-{}.html", record.id));
                write_html_report(record, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            "md" | "markdown" => {
                let path = dir.join(format!("run-{}.md", record.id));
                std::fs::write(&path, record.to_markdown(Some(course)))?;
                eprintln!("Markdown report: {}", path.display());
            }
            _ => {
                eprintln!("Unknown format: {fmt}");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labreview_core::catalog::builtin_catalog;
    use labreview_core::model::ReportType;

    #[test]
    fn select_all_experiments_with_limit() {
        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let slots = select_slots(course, &[], Some(2)).unwrap();
        assert_eq!(slots.len(), 6);
        assert_eq!(slots[0].experiment_id, "java_exp1");
        assert_eq!(slots[5].experiment_id, "java_exp3");
    }

    #[test]
    fn select_named_experiment() {
        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let slots = select_slots(course, &["java_exp2".into()], None).unwrap();
        assert_eq!(slots.len(), 40);
        assert_eq!(slots[38].report_type, ReportType::Dify);
    }

    #[test]
    fn repeated_experiment_is_selected_once() {
        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let slots = select_slots(
            course,
            &["java_exp1".into(), "java_exp2".into(), "java_exp1".into()],
            Some(3),
        )
        .unwrap();
        assert_eq!(slots.len(), 6);
        assert_eq!(
            slots.iter().filter(|s| s.experiment_id == "java_exp1").count(),
            3
        );
    }

    #[test]
    fn unknown_experiment_is_an_error() {
        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let err = select_slots(course, &["nope".into()], None).unwrap_err();
        assert!(matches!(err, ReviewError::UnknownExperiment { .. }));
    }
}
