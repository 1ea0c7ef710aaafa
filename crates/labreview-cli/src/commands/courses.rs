//! The `labreview courses` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use labreview_core::model::ReportType;

use super::Workspace;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let ws = Workspace::load(config_path)?;

    if ws.catalog.is_empty() {
        println!("No courses in the catalog.");
        return Ok(());
    }

    for course in &ws.catalog.courses {
        println!("{} ({}): {} reports", course.name, course.id, course.total_reports());

        let mut table = Table::new();
        table.set_header(vec!["Experiment", "Name", "Word", "Dify", "Total"]);
        for exp in &course.experiments {
            table.add_row(vec![
                Cell::new(&exp.id),
                Cell::new(&exp.name),
                Cell::new(exp.counts.count_of(ReportType::Word)),
                Cell::new(exp.counts.count_of(ReportType::Dify)),
                Cell::new(exp.report_count()),
            ]);
        }
        println!("{table}\n");
    }

    Ok(())
}
