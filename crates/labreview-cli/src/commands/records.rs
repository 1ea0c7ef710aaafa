//! The `labreview records` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use labreview_core::traits::load_task_records_or_empty;

use super::Workspace;
use crate::RecordsCommand;

pub async fn execute(cmd: RecordsCommand, config_path: Option<PathBuf>) -> Result<()> {
    let ws = Workspace::load(config_path)?;

    match cmd {
        RecordsCommand::List { limit } => {
            let records = load_task_records_or_empty(ws.store.as_ref()).await;
            if records.is_empty() {
                println!("No runs recorded yet. Finish a review with `labreview run` first.");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["Run", "Finished", "Course", "Reports", "Average"]);
            for r in records.iter().take(limit.unwrap_or(usize::MAX)) {
                let avg = if r.total > 0 {
                    format!("{:.1}", r.avg_score)
                } else {
                    "-".to_string()
                };
                table.add_row(vec![
                    Cell::new(&r.id),
                    Cell::new(r.finished_at.format("%Y-%m-%d %H:%M:%S")),
                    Cell::new(&r.course_name),
                    Cell::new(r.total),
                    Cell::new(avg),
                ]);
            }
            println!("{table}");
        }

        RecordsCommand::Show { id } => {
            let records = ws
                .store
                .load_task_records()
                .await
                .context("failed to load task records")?;
            let record = records
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| anyhow::anyhow!("no run with id '{id}'"))?;
            println!("{}", record.to_markdown(ws.catalog.course(&record.course_id)));
        }

        RecordsCommand::Delete { id } => {
            let deleted = ws
                .store
                .delete_task_record(&id)
                .await
                .context("failed to delete task record")?;
            anyhow::ensure!(deleted, "no run with id '{id}'");
            println!("Deleted run {id}");
        }

        RecordsCommand::Clear => {
            ws.store
                .clear_task_records()
                .await
                .context("failed to clear task records")?;
            println!("Cleared all runs");
        }
    }

    Ok(())
}
