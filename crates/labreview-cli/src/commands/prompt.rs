//! The `labreview prompt` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use labreview_core::model::ReportType;
use labreview_core::prompts::{apply_template, prompt_status, template, template_names};
use labreview_core::traits::{PromptConfig, PromptKey};

use super::Workspace;
use crate::PromptCommand;

fn parse_type(s: &str) -> Result<ReportType> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub async fn execute(cmd: PromptCommand, config_path: Option<PathBuf>) -> Result<()> {
    match cmd {
        PromptCommand::Set {
            course,
            experiment,
            report_type,
            text,
            file,
        } => {
            let ws = Workspace::load(config_path)?;
            let course = ws.course(&course)?;
            let exp = course.experiment(&experiment).ok_or_else(|| {
                anyhow::anyhow!("experiment '{experiment}' is not part of course '{}'", course.id)
            })?;
            let report_type = match report_type {
                Some(t) => parse_type(&t)?,
                None => exp.primary_report_type(),
            };
            let prompt = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read prompt file: {}", path.display()))?,
                (None, None) => anyhow::bail!("provide the prompt with --text or --file"),
            };
            anyhow::ensure!(!prompt.trim().is_empty(), "prompt must not be empty");

            let key = PromptKey::new(&course.id, &exp.id);
            ws.store
                .save_prompt(&key, &PromptConfig::new(report_type, prompt))
                .await
                .with_context(|| format!("failed to save prompt for {key}"))?;
            println!("Saved {report_type} prompt for {}", exp.name);
        }

        PromptCommand::Show { course, experiment } => {
            let ws = Workspace::load(config_path)?;
            let course = ws.course(&course)?;
            let key = PromptKey::new(&course.id, &experiment);
            match ws.store.load_prompt(&key).await? {
                Some(config) if config.is_configured() => {
                    println!("Type: {}\n", config.report_type.label());
                    println!("{}", config.prompt);
                }
                _ => println!("No prompt configured for {key}."),
            }
        }

        PromptCommand::Template {
            course,
            experiment,
            report_type,
            name,
        } => {
            let report_type = parse_type(&report_type)?;
            let Some(name) = name else {
                println!("{} templates:", report_type.label());
                for n in template_names(report_type) {
                    println!("  {n}");
                }
                return Ok(());
            };
            let tpl = template(report_type, &name).ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown {report_type} template '{name}' (available: {})",
                    template_names(report_type).join(", ")
                )
            })?;
            let course = course.context("--course is required to apply a template")?;

            let ws = Workspace::load(config_path)?;
            let course = ws.course(&course)?;
            if let Some(id) = experiment.as_deref() {
                anyhow::ensure!(
                    course.experiment(id).is_some(),
                    "experiment '{id}' is not part of course '{}'",
                    course.id
                );
            }
            let written = apply_template(ws.store.as_ref(), course, experiment.as_deref(), tpl)
                .await
                .context("failed to save prompts")?;
            println!("Applied template {} to {written} experiment(s)", tpl.name);
        }

        PromptCommand::Status { course } => {
            let ws = Workspace::load(config_path)?;
            let course = ws.course(&course)?;
            let status = prompt_status(ws.store.as_ref(), course).await;

            let mut table = Table::new();
            table.set_header(vec!["Experiment", "Name", "Type", "Configured"]);
            for exp in &status.experiments {
                table.add_row(vec![
                    Cell::new(&exp.experiment_id),
                    Cell::new(&exp.name),
                    Cell::new(exp.report_type.map(|t| t.label()).unwrap_or("-")),
                    Cell::new(if exp.configured { "yes" } else { "no" }),
                ]);
            }
            println!("{table}");
            println!(
                "{}/{} configured ({}%)",
                status.configured(),
                status.experiments.len(),
                status.percent()
            );
        }
    }

    Ok(())
}
