//! The `labreview validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(catalog_path: PathBuf) -> Result<()> {
    let catalog = labreview_core::catalog::load_catalog(&catalog_path)?;

    for course in &catalog.courses {
        println!(
            "Course: {} ({} experiments, {} reports)",
            course.name,
            course.experiments.len(),
            course.total_reports()
        );
    }

    let warnings = labreview_core::catalog::validate_catalog(&catalog);
    for w in &warnings {
        let prefix = w
            .course_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Catalog valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
