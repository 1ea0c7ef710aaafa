//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use labreview_core::report::TaskRunRecord;
use labreview_core::statistics::ScoreHistogram;

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Generate an HTML report for one finished run.
pub fn generate_html(record: &TaskRunRecord) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>labreview report: {}</title>\n",
        html_escape(&record.course_name)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str(&format!(
        "<h1>{} review report</h1>\n",
        html_escape(&record.course_name)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Run <code>{}</code> | started {} | finished {} | {}s</p>\n",
        html_escape(&record.id),
        record.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        record.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        record.duration().num_seconds()
    ));
    html.push_str("</header>\n");

    // KPI cards
    html.push_str("<section class=\"kpis\">\n");
    for (label, value) in [
        ("Reports", record.total.to_string()),
        ("Average score", format_avg(record.total, record.avg_score)),
        ("Pass rate", format!("{:.1}%", record.pass_rate * 100.0)),
        ("Excellent rate", format!("{:.1}%", record.excellent_rate * 100.0)),
    ] {
        html.push_str(&format!(
            "<div class=\"card\"><div class=\"label\">{label}</div><div class=\"value\">{value}</div></div>\n"
        ));
    }
    html.push_str("</section>\n");

    // Experiments
    html.push_str("<section class=\"experiments\">\n");
    html.push_str("<h2>Experiments</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Experiment</th><th>Reviewed</th><th>Average</th><th>Pass rate</th><th>Excellent rate</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for exp in &record.by_experiment {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}%</td></tr>\n",
            html_escape(&exp.name),
            exp.total,
            format_avg(exp.total, exp.avg),
            exp.pass_rate * 100.0,
            exp.excellent_rate * 100.0,
        ));
    }
    html.push_str("</tbody></table>\n");

    let bars: Vec<(String, f64, String)> = record
        .by_experiment
        .iter()
        .filter(|e| e.total > 0)
        .map(|e| (e.name.clone(), e.avg / 100.0, format!("{:.1}", e.avg)))
        .collect();
    if !bars.is_empty() {
        html.push_str(&generate_bar_chart(&bars));
    }
    html.push_str("</section>\n");

    // Distribution
    html.push_str("<section class=\"distribution\">\n");
    html.push_str("<h2>Score distribution</h2>\n");
    html.push_str(&generate_histogram(&record.distribution));
    html.push_str("</section>\n");

    // Students
    if !record.by_student.is_empty() {
        html.push_str("<section class=\"results\">\n");
        html.push_str("<h2>Students</h2>\n");
        html.push_str("<table class=\"results-table\" id=\"results\">\n");
        html.push_str("<thead><tr><th onclick=\"sortTable(0)\">ID</th><th onclick=\"sortTable(1)\">Name</th><th onclick=\"sortTable(2)\">Submissions</th><th onclick=\"sortTable(3)\">Average</th><th onclick=\"sortTable(4)\">Max</th><th onclick=\"sortTable(5)\">Min</th><th onclick=\"sortTable(6)\">Pass rate</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for s in &record.by_student {
            let class = if s.avg_score >= 60.0 { "pass" } else { "fail" };
            html.push_str(&format!(
                "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
                class,
                html_escape(&s.student_id),
                html_escape(&s.name),
                s.submissions,
                s.avg_score,
                s.max_score,
                s.min_score,
                s.pass_rate
            ));
        }
        html.push_str("</tbody></table>\n");
        html.push_str("</section>\n");
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(record).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    // JavaScript for sorting
    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(record: &TaskRunRecord, path: &Path) -> Result<()> {
    let html = generate_html(record);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn format_avg(total: usize, avg: f64) -> String {
    if total == 0 {
        "-".to_string()
    } else {
        format!("{avg:.1}")
    }
}

/// Horizontal bar chart. Each bar is `(label, fraction in 0..=1, value text)`.
fn generate_bar_chart(bars: &[(String, f64, String)]) -> String {
    let bar_height = 30;
    let max_width = 400;
    let padding = 10;
    let label_width = 260;

    let total_height = bars.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (label, fraction, text)) in bars.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (fraction.clamp(0.0, 1.0) * max_width as f64) as usize;

        let color = if *fraction >= 0.85 {
            "#22c55e"
        } else if *fraction >= 0.6 {
            "#eab308"
        } else {
            "#ef4444"
        };

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(label)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            html_escape(text)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

/// Bar chart of histogram bucket shares, one bar per bucket.
fn generate_histogram(histogram: &ScoreHistogram) -> String {
    let bars: Vec<(String, f64, String)> = histogram
        .rows()
        .into_iter()
        .map(|(label, count, pct)| (label.to_string(), pct / 100.0, format!("{count} ({pct:.1}%)")))
        .collect();
    generate_bar_chart(&bars)
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.kpis { display: flex; gap: 1rem; flex-wrap: wrap; }
.card { border: 1px solid var(--border); border-radius: 8px; padding: 1rem 1.5rem; min-width: 10rem; }
.card .label { color: #6b7280; font-size: 0.85rem; }
.card .value { font-size: 1.6rem; font-weight: bold; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    const na = parseFloat(va), nb = parseFloat(vb);
    if (!isNaN(na) && !isNaN(nb)) return asc ? na - nb : nb - na;
    return asc ? va.localeCompare(vb) : vb.localeCompare(va);
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use labreview_core::model::{Course, Experiment, ExperimentCountSpec, ReportType};
    use labreview_core::report::finalize_run;
    use labreview_core::results::ReportRecord;

    fn make_test_record() -> TaskRunRecord {
        let course = Course {
            id: "hadoop".into(),
            name: "Hadoop <Basics>".into(),
            experiments: vec![
                Experiment {
                    id: "hdfs_exp".into(),
                    name: "HDFS".into(),
                    counts: ExperimentCountSpec::Single {
                        report_type: ReportType::Word,
                        count: 2,
                    },
                },
                Experiment {
                    id: "yarn_exp".into(),
                    name: "YARN".into(),
                    counts: ExperimentCountSpec::Single {
                        report_type: ReportType::Word,
                        count: 2,
                    },
                },
            ],
        };
        let records: Vec<ReportRecord> = course.experiments[0]
            .slots()
            .iter()
            .zip([91, 64])
            .map(|(slot, score)| ReportRecord::from_slot("hadoop", "hadoop-run", slot, score))
            .collect();
        finalize_run("hadoop-run", &course, &records, Utc::now())
    }

    #[test]
    fn html_report_contains_required_elements() {
        let record = make_test_record();
        let html = generate_html(&record);

        assert!(html.contains("<html"));
        assert!(html.contains("</html>"));
        assert!(html.contains("Hadoop &lt;Basics&gt; review report"));
        assert!(html.contains("hadoop-run"));
        assert!(html.contains("<td>HDFS</td><td>2</td><td>77.5</td>"));
        assert!(html.contains("<td>YARN</td><td>0</td><td>-</td>"));
        assert!(html.contains("Student 1"));
        assert!(html.contains("90-100"));
        assert!(!html.contains("<Basics>"));
    }

    #[test]
    fn empty_experiments_are_left_out_of_the_chart() {
        let html = generate_html(&make_test_record());
        let chart_labels = html.matches("text-anchor=\"end\"").count();
        // one bar for HDFS plus five histogram buckets
        assert_eq!(chart_labels, 6);
    }

    #[test]
    fn html_report_write_to_file() {
        let record = make_test_record();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.html");

        write_html_report(&record, &path).unwrap();
        assert!(path.exists());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
