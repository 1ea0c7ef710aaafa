//! The `labreview init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create labreview.toml
    if std::path::Path::new("labreview.toml").exists() {
        println!("labreview.toml already exists, skipping.");
    } else {
        std::fs::write("labreview.toml", SAMPLE_CONFIG)?;
        println!("Created labreview.toml");
    }

    // Create example catalog
    let example_path = std::path::Path::new("catalog.toml");
    if example_path.exists() {
        println!("catalog.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_CATALOG)?;
        println!("Created catalog.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: labreview validate --catalog catalog.toml");
    println!("  2. Run: labreview prompt template --course hadoop --type word --name comprehensive");
    println!("  3. Run: labreview run --course hadoop --limit 5");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# labreview configuration

tick_interval_ms = 500
minutes_per_report = 0.1
require_prompts = true

# Uncomment to replace the built-in courses.
# catalog = "catalog.toml"

[store]
type = "file"
data_dir = "./labreview-data"
"#;

const EXAMPLE_CATALOG: &str = r#"[[courses]]
id = "hadoop"
name = "Hadoop Principles and Technology"

[[courses.experiments]]
id = "hdfs_exp"
name = "HDFS deployment and operations"
report_type = "word"
count = 45

[[courses.experiments]]
id = "mapreduce_exp"
name = "MapReduce data statistics"
report_type = "word"
count = 45

[[courses]]
id = "java"
name = "Java Programming"

[[courses.experiments]]
id = "java_exp2"
name = "Lab 2: Object-oriented programming"
word_count = 38
dify_count = 2
"#;
