//! Course catalog: the built-in courses and a TOML catalog parser.
//!
//! A catalog file lists courses and their experiments:
//!
//! ```toml
//! [[courses]]
//! id = "hadoop"
//! name = "Hadoop Principles"
//!
//! [[courses.experiments]]
//! id = "hdfs_exp"
//! name = "HDFS deployment"
//! report_type = "word"
//! count = 45
//!
//! [[courses.experiments]]
//! id = "mixed"
//! name = "Mixed submissions"
//! word_count = 30
//! dify_count = 10
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Course, Experiment, ExperimentCountSpec, ReportType};

/// The set of courses the dashboard offers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Catalog {
    pub courses: Vec<Course>,
}

impl Catalog {
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TomlCatalogFile {
    #[serde(default)]
    courses: Vec<TomlCourse>,
}

#[derive(Debug, Deserialize)]
struct TomlCourse {
    id: String,
    name: String,
    #[serde(default)]
    experiments: Vec<TomlExperiment>,
}

#[derive(Debug, Deserialize)]
struct TomlExperiment {
    id: String,
    name: String,
    #[serde(default, alias = "reportType")]
    report_type: Option<String>,
    #[serde(default)]
    count: Option<u32>,
    #[serde(default, alias = "wordCount")]
    word_count: Option<u32>,
    #[serde(default, alias = "difyCount")]
    dify_count: Option<u32>,
}

impl TomlExperiment {
    fn into_experiment(self, course_id: &str) -> Result<Experiment> {
        let counts = match (self.report_type, self.count) {
            (Some(ty), Some(count)) => {
                if self.word_count.is_some() || self.dify_count.is_some() {
                    anyhow::bail!(
                        "experiment '{}' in course '{course_id}' mixes report_type/count with word_count/dify_count",
                        self.id
                    );
                }
                let report_type: ReportType = ty
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!("experiment '{}': {e}", self.id))?;
                ExperimentCountSpec::Single { report_type, count }
            }
            (Some(_), None) => {
                anyhow::bail!("experiment '{}' sets report_type but no count", self.id)
            }
            (None, Some(count)) => ExperimentCountSpec::Single {
                report_type: ReportType::Word,
                count,
            },
            (None, None) => ExperimentCountSpec::Split {
                word_count: self.word_count.unwrap_or(0),
                dify_count: self.dify_count.unwrap_or(0),
            },
        };
        Ok(Experiment {
            id: self.id,
            name: self.name,
            counts,
        })
    }
}

/// Parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content, path)
}

/// Parse a TOML string into a `Catalog` (useful for testing).
pub fn parse_catalog_str(content: &str, source_path: &Path) -> Result<Catalog> {
    let parsed: TomlCatalogFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let courses = parsed
        .courses
        .into_iter()
        .map(|c| {
            let experiments = c
                .experiments
                .into_iter()
                .map(|e| e.into_experiment(&c.id))
                .collect::<Result<Vec<_>>>()?;
            Ok(Course {
                id: c.id,
                name: c.name,
                experiments,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Catalog { courses })
}

/// A warning from catalog validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The course the warning is about.
    pub course_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a catalog for common issues.
pub fn validate_catalog(catalog: &Catalog) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_courses = HashSet::new();
    for course in &catalog.courses {
        if !seen_courses.insert(&course.id) {
            warnings.push(ValidationWarning {
                course_id: Some(course.id.clone()),
                message: format!("duplicate course ID: {}", course.id),
            });
        }

        if course.experiments.is_empty() {
            warnings.push(ValidationWarning {
                course_id: Some(course.id.clone()),
                message: "course declares no experiments".into(),
            });
        }

        let mut seen_experiments = HashSet::new();
        for exp in &course.experiments {
            if !seen_experiments.insert(&exp.id) {
                warnings.push(ValidationWarning {
                    course_id: Some(course.id.clone()),
                    message: format!("duplicate experiment ID: {}", exp.id),
                });
            }
            if exp.report_count() == 0 {
                warnings.push(ValidationWarning {
                    course_id: Some(course.id.clone()),
                    message: format!("experiment {} declares no reports", exp.id),
                });
            }
        }
    }

    warnings
}

fn single(id: &str, name: &str, count: u32) -> Experiment {
    Experiment {
        id: id.into(),
        name: name.into(),
        counts: ExperimentCountSpec::Single {
            report_type: ReportType::Word,
            count,
        },
    }
}

fn split(id: &str, name: &str, word_count: u32, dify_count: u32) -> Experiment {
    Experiment {
        id: id.into(),
        name: name.into(),
        counts: ExperimentCountSpec::Split {
            word_count,
            dify_count,
        },
    }
}

/// The four courses shipped with the dashboard.
pub fn builtin_catalog() -> Catalog {
    Catalog {
        courses: vec![
            Course {
                id: "hadoop".into(),
                name: "Hadoop Principles and Technology".into(),
                experiments: vec![
                    single("hdfs_exp", "HDFS deployment and operations", 45),
                    single("mapreduce_exp", "MapReduce data statistics", 45),
                    single("yarn_exp", "YARN scheduling and monitoring", 45),
                ],
            },
            Course {
                id: "java".into(),
                name: "Java Programming".into(),
                experiments: vec![
                    split("java_exp1", "Lab 1: Java basic syntax", 40, 0),
                    split("java_exp2", "Lab 2: Object-oriented programming", 38, 2),
                    split("java_exp3", "Lab 3: Exceptions and collections", 35, 5),
                ],
            },
            Course {
                id: "datastructure".into(),
                name: "Data Structures".into(),
                experiments: vec![
                    split("ds_exp1", "Lab 1: Linear lists", 30, 10),
                    split("ds_exp2", "Lab 2: Stacks and queues", 25, 20),
                    split("ds_exp3", "Lab 3: Binary tree traversal", 28, 12),
                ],
            },
            Course {
                id: "database".into(),
                name: "Database Principles".into(),
                experiments: vec![
                    split("db_exp1", "Lab 1: Basic SQL queries", 50, 0),
                    split("db_exp2", "Lab 2: Schema design and normal forms", 45, 0),
                ],
            },
        ],
    }
}
