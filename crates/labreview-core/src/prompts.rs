//! Review prompt templates and per-course prompt configuration status.

use serde::Serialize;

use crate::error::StorageError;
use crate::model::{Course, ReportType};
use crate::traits::{load_prompt_or_none, PromptConfig, PromptKey, ReviewStore};

/// A named review prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub report_type: ReportType,
    pub body: &'static str,
}

const WORD_TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "comprehensive",
        report_type: ReportType::Word,
        body: "Review the lab report along the following dimensions:\n\
1. Understanding of the lab objectives and principles (20 points)\n\
2. Completeness and accuracy of the procedure (30 points)\n\
3. Quality of data recording and analysis (30 points)\n\
4. Soundness of the conclusions and depth of reflection (20 points)\n\
Give a score for each dimension and concrete suggestions for improvement.",
    },
    PromptTemplate {
        name: "format",
        report_type: ReportType::Word,
        body: "Focus on the formatting of the lab report:\n\
1. Are the title and section structure well formed?\n\
2. Are figures and tables numbered and captioned?\n\
3. Are references formatted correctly?\n\
4. Is the page layout clean?\n\
Point out formatting problems and suggest fixes.",
    },
    PromptTemplate {
        name: "content",
        report_type: ReportType::Word,
        body: "Assess the content quality of the lab report in depth:\n\
1. Depth of understanding of the underlying principles\n\
2. Soundness of the experiment design\n\
3. Rigor of the data analysis\n\
4. Originality of the discussion\n\
Give a detailed content assessment and suggestions for improvement.",
    },
];

const DIFY_TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: "workflow_analysis",
        report_type: ReportType::Dify,
        body: "# Dify workflow review\n\
Review the submitted Dify YAML workflow along these dimensions:\n\n\
1. **Structural completeness** (25 points)\n\
   - Are all nodes fully configured?\n\
   - Are node connections correct?\n\
   - Do inputs and outputs match?\n\n\
2. **Logic design** (30 points)\n\
   - Does the flow meet the requirements?\n\
   - Are conditions accurate?\n\
   - Is error handling complete?\n\n\
3. **Parameter configuration** (25 points)\n\
   - Model parameters\n\
   - Prompt quality\n\
   - Variable passing\n\n\
4. **Optimization and originality** (20 points)\n\
   - Evidence of optimization\n\
   - Original design choices",
    },
    PromptTemplate {
        name: "prompt_quality",
        report_type: ReportType::Dify,
        body: "# Dify prompt quality review\n\
Evaluate the prompt design inside the YAML:\n\n\
1. **Clarity** (30 points)\n\
   - Are instructions explicit?\n\
   - Is the context sufficient?\n\
   - Are output format requirements clear?\n\n\
2. **Effectiveness** (30 points)\n\
   - Does the prompt reach its goal?\n\
   - Output quality\n\
   - Handling of edge cases\n\n\
3. **Optimization** (20 points)\n\
   - Token efficiency\n\
   - Context management\n\
   - Performance\n\n\
4. **Documentation** (20 points)\n\
   - Comments\n\
   - Naming conventions",
    },
    PromptTemplate {
        name: "integration_test",
        report_type: ReportType::Dify,
        body: "# Dify integration test review\n\
Evaluate how the YAML workflow behaves when run:\n\n\
1. **Functional completeness** (30 points)\n\
   - Are all required features implemented?\n\
   - Boundary conditions\n\
   - Error cases\n\n\
2. **Stability** (25 points)\n\
   - Run stability\n\
   - Recovery from errors\n\
   - Logging\n\n\
3. **Output quality** (25 points)\n\
   - Output format\n\
   - Accuracy\n\
   - Readability\n\n\
4. **Test coverage** (20 points)\n\
   - Completeness of test cases\n\
   - Analysis of test results",
    },
];

/// Templates available for a report type.
pub fn templates(report_type: ReportType) -> &'static [PromptTemplate] {
    match report_type {
        ReportType::Word => WORD_TEMPLATES,
        ReportType::Dify => DIFY_TEMPLATES,
    }
}

/// Look up a template by report type and name.
pub fn template(report_type: ReportType, name: &str) -> Option<&'static PromptTemplate> {
    templates(report_type).iter().find(|t| t.name == name)
}

pub fn template_names(report_type: ReportType) -> Vec<&'static str> {
    templates(report_type).iter().map(|t| t.name).collect()
}

/// Write `template` as the prompt of one experiment, or of every experiment in
/// `course` when `experiment_id` is `None`. Returns the number of experiments
/// written.
pub async fn apply_template(
    store: &dyn ReviewStore,
    course: &Course,
    experiment_id: Option<&str>,
    template: &PromptTemplate,
) -> Result<usize, StorageError> {
    let config = PromptConfig::new(template.report_type, template.body);
    let mut written = 0;
    for exp in &course.experiments {
        if experiment_id.is_some_and(|id| id != exp.id) {
            continue;
        }
        store
            .save_prompt(&PromptKey::new(&course.id, &exp.id), &config)
            .await?;
        written += 1;
    }
    tracing::info!(
        "applied template {} to {written} experiment(s) of {}",
        template.name,
        course.id
    );
    Ok(written)
}

/// Prompt configuration state of one experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptStatus {
    pub experiment_id: String,
    pub name: String,
    pub report_type: Option<ReportType>,
    pub configured: bool,
}

/// Prompt configuration state of a whole course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigProgress {
    pub course_id: String,
    pub experiments: Vec<PromptStatus>,
}

impl ConfigProgress {
    pub fn configured(&self) -> usize {
        self.experiments.iter().filter(|e| e.configured).count()
    }

    /// Rounded percentage of configured experiments.
    pub fn percent(&self) -> u32 {
        if self.experiments.is_empty() {
            return 0;
        }
        (self.configured() as f64 * 100.0 / self.experiments.len() as f64).round() as u32
    }

    /// Names of experiments that still lack a prompt.
    pub fn unconfigured_names(&self) -> Vec<String> {
        self.experiments
            .iter()
            .filter(|e| !e.configured)
            .map(|e| e.name.clone())
            .collect()
    }
}

/// Collect the prompt status of every experiment in `course`.
pub async fn prompt_status(store: &dyn ReviewStore, course: &Course) -> ConfigProgress {
    let mut experiments = Vec::with_capacity(course.experiments.len());
    for exp in &course.experiments {
        let config = load_prompt_or_none(store, &PromptKey::new(&course.id, &exp.id)).await;
        experiments.push(PromptStatus {
            experiment_id: exp.id.clone(),
            name: exp.name.clone(),
            report_type: config.as_ref().map(|c| c.report_type),
            configured: config.is_some_and(|c| c.is_configured()),
        });
    }
    ConfigProgress {
        course_id: course.id.clone(),
        experiments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::catalog::builtin_catalog;
    use crate::report::TaskRunRecord;

    #[derive(Default)]
    struct PromptOnlyStore {
        prompts: Mutex<HashMap<PromptKey, PromptConfig>>,
    }

    #[async_trait]
    impl ReviewStore for PromptOnlyStore {
        fn name(&self) -> &str {
            "prompts"
        }

        async fn load_task_records(&self) -> Result<Vec<TaskRunRecord>, StorageError> {
            Ok(Vec::new())
        }

        async fn save_task_records(&self, _: &[TaskRunRecord]) -> Result<(), StorageError> {
            Ok(())
        }

        async fn load_prompt(&self, key: &PromptKey) -> Result<Option<PromptConfig>, StorageError> {
            Ok(self.prompts.lock().unwrap().get(key).cloned())
        }

        async fn save_prompt(
            &self,
            key: &PromptKey,
            config: &PromptConfig,
        ) -> Result<(), StorageError> {
            self.prompts
                .lock()
                .unwrap()
                .insert(key.clone(), config.clone());
            Ok(())
        }
    }

    #[test]
    fn template_lookup() {
        assert_eq!(
            template_names(ReportType::Word),
            vec!["comprehensive", "format", "content"]
        );
        assert_eq!(
            template_names(ReportType::Dify),
            vec!["workflow_analysis", "prompt_quality", "integration_test"]
        );
        let t = template(ReportType::Dify, "prompt_quality").unwrap();
        assert_eq!(t.report_type, ReportType::Dify);
        assert!(t.body.starts_with("# Dify prompt quality review"));
        assert!(template(ReportType::Word, "workflow_analysis").is_none());
    }

    #[tokio::test]
    async fn apply_to_one_then_all() {
        let store = PromptOnlyStore::default();
        let catalog = builtin_catalog();
        let course = catalog.course("hadoop").unwrap();
        let t = template(ReportType::Word, "format").unwrap();

        let status = prompt_status(&store, course).await;
        assert_eq!(status.percent(), 0);

        let n = apply_template(&store, course, Some("yarn_exp"), t).await.unwrap();
        assert_eq!(n, 1);
        let status = prompt_status(&store, course).await;
        assert_eq!(status.configured(), 1);
        assert_eq!(status.percent(), 33);
        assert_eq!(
            status.unconfigured_names(),
            vec![
                course.experiments[0].name.clone(),
                course.experiments[1].name.clone()
            ]
        );

        let n = apply_template(&store, course, None, t).await.unwrap();
        assert_eq!(n, 3);
        let status = prompt_status(&store, course).await;
        assert_eq!(status.percent(), 100);
        assert_eq!(status.experiments[0].report_type, Some(ReportType::Word));
    }

    #[tokio::test]
    async fn unknown_experiment_writes_nothing() {
        let store = PromptOnlyStore::default();
        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let t = template(ReportType::Word, "content").unwrap();
        let n = apply_template(&store, course, Some("nope"), t).await.unwrap();
        assert_eq!(n, 0);
        assert!(store.prompts.lock().unwrap().is_empty());
    }
}
