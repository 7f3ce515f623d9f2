//! Prompt rendering for generator requests.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::extract::FILE_TAG;
use crate::core::types::Context;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const CANDIDATE_TEMPLATE: &str = include_str!("prompts/candidate.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("candidate", CANDIDATE_TEMPLATE)
            .expect("candidate template should be valid");
        Self { env }
    }

    /// Role instructions shared by every request of a run.
    pub fn render_system(&self, task: &str) -> Result<String> {
        let template = self.env.get_template("system")?;
        let rendered = template.render(context! {
            task => (!task.trim().is_empty()).then(|| task.trim()),
            tag => FILE_TAG,
        })?;
        Ok(rendered)
    }

    /// Per-candidate prompt. `strict` appends the format reminder used on retry.
    pub fn render_candidate(&self, context: &Context, strict: bool) -> Result<String> {
        let template = self.env.get_template("candidate")?;
        let feedback = context.feedback.trim();
        let rendered = template.render(context! {
            artifact => context.artifact.trim_end(),
            feedback => if feedback.is_empty() { "None." } else { feedback },
            tag => FILE_TAG,
            strict => strict,
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> Context {
        Context {
            artifact: "def top_k_frequent(nums, k):\n    return []\n".to_string(),
            feedback: "1 failed, 5 passed".to_string(),
        }
    }

    #[test]
    fn system_prompt_includes_task_and_format() {
        let engine = PromptEngine::new();
        let system = engine
            .render_system("Sort by frequency DESC, ties by value ASC.")
            .expect("render");
        assert!(system.contains("Sort by frequency DESC"));
        assert!(system.contains("<file>"));
        assert!(system.contains("</file>"));
    }

    #[test]
    fn system_prompt_omits_empty_task() {
        let engine = PromptEngine::new();
        let system = engine.render_system("   ").expect("render");
        assert!(!system.contains("Task:"));
    }

    #[test]
    fn candidate_prompt_carries_artifact_and_feedback() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_candidate(&sample_context(), false)
            .expect("render");
        assert!(prompt.contains("def top_k_frequent"));
        assert!(prompt.contains("1 failed, 5 passed"));
        assert!(!prompt.contains("IMPORTANT"));
    }

    #[test]
    fn strict_prompt_adds_format_reminder() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_candidate(&sample_context(), true)
            .expect("render");
        assert!(prompt.contains("IMPORTANT"));
        assert!(prompt.contains("def top_k_frequent"));
    }

    #[test]
    fn empty_feedback_renders_placeholder() {
        let engine = PromptEngine::new();
        let context = Context {
            artifact: "x = 1".to_string(),
            feedback: String::new(),
        };
        let prompt = engine.render_candidate(&context, false).expect("render");
        assert!(prompt.contains("None."));
    }
}
