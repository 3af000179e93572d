use draftloop_agent::ResponseSchema;
use serde_json::json;

/// Tone used when none is configured
pub const DEFAULT_TONE: &str = "inspirational";

/// A system role paired with the instructions sent under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_role: String,
    pub instructions: String,
}

/// Prompt templates for the writer, editor and reviser roles
pub struct CritiquePrompts;

impl CritiquePrompts {
    /// Build the initial-draft prompt
    pub fn build_generation_prompt(user_prompt: &str, tone: &str) -> PromptPair {
        PromptPair {
            system_role: "You are an expert blog writer skilled at writing clear, engaging, \
                          and informative content."
                .to_string(),
            instructions: format!(
                r#"Write a detailed, engaging blog post based on the following topic and keep it in a {tone} tone:

{topic}

Make sure the writing is well structured with a title, an introduction, a body, and a conclusion.
Keep the tone conversational yet professional."#,
                tone = tone,
                topic = user_prompt,
            ),
        }
    }

    /// Build the critique prompt for the current draft
    pub fn build_evaluation_prompt(draft: &str, revision_count: u32) -> PromptPair {
        PromptPair {
            system_role: "You are a professional editor who evaluates blogs based on quality, \
                          clarity and engagement. Be objective and provide constructive criticism. \
                          You must assign a quality score from 0.0 to 100.0. \
                          Use the provided schema to return your decision."
                .to_string(),
            instructions: format!(
                r#"Here is the current blog draft that needs critique (review round {round}):

{draft}

Evaluate the above blog and decide whether it should be "REVISE" or "PASS".
Also provide a quality score (0.0 to 100.0) based on the requirements and the quality.
Summarize your critique and list 2-3 specific feedback points for improvement."#,
                round = revision_count,
                draft = draft,
            ),
        }
    }

    /// Build the revision prompt. An empty feedback list still yields a
    /// prompt with an empty feedback section.
    pub fn build_revision_prompt(draft: &str, feedback: &[String]) -> PromptPair {
        let feedback_text: String = feedback
            .iter()
            .map(|point| format!("\n- {}", point))
            .collect();

        PromptPair {
            system_role: "You are an expert blog editor. Your task is to revise the given blog \
                          draft by applying the critique feedback while preserving the original \
                          tone, structure, and coherence."
                .to_string(),
            instructions: format!(
                r#"Here is the critique feedback you must address:
{feedback}

And here is the current blog draft that needs revision:

{draft}

Now, produce an improved version of this blog that addresses each feedback point above.
Ensure the result remains fluent and engaging."#,
                feedback = feedback_text,
                draft = draft,
            ),
        }
    }

    /// Response schema the evaluator's structured completion must satisfy
    pub fn critique_schema() -> ResponseSchema {
        ResponseSchema::new(
            "critique",
            json!({
                "type": "object",
                "properties": {
                    "decision": {
                        "type": "string",
                        "enum": ["REVISE", "PASS"],
                        "description": "REVISE if the blog needs improvement, PASS if it is finalized."
                    },
                    "quality_score": {
                        "type": "number",
                        "description": "Quality score from 0.0 (poor) to 100.0 (excellent)."
                    },
                    "critique_summary": {
                        "type": "string",
                        "description": "A brief, high-level summary of the evaluation."
                    },
                    "specific_feedback": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Actionable, itemized feedback points for the reviser."
                    }
                },
                "required": ["decision", "quality_score", "critique_summary", "specific_feedback"]
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_includes_topic_and_tone() {
        let prompt = CritiquePrompts::build_generation_prompt("Tide pools", "playful");
        assert!(prompt.instructions.contains("Tide pools"));
        assert!(prompt.instructions.contains("playful tone"));
        assert!(prompt.system_role.contains("blog writer"));
    }

    #[test]
    fn test_revision_prompt_lists_feedback() {
        let feedback = vec!["Shorter intro".to_string(), "Cite sources".to_string()];
        let prompt = CritiquePrompts::build_revision_prompt("DRAFT", &feedback);
        assert!(prompt.instructions.contains("\n- Shorter intro\n- Cite sources"));
        assert!(prompt.instructions.contains("DRAFT"));
    }

    #[test]
    fn test_revision_prompt_with_empty_feedback() {
        let prompt = CritiquePrompts::build_revision_prompt("DRAFT", &[]);
        assert!(prompt
            .instructions
            .starts_with("Here is the critique feedback you must address:\n\n"));
        assert!(prompt.instructions.contains("DRAFT"));
    }

    #[test]
    fn test_critique_schema_requires_all_fields() {
        let schema = CritiquePrompts::critique_schema();
        assert_eq!(
            schema.required_fields(),
            vec!["decision", "quality_score", "critique_summary", "specific_feedback"]
        );
    }
}
