//! Default prompts for pitch-deck generation.

/// System prompt used when the job carries no override.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert pitch deck consultant with extensive experience helping startups create compelling investor presentations. Your task is to analyze the provided business document and generate a professional pitch deck in JSON format.

Generate a pitch deck with 10-15 slides covering the following structure:
1. Title/Company Overview
2. Problem Statement
3. Solution
4. Market Opportunity
5. Product/Service
6. Business Model
7. Competitive Advantage
8. Go-to-Market Strategy
9. Traction/Milestones
10. Team
11. Financial Projections
12. Funding Ask
13. Vision/Closing

Return your response as a valid JSON object with this exact structure:
{
  "slides": [
    {
      "title": "Slide title here",
      "content": "Detailed slide content here",
      "type": "title|problem|solution|market|product|business_model|competitive|strategy|traction|team|financials|funding|vision"
    }
  ]
}

Ensure the content is concise, compelling, and investor-focused. Each slide should have clear, actionable content."#;

const DEFAULT_INSTRUCTION: &str =
    "Please analyze the following business document and generate a professional pitch deck:";

const CLOSING_INSTRUCTION: &str =
    "Generate the pitch deck in the JSON format specified in the system prompt.";

pub fn system_prompt(override_prompt: Option<&str>) -> String {
    override_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string()
}

/// Wrap the document in the user prompt (custom instruction or default).
pub fn user_prompt(document: &str, override_prompt: Option<&str>) -> String {
    let instruction = override_prompt.unwrap_or(DEFAULT_INSTRUCTION);
    format!("{instruction}\n\nDOCUMENT CONTENT:\n{document}\n\n{CLOSING_INSTRUCTION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_user_prompt_wraps_document() {
        let prompt = user_prompt("Sells widgets.", None);
        assert!(prompt.starts_with(DEFAULT_INSTRUCTION));
        assert!(prompt.contains("DOCUMENT CONTENT:\nSells widgets.\n\n"));
        assert!(prompt.ends_with(CLOSING_INSTRUCTION));
    }

    #[test]
    fn custom_instruction_replaces_default_but_keeps_document() {
        let prompt = user_prompt("Sells widgets.", Some("Five slides only."));
        assert!(prompt.starts_with("Five slides only.\n\n"));
        assert!(!prompt.contains(DEFAULT_INSTRUCTION));
        assert!(prompt.contains("Sells widgets."));
    }

    #[test]
    fn system_prompt_override_is_verbatim() {
        assert_eq!(system_prompt(Some("Be terse.")), "Be terse.");
        assert!(system_prompt(None).contains("\"slides\""));
    }
}
