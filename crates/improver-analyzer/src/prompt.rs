//! LLM prompt engineering for protocol review and revision

use improver_domain::Suggestion;

/// Fixed prompt for the model connection check
pub const HEALTH_CHECK_PROMPT: &str = "Respond with 'OK' if you can read this.";

const REVIEWER_INTRO: &str = "You are an expert laboratory protocol reviewer. Analyze the following laboratory protocol and identify specific improvements.";

const REVIEW_INSTRUCTIONS: &str = r#"For each issue you find, provide:
1. The category (safety, clarity, completeness, formatting, or best_practices)
2. The priority level (HIGH, MEDIUM, or LOW)
3. The specific location (step number or section)
4. A clear description of the issue
5. A specific, actionable suggestion for improvement

Focus on:
- **Safety Issues**: Missing warnings, hazard information, PPE requirements
- **Clarity Issues**: Ambiguous instructions, unclear measurements, vague timing
- **Completeness Issues**: Missing materials, equipment, concentrations, temperatures
- **Formatting Issues**: Poor structure, inconsistent numbering, hard to follow
- **Best Practices**: Industry standards, optimization opportunities, quality controls

Return your analysis in this exact JSON format:
{
    "summary": "Brief overview of the protocol and overall assessment",
    "overall_score": "A score from 1-10",
    "total_issues": "Total number of issues found",
    "suggestions": [
        {
            "category": "safety|clarity|completeness|formatting|best_practices",
            "priority": "HIGH|MEDIUM|LOW",
            "location": "Step 3" or "Materials section" etc,
            "issue": "Clear description of what's wrong",
            "suggestion": "Specific recommendation to fix it",
            "example": "Optional: How it should look after the fix"
        }
    ]
}"#;

const OUTPUT_FORMAT_REMINDER: &str =
    "Provide your analysis in valid JSON format only, with no additional text before or after.";

const EDITOR_INTRO: &str = "You are a laboratory protocol editor. Please rewrite this protocol incorporating the following improvements:";

const REVISION_INSTRUCTIONS: &str = "Maintain the original structure and style, but integrate these improvements naturally. Make the protocol clearer and safer while keeping it professional.";

/// Build the review prompt for a protocol
///
/// `filename` is mentioned in the prompt when non-empty.
pub fn build_analysis_prompt(protocol_text: &str, filename: &str) -> String {
    let file_line = if filename.is_empty() {
        String::new()
    } else {
        format!("Protocol File: {}", filename)
    };

    format!(
        "{}\n\n{}\n\n{}\n\nProtocol to analyze:\n\n{}\n\n{}",
        REVIEWER_INTRO, file_line, REVIEW_INSTRUCTIONS, protocol_text, OUTPUT_FORMAT_REMINDER
    )
}

/// Build the revision prompt for a protocol and the suggestions the user accepted
///
/// One bullet per suggestion, in the order given.
pub fn build_revision_prompt(original_text: &str, accepted: &[Suggestion]) -> String {
    let bullets = accepted
        .iter()
        .map(|s| format!("- {}: {}", s.location, s.suggestion))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n{}\n\n{}\n\nOriginal Protocol:\n{}\n\nProvide the improved protocol below:",
        EDITOR_INTRO, bullets, REVISION_INSTRUCTIONS, original_text
    )
}
