//! Prompt template for learning-content generation.
//!
//! Keeping the template here (rather than inline in the generator) means the
//! output contract the model is asked to honour can be inspected by unit
//! tests, and changed, without touching the fallback or extraction code.

use crate::content::DiagramType;

/// Fixed instructions preceding the JSON contract.
pub const STUDY_INSTRUCTIONS: &str = r#"You are StudyLM, an expert teacher for students.

Analyze the input carefully and return:

1. Topic (short and clear)
2. A simple, student-friendly explanation (200–300 words)
3. Best learning resources for beginners
4. If a diagram is requested, generate clear step-by-step points
   that visually explain the concept (NO code, NO Mermaid).

Return STRICT JSON ONLY in this exact format:"#;

/// Guidelines placed between the JSON contract and the user's input.
pub const GUIDELINES: &str = r#"Guidelines:
- Explanation should be easy for school/college students
- Resources must be real, popular, and beginner-friendly
- Diagram steps should be short, clear, and ordered"#;

/// The output contract with `diagram.type` pre-filled.
pub fn output_contract(diagram: DiagramType) -> String {
    format!(
        r#"{{
  "topic": "",
  "explanation": "",
  "resources": {{
    "youtube": {{
      "title": "",
      "url": ""
    }},
    "website": {{
      "title": "",
      "url": ""
    }},
    "article": {{
      "title": "",
      "url": ""
    }}
  }},
  "diagram": {{
    "type": "{}",
    "steps": []
  }}
}}"#,
        diagram.label()
    )
}

/// Build the single user message sent to every candidate model.
///
/// `input` is appended verbatim after the `Input:` marker.
pub fn build_prompt(input: &str, diagram: DiagramType) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\nInput:\n{}\n",
        STUDY_INSTRUCTIONS,
        output_contract(diagram),
        GUIDELINES,
        input
    )
}
