// src/grading/prompt.rs

//! Prompt templates sent to the AI model.

use crate::{clients::GradeRequest, models::grading::TestCaseResult};

pub const TUTOR_SYSTEM_PROMPT: &str = "You are Edu-Chatbot, a friendly and knowledgeable AI tutor \
that helps students understand course materials, programming concepts, and assignments. \
Keep your answers concise, clear, and focused on helping students learn.";

/// Asks for a JSON verdict `{"correct": bool, "feedback": string}`.
pub fn grading_prompt(request: &GradeRequest) -> String {
    format!(
        r#"
You are a kind, encouraging C++ tutor who gives feedback like a real teacher.
Evaluate the student's answer carefully.
Rules:
- If the student's answer is mostly correct, respond with short, positive feedback.
  Example: "Great job! You clearly understand this concept."
  Do NOT ask additional questions when the student is correct.
- If the answer is incomplete or wrong:
  - Start feedback with "Nice try, but..."
  - Ask 1-2 short guiding questions that help the student reflect or recall the right concept.
  - Your questions should guide thinking WITHOUT giving away the answer.
  - Do NOT use examples that are identical or too similar to the original question context.
  - Focus on the KEY CHARACTERISTIC of what makes the answer correct.
  - NEVER reveal the correct answer, data type name, or give obvious hints that directly lead to it.
- Keep your feedback under 3 sentences.
- Output ONLY valid JSON like this:
{{
  "correct": true or false,
  "feedback": "Your feedback text here"
}}
Question: "{}"
Expected Answer: "{}"
Student Answer: "{}"
"#,
        request.question, request.expected_answer, request.student_answer
    )
}

/// Socratic hint for failed test cases. Never reveals the solution.
pub fn hint_prompt(code: &str, failed: &[TestCaseResult]) -> String {
    let cases = failed
        .iter()
        .map(|f| {
            format!(
                "- input: {} | expected: {} | output: {}",
                json_quote(&f.input),
                json_quote(&f.expected),
                json_quote(&f.output)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
You are a helpful C++ tutor. The student's code failed some test cases.

Rules:
- Start with "Nice try, but..."
- Do NOT reveal the solution.
- Give 2 concise guiding questions or hints.
- Keep it under 3 sentences total.

Student code:
```cpp
{code}
```

Failed test cases:
{cases}
"#
    )
}

fn json_quote(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}
