use tera::{Context, Tera};

/// The description call should be deterministic.
pub const DESCRIPTION_TEMPERATURE: f32 = 0.0;
pub const ANSWER_TEMPERATURE: f32 = 0.2;

/// Marks the start of the filtered rows inside the answer prompt.
pub const DATA_FENCE: &str = "Data:\n---\n";

const TEXT_TO_QUERY_TEMPLATE: &str = r#"
Given the following Google Sheets data structure, analyze the user's question and describe what data should be filtered or retrieved.
- Describe the filtering logic clearly
- Mention specific column names and conditions
- Be specific about what data should be returned
- If it's a calculation (like average), mention that

Schema:
---
{{ schema }}
---

User Question: {{ question }}

Query Description:
"#;

const FINAL_ANSWER_TEMPLATE: &str = r#"
Answer the following user's question based ONLY on the provided data from Google Sheets.
If the data is empty or irrelevant, say you could not find an answer.
Be friendly and concise.

Data:
---
{{ data }}
---

User Question: {{ question }}

Answer:
"#;

pub fn text_to_query_prompt(schema: &str, question: &str) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("schema", schema);
    context.insert("question", question);
    Tera::one_off(TEXT_TO_QUERY_TEMPLATE, &context, false)
}

pub fn final_answer_prompt(question: &str, data: &str) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("data", data);
    context.insert("question", question);
    Tera::one_off(FINAL_ANSWER_TEMPLATE, &context, false)
}
