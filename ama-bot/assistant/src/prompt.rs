use crate::Documents;

pub const RESUME_PLACEHOLDER: &str = "{resume}";
pub const BACKGROUND_PLACEHOLDER: &str = "{background}";

pub const DEFAULT_SYSTEM_PROMPT_TEMPLATE: &str = "\
Answer questions about the person described below, in the first person.
Base every answer strictly on these documents and say so when they do not cover a question.
Keep answers concise and professional.

Resume:
{resume}

Additional background:
{background}
";

/// Substitutes the document text into `template` in a single pass, so
/// placeholders inside the documents stay untouched.
#[must_use]
pub fn render_system_prompt(template: &str, documents: &Documents) -> String {
    let mut rendered = String::with_capacity(
        template.len() + documents.resume.len() + documents.background.len(),
    );
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(RESUME_PLACEHOLDER) {
            rendered.push_str(&documents.resume);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(BACKGROUND_PLACEHOLDER) {
            rendered.push_str(&documents.background);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}
