//! Instruction templates sent to the model.

/// Fixed system instruction listing the extraction rules.
pub const SYSTEM_PROMPT: &str = "\
You extract structured data from job postings.
Apply these rules without exception:

1. Record only what the posting states. Leave a field null rather than guess.
2. Write every date as YYYY-MM-DD.
3. List every technical term in technical_keywords: languages, frameworks, libraries, tools, databases, clouds and platforms.
4. Fill role_tags from three buckets:
   - seniority (intern, entry-level, mid-level, senior, staff, lead, principal)
   - department (frontend, backend, full-stack, data, ML, infrastructure, security, mobile)
   - key requirements (cloud, distributed systems, on-call, clearance, travel)
5. Convert salary figures to yearly amounts in the stated currency.
6. remote_status is exactly one of \"Remote\", \"Hybrid\", \"On-site\", or null when not stated.
7. employment.type is exactly one of \"full-time\", \"part-time\", \"contract\", \"internship\", \"coop\", or null.
8. Set metadata.confidence_score between 0 and 1, lowering it for incomplete, unclear or ambiguous source text.

Capture all available information while staying accurate.";

const USER_TEMPLATE: &str = "\
Extract the job posting below into the schema. Return only the structured data.
Put a cleanly restructured Markdown version of the full posting in markdown_description.

Job posting:
";

/// User instruction with the normalized text embedded verbatim.
pub fn user_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(USER_TEMPLATE.len() + text.len());
    prompt.push_str(USER_TEMPLATE);
    prompt.push_str(text);
    prompt
}
