/// Wrap the resolved-issues block in summarization instructions
pub fn build_rollup_prompt(issues_markdown: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are writing a weekly engineering status update for Slack.\n\n");
    prompt.push_str("Below are the issues the team resolved this period. Each issue has a ");
    prompt.push_str("title, an assignee and an optional description.\n\n");
    prompt.push_str("---\n");
    prompt.push_str(issues_markdown.trim());
    prompt.push_str("\n---\n\n");

    prompt.push_str("Summarize the work in 1-5 short bullet points:\n");
    prompt.push_str("- Group related issues into one bullet\n");
    prompt.push_str("- Focus on user-visible outcomes, not implementation details\n");
    prompt.push_str("- Do not mention issue keys or assignees\n");
    prompt.push_str("- Reply with the bullets only, one per line, each starting with \"- \"\n");

    prompt
}

/// Keep only bullet lines and render them as Slack bullets.
///
/// Falls back to the trimmed response when the model answered without bullets.
pub fn normalize_bullets(response: &str) -> String {
    let bullets: Vec<String> = response
        .lines()
        .map(str::trim)
        .filter_map(strip_bullet)
        .filter(|content| !content.is_empty())
        .map(|content| format!("• {}", content))
        .collect();

    if bullets.is_empty() {
        response.trim().to_string()
    } else {
        bullets.join("\n")
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    if let Some(content) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        return Some(content.trim());
    }

    // Numbered lists: "1. ", "2) "
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(content) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(content.trim());
        }
    }
    None
}
