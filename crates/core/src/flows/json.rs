/// Finds the JSON object in a reply that may wrap it in a markdown fence or
/// surround it with prose.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        let content_start = text[block_start..]
            .find('\n')
            .map(|i| block_start + i + 1)
            .unwrap_or(block_start);
        if let Some(end) = text[content_start..].find("```") {
            let content = text[content_start..content_start + end].trim();
            if content.starts_with('{') {
                return Some(content);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_object() {
        assert_eq!(extract_json_object(" {\"a\":1} "), Some("{\"a\":1}"));
    }

    #[test]
    fn fenced_object() {
        let reply = "Here you go:\n```json\n{\"a\": 1}\n```\nanything else?";
        assert_eq!(extract_json_object(reply), Some("{\"a\": 1}"));
    }

    #[test]
    fn object_inside_prose() {
        assert_eq!(
            extract_json_object("result: {\"a\": {\"b\": 2}} done"),
            Some("{\"a\": {\"b\": 2}}")
        );
    }

    #[test]
    fn no_object() {
        assert_eq!(extract_json_object("sorry, I can't"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }
}
