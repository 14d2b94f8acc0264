/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a model reply.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Locate the JSON object inside a model reply.
///
/// Models occasionally wrap the object in fences or a sentence of prose. The
/// slice runs from the first `{` to the last `}`; when there is no such pair
/// the fence-stripped reply is returned unchanged so the caller's parser can
/// report the failure.
pub fn json_payload(response: &str) -> &str {
    let body = strip_code_blocks(response);
    match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary() {
        let text = "preço: R$ 10";
        let truncated = truncate_to_char_boundary(text, 4);
        assert_eq!(truncated, "pre");
        assert_eq!(truncate_to_char_boundary("curto", 100), "curto");
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn payload_ignores_surrounding_prose() {
        let reply = "Here is the result:\n{\"a\": {\"b\": 1}}\nHope it helps.";
        assert_eq!(json_payload(reply), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn payload_without_object_is_returned_trimmed() {
        assert_eq!(json_payload("  not json  "), "not json");
        assert_eq!(json_payload(""), "");
    }
}
