//! Result helpers for tool responses

use rmcp::model::{CallToolResult, Content};

/// Successful plain text response
pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

/// Tool-level failure reported to the caller as content, not as a protocol error
pub fn tool_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::RawContent;

    fn first_text(result: &CallToolResult) -> Option<String> {
        result.content.first().and_then(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.clone()),
            _ => None,
        })
    }

    #[test]
    fn test_text_success() {
        let result = text_success("System status normal");
        assert_eq!(result.is_error, Some(false));
        assert_eq!(first_text(&result).as_deref(), Some("System status normal"));
    }

    #[test]
    fn test_tool_error() {
        let result = tool_error("bad input");
        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result).as_deref(), Some("bad input"));
    }
}
