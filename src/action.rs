//! Action grammar for model completions.
//!
//! A completion either answers the user directly or requests one tool call:
//!
//! ```text
//! ACTION: tool_name({"arg1": "value1", "arg2": 2})
//! ```
//!
//! The marker must start the completion. The tool name runs up to the first
//! `(`; the arguments are the JSON object between that `(` and the last `)`,
//! so parentheses inside JSON string values do not end the span early.

use serde_json::{Map, Value};

/// Literal prefix that turns a completion into a tool call.
pub const ACTION_MARKER: &str = "ACTION:";

/// What the model asked for in one completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// No marker: the completion is the final answer.
    NoAction,
    /// A well-formed tool invocation.
    ToolCall {
        name: String,
        args: Map<String, Value>,
    },
    /// The marker was present but the invocation could not be decoded.
    Malformed { raw: String, reason: String },
}

impl Action {
    /// Whether this action should be executed against a tool server.
    #[must_use]
    pub const fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}

/// Decode a completion into an [`Action`]. Never panics.
#[must_use]
pub fn parse_action(completion: &str) -> Action {
    let Some(rest) = completion.strip_prefix(ACTION_MARKER) else {
        return Action::NoAction;
    };
    let rest = rest.trim();

    let malformed = |reason: &str| Action::Malformed {
        raw: completion.to_string(),
        reason: reason.to_string(),
    };

    let Some(open) = rest.find('(') else {
        return malformed("missing '(' after tool name");
    };

    let name = rest[..open].trim();
    if name.is_empty() {
        return malformed("empty tool name");
    }

    let after_open = &rest[open + 1..];
    let Some(close) = after_open.rfind(')') else {
        return malformed("missing closing ')'");
    };

    match serde_json::from_str::<Value>(&after_open[..close]) {
        Ok(Value::Object(args)) => Action::ToolCall {
            name: name.to_string(),
            args,
        },
        Ok(other) => malformed(&format!(
            "arguments must be a JSON object, got {}",
            json_kind(&other)
        )),
        Err(e) => malformed(&format!("invalid JSON arguments: {e}")),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_call(name: &str, args: Value) -> Action {
        let Value::Object(args) = args else {
            panic!("test args must be an object");
        };
        Action::ToolCall {
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_plain_text_is_no_action() {
        assert_eq!(parse_action("4"), Action::NoAction);
        assert_eq!(parse_action(""), Action::NoAction);
        assert_eq!(parse_action("The answer is ACTION: goto({})"), Action::NoAction);
    }

    #[test]
    fn test_marker_must_be_at_start() {
        assert_eq!(parse_action(" ACTION: goto({})"), Action::NoAction);
        assert_eq!(parse_action("action: goto({})"), Action::NoAction);
    }

    #[test]
    fn test_goto_example() {
        let action = parse_action(r#"ACTION: goto({"url": "http://example.com"})"#);
        assert_eq!(action, tool_call("goto", json!({"url": "http://example.com"})));
        assert!(action.is_tool_call());
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let input = r##"ACTION: fill({"selector": "#q", "value": "rust"})"##;
        assert_eq!(parse_action(input), parse_action(input));
    }

    #[test]
    fn test_tool_name_is_trimmed() {
        let action = parse_action("ACTION:   read_graph   ({})");
        assert_eq!(action, tool_call("read_graph", json!({})));
    }

    #[test]
    fn test_last_paren_closes_arguments() {
        let action = parse_action(r#"ACTION: create_task({"title": "fix (urgent) bug :)"})"#);
        assert_eq!(
            action,
            tool_call("create_task", json!({"title": "fix (urgent) bug :)"}))
        );
    }

    #[test]
    fn test_trailing_text_after_last_paren_is_ignored() {
        let action = parse_action("ACTION: read_graph({})\n");
        assert_eq!(action, tool_call("read_graph", json!({})));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let input = "ACTION: click(not json)";
        match parse_action(input) {
            Action::Malformed { raw, reason } => {
                assert_eq!(raw, input);
                assert!(reason.starts_with("invalid JSON arguments"), "{reason}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_parens_is_malformed() {
        assert!(matches!(
            parse_action("ACTION: screenshot"),
            Action::Malformed { .. }
        ));
        assert!(matches!(
            parse_action(r#"ACTION: goto({"url": "x"}"#),
            Action::Malformed { .. }
        ));
    }

    #[test]
    fn test_empty_tool_name_is_malformed() {
        assert!(matches!(
            parse_action(r#"ACTION: ({"a": 1})"#),
            Action::Malformed { .. }
        ));
    }

    #[test]
    fn test_non_object_arguments_are_malformed() {
        match parse_action("ACTION: goto([1, 2])") {
            Action::Malformed { reason, .. } => assert!(reason.contains("an array")),
            other => panic!("expected malformed, got {other:?}"),
        }
        assert!(!parse_action("ACTION: goto()").is_tool_call());
    }
}
