//! Parser for the Thought / Action / Action Input / Final Answer grammar.

use regex::Regex;
use std::sync::OnceLock;

const FINAL_ANSWER: &str = "Final Answer:";

/// What one model turn asks the loop to do.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    Action { tool: String, input: String },
    Finish { answer: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReactParseError {
    #[error("output contains both a final answer and a parse-able action")]
    ActionAndAnswer,
    #[error("invalid format: missing 'Action:' after 'Thought:'")]
    MissingAction,
    #[error("invalid format: missing 'Action Input:' after 'Action:'")]
    MissingActionInput,
}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
            .expect("action pattern is valid")
    })
}

fn action_only_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("action pattern is valid"))
}

fn clean_tool_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '*')
        .trim()
        .to_string()
}

fn clean_input(raw: &str) -> String {
    // Models sometimes keep going and invent their own observation.
    let raw = raw.split("\nObservation").next().unwrap_or(raw);
    raw.trim().trim_matches('"').to_string()
}

/// Parse one model turn.
pub fn parse(text: &str) -> Result<AgentStep, ReactParseError> {
    let includes_answer = text.contains(FINAL_ANSWER);

    if let Some(caps) = action_re().captures(text) {
        if includes_answer {
            return Err(ReactParseError::ActionAndAnswer);
        }
        let tool = clean_tool_name(caps.get(1).map_or("", |m| m.as_str()));
        let input = clean_input(caps.get(2).map_or("", |m| m.as_str()));
        if tool.is_empty() {
            return Err(ReactParseError::MissingAction);
        }
        return Ok(AgentStep::Action { tool, input });
    }

    if includes_answer {
        return Ok(AgentStep::Finish {
            answer: final_answer(text).unwrap_or_default(),
        });
    }

    if action_only_re().is_match(text) {
        Err(ReactParseError::MissingActionInput)
    } else {
        Err(ReactParseError::MissingAction)
    }
}

/// Text after the last `Final Answer:` marker, if any.
pub fn final_answer(text: &str) -> Option<String> {
    text.rfind(FINAL_ANSWER)
        .map(|idx| text[idx + FINAL_ANSWER.len()..].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let text = " The query is about flood-prone terrain.\nAction: get_flood_mask\nAction Input: Guwahati";
        assert_eq!(
            parse(text).unwrap(),
            AgentStep::Action {
                tool: "get_flood_mask".to_string(),
                input: "Guwahati".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_action_strips_decoration() {
        let text = "Action: `get_ndvi_mask`\nAction Input: \"green cover\"\nObservation: made up";
        assert_eq!(
            parse(text).unwrap(),
            AgentStep::Action {
                tool: "get_ndvi_mask".to_string(),
                input: "green cover".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_numbered_action() {
        let text = "Action 1: get_land_cover\nAction 1 Input: Bengaluru";
        match parse(text).unwrap() {
            AgentStep::Action { tool, .. } => assert_eq!(tool, "get_land_cover"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_final_answer() {
        let text = "I now know the final answer\nFinal Answer: Flood-prone terrain was mapped.";
        assert_eq!(
            parse(text).unwrap(),
            AgentStep::Finish {
                answer: "Flood-prone terrain was mapped.".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_action_and_answer() {
        let text = "Action: get_flood_mask\nAction Input: x\nFinal Answer: done";
        assert_eq!(parse(text), Err(ReactParseError::ActionAndAnswer));
    }

    #[test]
    fn test_parse_rejects_free_text() {
        assert_eq!(
            parse("Sure! Guwahati floods a lot."),
            Err(ReactParseError::MissingAction)
        );
        assert_eq!(
            parse("Action: get_flood_mask"),
            Err(ReactParseError::MissingActionInput)
        );
        assert_eq!(
            parse("Action:   \nAction Input: x"),
            Err(ReactParseError::MissingAction)
        );
    }

    #[test]
    fn test_final_answer_uses_last_marker() {
        assert_eq!(
            final_answer("Final Answer: a\nFinal Answer: b").as_deref(),
            Some("b")
        );
        assert_eq!(final_answer("nothing"), None);
    }
}
