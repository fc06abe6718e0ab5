use nadia_core::HistoryTurn;

/// How many of the most recent turns get folded into the context summary
/// handed to C4. The persona prompt already carries the full stable prefix;
/// this is only enough to keep LLM-1 aware of what was just said.
const SUMMARY_TURN_WINDOW: usize = 6;

/// Collapses recent conversation history into a single text block suitable
/// for the "Conversation context: <summary>" system line. Returns `None`
/// when there is no history yet, so the caller omits the line entirely.
pub fn summarize(turns: &[HistoryTurn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    let start = turns.len().saturating_sub(SUMMARY_TURN_WINDOW);
    let lines: Vec<String> = turns[start..]
        .iter()
        .map(|t| format!("{:?}: {}", t.role, t.content))
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nadia_core::Role;

    fn turn(role: Role, content: &str) -> HistoryTurn {
        HistoryTurn { role, content: content.to_string(), timestamp: Utc::now() }
    }

    #[test]
    fn empty_history_yields_no_summary() {
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn keeps_only_the_most_recent_window() {
        let turns: Vec<HistoryTurn> =
            (0..10).map(|i| turn(Role::User, &format!("turn {i}"))).collect();
        let summary = summarize(&turns).unwrap();
        assert!(!summary.contains("turn 0"));
        assert!(summary.contains("turn 9"));
    }
}
