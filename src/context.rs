//! Prompt assembly for agent requests
//!
//! Pure, deterministic functions: identical inputs always produce
//! byte-identical payloads. The ledger is embedded verbatim; no truncation
//! or summarization happens on the client side.

use crate::models::GoalSet;

/// Build the primary-audit request: the full ledger framed by an analysis
/// instruction, with the goal enumeration appended when any goals exist.
pub fn audit_request(ledger_content: &str, goals: &GoalSet) -> String {
    let mut message = format!("Analyze this CSV data:\n{}", ledger_content);
    if !goals.is_empty() {
        message.push_str(&format!("\n\nUser's financial goals: {}", goals.joined()));
    }
    message
}

/// Build a chat request: with a loaded ledger the user text is framed by the
/// transaction history; without one it passes through unchanged.
pub fn chat_request(user_text: &str, ledger_content: Option<&str>) -> String {
    match ledger_content {
        Some(content) => format!(
            "Based on my transaction history:\n{}\n\nQuery: {}",
            content, user_text
        ),
        None => user_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_request_without_goals() {
        let goals = GoalSet::new();
        let message = audit_request("date,amount\n2024-01-01,100", &goals);
        assert_eq!(message, "Analyze this CSV data:\ndate,amount\n2024-01-01,100");
    }

    #[test]
    fn test_audit_request_appends_goals_in_order() {
        let mut goals = GoalSet::new();
        goals.add("Save ₹50,000 for vacation");
        goals.add("Reduce dining out");

        let message = audit_request("a,b", &goals);
        assert_eq!(
            message,
            "Analyze this CSV data:\na,b\n\nUser's financial goals: Save ₹50,000 for vacation, Reduce dining out"
        );
    }

    #[test]
    fn test_chat_request_without_ledger_is_unchanged() {
        let message = chat_request("What's my 3-month spending projection?", None);
        assert_eq!(message, "What's my 3-month spending projection?");
    }

    #[test]
    fn test_chat_request_embeds_ledger_verbatim() {
        let csv = "date,amount\n2024-01-01,100\n2024-01-02,250";
        let message = chat_request("Why did my bill spike?", Some(csv));
        assert_eq!(
            message,
            format!(
                "Based on my transaction history:\n{}\n\nQuery: Why did my bill spike?",
                csv
            )
        );
    }

    #[test]
    fn test_determinism_over_varied_inputs() {
        // Purity check: repeated calls with the same inputs are byte-identical,
        // across content with delimiters, unicode, and embedded newlines.
        let ledgers = [
            "",
            "a,b,c",
            "₹1,000\n₹2,000",
            "line1\nline2\nline3",
            "quote\"inside,field",
        ];
        let texts = ["", "hello", "multi\nline query", "🙂 unicode"];

        for ledger in &ledgers {
            let mut goals = GoalSet::new();
            goals.add(ledger);
            for text in &texts {
                assert_eq!(
                    chat_request(text, Some(ledger)),
                    chat_request(text, Some(ledger))
                );
                assert_eq!(audit_request(ledger, &goals), audit_request(ledger, &goals));
            }
        }
    }
}
