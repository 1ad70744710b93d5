//! Post-success state planning
//!
//! Given the current session values and a successful generation result, compute
//! everything that changes in one go. The shell swaps the plan in as a single
//! step, so no half-applied state is ever observable.

use crate::error::GenerationError;
use crate::files::{merge, FileTree};
use crate::ledger::{cost, debit};
use crate::transcript::Message;

/// State after a chat reply is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommit {
    /// Full transcript including the new assistant message.
    pub messages: Vec<Message>,
    pub cost: i64,
    pub balance: i64,
}

/// State after a code overlay is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCommit {
    /// New rendered tree (previous tree with the overlay on top).
    pub files: FileTree,
    /// The overlay exactly as generated; this is what gets persisted.
    pub overlay: FileTree,
    pub cost: i64,
    pub balance: i64,
}

pub fn plan_chat_commit(messages: &[Message], balance: i64, reply: String) -> ChatCommit {
    let cost = cost(&reply);
    let mut messages = messages.to_vec();
    messages.push(Message::ai(reply));

    ChatCommit {
        messages,
        cost,
        balance: debit(balance, cost),
    }
}

/// Plan the commit of a generated overlay. Its cost is the word count of the
/// overlay serialized as JSON.
pub fn plan_code_commit(
    current: &FileTree,
    balance: i64,
    overlay: FileTree,
) -> Result<CodeCommit, GenerationError> {
    let serialized = serde_json::to_string(&overlay)
        .map_err(|e| GenerationError::SchemaError(format!("Failed to serialize overlay: {e}")))?;
    let cost = cost(&serialized);

    Ok(CodeCommit {
        files: merge(current, &overlay),
        overlay,
        cost,
        balance: debit(balance, cost),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{default_skeleton, FileContent};
    use crate::transcript::Role;

    #[test]
    fn test_plan_chat_commit() {
        let messages = vec![Message::user("add a button")];
        let plan = plan_chat_commit(&messages, 100, "Sure, adding a button now".to_string());

        assert_eq!(plan.cost, 5);
        assert_eq!(plan.balance, 95);
        assert_eq!(plan.messages.len(), 2);
        assert_eq!(plan.messages[1].role, Role::Ai);
        assert_eq!(plan.messages[1].content, "Sure, adding a button now");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_plan_code_commit_merges_and_keeps_overlay() {
        let skeleton = default_skeleton();
        let mut overlay = FileTree::new();
        overlay.insert(
            "/App.js".to_string(),
            FileContent::new("export default function App() { return <button>Hi</button>; }"),
        );

        let plan = plan_code_commit(&skeleton, 100, overlay.clone()).unwrap();

        assert_eq!(plan.overlay, overlay);
        assert_eq!(plan.files["/App.js"], overlay["/App.js"]);
        for path in skeleton.keys() {
            assert!(plan.files.contains_key(path));
        }
        assert!(plan.cost > 0);
        assert_eq!(plan.balance, 100 - plan.cost);
    }

    #[test]
    fn test_plan_code_commit_cost_is_serialized_overlay_words() {
        let mut overlay = FileTree::new();
        overlay.insert("/a.js".to_string(), FileContent::new("one two three"));

        // {"/a.js":{"code":"one two three"}} splits into three words
        let plan = plan_code_commit(&FileTree::new(), 10, overlay).unwrap();
        assert_eq!(plan.cost, 3);
        assert_eq!(plan.balance, 7);
    }

    #[test]
    fn test_plan_code_commit_may_overshoot() {
        let mut overlay = FileTree::new();
        overlay.insert("/a.js".to_string(), FileContent::new("a b c d e f g h i j k l"));

        let plan = plan_code_commit(&FileTree::new(), 10, overlay).unwrap();
        assert_eq!(plan.balance, -2);
    }
}
