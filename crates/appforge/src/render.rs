use appforge_core::jobs::{JobKind, Notification};
use appforge_core::transcript::{Role, WorkspaceSnapshot};
use colored::Colorize;

/// Chat transcript view.
pub fn render_chat_view(snapshot: &WorkspaceSnapshot) -> String {
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!(
        "{} ({} {})\n",
        "CHAT".bright_cyan().bold(),
        "tokens left:".green(),
        snapshot.token_balance.to_string().bright_yellow()
    ));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    for message in &snapshot.messages {
        let author = match message.role {
            Role::User => "You".bright_white().bold(),
            Role::Ai => "AI".bright_magenta().bold(),
        };
        result.push_str(&format!("{}: {}\n", author, message.content));
    }

    if snapshot.chat_busy {
        result.push_str(&format!("{}\n", "Generating response...".bright_black()));
    }

    result
}

/// Code tree view. With `full`, every file body is printed below its path.
pub fn render_code_view(snapshot: &WorkspaceSnapshot, full: bool) -> String {
    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_magenta()));
    result.push_str(&format!(
        "{} ({} {})\n",
        "FILES".bright_magenta().bold(),
        snapshot.files.len().to_string().bright_cyan().bold(),
        "total".green()
    ));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_magenta()));

    for (path, content) in &snapshot.files {
        result.push_str(&format!(
            "{} {}\n",
            path.cyan(),
            format!("({} lines)", content.code.lines().count()).bright_black()
        ));
        if full {
            result.push_str(&format!("{}\n\n", content.code));
        }
    }

    if snapshot.code_busy {
        result.push_str(&format!("{}\n", "Generating your files...".bright_black()));
    }

    result
}

pub fn render_notification(notification: &Notification) -> String {
    let source = match notification.job {
        Some(JobKind::Chat) => "chat",
        Some(JobKind::Code) => "code",
        None => "workspace",
    };

    format!(
        "{} {}: {}",
        format!("[{}]", notification.kind).red().bold(),
        source.yellow(),
        notification.message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use appforge_core::files::default_skeleton;
    use appforge_core::transcript::Message;
    use appforge_core::GenerationError;

    fn snapshot() -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            workspace_id: Some("w1".to_string()),
            messages: vec![
                Message::user("add a button"),
                Message::ai("Sure, adding a button now"),
            ],
            files: default_skeleton(),
            token_balance: 95,
            chat_busy: false,
            code_busy: true,
        }
    }

    #[test]
    fn test_chat_view_lists_transcript() {
        let view = render_chat_view(&snapshot());

        assert!(view.contains("add a button"));
        assert!(view.contains("Sure, adding a button now"));
        assert!(view.contains("95"));
        assert!(!view.contains("Generating response..."));
    }

    #[test]
    fn test_code_view_paths_and_indicator() {
        let view = render_code_view(&snapshot(), false);

        assert!(view.contains("/App.css"));
        assert!(view.contains("/public/index.html"));
        assert!(view.contains("Generating your files..."));
        assert!(!view.contains("tailwindcss"));

        let full = render_code_view(&snapshot(), true);
        assert!(full.contains("tailwindcss"));
    }

    #[test]
    fn test_notification_line() {
        let notification = Notification::from_error(
            None,
            &GenerationError::InsufficientBudget {
                balance: 5,
                minimum: 10,
            },
        );

        let line = render_notification(&notification);
        assert!(line.contains("InsufficientBudget"));
        assert!(line.contains("workspace"));
        assert!(line.contains("You don't have enough token to generate code"));
    }
}
