use ratatui::prelude::Color;

use crate::board::Status;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a connectivity status
pub fn status_color(status: Status) -> Color {
  match status {
    Status::Ready => Color::Green,
    Status::Updating => Color::Yellow,
    Status::Offline => Color::Red,
    Status::Idle => Color::DarkGray,
  }
}
