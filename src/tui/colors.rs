//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Status;

/// Used for the To Do column
pub const SLATE: Color = Color::Rgb(100, 116, 139);
/// Used for the In Progress column
pub const BLUE: Color = Color::Rgb(59, 130, 246);
/// Used for the Done column
pub const GREEN: Color = Color::Rgb(34, 197, 94);
/// Used for the AI assistant panel
pub const PURPLE: Color = Color::Rgb(147, 51, 234);
/// Used for error messages in the status bar
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);

/// Accent color of a status column.
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Todo => SLATE,
        Status::InProgress => BLUE,
        Status::Done => GREEN,
    }
}
