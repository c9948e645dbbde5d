//! Input field handling for the terminal user interface.

/// A single-line text input with a cursor. The cursor counts characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
    pub active: bool,
}

impl InputField {
    /// Create a new empty input field.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
            active: false,
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Text with a block cursor drawn in, for rendering the focused field.
    pub fn display_with_cursor(&self) -> String {
        let mut out = String::with_capacity(self.value.len() + 3);
        for (i, ch) in self.value.chars().enumerate() {
            if i == self.cursor && self.active {
                out.push('▏');
            }
            out.push(ch);
        }
        if self.active && self.cursor >= self.value.chars().count() {
            out.push('▏');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editing_multibyte_text() {
        let mut field = InputField::with_value("café");
        assert_eq!(field.cursor, 4);
        field.handle_backspace();
        assert_eq!(field.value, "caf");
        field.move_cursor_left();
        field.handle_char('ñ');
        assert_eq!(field.value, "cañf");
        assert_eq!(field.cursor, 3);
    }

    #[test]
    fn test_delete_and_bounds() {
        let mut field = InputField::with_value("ab");
        field.move_cursor_right();
        assert_eq!(field.cursor, 2);
        field.handle_delete();
        assert_eq!(field.value, "ab");
        field.move_cursor_left();
        field.move_cursor_left();
        field.move_cursor_left();
        assert_eq!(field.cursor, 0);
        field.handle_delete();
        assert_eq!(field.value, "b");
        field.clear();
        assert!(field.value.is_empty());
        assert_eq!(field.cursor, 0);
    }
}
