use unicode_width::UnicodeWidthStr;

/// Editable text with a cursor, indexed in chars so multi-byte input is safe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    content: String,
    cursor: usize,
    multiline: bool,
}

impl TextInput {
    pub fn single_line() -> Self {
        TextInput::default()
    }

    pub fn multi_line() -> Self {
        TextInput {
            multiline: true,
            ..TextInput::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Replaces the content and parks the cursor at the end.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.content = value.into();
        if !self.multiline {
            self.content = self.content.replace('\n', " ");
        }
        self.cursor = self.char_count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        if c == '\n' && !self.multiline {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    pub fn newline(&mut self) {
        self.insert('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.content.remove(at);
            self.cursor -= 1;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = self.line_start(self.cursor);
    }

    pub fn move_end(&mut self) {
        let chars: Vec<char> = self.content.chars().collect();
        let mut end = self.cursor;
        while end < chars.len() && chars[end] != '\n' {
            end += 1;
        }
        self.cursor = end;
    }

    pub fn move_up(&mut self) {
        let current_start = self.line_start(self.cursor);
        if current_start == 0 {
            return;
        }
        let column = self.cursor - current_start;
        let prev_start = self.line_start(current_start - 1);
        let prev_len = current_start - 1 - prev_start;
        self.cursor = prev_start + column.min(prev_len);
    }

    pub fn move_down(&mut self) {
        let chars: Vec<char> = self.content.chars().collect();
        let current_start = self.line_start(self.cursor);
        let column = self.cursor - current_start;
        let Some(offset) = chars[self.cursor..].iter().position(|c| *c == '\n') else {
            return;
        };
        let next_start = self.cursor + offset + 1;
        let next_len = chars[next_start..]
            .iter()
            .position(|c| *c == '\n')
            .unwrap_or(chars.len() - next_start);
        self.cursor = next_start + column.min(next_len);
    }

    /// Content with a bar drawn at the cursor, as shown in the focused field.
    pub fn with_cursor_marker(&self) -> String {
        let mut shown = self.content.clone();
        shown.insert(self.byte_index(self.cursor), '|');
        shown
    }

    /// Terminal columns occupied by the line holding the cursor, up to it.
    pub fn cursor_column_width(&self) -> usize {
        let start = self.byte_index(self.line_start(self.cursor));
        let end = self.byte_index(self.cursor);
        self.content[start..end].width()
    }

    fn line_start(&self, position: usize) -> usize {
        self.content
            .chars()
            .take(position)
            .collect::<Vec<_>>()
            .iter()
            .rposition(|c| *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }
}
