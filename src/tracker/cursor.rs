//! Forward-only cursor over the lines of a formatted procedure body.

/// Position-owning cursor shared between the main scan loop and the
/// continuation collector.
///
/// Whoever holds `&mut LineCursor` may advance it; the main loop must always
/// re-read the position instead of assuming it is the only consumer.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    /// Split `text` on `\n` and position the cursor before the first line.
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            pos: 0,
        }
    }

    /// Check if every line has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Index of the next line to be returned.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total number of lines.
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look at the next line without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// Skip the next line.
    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Consume and return the next line.
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.pos += 1;
        Some(line)
    }
}
