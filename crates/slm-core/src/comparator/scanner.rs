//! Source blanking — hides Solidity comments and string literals
//!
//! Walks the text once, character by character, and replaces the contents of
//! `// ...`, `/* ... */`, `"..."` and `'...'` with spaces. Newlines are kept,
//! so byte offsets and line numbers in the output match the input and
//! extracted elements can be located in the original source.

/// Blank comments and string literals, preserving length and line structure
pub fn blank_comments_and_strings(source: &str) -> String {
    Scanner::new(source).run()
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

struct Scanner<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    out: String,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Scanner {
            input,
            chars: input.chars().peekable(),
            out: String::with_capacity(input.len()),
        }
    }

    fn run(mut self) -> String {
        while let Some(c) = self.chars.next() {
            match c {
                '/' if self.chars.peek() == Some(&'/') => {
                    self.blank(c);
                    self.skip_line_comment();
                }
                '/' if self.chars.peek() == Some(&'*') => {
                    self.blank(c);
                    self.skip_block_comment();
                }
                '"' | '\'' => {
                    // Quotes stay so `"..."` still reads as an expression.
                    self.out.push(c);
                    self.skip_string(c);
                }
                _ => self.out.push(c),
            }
        }
        debug_assert_eq!(self.out.len(), self.input.len());
        self.out
    }

    // ── Character helpers ──────────────────────────────────

    /// Same-width replacement: newlines survive, everything else turns into spaces
    fn blank(&mut self, c: char) {
        if c == '\n' {
            self.out.push('\n');
        } else {
            for _ in 0..c.len_utf8() {
                self.out.push(' ');
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                return;
            }
            self.chars.next();
            self.blank(c);
        }
    }

    fn skip_block_comment(&mut self) {
        // Consume the opening '*'
        if let Some(c) = self.chars.next() {
            self.blank(c);
        }
        let mut prev = '\0';
        while let Some(c) = self.chars.next() {
            self.blank(c);
            if prev == '*' && c == '/' {
                return;
            }
            prev = c;
        }
    }

    fn skip_string(&mut self, quote: char) {
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => {
                    self.blank(c);
                    if let Some(escaped) = self.chars.next() {
                        self.blank(escaped);
                    }
                }
                c if c == quote => {
                    self.out.push(c);
                    return;
                }
                // Unterminated literal ends at the line break
                '\n' => {
                    self.out.push('\n');
                    return;
                }
                _ => self.blank(c),
            }
        }
    }
}
