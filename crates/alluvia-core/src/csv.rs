//! Minimal RFC 4180-style reader for flow tables.
//!
//! Fields may be quoted; `""` inside a quoted field is a literal quote and quoted fields may
//! contain commas and newlines. Blank lines and lines starting with `#` are skipped.

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Treat the first record as a header and drop it.
    pub has_header: bool,
    /// Interpret the last field of each record as the row weight.
    pub weight_column: bool,
}

pub(crate) fn parse_records(input: &str) -> Result<Vec<Vec<String>>> {
    let mut p = CsvParser::new(input);
    let mut records = Vec::new();
    loop {
        p.skip_blank_and_comment_lines();
        if p.eof() {
            break;
        }
        let mut record = vec![p.parse_field()?];
        while p.try_consume_char(',') {
            record.push(p.parse_field()?);
        }

        // End of record: \n, \r\n or EOF.
        if !p.try_consume_newline() && !p.eof() {
            return Err(p.error("expected end of record"));
        }
        records.push(record);
    }
    Ok(records)
}

struct CsvParser<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> CsvParser<'a> {
    fn new(input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::CsvParse {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn try_consume_char(&mut self, ch: char) -> bool {
        if self.rest().starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_blank_and_comment_lines(&mut self) {
        loop {
            let rest = self.rest();
            let line_end = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
            let line = &rest[..line_end];
            let trimmed = line.trim();
            if line.is_empty() || !(trimmed.is_empty() || trimmed.starts_with('#')) {
                return;
            }
            self.pos += line_end;
            if line.ends_with('\n') {
                self.line += 1;
            }
        }
    }

    fn try_consume_newline(&mut self) -> bool {
        match self.peek_char() {
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                true
            }
            Some('\r') => {
                self.pos += 1;
                if self.peek_char() == Some('\n') {
                    self.pos += 1;
                }
                self.line += 1;
                true
            }
            _ => false,
        }
    }

    fn parse_field(&mut self) -> Result<String> {
        let leading = self.rest().len() - self.rest().trim_start_matches([' ', '\t']).len();
        if self.rest()[leading..].starts_with('"') {
            self.pos += leading;
            let field = self.parse_quoted_field()?;
            // Tolerate whitespace between the closing quote and the delimiter.
            let trailing = self.rest().len() - self.rest().trim_start_matches([' ', '\t']).len();
            self.pos += trailing;
            return Ok(field);
        }
        Ok(self.parse_unquoted_field())
    }

    fn parse_unquoted_field(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            if ch == ',' || ch == '\n' || ch == '\r' {
                break;
            }
            out.push(ch);
            self.pos += ch.len_utf8();
        }
        out.trim().to_string()
    }

    fn parse_quoted_field(&mut self) -> Result<String> {
        let start_line = self.line;
        self.pos += 1;
        let mut out = String::new();
        while let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
            if ch == '"' {
                if self.peek_char() == Some('"') {
                    // Escaped quote
                    self.pos += 1;
                    out.push('"');
                    continue;
                }
                return Ok(out);
            }
            if ch == '\n' {
                self.line += 1;
            }
            out.push(ch);
        }
        Err(Error::CsvParse {
            line: start_line,
            message: "unterminated quoted field".to_string(),
        })
    }
}
