use std::io::Read;

use tracing::error;

/// Size of the refill buffer.
pub const READ_BUFFER_SIZE: usize = 4096;

/// Streaming parser for Makefile rules produced by `gcc -MMD`.
///
/// ```text
/// path/to/target.o : path/to/mytarget.h \
///                    path/to/my\ second\ target.h
/// ```
///
/// Creating (or [`reset`](GccDepParser::reset)ting) the parser skips
/// everything up to the first `:`. Iterating then yields each prerequisite
/// once, in file order. Escapes:
///
/// - `\ ` is a literal space inside the path.
/// - `\` + newline directly followed by a path character joins the two
///   lines into one token; followed by indentation it is an ordinary
///   separator.
/// - `\` before anything else is a literal backslash.
pub struct GccDepParser<R> {
    reader: R,
    buffer: Box<[u8]>,
    pos: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> GccDepParser<R> {
    pub fn new(reader: R) -> Self {
        let mut parser = Self {
            reader,
            buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            end: 0,
            eof: false,
        };
        parser.skip_target();
        parser
    }

    /// Rebinds the parser to `reader`, reusing its buffer.
    pub fn reset(&mut self, reader: R) {
        self.reader = reader;
        self.pos = 0;
        self.end = 0;
        self.eof = false;
        self.skip_target();
    }

    fn skip_target(&mut self) {
        while let Some(c) = self.next_byte() {
            if c == b':' {
                break;
            }
        }
    }

    fn fill(&mut self) -> bool {
        if self.pos < self.end {
            return true;
        }
        if self.eof {
            return false;
        }
        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.eof = true;
                    return false;
                }
                Ok(n) => {
                    self.pos = 0;
                    self.end = n;
                    return true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("failed to read dependency file: {e}");
                    self.eof = true;
                    return false;
                }
            }
        }
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.fill() {
            Some(self.buffer[self.pos])
        } else {
            None
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let c = self.peek_byte()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_byte()
            && c.is_ascii_whitespace()
        {
            self.pos += 1;
        }
    }

    fn next_dependency(&mut self) -> Option<String> {
        let mut token: Vec<u8> = Vec::new();

        self.skip_whitespace();

        while let Some(c) = self.next_byte() {
            if c.is_ascii_whitespace() {
                break;
            }
            if c != b'\\' {
                token.push(c);
                continue;
            }
            match self.peek_byte() {
                Some(b' ') => {
                    self.pos += 1;
                    token.push(b' ');
                }
                Some(b'\r' | b'\n') => {
                    while let Some(b'\r' | b'\n') = self.peek_byte() {
                        self.pos += 1;
                    }
                    let joined = matches!(self.peek_byte(), Some(n) if !n.is_ascii_whitespace());
                    if !joined {
                        if !token.is_empty() {
                            break;
                        }
                        // Continuation before the first path of a line.
                        self.skip_whitespace();
                    }
                }
                _ => token.push(b'\\'),
            }
        }

        if token.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&token).into_owned())
        }
    }
}

impl<R: Read> Iterator for GccDepParser<R> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_dependency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<String> {
        GccDepParser::new(input.as_bytes()).collect()
    }

    #[test]
    fn test_nothing_to_parse() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\t \r\n").is_empty());
        assert!(parse("target.o foo.h").is_empty());
        assert!(parse("target.o:").is_empty());
        assert!(parse("target.o:   \n").is_empty());
    }

    #[test]
    fn test_two_dependencies() {
        assert_eq!(parse("target.o: a.h b.h"), vec!["a.h", "b.h"]);
    }

    #[test]
    fn test_single_dependency_with_whitespace() {
        assert_eq!(parse("target.o :   foo.h   \r\n"), vec!["foo.h"]);
    }

    #[test]
    fn test_continuation_with_indentation_separates() {
        assert_eq!(parse("t.o: a.h\\\n   b.h"), vec!["a.h", "b.h"]);
    }

    #[test]
    fn test_continuation_without_indentation_joins() {
        assert_eq!(parse("a: b\\\nc"), vec!["bc"]);
        assert_eq!(parse("a: b\\\r\nc"), vec!["bc"]);
    }

    #[test]
    fn test_escaped_spaces() {
        assert_eq!(parse("a:\\ b \\ c"), vec![" b", " c"]);
        assert_eq!(
            parse("t.o: my\\ second\\ target.h"),
            vec!["my second target.h"]
        );
    }

    #[test]
    fn test_lone_backslash_is_literal() {
        assert_eq!(parse(r"t.o: C:\src\foo.h"), vec![r"C:\src\foo.h"]);
        assert_eq!(parse("t.o: foo\\"), vec!["foo\\"]);
    }

    #[test]
    fn test_real_example() {
        let input = "foo.o: /path/src/foo.c /path/src/foo.h \\\r\n /path/src/common.h\r\n";
        assert_eq!(
            parse(input),
            vec!["/path/src/foo.c", "/path/src/foo.h", "/path/src/common.h"]
        );
        assert_eq!(parse(&input.replace("\r\n", "\n")).len(), 3);
    }

    #[test]
    fn test_refill_across_buffer_boundary() {
        let long = "x".repeat(READ_BUFFER_SIZE + 17);
        let input = format!("t.o: {long} short.h");
        let deps = parse(&input);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].len(), READ_BUFFER_SIZE + 17);
        assert_eq!(deps[1], "short.h");
    }

    #[test]
    fn test_reset_restarts() {
        let mut parser = GccDepParser::new("a.o: one.h".as_bytes());
        assert_eq!(parser.next().as_deref(), Some("one.h"));
        assert_eq!(parser.next(), None);
        parser.reset("b.o: two.h".as_bytes());
        assert_eq!(parser.next().as_deref(), Some("two.h"));
    }
}
