use crate::strv::StrView;

/// Line prefixes printed by `cl /showIncludes`, per UI language.
pub const SHOW_INCLUDES_PREFIXES: [&str; 6] = [
    "Note: including file: ",              // English
    "Remarque : inclusion du fichier :  ", // French
    "Hinweis: Einlesen der Datei: ",       // German
    "Nota: file incluso  ",                // Italian
    "注意: 包含文件:  ",                   // Chinese
    "メモ: インクルード ファイル:  ",      // Japanese
];

/// Headers under these directories belong to the toolchain and are never
/// tracked.
pub const SYSTEM_PATH_FRAGMENTS: [&str; 2] = [r"\Microsoft Visual Studio\", r"\Windows Kits\"];

/// Parser for the captured stdout of `cl /showIncludes`.
///
/// The first line (the echoed source file name) is skipped. Each following
/// line that starts with a known prefix yields the path after it, with
/// leading spaces removed and the line ending stripped. Other lines are
/// compiler diagnostics and are ignored.
#[derive(Debug, Clone)]
pub struct MsvcDepParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> MsvcDepParser<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut parser = Self { text, pos: 0 };
        parser.skip_target();
        parser
    }

    pub fn reset(&mut self, text: &'a str) {
        self.text = text;
        self.pos = 0;
        self.skip_target();
    }

    fn skip_target(&mut self) {
        self.pos = self
            .text
            .find(['\r', '\n'])
            .unwrap_or(self.text.len());
    }

    /// Path announced by `line`, if it is a show-includes line.
    pub fn include_path(line: &str) -> Option<&str> {
        let rest = SHOW_INCLUDES_PREFIXES
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))?;
        let path = rest.trim_start_matches(' ');
        (!path.is_empty()).then_some(path)
    }

    pub fn is_system_path(path: &str) -> bool {
        let view = StrView::from(path);
        SYSTEM_PATH_FRAGMENTS
            .iter()
            .any(|fragment| view.contains(fragment))
    }
}

impl<'a> Iterator for MsvcDepParser<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let line_start = rest.trim_start_matches(['\r', '\n']);
            self.pos += rest.len() - line_start.len();

            let line_len = line_start.find(['\r', '\n']).unwrap_or(line_start.len());
            let line = &line_start[..line_len];
            self.pos += line_len;

            if let Some(path) = Self::include_path(line)
                && !Self::is_system_path(path)
            {
                return Some(path);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<&str> {
        MsvcDepParser::new(text).collect()
    }

    #[test]
    fn test_nothing_to_parse() {
        assert!(parse("").is_empty());
        assert!(parse("foo.c\r\n").is_empty());
        assert!(parse("foo.c").is_empty());
    }

    #[test]
    fn test_first_line_is_skipped() {
        assert!(parse("Note: including file: foo.h\r\n").is_empty());
    }

    #[test]
    fn test_single_and_multiple() {
        assert_eq!(parse("foo.c\r\nNote: including file: foo.h\r\n"), vec!["foo.h"]);
        assert_eq!(
            parse("foo.c\nNote: including file:  foo.h\nNote: including file:   bar.h"),
            vec!["foo.h", "bar.h"]
        );
    }

    #[test]
    fn test_paths_with_spaces() {
        let text = "foo.c\r\nNote: including file: my/p a t h/foo.h\r\nNote: including file: my/p a t h/bar.h\r\n";
        assert_eq!(parse(text), vec!["my/p a t h/foo.h", "my/p a t h/bar.h"]);
    }

    #[test]
    fn test_system_headers_are_skipped() {
        let text = "main.c\r\n\
            Note: including file:   foo.h\r\n\
            Note: including file: C:\\Program Files\\Microsoft Visual Studio\\VC\\include\\stdio.h\r\n\
            Note: including file: C:\\Program Files (x86)\\Windows Kits\\10\\Include\\ucrt\\corecrt.h\r\n";
        assert_eq!(parse(text), vec!["foo.h"]);
    }

    #[test]
    fn test_localized_prefixes() {
        let text = "main.c\n\
            Remarque : inclusion du fichier :  fr.h\n\
            Hinweis: Einlesen der Datei: de.h\n\
            Nota: file incluso  it.h\n\
            注意: 包含文件:  zh.h\n\
            メモ: インクルード ファイル:  ja.h\n";
        assert_eq!(parse(text), vec!["fr.h", "de.h", "it.h", "zh.h", "ja.h"]);
    }

    #[test]
    fn test_diagnostics_are_ignored() {
        let text = "main.c\r\nmain.c(3): warning C4996: 'fopen'\r\nNote: including file: a.h\r\n";
        assert_eq!(parse(text), vec!["a.h"]);
    }

    #[test]
    fn test_reset() {
        let mut parser = MsvcDepParser::new("x.c\nNote: including file: a.h\n");
        assert_eq!(parser.next(), Some("a.h"));
        assert_eq!(parser.next(), None);
        parser.reset("y.c\nNote: including file: b.h\n");
        assert_eq!(parser.next(), Some("b.h"));
    }
}
