//! Lexical classification of raw source text
//!
//! Splits text into code, string literal and comment regions without any
//! grammar knowledge. The textual passes use it to keep their edits out of
//! string literals and to find line boundaries where inserting a line is
//! harmless.

/// Comment and string conventions of a language family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `#` comments, `'`/`"` strings with triple-quoted variants
    Python,
    /// `//` and `/* */` comments, `'`/`"` literals
    CLike,
    /// C-like plus backtick template literals with `${...}` interpolation
    JavaScript,
    /// C-like plus backtick raw strings
    Go,
}

impl Dialect {
    pub fn comment_marker(&self) -> &'static str {
        match self {
            Self::Python => "#",
            Self::CLike | Self::JavaScript | Self::Go => "//",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    Literal,
    Comment,
}

/// Region of every byte of `text`.
///
/// All delimiters are ASCII, so region boundaries always fall on UTF-8
/// character boundaries.
pub fn classify(text: &str, dialect: Dialect) -> Vec<Region> {
    let mut scanner = Scanner {
        bytes: text.as_bytes(),
        pos: 0,
        dialect,
        regions: vec![Region::Code; text.len()],
    };
    scanner.scan_code(false);
    scanner.regions
}

struct Scanner<'t> {
    bytes: &'t [u8],
    pos: usize,
    dialect: Dialect,
    regions: Vec<Region>,
}

impl Scanner<'_> {
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn mark(&mut self, start: usize, end: usize, region: Region) {
        let end = end.min(self.bytes.len());
        for r in &mut self.regions[start..end] {
            *r = region;
        }
    }

    /// Scan code until end of input, or until the `}` closing an
    /// interpolation when `nested`.
    fn scan_code(&mut self, nested: bool) {
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                b'#' if self.dialect == Dialect::Python => self.scan_line_comment(),
                b'/' if self.dialect != Dialect::Python && self.peek(1) == Some(b'/') => {
                    self.scan_line_comment()
                }
                b'/' if self.dialect != Dialect::Python && self.peek(1) == Some(b'*') => {
                    self.scan_block_comment()
                }
                b'\'' | b'"' => self.scan_quoted(c),
                b'`' if matches!(self.dialect, Dialect::JavaScript | Dialect::Go) => {
                    self.scan_backtick()
                }
                b'{' if nested => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' if nested => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_line_comment(&mut self) {
        let start = self.pos;
        let end = self.bytes[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |p| start + p);
        self.mark(start, end, Region::Comment);
        self.pos = end;
    }

    fn scan_block_comment(&mut self) {
        let start = self.pos;
        let end = self.bytes[start + 2..]
            .windows(2)
            .position(|w| w == b"*/")
            .map_or(self.bytes.len(), |p| start + 2 + p + 2);
        self.mark(start, end, Region::Comment);
        self.pos = end;
    }

    fn scan_quoted(&mut self, quote: u8) {
        let start = self.pos;
        let triple = self.dialect == Dialect::Python
            && self.peek(1) == Some(quote)
            && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        while let Some(c) = self.peek(0) {
            if c == b'\\' {
                self.pos += 2;
                continue;
            }
            if triple {
                if c == quote && self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.pos += 3;
                    break;
                }
            } else if c == quote {
                self.pos += 1;
                break;
            } else if c == b'\n' {
                // unterminated single-line literal
                break;
            }
            self.pos += 1;
        }
        self.pos = self.pos.min(self.bytes.len());
        self.mark(start, self.pos, Region::Literal);
    }

    fn scan_backtick(&mut self) {
        let mut start = self.pos;
        self.pos += 1;
        let interpolates = self.dialect == Dialect::JavaScript;

        while let Some(c) = self.peek(0) {
            match c {
                b'\\' if interpolates => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    self.mark(start, self.pos, Region::Literal);
                    return;
                }
                b'$' if interpolates && self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.mark(start, self.pos, Region::Literal);
                    self.scan_code(true);
                    start = self.pos;
                    if self.pos < self.bytes.len() {
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.mark(start, self.pos, Region::Literal);
    }
}

/// Facts about one line that decide whether an edit there is safe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineShape {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset of the terminating `\n` (or end of text)
    pub end: usize,
    /// The line begins inside a literal or comment opened on an earlier line
    pub starts_inside: bool,
    /// A literal or comment is still open at the end of the line
    pub ends_inside: bool,
    /// Bracket nesting at the start of the line
    pub depth_before: usize,
    /// Bracket nesting after the line
    pub depth_after: usize,
    /// Code contains a bare `=` (not `==`, `!=`, `<=`, `>=`)
    pub has_assignment: bool,
    /// Last non-blank code byte
    pub code_tail: Option<u8>,
    /// Ends with a backslash line continuation
    pub continues: bool,
}

impl LineShape {
    /// Outside any bracket, literal or continuation at both ends
    pub fn is_complete_statement(&self) -> bool {
        self.depth_before == 0
            && self.depth_after == 0
            && !self.starts_inside
            && !self.ends_inside
            && !self.continues
    }
}

/// Shape of each `\n`-separated line of `text`, given its regions.
pub fn line_shapes(text: &str, regions: &[Region]) -> Vec<LineShape> {
    let bytes = text.as_bytes();
    let mut shapes = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    loop {
        let end = bytes[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| start + p);

        let starts_inside = start > 0 && regions[start - 1] != Region::Code;
        let ends_inside = end < bytes.len() && regions[end] != Region::Code;
        let depth_before = depth;
        let mut has_assignment = false;
        let mut code_tail = None;

        for i in start..end {
            if regions[i] != Region::Code {
                continue;
            }
            let b = bytes[i];
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                b'=' => {
                    let prev = if i > start { bytes[i - 1] } else { b' ' };
                    let next = bytes.get(i + 1).copied().unwrap_or(b' ');
                    if !matches!(prev, b'=' | b'!' | b'<' | b'>') && next != b'=' {
                        has_assignment = true;
                    }
                }
                _ => {}
            }
            if !b.is_ascii_whitespace() {
                code_tail = Some(b);
            }
        }

        let continues = text[start..end].trim_end_matches('\r').ends_with('\\');

        shapes.push(LineShape {
            start,
            end,
            starts_inside,
            ends_inside,
            depth_before,
            depth_after: depth,
            has_assignment,
            code_tail,
            continues,
        });

        if end >= bytes.len() {
            break;
        }
        start = end + 1;
    }
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions_of(text: &str, dialect: Dialect) -> String {
        classify(text, dialect)
            .iter()
            .map(|r| match r {
                Region::Code => 'c',
                Region::Literal => 'l',
                Region::Comment => '#',
            })
            .collect()
    }

    #[test]
    fn test_python_regions() {
        assert_eq!(regions_of("x = 'a#b'  # c", Dialect::Python), "cccclllllcc###");
        assert_eq!(regions_of(r#"s = "a\"b""#, Dialect::Python), "cccclllllll");
        assert_eq!(regions_of("'''a\nb'''", Dialect::Python), "lllllllll");
    }

    #[test]
    fn test_c_like_regions() {
        assert_eq!(regions_of("a /* b */ c // d", Dialect::CLike), "cc#######ccc####");
        assert_eq!(regions_of("c = '/';", Dialect::CLike), "cccclllc");
    }

    #[test]
    fn test_javascript_template_interpolation() {
        let text = "`a${x}b`";
        assert_eq!(regions_of(text, Dialect::JavaScript), "llllclll");
        // Go raw strings have no interpolation
        assert_eq!(regions_of(text, Dialect::Go), "llllllll");
    }

    #[test]
    fn test_line_shapes() {
        let text = "x = 1\nfoo(a,\n    b=2)\ns = \"\"\"\ntext\n\"\"\"\nif x == 1:\n    y = 2 \\\n        + 3\n";
        let regions = classify(text, Dialect::Python);
        let shapes = line_shapes(text, &regions);

        assert!(shapes[0].has_assignment && shapes[0].is_complete_statement());
        assert_eq!(shapes[1].depth_after, 1);
        assert!(!shapes[1].is_complete_statement());
        assert_eq!(shapes[2].depth_before, 1);
        assert!(shapes[2].has_assignment && !shapes[2].is_complete_statement());
        assert!(shapes[3].ends_inside);
        assert!(shapes[4].starts_inside && shapes[4].ends_inside);
        assert!(shapes[5].starts_inside && !shapes[5].ends_inside);
        assert!(!shapes[6].has_assignment);
        assert_eq!(shapes[6].code_tail, Some(b':'));
        assert!(shapes[7].continues);
        // trailing empty line after the final newline
        assert_eq!(shapes.len(), 10);
        assert_eq!(shapes[9].start, text.len());
    }
}
