//! Configuration text parser.
//!
//! Grammar, informally:
//!
//! ```text
//! file      := statement*
//! statement := name value? ';'
//!            | name value? '{' statement* '}' ';'
//! ```
//!
//! - `#` and `//` comment to end of line, `/* ... */` comments a block.
//! - Values run to the next `;` or `{`; an unquoted `}` inside a
//!   statement means its `;` is missing. Unquoted whitespace collapses to a
//!   single space and trailing whitespace is dropped. `"..."` keeps its
//!   contents verbatim and understands `\a \b \f \n \r \t \v`; any other
//!   escaped character stands for itself.
//! - A statement starting with `"` or `{` has an empty name, as does a lone
//!   word directly followed by `;` (the word becomes the value).
//! - `$INCLUDE path;` splices another file's top-level entries in place.
//! - Includes nest at most `MAX_INCLUDE_DEPTH` deep and sections at most
//!   `MAX_NESTING_DEPTH` deep, so hostile input ends in an error rather
//!   than exhausting the stack.
//!
//! A parse either produces a whole tree or an error; nothing partial is
//! handed back.

use crate::conf_tree::{ConfTree, ListId};
use crate::error::ConfError;
use std::path::{Path, PathBuf};

/// Include files may nest this deep.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Sections may nest this deep, counted across include files.
pub const MAX_NESTING_DEPTH: usize = 128;

const INCLUDE: &str = "$INCLUDE";

/// How deep the parser currently is, in include files and in open sections.
#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    includes: usize,
    sections: usize,
}

impl ConfTree {
    /// Parse in-memory text. `origin` names the source in error messages;
    /// relative includes resolve against the current directory.
    pub fn parse_str(origin: &str, text: &str) -> Result<Self, ConfError> {
        let mut tree = ConfTree::new();
        let root = tree.root();
        parse_into(&mut tree, root, origin, None, text, Depth::default())?;
        tracing::debug!(origin, entries = tree.len(), "parsed configuration");
        Ok(tree)
    }

    /// Read and parse a configuration file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfError> {
        let path = path.as_ref();
        let mut tree = ConfTree::new();
        let root = tree.root();
        include_file(&mut tree, root, path, Depth::default())?;
        tracing::debug!(path = %path.display(), entries = tree.len(), "read configuration");
        Ok(tree)
    }
}

fn include_file(tree: &mut ConfTree, list: ListId, path: &Path, depth: Depth) -> Result<(), ConfError> {
    if depth.includes > MAX_INCLUDE_DEPTH {
        return Err(ConfError::IncludeDepth {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let origin = path.display().to_string();
    parse_into(tree, list, &origin, path.parent(), &text, depth)
}

fn parse_into(
    tree: &mut ConfTree,
    list: ListId,
    origin: &str,
    base: Option<&Path>,
    text: &str,
    depth: Depth,
) -> Result<(), ConfError> {
    let src = strip_comments(origin, text)?;
    let mut p = Parser {
        src: &src,
        pos: 0,
        line: 1,
        origin,
        base,
        depth,
        tree,
    };
    p.parse_list(list, None)
}

/// Remove comments, keeping newlines so line numbers survive. Quoted text
/// is copied untouched; a backslash protects the following character.
fn strip_comments(origin: &str, text: &str) -> Result<Vec<u8>, ConfError> {
    let s = text.as_bytes();
    let mut out = Vec::with_capacity(s.len());
    let mut i = 0;
    let mut line = 1;
    let mut in_string = false;
    let mut in_comment = false;
    let mut began = 0;

    while i < s.len() {
        let c = s[i];
        if c == b'\n' {
            line += 1;
            out.push(c);
            i += 1;
            continue;
        }
        if in_comment {
            if c == b'*' && s.get(i + 1) == Some(&b'/') {
                in_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        match c {
            b'"' => {
                if !in_string {
                    began = line;
                }
                in_string = !in_string;
                out.push(c);
                i += 1;
            }
            b'\\' => {
                out.push(c);
                i += 1;
                if let Some(&n) = s.get(i) {
                    if n == b'\n' {
                        line += 1;
                    }
                    out.push(n);
                    i += 1;
                }
            }
            b'#' if !in_string => {
                while i < s.len() && s[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if !in_string && s.get(i + 1) == Some(&b'/') => {
                while i < s.len() && s[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if !in_string && s.get(i + 1) == Some(&b'*') => {
                in_comment = true;
                began = line;
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if in_string || in_comment {
        return Err(ConfError::syntax(
            origin,
            began,
            "unterminated string or comment beginning here",
        ));
    }
    Ok(out)
}

struct Parser<'a, 't> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    origin: &'a str,
    base: Option<&'a Path>,
    depth: Depth,
    tree: &'t mut ConfTree,
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) {
        if self.peek() == Some(b'\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn err(&self, line: usize, message: &str) -> ConfError {
        ConfError::syntax(self.origin, line, message)
    }

    /// Parse statements into `list` until end of input (top level) or the
    /// closing brace of the section opened on `opened` (nested).
    fn parse_list(&mut self, list: ListId, opened: Option<usize>) -> Result<(), ConfError> {
        loop {
            self.skip_ws();
            match (self.peek(), opened) {
                (None, None) => return Ok(()),
                (None, Some(line)) => return Err(self.err(line, "syntax error (unclosed braces)")),
                (Some(b'}'), Some(_)) => {
                    self.bump();
                    return Ok(());
                }
                (Some(b'}'), None) => return Err(self.err(self.line, "unexpected closing brace ('}')")),
                _ => self.statement(list)?,
            }
        }
    }

    fn statement(&mut self, list: ListId) -> Result<(), ConfError> {
        let start_line = self.line;
        let mut name = String::new();

        if !matches!(self.peek(), Some(b'"') | Some(b'{')) {
            let start = self.pos;
            while self
                .peek()
                .is_some_and(|c| !c.is_ascii_whitespace() && !matches!(c, b'{' | b'}' | b';'))
            {
                self.bump();
            }
            if self.peek().is_none() {
                return Err(self.err(start_line, "file terminated prematurely"));
            }
            let word_end = self.pos;
            self.skip_ws();
            if self.peek() == Some(b';') {
                // A lone word: nameless entry, reread the word as the value.
                self.pos = start;
                self.line = start_line;
            } else {
                name = String::from_utf8_lossy(&self.src[start..word_end]).into_owned();
            }
        }

        self.skip_ws();
        let raw_start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                b';' | b'{' => break,
                b'}' => return Err(self.err(self.line, "missing semicolon (';')")),
                b'"' => {
                    self.bump();
                    while let Some(q) = self.peek() {
                        self.bump();
                        if q == b'\\' {
                            self.bump();
                        } else if q == b'"' {
                            break;
                        }
                    }
                }
                _ => self.bump(),
            }
        }
        let Some(term) = self.peek() else {
            return Err(self.err(start_line, "syntax error"));
        };
        let value = expand_text(&self.src[raw_start..self.pos.min(self.src.len())]);
        let value = (!value.is_empty()).then_some(value);
        self.bump();

        if term == b';' {
            let (name, value) = match value {
                Some(v) => (name, v),
                None => (String::new(), name),
            };
            if name == INCLUDE {
                return self.include(list, &value, start_line);
            }
            self.tree.push_leaf(list, name, value);
            return Ok(());
        }

        if self.depth.sections >= MAX_NESTING_DEPTH {
            return Err(self.err(start_line, "sections nested too deeply"));
        }
        let (_, children) = self.tree.push_section(list, name, value);
        self.depth.sections += 1;
        self.parse_list(children, Some(start_line))?;
        self.depth.sections -= 1;

        self.skip_ws();
        match self.peek() {
            None => Err(self.err(self.line, "missing semicolon (';')")),
            Some(b';') => {
                self.bump();
                Ok(())
            }
            Some(_) => Err(self.err(
                self.line,
                "garbage between closing brace ('}') and semicolon (';')",
            )),
        }
    }

    fn include(&mut self, list: ListId, target: &str, line: usize) -> Result<(), ConfError> {
        let path = match self.base {
            Some(base) if Path::new(target).is_relative() => base.join(target),
            _ => PathBuf::from(target),
        };
        tracing::debug!(origin = self.origin, line, include = %path.display(), "including file");
        let depth = Depth {
            includes: self.depth.includes + 1,
            ..self.depth
        };
        include_file(self.tree, list, &path, depth)
    }
}

/// Collapse unquoted whitespace, strip quotes and expand escapes.
fn expand_text(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        if c == b'"' {
            i += 1;
            while i < raw.len() {
                match raw[i] {
                    b'\\' => {
                        i += 1;
                        let Some(&e) = raw.get(i) else {
                            out.push(b'\\');
                            break;
                        };
                        out.push(match e {
                            b'a' => 0x07,
                            b'b' => 0x08,
                            b'f' => 0x0c,
                            b'n' => b'\n',
                            b'r' => b'\r',
                            b't' => b'\t',
                            b'v' => 0x0b,
                            other => other,
                        });
                        i += 1;
                    }
                    b'"' => {
                        i += 1;
                        break;
                    }
                    other => {
                        out.push(other);
                        i += 1;
                    }
                }
            }
        } else if c.is_ascii_whitespace() {
            while i < raw.len() && raw[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < raw.len() {
                out.push(b' ');
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
