//! Character-level reader turning RDF/XML text into a tree of tagged blocks.
//!
//! No XML library sits underneath: prologs, CDATA sections, self-closing
//! tags and `schema:name` pairs are handled off a single byte cursor with
//! one-character lookahead. The reader consumes its input exactly once and
//! fails fast on the first malformed construct.

use log::trace;

use crate::error::{RdfError, Result};

/// Delimiter mask for whitespace: tab, newline, carriage return, space.
/// All delimiters the reader cares about are ASCII below 64, so a `u64`
/// bitmask indexed by byte value covers every set.
const WHITESPACE: u64 = 1 << b'\t' | 1 << b'\n' | 1 << b'\r' | 1 << b' ';

const CDATA_OPENING: &str = "<![CDATA[";
const CDATA_CLOSING: &str = "]]>";

/// An attribute of the form `[schema:]name="value"` inside an opening tag.
///
/// For `<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">`
/// the single attribute has `schema_name = "xmlns"`, `name = "rdf"` and the
/// URI as its value. `schema_name` is empty when the attribute carries no
/// prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attribute {
    pub schema_name: String,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tag {
    pub schema_name: String,
    pub name: String,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// `schema:name`, or just `name` when no prefix was given.
    pub fn qualified_name(&self) -> String {
        if self.schema_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}:{}", self.schema_name, self.name)
        }
    }
}

/// A well-formed sub-document:
///
/// ```xml
/// <tag />
/// <tag attr="value" />
/// <tag> value </tag>
/// <parent> <child> value </child> </parent>
/// ```
///
/// A leaf holds text in `value`, a branch holds `children`, a self-closed
/// tag holds neither. Blocks are owned by their parent and immutable once
/// read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub opening_tag: Tag,
    pub value: String,
    pub children: Vec<Block>,
}

/// Outcome of reading one `<...>` construct at the cursor.
#[derive(Debug)]
enum Opening {
    /// A `<?...?>` prolog; no tag produced, the next construct follows it.
    Prolog,
    /// `<tag ... />`: a complete block with no value or children.
    SelfClosed(Tag),
    /// `<tag ...>`: content and a matching closing tag follow.
    Open(Tag),
}

/// Sequential reader over an in-memory document.
pub struct BlockReader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> BlockReader<'a> {
    pub fn new(text: &'a str) -> BlockReader<'a> {
        BlockReader { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Result<char> {
        self.rest().chars().next().ok_or(RdfError::UnexpectedEof)
    }

    fn read_char(&mut self) -> Result<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn peek_n(&self, n: usize) -> Result<&'a str> {
        self.rest().get(..n).ok_or(RdfError::UnexpectedEof)
    }

    fn read_n(&mut self, n: usize) -> Result<&'a str> {
        let s = self.peek_n(n)?;
        self.pos += n;
        Ok(s)
    }

    /// Reads up to (excluding) the first byte present in `delims`, leaving
    /// the cursor on the delimiter. On a miss the cursor ends up at
    /// end-of-input.
    fn read_till(&mut self, delims: u64) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b < 64 && delims & (1 << b) != 0 {
                return Ok(&self.text[start..self.pos]);
            }
            self.pos += 1;
        }
        Err(RdfError::UnexpectedEof)
    }

    /// Reads up to (excluding) the literal `delim`, leaving the cursor on
    /// the match.
    fn read_till_str(&mut self, delim: &str) -> Result<&'a str> {
        match self.rest().find(delim) {
            Some(idx) => {
                let s = &self.text[self.pos..self.pos + idx];
                self.pos += idx;
                Ok(s)
            }
            None => {
                self.pos = self.text.len();
                Err(RdfError::UnexpectedEof)
            }
        }
    }

    fn skip_whitespace(&mut self) -> usize {
        let bytes = self.text.as_bytes();
        let mut skipped = 0;
        while self.pos < bytes.len() && matches!(bytes[self.pos], b'\t' | b'\n' | b'\r' | b' ') {
            self.pos += 1;
            skipped += 1;
        }
        skipped
    }

    /// Reads a `name` or `schema:name` word up to any byte in `delims`.
    /// Returns `(schema_name, name)`, with an empty schema when the word
    /// has no colon.
    fn read_colon_pair(&mut self, delims: u64) -> Result<(&'a str, &'a str)> {
        let word = self.read_till(delims)?;
        match word.find(':') {
            Some(idx) => {
                let (first, latter) = (&word[..idx], &word[idx + 1..]);
                if latter.is_empty() {
                    return Err(RdfError::Syntax("expected a word after colon".to_string()));
                }
                Ok((first, latter))
            }
            None => Ok(("", word)),
        }
    }

    /// Expects the cursor on an attribute name; reads `[schema:]name="value"`.
    fn read_attribute(&mut self) -> Result<Attribute> {
        let (schema_name, name) = self.read_colon_pair(WHITESPACE | 1 << b'=')?;
        self.skip_whitespace();
        if self.read_char()? != '=' {
            return Err(RdfError::Syntax(format!(
                "attribute {name:?} is missing an assignment sign (=)"
            )));
        }

        let quote = self.read_char()?;
        if quote != '\'' && quote != '"' {
            return Err(RdfError::Syntax(
                "attribute value must be enclosed within quotes".to_string(),
            ));
        }
        let value = self.read_till(WHITESPACE | 1 << (quote as u8))?;
        if self.read_char()? != quote {
            return Err(RdfError::Syntax(
                "expected a closing quote matching the opening one".to_string(),
            ));
        }

        Ok(Attribute {
            schema_name: schema_name.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Reads one of `<?...?>`, `<tag ... />` or `<tag ...>`. Whitespace is
    /// allowed after `<`; any non-whitespace text before it is an error.
    fn read_opening_tag(&mut self) -> Result<Opening> {
        self.skip_whitespace();
        let start = self.pos;
        match self.read_till(1 << b'<') {
            Ok(word) if word.is_empty() => {}
            Ok(_) => {
                return Err(RdfError::Syntax(
                    "found extra characters before tag start".to_string(),
                ))
            }
            Err(_) => {
                // the stream ended while looking for the next tag
                return if self.pos > start {
                    Err(RdfError::Syntax(
                        "found stray characters at end of input".to_string(),
                    ))
                } else {
                    Err(RdfError::UnexpectedEof)
                };
            }
        }
        self.read_char()?; // the '<'
        self.skip_whitespace();

        match self.peek_char()? {
            '/' => return Err(RdfError::Syntax("unexpected closing tag".to_string())),
            '?' => {
                self.read_char()?;
                self.read_till(1 << b'?')?;
                self.read_char()?;
                self.skip_whitespace();
                return match self.read_char()? {
                    '>' => Ok(Opening::Prolog),
                    c => Err(RdfError::Syntax(format!(
                        "expected '>' closing the prolog, found {c:?}"
                    ))),
                };
            }
            _ => {}
        }

        let (schema_name, name) = self.read_colon_pair(1 << b'>' | WHITESPACE | 1 << b'/')?;
        let mut tag = Tag {
            schema_name: schema_name.to_string(),
            name: name.to_string(),
            attrs: Vec::new(),
        };

        loop {
            self.skip_whitespace();
            match self.peek_char()? {
                '>' => {
                    self.read_char()?;
                    return Ok(Opening::Open(tag));
                }
                '/' => {
                    self.read_char()?;
                    return match self.read_char()? {
                        '>' => Ok(Opening::SelfClosed(tag)),
                        _ => Err(RdfError::Syntax(
                            "expected a closing angular bracket after /".to_string(),
                        )),
                    };
                }
                _ => tag.attrs.push(self.read_attribute()?),
            }
        }
    }

    /// Reads `</[schema:]name>`; any deviation fails.
    fn read_closing_tag(&mut self) -> Result<Tag> {
        if self.read_n(2)? != "</" {
            return Err(RdfError::Syntax("expected a closing tag".to_string()));
        }
        let (schema_name, name) = self.read_colon_pair(1 << b'>' | WHITESPACE)?;
        self.skip_whitespace();
        match self.read_char()? {
            '>' => Ok(Tag {
                schema_name: schema_name.to_string(),
                name: name.to_string(),
                attrs: Vec::new(),
            }),
            c => Err(RdfError::Syntax(format!(
                "expected '>' ending the closing tag, found {c:?}"
            ))),
        }
    }

    /// Reads `<![CDATA[ ... ]]>` and returns the entire section, delimiters
    /// included, verbatim.
    fn read_cdata(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let opening = self.read_n(CDATA_OPENING.len())?;
        if opening != CDATA_OPENING {
            return Err(RdfError::Syntax(format!(
                "not a CDATA section: expected {CDATA_OPENING:?}, found {opening:?}"
            )));
        }
        self.read_till_str(CDATA_CLOSING)
            .map_err(|_| RdfError::Syntax("unterminated CDATA section".to_string()))?;
        self.read_n(CDATA_CLOSING.len())?;
        Ok(&self.text[start..self.pos])
    }

    /// Reads one block: opening tag, then a text value, a CDATA section or
    /// child blocks, then the matching closing tag. Prologs before the
    /// opening tag are skipped.
    fn read_block(&mut self) -> Result<Block> {
        let opening_tag = loop {
            match self.read_opening_tag()? {
                Opening::Prolog => continue,
                Opening::SelfClosed(tag) => {
                    return Ok(Block {
                        opening_tag: tag,
                        value: String::new(),
                        children: Vec::new(),
                    })
                }
                Opening::Open(tag) => break tag,
            }
        };

        let mut block = Block {
            opening_tag,
            value: String::new(),
            children: Vec::new(),
        };
        self.skip_whitespace();

        if self.peek_char()? != '<' {
            // the tag wraps a text value
            block.value = self.read_till(1 << b'<')?.to_string();
        } else if self.peek_n(2)? == "<!" {
            block.value = self.read_cdata()?.to_string();
        } else {
            while self.peek_n(2)? != "</" {
                block.children.push(self.read_block()?);
                self.skip_whitespace();
            }
        }

        self.skip_whitespace();
        let closing_tag = self.read_closing_tag()?;
        if block.opening_tag.name != closing_tag.name
            || block.opening_tag.schema_name != closing_tag.schema_name
        {
            return Err(RdfError::Syntax(format!(
                "opening and closing tags don't match: <{}>, </{}>",
                block.opening_tag.qualified_name(),
                closing_tag.qualified_name(),
            )));
        }
        Ok(block)
    }

    /// Reads exactly one top-level block and requires the remaining input,
    /// after trailing whitespace, to be empty.
    pub fn read(&mut self) -> Result<Block> {
        let root = self.read_block()?;
        self.skip_whitespace();
        if let Ok(c) = self.peek_char() {
            return Err(RdfError::Syntax(format!(
                "unexpected characters after the root block, starting with {c:?}"
            )));
        }
        trace!(
            "read root block <{}> with {} children",
            root.opening_tag.qualified_name(),
            root.children.len()
        );
        Ok(root)
    }
}
