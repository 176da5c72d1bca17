//! Log filter expressions.
//!
//! A filter is a boolean predicate over message attributes, written as
//! `field regex` terms combined with `and`, `or`, `not` and parentheses:
//!
//! ```text
//! class ^help$ and not sender "^bot "
//! (type jabber or type aim) and direction in
//! ```
//!
//! `and` binds tighter than `or`. Patterns are unanchored regex searches.
//! Parentheses and `not` may nest at most [`MAX_NESTING`] levels deep.

use std::fmt;

use regex::Regex;

use crate::message::MessageEntity;

/// Deepest allowed nesting of parentheses and `not`.
pub const MAX_NESTING: usize = 64;

/// Errors from parsing a filter expression.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// Input ended where a term was expected.
    #[error("unexpected end of filter expression")]
    UnexpectedEnd,

    /// A token appeared where it is not allowed.
    #[error("unexpected token in filter: {0:?}")]
    UnexpectedToken(String),

    /// A term named an unknown message field.
    #[error("unknown filter field: {0:?}")]
    UnknownField(String),

    /// A pattern failed to compile.
    #[error("invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A double-quoted pattern was not closed.
    #[error("unterminated quote in filter")]
    UnterminatedQuote,

    /// Tokens remained after a complete expression.
    #[error("trailing input in filter: {0:?}")]
    TrailingInput(String),

    /// Parentheses or `not` nested deeper than [`MAX_NESTING`].
    #[error("filter nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Message attribute a filter term matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Sender address.
    Sender,
    /// Recipient address.
    Recipient,
    /// Message class.
    Class,
    /// Message instance.
    Instance,
    /// Message text.
    Body,
    /// Protocol name.
    Type,
    /// `in`, `out` or `none`.
    Direction,
    /// `login`, `logout` or `none`.
    Login,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "sender" => Self::Sender,
            "recipient" => Self::Recipient,
            "class" => Self::Class,
            "instance" => Self::Instance,
            "body" => Self::Body,
            "type" => Self::Type,
            "direction" => Self::Direction,
            "login" => Self::Login,
            _ => return None,
        })
    }

    fn value(self, msg: &MessageEntity) -> &str {
        match self {
            Self::Sender => msg.sender(),
            Self::Recipient => msg.recipient(),
            Self::Class => msg.class(),
            Self::Instance => msg.instance(),
            Self::Body => msg.body(),
            Self::Type => msg.protocol().as_str(),
            Self::Direction => msg.direction().as_str(),
            Self::Login => msg.login().as_str(),
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Const(bool),
    Match(Field, Regex),
    Not(Box<Node>),
    All(Vec<Node>),
    Any(Vec<Node>),
}

impl Node {
    fn eval(&self, msg: &MessageEntity) -> bool {
        match self {
            Self::Const(b) => *b,
            Self::Match(field, re) => re.is_match(field.value(msg)),
            Self::Not(inner) => !inner.eval(msg),
            Self::All(nodes) => nodes.iter().all(|n| n.eval(msg)),
            Self::Any(nodes) => nodes.iter().any(|n| n.eval(msg)),
        }
    }
}

/// A parsed filter expression.
#[derive(Clone)]
pub struct Filter {
    source: String,
    root: Node,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.source).finish()
    }
}

impl Filter {
    /// Parse a filter expression.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] describing the first problem found.
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.or_expr()?;
        if let Some(tok) = parser.peek() {
            return Err(FilterError::TrailingInput(tok.text().to_owned()));
        }
        Ok(Self {
            source: source.to_owned(),
            root,
        })
    }

    /// Whether `msg` satisfies the filter.
    pub fn matches(&self, msg: &MessageEntity) -> bool {
        self.root.eval(msg)
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
}

impl Token {
    fn text(&self) -> &str {
        match self {
            Self::Open => "(",
            Self::Close => ")",
            Self::Word(s) | Self::Quoted(s) => s.as_str(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') if chars.peek() == Some(&'"') => {
                            chars.next();
                            text.push('"');
                        }
                        Some(other) => text.push(other),
                        None => return Err(FilterError::UnterminatedQuote),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            _ => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(text));
            }
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos = self.pos.saturating_add(1);
        }
        tok
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Word(w)) if w == keyword) {
            self.pos = self.pos.saturating_add(1);
            true
        } else {
            false
        }
    }

    // Operator chains are kept flat so only parentheses and `not` add depth.
    fn or_expr(&mut self) -> Result<Node, FilterError> {
        let mut nodes = vec![self.and_expr()?];
        while self.eat_keyword("or") {
            nodes.push(self.and_expr()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Any(nodes)
        })
    }

    fn and_expr(&mut self) -> Result<Node, FilterError> {
        let mut nodes = vec![self.unary()?];
        while self.eat_keyword("and") {
            nodes.push(self.unary()?);
        }
        Ok(if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::All(nodes)
        })
    }

    fn nested(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<Node, FilterError>,
    ) -> Result<Node, FilterError> {
        if self.depth >= MAX_NESTING {
            return Err(FilterError::TooDeep(MAX_NESTING));
        }
        self.depth = self.depth.saturating_add(1);
        let node = parse(self);
        self.depth = self.depth.saturating_sub(1);
        node
    }

    fn unary(&mut self) -> Result<Node, FilterError> {
        match self.next().ok_or(FilterError::UnexpectedEnd)? {
            Token::Open => self.nested(|p| {
                let inner = p.or_expr()?;
                match p.next() {
                    Some(Token::Close) => Ok(inner),
                    Some(other) => Err(FilterError::UnexpectedToken(other.text().to_owned())),
                    None => Err(FilterError::UnexpectedEnd),
                }
            }),
            Token::Word(w) => match w.as_str() {
                "not" => self.nested(|p| Ok(Node::Not(Box::new(p.unary()?)))),
                "true" => Ok(Node::Const(true)),
                "false" => Ok(Node::Const(false)),
                "and" | "or" => Err(FilterError::UnexpectedToken(w.clone())),
                name => {
                    let field =
                        Field::parse(name).ok_or_else(|| FilterError::UnknownField(w.clone()))?;
                    let pattern = match self.next().ok_or(FilterError::UnexpectedEnd)? {
                        Token::Word(p) | Token::Quoted(p) => p,
                        other => return Err(FilterError::UnexpectedToken(other.text().to_owned())),
                    };
                    Ok(Node::Match(field, Regex::new(&pattern)?))
                }
            },
            other => Err(FilterError::UnexpectedToken(other.text().to_owned())),
        }
    }
}
