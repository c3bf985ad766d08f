//! DDL lexer.
//!
//! Tokenizes schema-definition text, tracking line and column positions so
//! that parse diagnostics can point at the offending statement. Handles `--`,
//! `#` and `/* */` comments and the `"`, `` ` `` and `[]` quoted-identifier
//! styles.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::Lazy;

use crate::diagnostics::Location;

/// DDL token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `CREATE`
    Create,
    /// `ALTER`
    Alter,
    /// `ADD`
    Add,
    /// `TABLE`
    Table,
    /// `VIEW`
    View,
    /// `INDEX`
    Index,
    /// `ONLY`
    Only,
    /// `PRIMARY`
    Primary,
    /// `KEY`
    Key,
    /// `FOREIGN`
    Foreign,
    /// `REFERENCES`
    References,
    /// `NOT`
    Not,
    /// `NULL`
    Null,
    /// `UNIQUE`
    Unique,
    /// `DEFAULT`
    Default,
    /// `ON`
    On,
    /// `DELETE`
    Delete,
    /// `UPDATE`
    Update,
    /// `CASCADE`
    Cascade,
    /// `RESTRICT`
    Restrict,
    /// `CONSTRAINT`
    Constraint,
    /// `IF`
    If,
    /// `EXISTS`
    Exists,
    /// `CHECK`
    Check,
    /// `AS`
    As,
    /// `INSERT`
    Insert,
    /// `INTO`
    Into,
    /// `VALUES`
    Values,
    /// `CLUSTERED`
    Clustered,
    /// `NONCLUSTERED`
    Nonclustered,

    /// Bare or quoted identifier
    Ident(String),
    /// Single-quoted string literal
    Str(String),
    /// Numeric literal, sign and decimal point included
    Num(String),

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `.`
    Dot,

    /// End of input
    Eof,
}

impl Token {
    /// Rough textual rendering, used when reconstructing opaque view queries.
    pub fn text(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Str(s) => format!("'{}'", s),
            Token::Num(n) => n.clone(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Semicolon => ";".to_string(),
            Token::Dot => ".".to_string(),
            Token::Eof => String::new(),
            other => format!("{:?}", other).to_uppercase(),
        }
    }
}

/// A token together with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token itself
    pub token: Token,
    /// Position of the token's first character
    pub location: Location,
}

static KEYWORDS: Lazy<HashMap<&'static str, Token>> = Lazy::new(|| {
    HashMap::from([
        ("CREATE", Token::Create),
        ("ALTER", Token::Alter),
        ("ADD", Token::Add),
        ("TABLE", Token::Table),
        ("VIEW", Token::View),
        ("INDEX", Token::Index),
        ("ONLY", Token::Only),
        ("PRIMARY", Token::Primary),
        ("KEY", Token::Key),
        ("FOREIGN", Token::Foreign),
        ("REFERENCES", Token::References),
        ("NOT", Token::Not),
        ("NULL", Token::Null),
        ("UNIQUE", Token::Unique),
        ("DEFAULT", Token::Default),
        ("ON", Token::On),
        ("DELETE", Token::Delete),
        ("UPDATE", Token::Update),
        ("CASCADE", Token::Cascade),
        ("RESTRICT", Token::Restrict),
        ("CONSTRAINT", Token::Constraint),
        ("IF", Token::If),
        ("EXISTS", Token::Exists),
        ("CHECK", Token::Check),
        ("AS", Token::As),
        ("INSERT", Token::Insert),
        ("INTO", Token::Into),
        ("VALUES", Token::Values),
        ("CLUSTERED", Token::Clustered),
        ("NONCLUSTERED", Token::Nonclustered),
    ])
});

/// DDL lexer over a single schema source.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over the given input.
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self {
            chars,
            current_char,
            line: 1,
            column: 1,
        }
    }

    fn advance(&mut self) {
        if self.current_char == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else if self.current_char.is_some() {
            self.column += 1;
        }
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            if c == '\n' {
                self.advance();
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            if c == '*' {
                self.advance();
                if self.current_char == Some('/') {
                    self.advance();
                    break;
                }
            } else {
                self.advance();
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted_identifier(&mut self, quote: char) -> String {
        self.advance(); // skip opening quote
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c == quote {
                // Doubled quote is an escaped quote character
                if self.peek() == Some(&quote) {
                    ident.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    break;
                }
            } else {
                ident.push(c);
                self.advance();
            }
        }
        ident
    }

    fn read_string(&mut self) -> String {
        self.advance(); // skip opening quote
        let mut s = String::new();
        while let Some(c) = self.current_char {
            if c == '\'' {
                if self.peek() == Some(&'\'') {
                    s.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }
        s
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }

        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_ident(s: String) -> Token {
        match KEYWORDS.get(s.to_uppercase().as_str()) {
            Some(token) => token.clone(),
            None => Token::Ident(s),
        }
    }

    fn next_spanned(&mut self) -> SpannedToken {
        loop {
            self.skip_whitespace();
            let location = self.location();

            let token = match self.current_char {
                None => Token::Eof,

                Some('-') => {
                    if self.peek() == Some(&'-') {
                        self.skip_line_comment();
                        continue;
                    } else if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        Token::Num(self.read_number())
                    } else {
                        self.advance();
                        continue;
                    }
                }

                Some('/') => {
                    if self.peek() == Some(&'*') {
                        self.advance();
                        self.skip_block_comment();
                        continue;
                    } else {
                        self.advance();
                        continue;
                    }
                }

                Some('#') => {
                    self.skip_line_comment();
                    continue;
                }

                Some('(') => {
                    self.advance();
                    Token::LParen
                }
                Some(')') => {
                    self.advance();
                    Token::RParen
                }
                Some(',') => {
                    self.advance();
                    Token::Comma
                }
                Some(';') => {
                    self.advance();
                    Token::Semicolon
                }
                Some('.') => {
                    self.advance();
                    Token::Dot
                }

                Some('"') => Token::Ident(self.read_quoted_identifier('"')),
                Some('`') => Token::Ident(self.read_quoted_identifier('`')),
                Some('[') => {
                    // SQL Server style [identifier]
                    self.advance();
                    let mut ident = String::new();
                    while let Some(c) = self.current_char {
                        if c == ']' {
                            self.advance();
                            break;
                        }
                        ident.push(c);
                        self.advance();
                    }
                    Token::Ident(ident)
                }

                Some('\'') => Token::Str(self.read_string()),

                Some(c) if c.is_ascii_digit() => Token::Num(self.read_number()),

                Some(c) if c.is_alphabetic() || c == '_' => {
                    Self::keyword_or_ident(self.read_identifier())
                }

                Some(_) => {
                    // Skip characters we have no token for
                    self.advance();
                    continue;
                }
            };

            return SpannedToken { token, location };
        }
    }

    /// Collect all tokens, ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<SpannedToken> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_spanned();
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_simple_create_table() {
        let toks = tokens("CREATE TABLE users (id INT);");
        assert_eq!(toks[0], Token::Create);
        assert_eq!(toks[1], Token::Table);
        assert_eq!(toks[2], Token::Ident("users".to_string()));
        assert_eq!(toks[3], Token::LParen);
        assert_eq!(toks[4], Token::Ident("id".to_string()));
        assert_eq!(toks[5], Token::Ident("INT".to_string()));
        assert_eq!(toks[6], Token::RParen);
        assert_eq!(toks[7], Token::Semicolon);
    }

    #[test]
    fn test_quoted_identifiers() {
        let toks = tokens(r#"CREATE TABLE "User Table" (`column name` INT, [Order Id] INT);"#);
        assert_eq!(toks[2], Token::Ident("User Table".to_string()));
        assert_eq!(toks[4], Token::Ident("column name".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let toks = tokens("-- comment\nCREATE /* block */ TABLE t (id INT);");
        assert_eq!(toks[0], Token::Create);
        assert_eq!(toks[1], Token::Table);
    }

    #[test]
    fn test_positions() {
        let spanned = Lexer::new("CREATE\n  TABLE t;").tokenize();
        assert_eq!(spanned[0].location, Location::new(1, 1));
        assert_eq!(spanned[1].location, Location::new(2, 3));
        assert_eq!(spanned[2].location, Location::new(2, 9));
    }

    #[test]
    fn test_string_literal_with_escaped_quote() {
        let toks = tokens("INSERT INTO t (a) VALUES ('it''s');");
        assert!(toks.contains(&Token::Str("it's".to_string())));
    }

    #[test]
    fn test_insert_keywords() {
        let toks = tokens("INSERT INTO t (a) VALUES ('x');");
        assert_eq!(toks[0], Token::Insert);
        assert_eq!(toks[1], Token::Into);
        assert_eq!(toks[6], Token::Values);
    }
}
