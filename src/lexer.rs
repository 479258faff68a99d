use crate::diagnostics::{Diagnostic, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Ref,
    Long,
    Int,
    Real,
    Bool,
    Char,
    Bits,
    String,
    Void,
    True,
    False,
    Nil,
    Is,
    Isnt,
    Of,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Lower-case identifier with embedded spaces folded out.
    Identifier,
    /// Operator symbol such as `+`, `<=` or `+:=`.
    Operator,
    /// Upper-case word that is not a keyword: an operator tag or a mode indicant.
    Tag,
    Keyword(Keyword),
    IntDenotation,
    RealDenotation,
    BitsDenotation,
    /// The lexeme holds the string contents with doubled quotes collapsed.
    StringDenotation,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Becomes,
    IdentityIs,
    IdentityIsnt,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: SourceSpan,
}

const MONADS: &str = "%^&+-~!?";
const NOMADS: &str = "></=*";

/// Scans the next token of `line` starting at byte `position`.
pub fn scan(line: &str, position: usize) -> Result<(Token, usize), Diagnostic> {
    let mut scanner = Scanner {
        source: line,
        position: position.min(line.len()),
    };
    let token = scanner.next_token()?;
    Ok((token, scanner.position))
}

pub struct Scanner<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut rest = self.source[self.position..].chars();
        rest.next();
        rest.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn rest_starts_with(&self, text: &str) -> bool {
        self.source[self.position..].starts_with(text)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            lexeme: self.source[start..self.position].to_string(),
            span: SourceSpan::new(start, self.position),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        self.skip_whitespace();
        let start = self.position;
        let Some(ch) = self.bump() else {
            return Ok(self.token(TokenKind::Eof, start));
        };
        let token = match ch {
            ':' => self.colon(start),
            '"' => self.string_denotation(start)?,
            'a'..='z' => self.identifier(start),
            'A'..='Z' => self.bold_word(start),
            '0'..='9' => self.number_denotation(start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '[' => self.token(TokenKind::LBracket, start),
            ']' => self.token(TokenKind::RBracket, start),
            ',' => self.token(TokenKind::Comma, start),
            ';' => self.token(TokenKind::Semicolon, start),
            ch if MONADS.contains(ch) || NOMADS.contains(ch) => self.operator(start),
            other => {
                return Err(Diagnostic::lexical(format!("unrecognised character `{other}`"))
                    .with_span(SourceSpan::new(start, self.position)))
            }
        };
        Ok(token)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn colon(&mut self, start: usize) -> Token {
        if self.rest_starts_with("/=:") {
            self.position += 3;
            return self.token(TokenKind::IdentityIsnt, start);
        }
        if self.match_next('=') {
            if self.match_next(':') {
                return self.token(TokenKind::IdentityIs, start);
            }
            return self.token(TokenKind::Becomes, start);
        }
        self.token(TokenKind::Colon, start)
    }

    /// One monad or nomad, an optional second nomad, then either `:` with an
    /// optional `=` or `=` with an optional `:`.
    fn operator(&mut self, start: usize) -> Token {
        if self.peek().is_some_and(|ch| NOMADS.contains(ch)) {
            self.bump();
        }
        if self.match_next(':') {
            self.match_next('=');
        } else if self.match_next('=') {
            self.match_next(':');
        }
        self.token(TokenKind::Operator, start)
    }

    fn identifier(&mut self, start: usize) -> Token {
        let mut name = String::new();
        name.push_str(&self.source[start..self.position]);
        loop {
            match self.peek() {
                Some(ch) if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' => {
                    name.push(ch);
                    self.bump();
                }
                Some(' ')
                    if self
                        .peek_second()
                        .is_some_and(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit()) =>
                {
                    self.bump();
                }
                _ => break,
            }
        }
        Token {
            kind: TokenKind::Identifier,
            lexeme: name,
            span: SourceSpan::new(start, self.position),
        }
    }

    fn bold_word(&mut self, start: usize) -> Token {
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
        {
            self.bump();
        }
        let word = &self.source[start..self.position];
        let kind = keyword_for(word).map_or(TokenKind::Tag, TokenKind::Keyword);
        self.token(kind, start)
    }

    fn number_denotation(&mut self, start: usize) -> Token {
        self.digits();
        if self.peek() == Some('r') && self.peek_second().is_some_and(|ch| ch.is_ascii_hexdigit()) {
            self.bump();
            while self.peek().is_some_and(|ch| ch.is_ascii_hexdigit()) {
                self.bump();
            }
            return self.token(TokenKind::BitsDenotation, start);
        }
        let mut kind = TokenKind::IntDenotation;
        if self.peek() == Some('.') && self.peek_second().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
            self.digits();
            kind = TokenKind::RealDenotation;
        }
        if matches!(self.peek(), Some('e' | 'E')) && self.exponent_follows() {
            self.bump();
            if !self.match_next('+') {
                self.match_next('-');
            }
            self.digits();
            kind = TokenKind::RealDenotation;
        }
        self.token(kind, start)
    }

    fn exponent_follows(&self) -> bool {
        let mut rest = self.source[self.position..].chars().skip(1);
        match rest.next() {
            Some('+' | '-') => rest.next().is_some_and(|ch| ch.is_ascii_digit()),
            Some(ch) => ch.is_ascii_digit(),
            None => false,
        }
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
        }
    }

    fn string_denotation(&mut self, start: usize) -> Result<Token, Diagnostic> {
        let mut value = String::new();
        while let Some(ch) = self.bump() {
            if ch == '"' {
                if self.match_next('"') {
                    value.push('"');
                    continue;
                }
                return Ok(Token {
                    kind: TokenKind::StringDenotation,
                    lexeme: value,
                    span: SourceSpan::new(start, self.position),
                });
            }
            value.push(ch);
        }
        Err(Diagnostic::lexical("unterminated string denotation")
            .with_span(SourceSpan::new(start, self.position)))
    }
}

fn keyword_for(word: &str) -> Option<Keyword> {
    use self::Keyword as Kw;
    let keyword = match word {
        "REF" => Kw::Ref,
        "LONG" => Kw::Long,
        "INT" => Kw::Int,
        "REAL" => Kw::Real,
        "BOOL" => Kw::Bool,
        "CHAR" => Kw::Char,
        "BITS" => Kw::Bits,
        "STRING" => Kw::String,
        "VOID" => Kw::Void,
        "TRUE" => Kw::True,
        "FALSE" => Kw::False,
        "NIL" => Kw::Nil,
        "IS" => Kw::Is,
        "ISNT" => Kw::Isnt,
        "OF" => Kw::Of,
        _ => return None,
    };
    Some(keyword)
}
