use echo::{
    diagnostics::DiagnosticKind,
    lexer::{scan, Keyword, Scanner, TokenKind},
};

fn kinds(source: &str) -> Vec<TokenKind> {
    Scanner::new(source)
        .tokenize()
        .expect("scan should succeed")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn lexemes(source: &str) -> Vec<String> {
    Scanner::new(source)
        .tokenize()
        .expect("scan should succeed")
        .into_iter()
        .filter(|token| token.kind != TokenKind::Eof)
        .map(|token| token.lexeme)
        .collect()
}

#[test]
fn identifiers_fold_embedded_spaces() {
    assert_eq!(lexemes("max int + long max int"), ["maxint", "+", "longmaxint"]);
    assert_eq!(kinds("x1"), [TokenKind::Identifier, TokenKind::Eof]);
}

#[test]
fn bold_words_are_keywords_or_tags() {
    assert_eq!(
        kinds("REF INT MOD"),
        [
            TokenKind::Keyword(Keyword::Ref),
            TokenKind::Keyword(Keyword::Int),
            TokenKind::Tag,
            TokenKind::Eof,
        ]
    );
    assert_eq!(kinds("count OF t")[1], TokenKind::Keyword(Keyword::Of));
}

#[test]
fn operators_take_up_to_four_symbols() {
    assert_eq!(lexemes("a +:= 1"), ["a", "+:=", "1"]);
    assert_eq!(lexemes("a <= b /= c"), ["a", "<=", "b", "/=", "c"]);
    assert_eq!(lexemes("2 ** -1"), ["2", "**", "-", "1"]);
    assert_eq!(lexemes("x>-1"), ["x", ">", "-", "1"]);
}

#[test]
fn colon_forms() {
    assert_eq!(
        kinds("a := b :=: c :/=: d : e"),
        [
            TokenKind::Identifier,
            TokenKind::Becomes,
            TokenKind::Identifier,
            TokenKind::IdentityIs,
            TokenKind::Identifier,
            TokenKind::IdentityIsnt,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Identifier,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn number_denotations() {
    assert_eq!(kinds("42")[0], TokenKind::IntDenotation);
    assert_eq!(kinds("4.25")[0], TokenKind::RealDenotation);
    assert_eq!(kinds("1e-3")[0], TokenKind::RealDenotation);
    assert_eq!(kinds("16rff")[0], TokenKind::BitsDenotation);
    // An exponent needs digits.
    assert_eq!(lexemes("1e"), ["1", "e"]);
}

#[test]
fn string_denotations_collapse_doubled_quotes() {
    let tokens = Scanner::new("\"say \"\"hi\"\"\"").tokenize().expect("scan");
    assert_eq!(tokens[0].kind, TokenKind::StringDenotation);
    assert_eq!(tokens[0].lexeme, "say \"hi\"");
}

#[test]
fn unterminated_strings_are_lexical_errors() {
    let err = Scanner::new("\"open").tokenize().expect_err("unterminated");
    assert_eq!(err.kind, DiagnosticKind::Lexical);
    assert!(err.message.contains("unterminated"));
}

#[test]
fn unknown_characters_are_lexical_errors() {
    let err = Scanner::new("a $ b").tokenize().expect_err("bad character");
    assert_eq!(err.kind, DiagnosticKind::Lexical);
    let span = err.span.expect("span");
    assert_eq!((span.start, span.end), (2, 3));
}

#[test]
fn scan_resumes_from_a_position() {
    let (token, next) = scan("x + y", 1).expect("scan");
    assert_eq!(token.kind, TokenKind::Operator);
    assert_eq!(token.lexeme, "+");
    assert_eq!(next, 3);
    let (token, _) = scan("x + y", next).expect("scan");
    assert_eq!(token.lexeme, "y");
}

#[test]
fn spans_cover_the_lexeme() {
    let tokens = Scanner::new("  abc").tokenize().expect("scan");
    assert_eq!((tokens[0].span.start, tokens[0].span.end), (2, 5));
}
