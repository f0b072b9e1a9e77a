//! Tokenizer for the normalized C subset.
//!
//! Tokenization is context-sensitive: an identifier whose lexeme is present
//! in the live user-defined type set is reclassified as
//! [`TokenKind::TypeName`] at the moment it is pulled from the stream. The
//! parser registers struct/typedef names into that set as soon as their
//! defining production reduces, so every later occurrence of the name lexes
//! as a type name.

use logos::Logos;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Raw token rules. Longest match wins, so keywords never swallow the
/// prefix of a longer identifier.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
enum Tok {
    #[token("int")]
    Int,
    #[token("char")]
    Char,
    #[token("void")]
    Void,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("short")]
    Short,
    #[token("long")]
    Long,
    #[token("unsigned")]
    Unsigned,
    #[token("signed")]
    Signed,
    #[token("byte")]
    Byte,
    #[token("bool")]
    Bool,
    #[token("struct")]
    Struct,
    #[token("typedef")]
    Typedef,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("printf")]
    Printf,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLit,
    #[regex(r"'([^'\\]|\\.)'")]
    CharLit,
    #[token("->")]
    Arrow,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("=")]
    Assign,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
}

/// The closed set of token kinds seen by the parser.
///
/// [`TokenKind::TypeName`] never comes out of the raw rules: it is produced
/// by reclassifying [`TokenKind::Ident`] against the user-defined type set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Char,
    Void,
    Float,
    Double,
    Short,
    Long,
    Unsigned,
    Signed,
    Byte,
    Bool,
    Struct,
    Typedef,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Printf,
    Ident,
    TypeName,
    Number,
    StringLit,
    CharLit,
    Arrow,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    EqEq,
    NotEq,
    Le,
    Ge,
    Shl,
    Shr,
    AndAnd,
    OrOr,
    Assign,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Question,
    Colon,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Eof,
}

impl From<Tok> for TokenKind {
    fn from(tok: Tok) -> Self {
        match tok {
            Tok::Int => TokenKind::Int,
            Tok::Char => TokenKind::Char,
            Tok::Void => TokenKind::Void,
            Tok::Float => TokenKind::Float,
            Tok::Double => TokenKind::Double,
            Tok::Short => TokenKind::Short,
            Tok::Long => TokenKind::Long,
            Tok::Unsigned => TokenKind::Unsigned,
            Tok::Signed => TokenKind::Signed,
            Tok::Byte => TokenKind::Byte,
            Tok::Bool => TokenKind::Bool,
            Tok::Struct => TokenKind::Struct,
            Tok::Typedef => TokenKind::Typedef,
            Tok::If => TokenKind::If,
            Tok::Else => TokenKind::Else,
            Tok::While => TokenKind::While,
            Tok::Do => TokenKind::Do,
            Tok::For => TokenKind::For,
            Tok::Switch => TokenKind::Switch,
            Tok::Case => TokenKind::Case,
            Tok::Default => TokenKind::Default,
            Tok::Break => TokenKind::Break,
            Tok::Continue => TokenKind::Continue,
            Tok::Return => TokenKind::Return,
            Tok::Printf => TokenKind::Printf,
            Tok::Ident => TokenKind::Ident,
            Tok::Number => TokenKind::Number,
            Tok::StringLit => TokenKind::StringLit,
            Tok::CharLit => TokenKind::CharLit,
            Tok::Arrow => TokenKind::Arrow,
            Tok::PlusPlus => TokenKind::PlusPlus,
            Tok::MinusMinus => TokenKind::MinusMinus,
            Tok::PlusEq => TokenKind::PlusEq,
            Tok::MinusEq => TokenKind::MinusEq,
            Tok::StarEq => TokenKind::StarEq,
            Tok::SlashEq => TokenKind::SlashEq,
            Tok::PercentEq => TokenKind::PercentEq,
            Tok::EqEq => TokenKind::EqEq,
            Tok::NotEq => TokenKind::NotEq,
            Tok::Le => TokenKind::Le,
            Tok::Ge => TokenKind::Ge,
            Tok::Shl => TokenKind::Shl,
            Tok::Shr => TokenKind::Shr,
            Tok::AndAnd => TokenKind::AndAnd,
            Tok::OrOr => TokenKind::OrOr,
            Tok::Assign => TokenKind::Assign,
            Tok::Lt => TokenKind::Lt,
            Tok::Gt => TokenKind::Gt,
            Tok::Plus => TokenKind::Plus,
            Tok::Minus => TokenKind::Minus,
            Tok::Star => TokenKind::Star,
            Tok::Slash => TokenKind::Slash,
            Tok::Percent => TokenKind::Percent,
            Tok::Bang => TokenKind::Bang,
            Tok::Tilde => TokenKind::Tilde,
            Tok::Amp => TokenKind::Amp,
            Tok::Pipe => TokenKind::Pipe,
            Tok::Caret => TokenKind::Caret,
            Tok::Question => TokenKind::Question,
            Tok::Colon => TokenKind::Colon,
            Tok::Dot => TokenKind::Dot,
            Tok::LParen => TokenKind::LParen,
            Tok::RParen => TokenKind::RParen,
            Tok::LBrace => TokenKind::LBrace,
            Tok::RBrace => TokenKind::RBrace,
            Tok::LBracket => TokenKind::LBracket,
            Tok::RBracket => TokenKind::RBracket,
            Tok::Semi => TokenKind::Semi,
            Tok::Comma => TokenKind::Comma,
        }
    }
}

impl TokenKind {
    /// Human-readable token name, used in expected-token sets of syntax
    /// errors.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Int => "'int'",
            TokenKind::Char => "'char'",
            TokenKind::Void => "'void'",
            TokenKind::Float => "'float'",
            TokenKind::Double => "'double'",
            TokenKind::Short => "'short'",
            TokenKind::Long => "'long'",
            TokenKind::Unsigned => "'unsigned'",
            TokenKind::Signed => "'signed'",
            TokenKind::Byte => "'byte'",
            TokenKind::Bool => "'bool'",
            TokenKind::Struct => "'struct'",
            TokenKind::Typedef => "'typedef'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::For => "'for'",
            TokenKind::Switch => "'switch'",
            TokenKind::Case => "'case'",
            TokenKind::Default => "'default'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Return => "'return'",
            TokenKind::Printf => "'printf'",
            TokenKind::Ident => "identifier",
            TokenKind::TypeName => "type name",
            TokenKind::Number => "number",
            TokenKind::StringLit => "string literal",
            TokenKind::CharLit => "character literal",
            TokenKind::Arrow => "'->'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Le => "'<='",
            TokenKind::Ge => "'>='",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Assign => "'='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Bang => "'!'",
            TokenKind::Tilde => "'~'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Question => "'?'",
            TokenKind::Colon => "':'",
            TokenKind::Dot => "'.'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of file",
        }
    }

    /// Whether this kind starts a base type specifier (`int`, `unsigned`,
    /// `byte`, ...).
    pub fn is_base_type(self) -> bool {
        matches!(
            self,
            TokenKind::Int
                | TokenKind::Char
                | TokenKind::Void
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Short
                | TokenKind::Long
                | TokenKind::Unsigned
                | TokenKind::Signed
                | TokenKind::Byte
                | TokenKind::Bool
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified token with its lexeme and source position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    /// Byte span into the source, used for verbatim pass-through of
    /// `printf` arguments.
    pub start: usize,
    pub end: usize,
}

/// Fatal lexical error: a byte that matches no token rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized character '{character}' at line {line}, column {column}")]
pub struct LexicalError {
    pub character: char,
    pub line: u32,
    pub column: u32,
}

/// Pull-based token stream over one source string.
///
/// The caller passes the live type-name set on every pull; classification
/// therefore reflects all type registrations made by the parser up to this
/// point in the input.
pub struct TokenStream<'src> {
    source: &'src str,
    lexer: logos::Lexer<'src, Tok>,
    line_starts: Vec<usize>,
}

impl<'src> TokenStream<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            lexer: Tok::lexer(source),
            line_starts,
        }
    }

    /// Map a byte offset to a 1-based (line, column) pair.
    fn locate(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(n) => n,
            Err(n) => n - 1,
        };
        let column = offset - self.line_starts[line] + 1;
        (line as u32 + 1, column as u32)
    }

    /// Pull the next token, reclassifying identifiers against `user_types`.
    pub fn next_token(&mut self, user_types: &HashSet<String>) -> Result<Token, LexicalError> {
        match self.lexer.next() {
            None => {
                let offset = self.source.len();
                let (line, column) = self.locate(offset);
                Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    line,
                    column,
                    start: offset,
                    end: offset,
                })
            }
            Some(Err(())) => {
                let span = self.lexer.span();
                let (line, column) = self.locate(span.start);
                let character = self.lexer.slice().chars().next().unwrap_or('\0');
                Err(LexicalError {
                    character,
                    line,
                    column,
                })
            }
            Some(Ok(tok)) => {
                let span = self.lexer.span();
                let (line, column) = self.locate(span.start);
                let text = self.lexer.slice().to_owned();
                let mut kind = TokenKind::from(tok);
                if kind == TokenKind::Ident && user_types.contains(&text) {
                    kind = TokenKind::TypeName;
                }
                Ok(Token {
                    kind,
                    text,
                    line,
                    column,
                    start: span.start,
                    end: span.end,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str, types: &HashSet<String>) -> Vec<Token> {
        let mut stream = TokenStream::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = stream.next_token(types).expect("lexes");
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = all_tokens("int main() { return 0; }", &HashSet::new());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::Number,
                TokenKind::Semi,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "main");
    }

    #[test]
    fn keyword_prefix_stays_identifier() {
        let tokens = all_tokens("integer dot", &HashSet::new());
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text, "integer");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn type_name_reclassification() {
        let mut types = HashSet::new();
        types.insert("Node".to_owned());
        let tokens = all_tokens("Node n; other x;", &types);
        assert_eq!(tokens[0].kind, TokenKind::TypeName);
        assert_eq!(tokens[0].text, "Node");
        assert_eq!(tokens[3].kind, TokenKind::Ident);
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = all_tokens("int x;\n  y = 1;", &HashSet::new());
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 5));
        // 'y' on line 2, after two spaces
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
    }

    #[test]
    fn multi_char_operators() {
        let tokens = all_tokens("++ -- == != <= >= << >> && || ->", &HashSet::new());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unrecognized_character_reports_position() {
        let mut stream = TokenStream::new("int x = @;");
        let types = HashSet::new();
        let mut err = None;
        for _ in 0..8 {
            match stream.next_token(&types) {
                Ok(token) if token.kind == TokenKind::Eof => break,
                Ok(_) => continue,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        let err = err.expect("lexical error");
        assert_eq!(err.character, '@');
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 9);
    }
}
