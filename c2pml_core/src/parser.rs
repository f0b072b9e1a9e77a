//! Syntax-directed translation from the rewritten C subset to Promela.
//!
//! A recursive-descent parser consumes the token stream and synthesizes
//! output text directly; there is no intermediate AST. Every statement
//! production yields a tagged [`Frag`] so that statement lists can
//! restructure around `continue`: Promela has no `continue`, so an
//! `if (c) continue;` followed by more statements becomes a two-branch
//! `if` whose `else` arm carries the rest of the list.

use std::collections::HashSet;
use thiserror::Error;

use crate::TranslateError;
use crate::lexer::{Token, TokenKind, TokenStream};

/// Fatal parse error with the found token and the expected alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: found {found}, expected {}", .expected.join(" or "))]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub found: String,
    pub expected: Vec<String>,
}

/// Synthesized attribute of a statement production.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Frag {
    /// Plain translated text.
    Normal(String),
    /// Text that ends control flow for the rest of its statement list
    /// (a translated `continue`).
    Continue(String),
    /// An `if` whose then-branch continues; rendering is deferred until
    /// the rest of the statement list is known.
    IfContinue { cond: String, then: String },
}

impl Frag {
    fn into_text(self) -> String {
        match self {
            Frag::Normal(text) | Frag::Continue(text) => text,
            Frag::IfContinue { cond, then } => render_if(&cond, &then, ""),
        }
    }

    /// Combine this fragment with the already-combined rest of its
    /// statement list.
    fn followed_by(self, rest: Frag) -> Frag {
        match self {
            // continue discards everything after it but keeps its tag so
            // an enclosing if can still observe it
            Frag::Continue(text) => Frag::Continue(text),
            Frag::IfContinue { cond, then } => {
                Frag::Normal(render_if(&cond, &then, &rest.into_text()))
            }
            Frag::Normal(text) => match rest {
                Frag::Continue(rest_text) => Frag::Continue(join_stmts(text, rest_text)),
                other => Frag::Normal(join_stmts(text, other.into_text())),
            },
        }
    }
}

/// Right fold over a statement list.
fn combine(frags: Vec<Frag>) -> Frag {
    let mut acc: Option<Frag> = None;
    for frag in frags.into_iter().rev() {
        acc = Some(match acc {
            None => frag,
            Some(rest) => frag.followed_by(rest),
        });
    }
    acc.unwrap_or_else(|| Frag::Normal(String::new()))
}

fn join_stmts(a: String, b: String) -> String {
    if a.is_empty() {
        b
    } else if b.is_empty() {
        a
    } else {
        format!("{a}\n{b}")
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether `cond` is a single balanced parenthesized expression.
fn wrapped(cond: &str) -> bool {
    if !(cond.starts_with('(') && cond.ends_with(')')) {
        return false;
    }
    let mut depth = 0usize;
    for (i, ch) in cond.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == cond.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn guard(cond: &str) -> String {
    if wrapped(cond) {
        cond.to_owned()
    } else {
        format!("({cond})")
    }
}

fn or_skip(text: String) -> String {
    if text.trim().is_empty() {
        "skip;".to_owned()
    } else {
        text
    }
}

fn render_if(cond: &str, then: &str, els: &str) -> String {
    let then_text = or_skip(then.to_owned());
    let els_text = or_skip(els.to_owned());
    let mut out = format!("if\n:: {} ->\n{}\n", guard(cond), indent(&then_text));
    if els_text == "skip;" {
        out.push_str(":: else -> skip;\n");
    } else {
        out.push_str(&format!(":: else ->\n{}\n", indent(&els_text)));
    }
    out.push_str("fi;");
    out
}

/// What a `break` statement escapes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Breakable {
    Loop,
    Switch,
}

/// Mutable translation state threaded through one parse.
#[derive(Debug, Default)]
struct Context {
    user_types: HashSet<String>,
    current_function: Option<String>,
    switch_expr: Option<String>,
    label_count: u32,
    anon_struct_count: u32,
    breakables: Vec<Breakable>,
}

pub(crate) fn translate_source(source: &str) -> Result<String, TranslateError> {
    let mut parser = Parser::new(source)?;
    parser.program()
}

struct Parser<'src> {
    source: &'src str,
    stream: TokenStream<'src>,
    ctx: Context,
    current: Token,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Result<Self, TranslateError> {
        let mut stream = TokenStream::new(source);
        let ctx = Context::default();
        let current = stream.next_token(&ctx.user_types)?;
        Ok(Self {
            source,
            stream,
            ctx,
            current,
        })
    }

    /// Consume the current token and pull the next one, classified
    /// against the user-type set as registered so far.
    fn advance(&mut self) -> Result<Token, TranslateError> {
        let next = self.stream.next_token(&self.ctx.user_types)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, TranslateError> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.expected_kinds(&[kind]))
        }
    }

    fn expect_ident(&mut self) -> Result<String, TranslateError> {
        if self.current.kind == TokenKind::Ident {
            Ok(self.advance()?.text)
        } else {
            Err(self.expected_kinds(&[TokenKind::Ident]))
        }
    }

    fn syntax_error(&self, expected: Vec<String>) -> TranslateError {
        let found = if self.current.kind == TokenKind::Eof {
            "end of file".to_owned()
        } else {
            format!("'{}'", self.current.text)
        };
        TranslateError::Syntax(SyntaxError {
            line: self.current.line,
            column: self.current.column,
            found,
            expected,
        })
    }

    fn expected_kinds(&self, kinds: &[TokenKind]) -> TranslateError {
        self.syntax_error(kinds.iter().map(|k| k.name().to_owned()).collect())
    }

    fn program(&mut self) -> Result<String, TranslateError> {
        let mut items = Vec::new();
        while self.current.kind != TokenKind::Eof {
            items.push(self.item()?);
        }
        Ok(items.join("\n"))
    }

    fn item(&mut self) -> Result<String, TranslateError> {
        match self.current.kind {
            TokenKind::Typedef | TokenKind::Struct => self.struct_definition(),
            _ => {
                let ty = self.type_specifier()?;
                let name = self.expect_ident()?;
                if self.current.kind == TokenKind::LParen {
                    self.function_definition(name)
                } else {
                    self.finish_declaration(ty, name)
                }
            }
        }
    }

    /// `struct Name { ... };`, `typedef struct [Tag] { ... } Alias;`,
    /// `struct Name { ... } var;` (trailing declarators become variables
    /// of the struct type).
    ///
    /// The struct name enters the user-type set before the token after
    /// the closing `;` is pulled, so every later occurrence lexes as a
    /// type name; a tag is registered before the body so self-referential
    /// fields resolve too.
    fn struct_definition(&mut self) -> Result<String, TranslateError> {
        let is_typedef = self.current.kind == TokenKind::Typedef;
        if is_typedef {
            self.advance()?;
        }
        self.expect(TokenKind::Struct)?;
        let tag = match self.current.kind {
            TokenKind::Ident | TokenKind::TypeName => Some(self.advance()?.text),
            _ => None,
        };
        if let Some(tag) = &tag {
            self.ctx.user_types.insert(tag.clone());
        }
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.current.kind != TokenKind::RBrace {
            let ty = self.type_specifier()?;
            let name = self.expect_ident()?;
            let mut field = format!("{ty} {name}");
            while self.current.kind == TokenKind::LBracket {
                self.advance()?;
                let size = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                field.push_str(&format!("[{size}]"));
            }
            self.expect(TokenKind::Semi)?;
            fields.push(field);
        }
        self.expect(TokenKind::RBrace)?;
        let name;
        let mut decls = Vec::new();
        if is_typedef {
            let alias = match self.current.kind {
                TokenKind::Ident | TokenKind::TypeName => Some(self.advance()?.text),
                _ => None,
            };
            name = match alias.or(tag) {
                Some(name) => name,
                None => self.fresh_anon_struct_name(),
            };
            self.ctx.user_types.insert(name.clone());
        } else {
            name = match tag {
                Some(tag) => tag,
                None => self.fresh_anon_struct_name(),
            };
            self.ctx.user_types.insert(name.clone());
            // trailing declarators are variables of the struct type
            while self.current.kind == TokenKind::Ident {
                let var = self.advance()?.text;
                let mut decl = format!("{name} {var}");
                while self.current.kind == TokenKind::LBracket {
                    self.advance()?;
                    let size = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    decl.push_str(&format!("[{size}]"));
                }
                decl.push(';');
                decls.push(decl);
                if self.current.kind == TokenKind::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::Semi)?;
        let body = fields
            .iter()
            .map(|f| format!("  {f}"))
            .collect::<Vec<_>>()
            .join(";\n");
        let mut out = format!("typedef {name} {{\n{body}\n}}");
        for decl in decls {
            out.push_str(&format!("\n{decl}"));
        }
        Ok(out)
    }

    fn fresh_anon_struct_name(&mut self) -> String {
        let n = self.ctx.anon_struct_count;
        self.ctx.anon_struct_count += 1;
        format!("AnonStruct{n}")
    }

    /// One or more base-type keywords, a registered type name, or a
    /// `struct Tag` reference (the keyword is dropped on output).
    fn type_specifier(&mut self) -> Result<String, TranslateError> {
        match self.current.kind {
            TokenKind::TypeName => Ok(self.advance()?.text),
            TokenKind::Struct => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Ident | TokenKind::TypeName => Ok(self.advance()?.text),
                    _ => Err(self.expected_kinds(&[TokenKind::Ident])),
                }
            }
            kind if kind.is_base_type() => {
                let mut parts = vec![self.advance()?.text];
                while self.current.kind.is_base_type() {
                    parts.push(self.advance()?.text);
                }
                Ok(parts.join(" "))
            }
            _ => Err(self.syntax_error(vec!["type".to_owned()])),
        }
    }

    /// `T f(params) { body }` → `proctype f(params) { body }` with
    /// `;`-separated parameters; the return type is dropped.
    fn function_definition(&mut self, name: String) -> Result<String, TranslateError> {
        log::debug!(target: "parser", "translating function '{name}'");
        self.ctx.current_function = Some(name.clone());
        let params = self.parameter_list()?;
        self.expect(TokenKind::LBrace)?;
        let body = self.statement_list(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace)?;
        if let Some(finished) = self.ctx.current_function.take() {
            log::trace!(target: "parser", "finished translating '{finished}'");
        }
        let body_text = or_skip(body.into_text());
        Ok(format!(
            "proctype {name}({params}) {{\n{}\n}}",
            indent(&body_text)
        ))
    }

    fn parameter_list(&mut self) -> Result<String, TranslateError> {
        self.expect(TokenKind::LParen)?;
        if self.current.kind == TokenKind::RParen {
            self.advance()?;
            return Ok(String::new());
        }
        if self.current.kind == TokenKind::Void {
            // a lone `void` parameter list
            self.advance()?;
            self.expect(TokenKind::RParen)?;
            return Ok(String::new());
        }
        let mut params = Vec::new();
        loop {
            let ty = self.type_specifier()?;
            let name = self.expect_ident()?;
            let mut param = format!("{ty} {name}");
            while self.current.kind == TokenKind::LBracket {
                self.advance()?;
                if self.current.kind != TokenKind::RBracket {
                    let size = self.expression()?;
                    param.push_str(&format!("[{size}]"));
                } else {
                    param.push_str("[]");
                }
                self.expect(TokenKind::RBracket)?;
            }
            params.push(param);
            if self.current.kind == TokenKind::Comma {
                self.advance()?;
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params.join("; "))
    }

    fn statement_list(&mut self, end: TokenKind) -> Result<Frag, TranslateError> {
        let mut frags = Vec::new();
        while self.current.kind != end && self.current.kind != TokenKind::Eof {
            frags.push(self.statement()?);
        }
        Ok(combine(frags))
    }

    fn statement(&mut self) -> Result<Frag, TranslateError> {
        match self.current.kind {
            TokenKind::Semi => {
                self.advance()?;
                Ok(Frag::Normal("skip;".to_owned()))
            }
            TokenKind::LBrace => {
                self.advance()?;
                let body = self.statement_list(TokenKind::RBrace)?;
                self.expect(TokenKind::RBrace)?;
                Ok(body)
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Do => self.do_while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Switch => self.switch_statement(),
            TokenKind::Break => self.break_statement(),
            TokenKind::Continue => {
                self.advance()?;
                self.expect(TokenKind::Semi)?;
                Ok(Frag::Continue("skip;".to_owned()))
            }
            TokenKind::Return => self.return_statement(),
            TokenKind::Printf => self.printf_statement(),
            TokenKind::TypeName | TokenKind::Struct => self.declaration().map(Frag::Normal),
            kind if kind.is_base_type() => self.declaration().map(Frag::Normal),
            TokenKind::Ident | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let text = self.expr_statement_core()?;
                self.expect(TokenKind::Semi)?;
                Ok(Frag::Normal(format!("{text};")))
            }
            _ => Err(self.syntax_error(vec!["statement".to_owned()])),
        }
    }

    fn if_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let then = self.statement()?;
        if self.current.kind == TokenKind::Else {
            self.advance()?;
            let els = self.statement()?;
            Ok(Frag::Normal(render_if(
                &cond,
                &then.into_text(),
                &els.into_text(),
            )))
        } else {
            match then {
                Frag::Continue(text) => Ok(Frag::IfContinue { cond, then: text }),
                other => Ok(Frag::Normal(render_if(&cond, &other.into_text(), ""))),
            }
        }
    }

    fn while_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        self.ctx.breakables.push(Breakable::Loop);
        let body = self.statement()?;
        self.ctx.breakables.pop();
        let body_text = or_skip(body.into_text());
        Ok(Frag::Normal(format!(
            "do\n:: !{} -> break;\n:: else ->\n{}\nod;",
            guard(&cond),
            indent(&body_text)
        )))
    }

    fn do_while_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        let label = format!("do_label_{}", self.ctx.label_count);
        self.ctx.label_count += 1;
        self.ctx.breakables.push(Breakable::Loop);
        let body = self.statement()?;
        self.ctx.breakables.pop();
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semi)?;
        let body_text = or_skip(body.into_text());
        Ok(Frag::Normal(format!(
            "{label}:\n{body_text}\nif\n:: {} -> goto {label};\n:: else -> skip;\nfi;",
            guard(&cond)
        )))
    }

    fn for_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let init = if self.current.kind != TokenKind::Semi {
            Some(self.expr_statement_core()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        let cond = if self.current.kind != TokenKind::Semi {
            self.expression()?
        } else {
            "true".to_owned()
        };
        self.expect(TokenKind::Semi)?;
        let incr = if self.current.kind != TokenKind::RParen {
            format!("{};", self.expr_statement_core()?)
        } else {
            "skip;".to_owned()
        };
        self.expect(TokenKind::RParen)?;
        self.ctx.breakables.push(Breakable::Loop);
        let body = self.statement()?;
        self.ctx.breakables.pop();
        let body_full = or_skip(join_stmts(body.into_text(), incr));
        let loop_text = format!(
            "do\n:: !{} -> break;\n:: else ->\n{}\nod;",
            guard(&cond),
            indent(&body_full)
        );
        Ok(Frag::Normal(match init {
            Some(init) => format!("{init};\n{loop_text}"),
            None => loop_text,
        }))
    }

    /// `switch` becomes a guarded `if`: one `(scrutinee == value)` arm per
    /// case in source order and a final `:: else ->` arm holding the
    /// `default` body, last regardless of where `default` appeared.
    fn switch_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        self.expect(TokenKind::LParen)?;
        let scrutinee = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let saved = self.ctx.switch_expr.replace(scrutinee);
        self.ctx.breakables.push(Breakable::Switch);
        self.expect(TokenKind::LBrace)?;
        let mut arms = Vec::new();
        let mut default_body = None;
        while self.current.kind != TokenKind::RBrace {
            match self.current.kind {
                TokenKind::Case => {
                    self.advance()?;
                    let value = self.expression()?;
                    self.expect(TokenKind::Colon)?;
                    let body = self.case_body()?;
                    arms.push((value, body));
                }
                TokenKind::Default => {
                    self.advance()?;
                    self.expect(TokenKind::Colon)?;
                    default_body = Some(self.case_body()?);
                }
                _ => {
                    return Err(self.expected_kinds(&[
                        TokenKind::Case,
                        TokenKind::Default,
                        TokenKind::RBrace,
                    ]));
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.ctx.breakables.pop();
        let scrutinee = self
            .ctx
            .switch_expr
            .take()
            .unwrap_or_default();
        self.ctx.switch_expr = saved;
        let mut out = String::from("if\n");
        for (value, body) in arms {
            out.push_str(&format!(
                ":: ({scrutinee} == {value}) ->\n{}\n",
                indent(&or_skip(body))
            ));
        }
        let default_text = or_skip(default_body.unwrap_or_default());
        if default_text == "skip;" {
            out.push_str(":: else -> skip;\n");
        } else {
            out.push_str(&format!(":: else ->\n{}\n", indent(&default_text)));
        }
        out.push_str("fi;");
        Ok(Frag::Normal(out))
    }

    fn case_body(&mut self) -> Result<String, TranslateError> {
        let mut frags = Vec::new();
        while !matches!(
            self.current.kind,
            TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
        ) {
            frags.push(self.statement()?);
        }
        Ok(combine(frags).into_text())
    }

    fn break_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        self.expect(TokenKind::Semi)?;
        // inside a switch arm a break is implied by the guarded if
        match self.ctx.breakables.last() {
            Some(Breakable::Switch) => Ok(Frag::Normal(String::new())),
            _ => Ok(Frag::Normal("break;".to_owned())),
        }
    }

    fn return_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        if self.current.kind == TokenKind::Semi {
            self.advance()?;
            Ok(Frag::Normal("return;".to_owned()))
        } else {
            let expr = self.expression()?;
            self.expect(TokenKind::Semi)?;
            Ok(Frag::Normal(format!("return {expr};")))
        }
    }

    /// `printf` arguments pass through verbatim, sliced out of the source
    /// between the balanced parentheses.
    fn printf_statement(&mut self) -> Result<Frag, TranslateError> {
        self.advance()?;
        let lparen = self.expect(TokenKind::LParen)?;
        let raw_start = lparen.end;
        let mut depth = 1usize;
        let raw_end;
        loop {
            match self.current.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        raw_end = self.current.start;
                        break;
                    }
                }
                TokenKind::Eof => {
                    return Err(self.expected_kinds(&[TokenKind::RParen]));
                }
                _ => {}
            }
            self.advance()?;
        }
        self.advance()?;
        self.expect(TokenKind::Semi)?;
        let raw = self.source[raw_start..raw_end].trim();
        Ok(Frag::Normal(format!("printf({raw});")))
    }

    fn declaration(&mut self) -> Result<String, TranslateError> {
        let ty = self.type_specifier()?;
        let name = self.expect_ident()?;
        self.finish_declaration(ty, name)
    }

    /// Declarator list after the type and first name; a comma list is
    /// split into one declaration per line.
    fn finish_declaration(&mut self, ty: String, first: String) -> Result<String, TranslateError> {
        let mut decls = Vec::new();
        let mut name = first;
        loop {
            let mut decl = format!("{ty} {name}");
            while self.current.kind == TokenKind::LBracket {
                self.advance()?;
                let size = self.expression()?;
                self.expect(TokenKind::RBracket)?;
                decl.push_str(&format!("[{size}]"));
            }
            if self.current.kind == TokenKind::Assign {
                self.advance()?;
                let init = self.expression()?;
                decl.push_str(&format!(" = {init}"));
            }
            decl.push(';');
            decls.push(decl);
            if self.current.kind == TokenKind::Comma {
                self.advance()?;
                name = self.expect_ident()?;
            } else {
                break;
            }
        }
        self.expect(TokenKind::Semi)?;
        Ok(decls.join("\n"))
    }

    /// Assignment, compound assignment, increment/decrement or a bare
    /// call, without the trailing `;` (shared with `for` headers).
    fn expr_statement_core(&mut self) -> Result<String, TranslateError> {
        match self.current.kind {
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = self.advance()?.kind;
                let target = self.postfix_expression()?;
                Ok(incdec(&target, op))
            }
            _ => {
                let lhs = self.postfix_expression()?;
                match self.current.kind {
                    TokenKind::Assign => {
                        self.advance()?;
                        let rhs = self.expression()?;
                        Ok(format!("{lhs} = {rhs}"))
                    }
                    TokenKind::PlusEq
                    | TokenKind::MinusEq
                    | TokenKind::StarEq
                    | TokenKind::SlashEq
                    | TokenKind::PercentEq => {
                        let op = match self.advance()?.kind {
                            TokenKind::PlusEq => "+",
                            TokenKind::MinusEq => "-",
                            TokenKind::StarEq => "*",
                            TokenKind::SlashEq => "/",
                            _ => "%",
                        };
                        let rhs = self.expression()?;
                        Ok(format!("{lhs} = ({lhs} {op} {rhs})"))
                    }
                    TokenKind::PlusPlus | TokenKind::MinusMinus => {
                        let op = self.advance()?.kind;
                        Ok(incdec(&lhs, op))
                    }
                    _ => Ok(lhs),
                }
            }
        }
    }

    fn expression(&mut self) -> Result<String, TranslateError> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<String, TranslateError> {
        let cond = self.binary(1)?;
        if self.current.kind == TokenKind::Question {
            self.advance()?;
            let then = self.expression()?;
            self.expect(TokenKind::Colon)?;
            let els = self.ternary()?;
            Ok(format!("({cond} -> {then} : {els})"))
        } else {
            Ok(cond)
        }
    }

    /// Precedence-climbing loop over the binary operators; every reduction
    /// parenthesizes its output.
    fn binary(&mut self, min_prec: u8) -> Result<String, TranslateError> {
        let mut lhs = self.unary()?;
        while let Some((prec, op)) = binary_op(self.current.kind) {
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let rhs = self.binary(prec + 1)?;
            lhs = format!("({lhs} {op} {rhs})");
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<String, TranslateError> {
        match self.current.kind {
            TokenKind::Bang => {
                self.advance()?;
                let operand = self.unary()?;
                Ok(format!("(!{operand})"))
            }
            TokenKind::Tilde => {
                self.advance()?;
                let operand = self.unary()?;
                Ok(format!("(~{operand})"))
            }
            TokenKind::Minus => {
                self.advance()?;
                // a negated literal stays a plain literal
                if self.current.kind == TokenKind::Number {
                    let number = self.advance()?.text;
                    Ok(format!("-{number}"))
                } else {
                    let operand = self.unary()?;
                    Ok(format!("(-{operand})"))
                }
            }
            _ => self.postfix_expression(),
        }
    }

    fn postfix_expression(&mut self) -> Result<String, TranslateError> {
        let mut expr = self.primary()?;
        loop {
            match self.current.kind {
                TokenKind::LParen => {
                    self.advance()?;
                    let mut args = Vec::new();
                    if self.current.kind != TokenKind::RParen {
                        loop {
                            args.push(self.expression()?);
                            if self.current.kind == TokenKind::Comma {
                                self.advance()?;
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    expr = format!("{expr}({})", args.join(", "));
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = format!("{expr}[{index}]");
                }
                TokenKind::Dot => {
                    self.advance()?;
                    let field = self.expect_ident()?;
                    expr = format!("{expr}.{field}");
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<String, TranslateError> {
        match self.current.kind {
            TokenKind::Number
            | TokenKind::Ident
            | TokenKind::StringLit
            | TokenKind::CharLit => Ok(self.advance()?.text),
            TokenKind::LParen => {
                self.advance()?;
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                // reductions parenthesize already
                Ok(inner)
            }
            _ => Err(self.syntax_error(vec!["expression".to_owned()])),
        }
    }
}

fn incdec(target: &str, op: TokenKind) -> String {
    if op == TokenKind::PlusPlus {
        format!("{target} = {target} + 1")
    } else {
        format!("{target} = {target} - 1")
    }
}

fn binary_op(kind: TokenKind) -> Option<(u8, &'static str)> {
    match kind {
        TokenKind::OrOr => Some((1, "||")),
        TokenKind::AndAnd => Some((2, "&&")),
        TokenKind::Pipe => Some((3, "|")),
        TokenKind::Caret => Some((4, "^")),
        TokenKind::Amp => Some((5, "&")),
        TokenKind::EqEq => Some((6, "==")),
        TokenKind::NotEq => Some((6, "!=")),
        TokenKind::Lt => Some((7, "<")),
        TokenKind::Gt => Some((7, ">")),
        TokenKind::Le => Some((7, "<=")),
        TokenKind::Ge => Some((7, ">=")),
        TokenKind::Shl => Some((8, "<<")),
        TokenKind::Shr => Some((8, ">>")),
        TokenKind::Plus => Some((9, "+")),
        TokenKind::Minus => Some((9, "-")),
        TokenKind::Star => Some((10, "*")),
        TokenKind::Slash => Some((10, "/")),
        TokenKind::Percent => Some((10, "%")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_pass_through() {
        let out = translate_source("int x;\nint y = 5;\nint buf[8];").unwrap();
        assert_eq!(out, "int x;\nint y = 5;\nint buf[8];");
    }

    #[test]
    fn expressions_parenthesize() {
        let out = translate_source("void f() { x = a + b * c; }").unwrap();
        assert!(out.contains("x = (a + (b * c));"));
    }

    #[test]
    fn struct_definition_registers_type() {
        let out = translate_source("struct Pair { int a; int b; };\nPair p;").unwrap();
        assert_eq!(out, "typedef Pair {\n  int a;\n  int b\n}\nPair p;");
    }

    #[test]
    fn struct_declarator_declares_variable() {
        let out =
            translate_source("struct Node { int v; } n;\nvoid f() { n.v = 1; }").unwrap();
        assert!(out.contains("typedef Node {\n  int v\n}\nNode n;"));
        assert!(out.contains("n.v = 1;"));
        // the declarator is a variable, not a type alias
        assert!(!out.contains("typedef n"));
    }

    #[test]
    fn anonymous_struct_declarator_gets_synthesized_type() {
        let out = translate_source("struct { int v; } cfg;").unwrap();
        assert!(out.contains("typedef AnonStruct0 {\n  int v\n}\nAnonStruct0 cfg;"));
    }

    #[test]
    fn typedef_alias_usable_immediately() {
        let out =
            translate_source("typedef struct { int a; } Pair;\nPair p;").unwrap();
        assert!(out.starts_with("typedef Pair {"));
        assert!(out.ends_with("Pair p;"));
    }

    #[test]
    fn continue_discards_rest_of_list() {
        let out =
            translate_source("void f() { while (x) { continue; x = 99; } }").unwrap();
        assert!(!out.contains("99"));
    }

    #[test]
    fn if_continue_restructures() {
        let out = translate_source(
            "void f() { while (i < 10) { if (i == 5) { continue; } i = i + 1; } }",
        )
        .unwrap();
        assert!(out.contains(
            "if\n    :: (i == 5) ->\n      skip;\n    :: else ->\n      i = (i + 1);\n    fi;"
        ));
    }

    #[test]
    fn switch_default_emitted_last() {
        let out = translate_source(
            "void f() { switch (x) { default: y = 0; break; case 1: y = 1; break; } }",
        )
        .unwrap();
        let guard_pos = out.find(":: (x == 1) ->").unwrap();
        let else_pos = out.find(":: else ->").unwrap();
        assert!(guard_pos < else_pos);
    }

    #[test]
    fn break_in_loop_survives() {
        let out = translate_source("void f() { while (1) { break; } }").unwrap();
        assert!(out.contains("break;"));
    }

    #[test]
    fn unexpected_token_reports_expected_set() {
        let err = translate_source("void f() { if x }").unwrap_err();
        match err {
            TranslateError::Syntax(e) => {
                assert_eq!(e.found, "'x'");
                assert!(e.expected.contains(&"'('".to_owned()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
