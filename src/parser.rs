use crate::ast::{
    BinaryOp, ClassDecl, Expression, ExpressionKind, FieldDecl, InputKind, Literal, LocalDecl,
    MethodDecl, ParamDecl, Program, Receiver, Statement, StatementKind, UnaryOp,
};
use crate::error::{InterpreterError, Result};
use crate::token::{Token, TokenType};
use crate::types::TYPE_SEPARATOR;
use phf::phf_map;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Begin,
    Set,
    If,
    While,
    Return,
    Call,
    Print,
    InputI,
    InputS,
    Let,
    New,
    Try,
    Throw,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "begin" => Keyword::Begin,
    "set" => Keyword::Set,
    "if" => Keyword::If,
    "while" => Keyword::While,
    "return" => Keyword::Return,
    "call" => Keyword::Call,
    "print" => Keyword::Print,
    "inputi" => Keyword::InputI,
    "inputs" => Keyword::InputS,
    "let" => Keyword::Let,
    "new" => Keyword::New,
    "try" => Keyword::Try,
    "throw" => Keyword::Throw,
};

/// A token tree: either a single token or a parenthesized list, with the line
/// of its opening parenthesis.
#[derive(Debug, Clone, PartialEq)]
enum SExpr {
    Atom(Token),
    List(Vec<SExpr>, usize),
}

impl SExpr {
    fn line(&self) -> usize {
        match self {
            SExpr::Atom(token) => token.line,
            SExpr::List(_, line) => *line,
        }
    }
    fn as_list(&self, what: &str) -> Result<&[SExpr]> {
        match self {
            SExpr::List(items, _) => Ok(items),
            SExpr::Atom(token) => Err(InterpreterError::syntax(
                format!("expected {} but found {}", what, token.lexeme),
                token.line,
            )),
        }
    }
    /// The atom's text, if this is a bare (non-string) atom.
    fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(token) if token.tokentype == TokenType::Atom => Some(&token.lexeme),
            _ => None,
        }
    }
    fn name(&self, what: &str) -> Result<String> {
        match self.atom() {
            Some(text) if !is_literal_atom(text) => Ok(text.to_string()),
            _ => Err(InterpreterError::syntax(format!("expected {}", what), self.line())),
        }
    }
}

fn is_literal_atom(text: &str) -> bool {
    matches!(text, "true" | "false" | "null") || text.parse::<i64>().is_ok()
}

struct Reader<'a> {
    tokens: &'a [Token],
    current: usize,
}

impl<'a> Reader<'a> {
    fn read_all(&mut self) -> Result<Vec<SExpr>> {
        let mut forms = Vec::new();
        while self.current < self.tokens.len() {
            forms.push(self.read()?);
        }
        Ok(forms)
    }
    fn read(&mut self) -> Result<SExpr> {
        let tokens = self.tokens;
        let token = &tokens[self.current];
        self.current += 1;
        match token.tokentype {
            TokenType::LeftParen => {
                let mut items = Vec::new();
                loop {
                    match self.tokens.get(self.current) {
                        None => {
                            return Err(InterpreterError::syntax(
                                "unbalanced parentheses: missing ')'",
                                token.line,
                            ))
                        }
                        Some(next) if next.tokentype == TokenType::RightParen => {
                            self.current += 1;
                            return Ok(SExpr::List(items, token.line));
                        }
                        Some(_) => items.push(self.read()?),
                    }
                }
            }
            TokenType::RightParen => Err(InterpreterError::syntax(
                "unbalanced parentheses: unexpected ')'",
                token.line,
            )),
            _ => Ok(SExpr::Atom(token.clone())),
        }
    }
}

pub fn parse(tokens: &[Token]) -> Result<Program> {
    let forms = Reader { tokens, current: 0 }.read_all()?;
    let mut program = Program::default();
    for form in &forms {
        program.classes.push(class_declaration(form)?);
    }
    Ok(program)
}

fn check_plain_name(name: &str, line: usize) -> Result<()> {
    if name.contains(TYPE_SEPARATOR) {
        return Err(InterpreterError::syntax(
            format!("{} may not contain '{}'", name, TYPE_SEPARATOR),
            line,
        ));
    }
    Ok(())
}

// (class Name [inherits Super] member*) | (tclass Name (T...) member*)
fn class_declaration(form: &SExpr) -> Result<ClassDecl> {
    let items = form.as_list("a class declaration")?;
    let line = form.line();
    let generic = match items.first().and_then(SExpr::atom) {
        Some("class") => false,
        Some("tclass") => true,
        _ => {
            return Err(InterpreterError::syntax(
                "expected class or tclass at top level",
                line,
            ))
        }
    };
    let name = items
        .get(1)
        .ok_or_else(|| InterpreterError::syntax("missing class name", line))?
        .name("a class name")?;
    check_plain_name(&name, line)?;

    let mut rest = &items[2..];
    let mut superclass = None;
    let mut type_params = None;
    if generic {
        let params = rest
            .first()
            .ok_or_else(|| InterpreterError::syntax("missing type parameters", line))?;
        let mut names = Vec::new();
        for param in params.as_list("a type parameter list")? {
            let param_name = param.name("a type parameter")?;
            check_plain_name(&param_name, param.line())?;
            names.push(param_name);
        }
        type_params = Some(names);
        rest = &rest[1..];
    } else if rest.first().and_then(SExpr::atom) == Some("inherits") {
        let parent = rest
            .get(1)
            .ok_or_else(|| InterpreterError::syntax("missing superclass name", line))?;
        superclass = Some(parent.name("a superclass name")?);
        rest = &rest[2..];
    }

    let mut fields = Vec::new();
    let mut methods = Vec::new();
    for member in rest {
        let parts = member.as_list("a field or method")?;
        match parts.first().and_then(SExpr::atom) {
            Some("field") => fields.push(field_declaration(parts, member.line())?),
            Some("method") => methods.push(method_declaration(parts, member.line())?),
            _ => {
                return Err(InterpreterError::syntax(
                    format!("invalid member in class {}", name),
                    member.line(),
                ))
            }
        }
    }
    Ok(ClassDecl {
        name,
        superclass,
        type_params,
        fields,
        methods,
        line,
    })
}

// (field Type name [literal])
fn field_declaration(parts: &[SExpr], line: usize) -> Result<FieldDecl> {
    if parts.len() != 3 && parts.len() != 4 {
        return Err(InterpreterError::syntax("malformed field declaration", line));
    }
    let default = match parts.get(3) {
        Some(value) => Some(literal(value)?),
        None => None,
    };
    Ok(FieldDecl {
        type_name: parts[1].name("a field type")?,
        name: parts[2].name("a field name")?,
        default,
        line,
    })
}

// (method ReturnType name ((Type p) ...) statement)
fn method_declaration(parts: &[SExpr], line: usize) -> Result<MethodDecl> {
    if parts.len() != 5 {
        return Err(InterpreterError::syntax("malformed method declaration", line));
    }
    let mut params = Vec::new();
    for param in parts[3].as_list("a parameter list")? {
        match param.as_list("a parameter")? {
            [ty, name] => params.push(ParamDecl {
                type_name: ty.name("a parameter type")?,
                name: name.name("a parameter name")?,
            }),
            _ => return Err(InterpreterError::syntax("malformed parameter", param.line())),
        }
    }
    Ok(MethodDecl {
        return_type: parts[1].name("a return type")?,
        name: parts[2].name("a method name")?,
        params,
        body: statement(&parts[4])?,
        line,
    })
}

fn literal(form: &SExpr) -> Result<Literal> {
    match form {
        SExpr::Atom(Token {
            tokentype: TokenType::String(text),
            ..
        }) => Ok(Literal::String(text.clone())),
        SExpr::Atom(token) => match token.lexeme.as_str() {
            "true" => Ok(Literal::Bool(true)),
            "false" => Ok(Literal::Bool(false)),
            "null" => Ok(Literal::Null),
            text => text.parse::<i64>().map(Literal::Int).map_err(|_| {
                InterpreterError::syntax(format!("expected a literal, found {}", text), token.line)
            }),
        },
        SExpr::List(_, line) => Err(InterpreterError::syntax("expected a literal", *line)),
    }
}

fn statement(form: &SExpr) -> Result<Statement> {
    let items = form.as_list("a statement")?;
    let line = form.line();
    let head = items.first().and_then(SExpr::atom).unwrap_or("");
    let keyword = KEYWORDS
        .get(head)
        .copied()
        .ok_or_else(|| InterpreterError::syntax(format!("unknown statement {}", head), line))?;
    let malformed = || InterpreterError::syntax(format!("malformed {} statement", head), line);
    let kind = match keyword {
        Keyword::Begin => StatementKind::Begin(statements(&items[1..])?),
        Keyword::Set => match items {
            [_, name, value] => StatementKind::Set {
                name: name.name("a variable name")?,
                value: expression(value)?,
            },
            _ => return Err(malformed()),
        },
        Keyword::If => match items {
            [_, condition, then_branch] => StatementKind::If {
                condition: expression(condition)?,
                then_branch: Box::new(statement(then_branch)?),
                else_branch: None,
            },
            [_, condition, then_branch, else_branch] => StatementKind::If {
                condition: expression(condition)?,
                then_branch: Box::new(statement(then_branch)?),
                else_branch: Some(Box::new(statement(else_branch)?)),
            },
            _ => return Err(malformed()),
        },
        Keyword::While => match items {
            [_, condition, body] => StatementKind::While {
                condition: expression(condition)?,
                body: Box::new(statement(body)?),
            },
            _ => return Err(malformed()),
        },
        Keyword::Return => match items {
            [_] => StatementKind::Return(None),
            [_, value] => StatementKind::Return(Some(expression(value)?)),
            _ => return Err(malformed()),
        },
        Keyword::Call => StatementKind::Call(expression(form)?),
        Keyword::Print => StatementKind::Print(
            items[1..]
                .iter()
                .map(expression)
                .collect::<Result<Vec<_>>>()?,
        ),
        Keyword::InputI | Keyword::InputS => match items {
            [_, target] => StatementKind::Input {
                target: target.name("a variable name")?,
                kind: if keyword == Keyword::InputI {
                    InputKind::Int
                } else {
                    InputKind::String
                },
            },
            _ => return Err(malformed()),
        },
        Keyword::Let => {
            let decls = items.get(1).ok_or_else(malformed)?;
            let mut locals = Vec::new();
            for decl in decls.as_list("a local variable list")? {
                locals.push(local_declaration(decl)?);
            }
            StatementKind::Let {
                locals,
                body: statements(&items[2..])?,
            }
        }
        Keyword::New => {
            return Err(InterpreterError::syntax(
                "new is an expression, not a statement",
                line,
            ))
        }
        Keyword::Try | Keyword::Throw => {
            return Err(InterpreterError::syntax(
                format!("{} is not supported", head),
                line,
            ))
        }
    };
    Ok(Statement { line, kind })
}

fn statements(forms: &[SExpr]) -> Result<Vec<Statement>> {
    forms.iter().map(statement).collect()
}

// (Type name [literal])
fn local_declaration(form: &SExpr) -> Result<LocalDecl> {
    let parts = form.as_list("a local variable")?;
    if parts.len() != 2 && parts.len() != 3 {
        return Err(InterpreterError::syntax("malformed local variable", form.line()));
    }
    let initializer = match parts.get(2) {
        Some(value) => Some(literal(value)?),
        None => None,
    };
    Ok(LocalDecl {
        type_name: parts[0].name("a local variable type")?,
        name: parts[1].name("a local variable name")?,
        initializer,
    })
}

fn expression(form: &SExpr) -> Result<Expression> {
    let line = form.line();
    let kind = match form {
        SExpr::Atom(token) => match &token.tokentype {
            TokenType::String(_) => ExpressionKind::Literal(literal(form)?),
            _ => match token.lexeme.as_str() {
                "me" => ExpressionKind::Me,
                "super" => {
                    return Err(InterpreterError::syntax(
                        "super may only be used as a call target",
                        line,
                    ))
                }
                text if is_literal_atom(text) => ExpressionKind::Literal(literal(form)?),
                text => ExpressionKind::Variable(text.to_string()),
            },
        },
        SExpr::List(items, _) => {
            let head = items
                .first()
                .and_then(SExpr::atom)
                .ok_or_else(|| InterpreterError::syntax("expected an operator", line))?;
            match (head, items.len()) {
                ("call", n) if n >= 3 => {
                    let receiver = if items[1].atom() == Some("super") {
                        Receiver::Super
                    } else {
                        Receiver::Object(Box::new(expression(&items[1])?))
                    };
                    ExpressionKind::Call {
                        receiver,
                        method: items[2].name("a method name")?,
                        arguments: items[3..]
                            .iter()
                            .map(expression)
                            .collect::<Result<Vec<_>>>()?,
                    }
                }
                ("new", 2) => ExpressionKind::New(items[1].name("a class name")?),
                (op, 2) if op == UnaryOp::Not.to_string() => ExpressionKind::Unary {
                    operator: UnaryOp::Not,
                    operand: Box::new(expression(&items[1])?),
                },
                (op, n) => match BinaryOp::from_str(op) {
                    Ok(operator) if n == 3 => ExpressionKind::Binary {
                        operator,
                        left: Box::new(expression(&items[1])?),
                        right: Box::new(expression(&items[2])?),
                    },
                    _ => {
                        return Err(InterpreterError::syntax(
                            format!("malformed expression ({} ...)", op),
                            line,
                        ))
                    }
                },
            }
        }
    };
    Ok(Expression { line, kind })
}
