use std::fmt;
use std::fmt::Formatter;
use strum_macros::{Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    String(String),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(x) => write!(f, "{}", x),
            Literal::Bool(x) => write!(f, "{}", x),
            Literal::String(x) => write!(f, "\"{}\"", x),
            Literal::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "&")]
    And,
    #[strum(serialize = "|")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum UnaryOp {
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    Super,
    Object(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub line: usize,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Literal),
    Variable(String),
    Me,
    Binary {
        operator: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },
    Call {
        receiver: Receiver,
        method: String,
        arguments: Vec<Expression>,
    },
    New(String),
}

pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl Expression {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Expression, T>) -> T {
        v.visit(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Int,
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub type_name: String,
    pub name: String,
    pub initializer: Option<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum StatementKind {
    #[strum(serialize = "begin")]
    Begin(Vec<Statement>),
    #[strum(serialize = "set")]
    Set { name: String, value: Expression },
    #[strum(serialize = "if")]
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    #[strum(serialize = "while")]
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    #[strum(serialize = "return")]
    Return(Option<Expression>),
    // Always an `ExpressionKind::Call`; the result is discarded.
    #[strum(serialize = "call")]
    Call(Expression),
    #[strum(serialize = "print")]
    Print(Vec<Expression>),
    #[strum(serialize = "input")]
    Input { target: String, kind: InputKind },
    #[strum(serialize = "let")]
    Let {
        locals: Vec<LocalDecl>,
        body: Vec<Statement>,
    },
}

impl Statement {
    pub fn accept<T>(&self, v: &mut dyn Visitor<Statement, T>) -> T {
        v.visit(self)
    }
    pub fn name(&self) -> &'static str {
        (&self.kind).into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub type_name: String,
    pub name: String,
    pub default: Option<Literal>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub return_type: String,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub body: Statement,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    // `Some` only for `tclass` declarations.
    pub type_params: Option<Vec<String>>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

/// Renders expressions back into their S-expression surface form, for error
/// messages.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize(&mut self, name: &str, args: Vec<&Expression>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(arg.accept(self).as_str());
        }
        x.push(')');
        x
    }
}

impl Visitor<Expression, String> for AstPrinter {
    fn visit(&mut self, n: &Expression) -> String {
        match &n.kind {
            ExpressionKind::Literal(x) => x.to_string(),
            ExpressionKind::Variable(x) => x.clone(),
            ExpressionKind::Me => String::from("me"),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => self.parenthesize(&operator.to_string(), vec![left.as_ref(), right.as_ref()]),
            ExpressionKind::Unary { operator, operand } => {
                self.parenthesize(&operator.to_string(), vec![operand.as_ref()])
            }
            ExpressionKind::Call {
                receiver,
                method,
                arguments,
            } => {
                let target = match receiver {
                    Receiver::Super => String::from("super"),
                    Receiver::Object(x) => x.accept(self),
                };
                let head = format!("call {} {}", target, method);
                self.parenthesize(&head, arguments.iter().collect())
            }
            ExpressionKind::New(class) => format!("(new {})", class),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.accept(&mut AstPrinter {}))
    }
}
