//! Statement execution and expression evaluation for one method activation.

use crate::ast::{
    BinaryOp, Expression, ExpressionKind, InputKind, LocalDecl, Receiver, Statement,
    StatementKind, UnaryOp, Visitor,
};
use crate::environment::Environment;
use crate::error::{InterpreterError, Result};
use crate::instance::Instance;
use crate::interpreter::Interpreter;
use crate::types::Type;
use crate::value::Value;
use std::collections::BTreeSet;

// With less than the red zone left, evaluation moves to a new stack segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Flow {
    Proceed,
    /// A `return` ran on the given line. A bare `return` carries `Nothing`.
    Return(Value, usize),
}

pub struct Frame<'i> {
    interpreter: &'i mut Interpreter,
    this: Instance,
    environment: Environment,
}

impl<'i> Frame<'i> {
    pub fn new(interpreter: &'i mut Interpreter, this: Instance, environment: Environment) -> Self {
        Frame {
            interpreter,
            this,
            environment,
        }
    }
    pub fn execute(&mut self, stmt: &Statement) -> Result<Flow> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || stmt.accept(self))
    }
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || expr.accept(self))
    }

    fn execute_block(&mut self, statements: &[Statement]) -> Result<Flow> {
        for statement in statements {
            if let Flow::Return(value, line) = self.execute(statement)? {
                return Ok(Flow::Return(value, line));
            }
        }
        Ok(Flow::Proceed)
    }

    fn execute_let(&mut self, locals: &[LocalDecl], body: &[Statement], line: usize) -> Result<Flow> {
        let mut seen = BTreeSet::new();
        let mut bindings = Vec::with_capacity(locals.len());
        for local in locals {
            if !seen.insert(local.name.as_str()) {
                return Err(InterpreterError::name(
                    format!("duplicate local variable {}", local.name),
                    Some(line),
                ));
            }
            let ty = match self.declared_type(&local.type_name) {
                Some(Type::Nothing) | None => {
                    return Err(InterpreterError::type_error(
                        format!("invalid type {} for local {}", local.type_name, local.name),
                        Some(line),
                    ))
                }
                Some(ty) => ty,
            };
            let value = match &local.initializer {
                Some(literal) => Value::from_literal(literal),
                None => Value::zero(&ty),
            };
            if !self.interpreter.registry().compatible(&ty, &value.runtime_type()) {
                return Err(InterpreterError::type_error(
                    format!("type mismatch initializing local {} of type {}", local.name, ty),
                    Some(line),
                ));
            }
            let value = value.typed_as(&ty);
            bindings.push((local.name.as_str(), ty, value));
        }

        self.environment.start_block();
        for (name, ty, value) in bindings {
            self.environment.define(name, ty, value);
        }
        let flow = self.execute_block(body);
        self.environment.end_block();
        flow
    }

    /// Resolves a type name used inside this method's body, honouring the
    /// bindings of a specialized generic class.
    fn declared_type(&self, type_name: &str) -> Option<Type> {
        let resolved = self.this.class().resolve_type_name(type_name);
        self.interpreter.registry().resolve(&resolved)
    }

    fn condition(&mut self, expr: &Expression, statement: &str, line: usize) -> Result<bool> {
        match self.evaluate(expr)? {
            Value::Bool(x) => Ok(x),
            other => Err(InterpreterError::type_error(
                format!(
                    "non-boolean {} condition {} ({})",
                    statement,
                    expr,
                    other.runtime_type()
                ),
                Some(line),
            )),
        }
    }

    /// Stores into a local if one is in scope, otherwise into a field of the
    /// current object level.
    fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if value.is_nothing() {
            return Err(InterpreterError::type_error(
                format!("cannot assign a void result to {}", name),
                Some(line),
            ));
        }
        let (declared, is_local) = match self.environment.get(name) {
            Some(binding) => (binding.ty.clone(), true),
            None => match self.this.field_type(name) {
                Some(ty) => (ty, false),
                None => {
                    return Err(InterpreterError::name(
                        format!("unknown variable {}", name),
                        Some(line),
                    ))
                }
            },
        };
        let actual = value.runtime_type();
        if !self.interpreter.registry().compatible(&declared, &actual) {
            return Err(InterpreterError::type_error(
                format!("cannot assign {} to {} of type {}", actual, name, declared),
                Some(line),
            ));
        }
        let value = value.typed_as(&declared);
        if is_local {
            self.environment.assign(name, value);
        } else {
            self.this.set_field(name, value);
        }
        Ok(())
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(binding) = self.environment.get(name) {
            return Ok(binding.value.clone());
        }
        self.this.get_field(name).ok_or_else(|| {
            InterpreterError::name(format!("unknown variable {}", name), Some(line))
        })
    }

    fn call(
        &mut self,
        receiver: &Receiver,
        method: &str,
        arguments: &[Expression],
        line: usize,
    ) -> Result<Value> {
        let target = match receiver {
            Receiver::Super => self.this.superobject().ok_or_else(|| {
                InterpreterError::name(
                    format!("class {} has no superclass", self.this.class_name()),
                    Some(line),
                )
            })?,
            Receiver::Object(expr) => match self.evaluate(expr)? {
                Value::Object(instance) => instance,
                Value::Null(_) => {
                    return Err(InterpreterError::fault(
                        format!("null dereference calling {}", method),
                        Some(line),
                    ))
                }
                other => {
                    return Err(InterpreterError::type_error(
                        format!(
                            "cannot call {} on a value of type {}",
                            method,
                            other.runtime_type()
                        ),
                        Some(line),
                    ))
                }
            },
        };
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }
        target.call_method(self.interpreter, method, values, Some(line))
    }

    fn binary(&self, operator: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value> {
        let invalid = |ty: &str| {
            InterpreterError::type_error(
                format!("invalid operator {} applied to {}", operator, ty),
                Some(line),
            )
        };
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => integer_op(operator, l, r, line),
            (Value::String(l), Value::String(r)) => match operator {
                BinaryOp::Add => Ok(Value::String(l + &r)),
                BinaryOp::Equal => Ok(Value::Bool(l == r)),
                BinaryOp::NotEqual => Ok(Value::Bool(l != r)),
                BinaryOp::Less => Ok(Value::Bool(l < r)),
                BinaryOp::LessEqual => Ok(Value::Bool(l <= r)),
                BinaryOp::Greater => Ok(Value::Bool(l > r)),
                BinaryOp::GreaterEqual => Ok(Value::Bool(l >= r)),
                _ => Err(invalid("strings")),
            },
            (Value::Bool(l), Value::Bool(r)) => match operator {
                BinaryOp::And => Ok(Value::Bool(l && r)),
                BinaryOp::Or => Ok(Value::Bool(l || r)),
                BinaryOp::Equal => Ok(Value::Bool(l == r)),
                BinaryOp::NotEqual => Ok(Value::Bool(l != r)),
                _ => Err(invalid("booleans")),
            },
            (l, r) if l.runtime_type().is_class() && r.runtime_type().is_class() => {
                let (lt, rt) = (l.runtime_type(), r.runtime_type());
                if !self.interpreter.registry().comparable(&lt, &rt) {
                    return Err(InterpreterError::type_error(
                        format!("operator {} applied to unrelated types {} and {}", operator, lt, rt),
                        Some(line),
                    ));
                }
                let same = match (&l, &r) {
                    (Value::Object(a), Value::Object(b)) => a.equals(b),
                    (Value::Null(_), Value::Null(_)) => true,
                    _ => false,
                };
                match operator {
                    BinaryOp::Equal => Ok(Value::Bool(same)),
                    BinaryOp::NotEqual => Ok(Value::Bool(!same)),
                    _ => Err(invalid("objects")),
                }
            }
            (l, r) => Err(InterpreterError::type_error(
                format!(
                    "operator {} applied to incompatible types {} and {}",
                    operator,
                    l.runtime_type(),
                    r.runtime_type()
                ),
                Some(line),
            )),
        }
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(l: i64, r: i64) -> Option<i64> {
    let q = l.checked_div(r)?;
    if l % r != 0 && ((l < 0) != (r < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

/// Remainder matching `floor_div`: takes the sign of the divisor.
fn floor_mod(l: i64, r: i64) -> Option<i64> {
    // `i64::MIN % -1` overflows in the hardware instruction, not in the result.
    if r == -1 {
        return Some(0);
    }
    let m = l.checked_rem(r)?;
    if m != 0 && ((m < 0) != (r < 0)) {
        Some(m + r)
    } else {
        Some(m)
    }
}

fn integer_op(operator: BinaryOp, l: i64, r: i64, line: usize) -> Result<Value> {
    let arithmetic = |result: Option<i64>| {
        result.map(Value::Int).ok_or_else(|| {
            let message = if r == 0 && (operator == BinaryOp::Divide || operator == BinaryOp::Modulo) {
                "division by zero".to_string()
            } else {
                format!("integer overflow in {} {} {}", l, operator, r)
            };
            InterpreterError::fault(message, Some(line))
        })
    };
    match operator {
        BinaryOp::Add => arithmetic(l.checked_add(r)),
        BinaryOp::Subtract => arithmetic(l.checked_sub(r)),
        BinaryOp::Multiply => arithmetic(l.checked_mul(r)),
        BinaryOp::Divide => arithmetic(floor_div(l, r)),
        BinaryOp::Modulo => arithmetic(floor_mod(l, r)),
        BinaryOp::Equal => Ok(Value::Bool(l == r)),
        BinaryOp::NotEqual => Ok(Value::Bool(l != r)),
        BinaryOp::Less => Ok(Value::Bool(l < r)),
        BinaryOp::LessEqual => Ok(Value::Bool(l <= r)),
        BinaryOp::Greater => Ok(Value::Bool(l > r)),
        BinaryOp::GreaterEqual => Ok(Value::Bool(l >= r)),
        BinaryOp::And | BinaryOp::Or => Err(InterpreterError::type_error(
            format!("invalid operator {} applied to ints", operator),
            Some(line),
        )),
    }
}

impl<'i> Visitor<Statement, Result<Flow>> for Frame<'i> {
    fn visit(&mut self, stmt: &Statement) -> Result<Flow> {
        if self.interpreter.config().trace {
            log::trace!("line {}: {} in {}", stmt.line, stmt.name(), self.this.class_name());
        }
        match &stmt.kind {
            StatementKind::Begin(statements) => self.execute_block(statements),
            StatementKind::Set { name, value } => {
                let value = self.evaluate(value)?;
                self.assign(name, value, stmt.line)?;
                Ok(Flow::Proceed)
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.condition(condition, "if", stmt.line)? {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Proceed)
                }
            }
            StatementKind::While { condition, body } => {
                while self.condition(condition, "while", stmt.line)? {
                    if let Flow::Return(value, line) = self.execute(body)? {
                        return Ok(Flow::Return(value, line));
                    }
                }
                Ok(Flow::Proceed)
            }
            StatementKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nothing,
                };
                Ok(Flow::Return(value, stmt.line))
            }
            StatementKind::Call(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Proceed)
            }
            StatementKind::Print(arguments) => {
                let mut output = String::new();
                for argument in arguments {
                    output.push_str(&self.evaluate(argument)?.to_string());
                }
                self.interpreter.output(&output);
                Ok(Flow::Proceed)
            }
            StatementKind::Input { target, kind } => {
                let text = self.interpreter.get_input().ok_or_else(|| {
                    InterpreterError::fault("no more input available", Some(stmt.line))
                })?;
                let value = match kind {
                    InputKind::String => Value::String(text),
                    InputKind::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        InterpreterError::type_error(
                            format!("input {:?} is not an integer", text),
                            Some(stmt.line),
                        )
                    })?,
                };
                self.assign(target, value, stmt.line)?;
                Ok(Flow::Proceed)
            }
            StatementKind::Let { locals, body } => self.execute_let(locals, body, stmt.line),
        }
    }
}

impl<'i> Visitor<Expression, Result<Value>> for Frame<'i> {
    fn visit(&mut self, expr: &Expression) -> Result<Value> {
        match &expr.kind {
            ExpressionKind::Literal(literal) => Ok(Value::from_literal(literal)),
            ExpressionKind::Variable(name) => self.lookup(name, expr.line),
            ExpressionKind::Me => Ok(Value::Object(self.this.clone())),
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary(*operator, left, right, expr.line)
            }
            ExpressionKind::Unary {
                operator: UnaryOp::Not,
                operand,
            } => match self.evaluate(operand)? {
                Value::Bool(x) => Ok(Value::Bool(!x)),
                other => Err(InterpreterError::type_error(
                    format!("invalid operator ! applied to {}", other.runtime_type()),
                    Some(expr.line),
                )),
            },
            ExpressionKind::Call {
                receiver,
                method,
                arguments,
            } => self.call(receiver, method, arguments, expr.line),
            ExpressionKind::New(class) => {
                let class = self.this.class().resolve_type_name(class);
                let instance = self.interpreter.instantiate(&class, Some(expr.line))?;
                Ok(Value::Object(instance))
            }
        }
    }
}

#[cfg(test)]
mod frame_tests {
    use super::*;

    #[test]
    fn floor_division() {
        assert_eq!(floor_div(7, 2), Some(3));
        assert_eq!(floor_div(-7, 2), Some(-4));
        assert_eq!(floor_div(7, -2), Some(-4));
        assert_eq!(floor_div(-7, -2), Some(3));
        assert_eq!(floor_div(-8, 2), Some(-4));
        assert_eq!(floor_div(1, 0), None);
        assert_eq!(floor_div(i64::MIN, -1), None);
    }

    #[test]
    fn floor_modulo() {
        assert_eq!(floor_mod(7, 3), Some(1));
        assert_eq!(floor_mod(-7, 2), Some(1));
        assert_eq!(floor_mod(7, -2), Some(-1));
        assert_eq!(floor_mod(-7, -2), Some(-1));
        assert_eq!(floor_mod(-6, 3), Some(0));
        assert_eq!(floor_mod(5, 0), None);
        assert_eq!(floor_mod(i64::MIN, -1), Some(0));
        assert_eq!(floor_mod(-9, -1), Some(0));
    }

    #[test]
    fn integer_faults() {
        let err = integer_op(BinaryOp::Divide, 3, 0, 4).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Fault);
        assert_eq!(err.message, "division by zero");
        let err = integer_op(BinaryOp::Add, i64::MAX, 1, 4).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Fault);
        let err = integer_op(BinaryOp::And, 1, 1, 4).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Type);
    }
}
