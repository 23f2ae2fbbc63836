use crate::ast::{MethodDecl, Statement};
use crate::environment::Environment;
use crate::error::{InterpreterError, Result};
use crate::frame::{Flow, Frame};
use crate::instance::Instance;
use crate::interpreter::Interpreter;
use crate::types::{substitute, Type, TypeRegistry};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub return_type: String,
    pub params: Vec<Param>,
    pub body: Rc<Statement>,
    pub line: usize,
}

impl fmt::Display for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect();
        write!(f, "{} {}({})", self.return_type, self.name, params.join(", "))
    }
}

fn resolve(registry: &TypeRegistry, type_name: &str, line: usize) -> Result<Type> {
    registry.resolve(type_name).ok_or_else(|| {
        InterpreterError::type_error(format!("invalid type {}", type_name), Some(line))
    })
}

impl MethodDef {
    pub fn from_decl(decl: &MethodDecl) -> MethodDef {
        MethodDef {
            name: decl.name.clone(),
            return_type: decl.return_type.clone(),
            params: decl
                .params
                .iter()
                .map(|p| Param {
                    type_name: p.type_name.clone(),
                    name: p.name.clone(),
                })
                .collect(),
            body: Rc::new(decl.body.clone()),
            line: decl.line,
        }
    }

    /// A copy with placeholder names in the signature replaced by their
    /// bindings. The body is shared; it is immutable.
    pub fn substituted(&self, bindings: &BTreeMap<String, String>) -> MethodDef {
        MethodDef {
            name: self.name.clone(),
            return_type: substitute(&self.return_type, bindings),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    type_name: substitute(&p.type_name, bindings),
                    name: p.name.clone(),
                })
                .collect(),
            body: Rc::clone(&self.body),
            line: self.line,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn check_parameter_names(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for param in &self.params {
            if !seen.insert(param.name.as_str()) {
                return Err(InterpreterError::name(
                    format!("duplicate formal parameter {} in {}", param.name, self.name),
                    Some(self.line),
                ));
            }
        }
        Ok(())
    }

    pub fn validate(&self, registry: &TypeRegistry) -> Result<()> {
        self.check_parameter_names()?;
        if !registry.is_valid_type(&self.return_type) {
            return Err(InterpreterError::type_error(
                format!("invalid return type for method {}", self.name),
                Some(self.line),
            ));
        }
        for param in &self.params {
            match registry.resolve(&param.type_name) {
                Some(Type::Nothing) | None => {
                    return Err(InterpreterError::type_error(
                        format!("invalid type for parameter {}", param.name),
                        Some(self.line),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Checks whether this method can take `arguments`. The error describes
    /// the first mismatch.
    pub fn check_arguments(
        &self,
        registry: &TypeRegistry,
        arguments: &[Value],
    ) -> std::result::Result<(), String> {
        if arguments.len() != self.arity() {
            return Err(format!(
                "invalid number of arguments in call to {}: expected {}, got {}",
                self.name,
                self.arity(),
                arguments.len()
            ));
        }
        for (param, argument) in self.params.iter().zip(arguments) {
            let actual = argument.runtime_type();
            let accepted = registry
                .resolve(&param.type_name)
                .map_or(false, |formal| registry.compatible(&formal, &actual));
            if !accepted {
                return Err(format!(
                    "method call to {} with wrong parameter type for {}: expected {}, got {}",
                    self.name, param.name, param.type_name, actual
                ));
            }
        }
        Ok(())
    }

    /// Runs the body on `this` and applies the return-type contract.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        this: &Instance,
        arguments: Vec<Value>,
        line: Option<usize>,
    ) -> Result<Value> {
        let return_type = resolve(interpreter.registry(), &self.return_type, self.line)?;
        let mut environment = Environment::new();
        for (param, argument) in self.params.iter().zip(arguments) {
            let ty = resolve(interpreter.registry(), &param.type_name, self.line)?;
            let value = argument.typed_as(&ty);
            environment.define(&param.name, ty, value);
        }

        interpreter.enter_call(&self.name, line)?;
        let flow = Frame::new(interpreter, this.clone(), environment).execute(&self.body);
        interpreter.exit_call();

        match flow? {
            Flow::Return(value, return_line) if !value.is_nothing() => {
                if return_type == Type::Nothing {
                    return Err(InterpreterError::type_error(
                        format!("void method {} returned a value", self.name),
                        Some(return_line),
                    ));
                }
                let actual = value.runtime_type();
                if !interpreter.registry().compatible(&return_type, &actual) {
                    return Err(InterpreterError::type_error(
                        format!(
                            "wrong return type for method {}: expected {}, got {}",
                            self.name, return_type, actual
                        ),
                        Some(return_line),
                    ));
                }
                Ok(value.typed_as(&return_type))
            }
            _ => Ok(Value::zero(&return_type)),
        }
    }
}
