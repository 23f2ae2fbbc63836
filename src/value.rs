use crate::ast::Literal;
use crate::instance::Instance;
use crate::types::Type;
use std::fmt;

#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Object(Instance),
    /// A null reference, carrying the static class type it was bound as.
    /// `None` until the literal is stored in a typed slot.
    Null(Option<String>),
    Nothing,
}

impl Value {
    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Int(x) => Value::Int(*x),
            Literal::Bool(x) => Value::Bool(*x),
            Literal::String(x) => Value::String(x.clone()),
            Literal::Null => Value::Null(None),
        }
    }

    /// The value a slot of type `ty` holds before anything is stored in it.
    pub fn zero(ty: &Type) -> Value {
        match ty {
            Type::Int => Value::Int(0),
            Type::Bool => Value::Bool(false),
            Type::String => Value::String(String::new()),
            Type::Class(name) => Value::Null(Some(name.clone())),
            Type::Null => Value::Null(None),
            Type::Nothing => Value::Nothing,
        }
    }

    pub fn runtime_type(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Bool(_) => Type::Bool,
            Value::String(_) => Type::String,
            Value::Object(instance) => Type::Class(instance.class_name()),
            Value::Null(Some(name)) => Type::Class(name.clone()),
            Value::Null(None) => Type::Null,
            Value::Nothing => Type::Nothing,
        }
    }

    /// Rebinds a null to the static type of the slot it is stored in. Other
    /// values are returned unchanged.
    pub fn typed_as(self, declared: &Type) -> Value {
        match (self, declared) {
            (Value::Null(_), Type::Class(name)) => Value::Null(Some(name.clone())),
            (value, _) => value,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{}", x),
            Value::Bool(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
            Value::Object(instance) => write!(f, "{}", instance),
            Value::Null(_) => write!(f, "null"),
            Value::Nothing => Ok(()),
        }
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[test]
    fn zero_values() {
        assert!(matches!(Value::zero(&Type::Int), Value::Int(0)));
        assert!(matches!(Value::zero(&Type::Bool), Value::Bool(false)));
        assert_eq!(Value::zero(&Type::String).to_string(), "");
        assert!(matches!(
            Value::zero(&Type::Class("Dog".to_string())),
            Value::Null(Some(ref name)) if name == "Dog"
        ));
    }

    #[test]
    fn null_takes_static_type() {
        let null = Value::from_literal(&Literal::Null);
        assert_eq!(null.runtime_type(), Type::Null);
        let typed = null.typed_as(&Type::Class("Person".to_string()));
        assert_eq!(typed.runtime_type(), Type::Class("Person".to_string()));
        let int = Value::Int(4).typed_as(&Type::Class("Person".to_string()));
        assert_eq!(int.runtime_type(), Type::Int);
    }

    #[test]
    fn printed_forms() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Null(None).to_string(), "null");
        assert_eq!(Value::Nothing.to_string(), "");
    }
}
