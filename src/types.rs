//! Nominal types and the class registry.
//!
//! Generic instantiation names are spelled with `@` between the base name and
//! each argument, in prefix order: `Pair@string@Box@int` is `Pair` applied to
//! `string` and `Box@int`. Decoding needs each template's arity, which is why
//! only the registry can take such a name apart.

use phf::phf_map;
use std::collections::BTreeMap;
use std::fmt;

pub const TYPE_SEPARATOR: char = '@';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    String,
    /// The type of `void` methods and of the value they produce.
    Nothing,
    /// The type of a bare `null` literal that has not been bound to a slot yet.
    Null,
    Class(String),
}

static PRIMITIVES: phf::Map<&'static str, Type> = phf_map! {
    "int" => Type::Int,
    "bool" => Type::Bool,
    "string" => Type::String,
    "void" => Type::Nothing,
};

impl Type {
    pub fn primitive(name: &str) -> Option<Type> {
        PRIMITIVES.get(name).cloned()
    }
    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Null)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Nothing => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

/// A decoded type name: a base plus its (possibly nested) type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub base: String,
    pub args: Vec<TypeName>,
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for arg in &self.args {
            write!(f, "{}{}", TYPE_SEPARATOR, arg)?;
        }
        Ok(())
    }
}

/// Replaces every placeholder segment of `type_name` by its binding.
///
/// Works on nested generic names too, since a bound argument is itself a
/// well-formed prefix-encoded name.
pub fn substitute(type_name: &str, bindings: &BTreeMap<String, String>) -> String {
    type_name
        .split(TYPE_SEPARATOR)
        .map(|segment| match bindings.get(segment) {
            Some(bound) => bound.as_str(),
            None => segment,
        })
        .collect::<Vec<_>>()
        .join(&TYPE_SEPARATOR.to_string())
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    superclasses: BTreeMap<String, Option<String>>,
    templates: BTreeMap<String, usize>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }
    pub fn register(&mut self, class: &str, superclass: Option<&str>) {
        self.superclasses
            .insert(class.to_string(), superclass.map(str::to_string));
    }
    pub fn register_template(&mut self, class: &str, arity: usize) {
        self.register(class, None);
        self.templates.insert(class.to_string(), arity);
    }
    pub fn is_registered(&self, class: &str) -> bool {
        self.superclasses.contains_key(class)
    }
    pub fn template_arity(&self, class: &str) -> Option<usize> {
        self.templates.get(class).cloned()
    }
    pub fn superclass_of(&self, class: &str) -> Option<&str> {
        self.superclasses.get(class).and_then(|s| s.as_deref())
    }

    /// Decodes a prefix-encoded type name, or `None` if it is malformed or
    /// names something unknown.
    pub fn parse_type_name(&self, name: &str) -> Option<TypeName> {
        let segments: Vec<&str> = name.split(TYPE_SEPARATOR).collect();
        let (parsed, consumed) = self.parse_segments(&segments)?;
        if consumed == segments.len() {
            Some(parsed)
        } else {
            None
        }
    }
    fn parse_segments(&self, segments: &[&str]) -> Option<(TypeName, usize)> {
        let base = *segments.first()?;
        let arity = if PRIMITIVES.contains_key(base) {
            0
        } else if let Some(arity) = self.template_arity(base) {
            arity
        } else if self.is_registered(base) {
            0
        } else {
            return None;
        };
        let mut args = Vec::with_capacity(arity);
        let mut consumed = 1;
        for _ in 0..arity {
            let (arg, used) = self.parse_segments(&segments[consumed..])?;
            args.push(arg);
            consumed += used;
        }
        Some((
            TypeName {
                base: base.to_string(),
                args,
            },
            consumed,
        ))
    }

    pub fn is_valid_type(&self, name: &str) -> bool {
        self.parse_type_name(name).is_some()
    }

    /// Maps a declared type name onto a runtime type.
    pub fn resolve(&self, name: &str) -> Option<Type> {
        if let Some(primitive) = Type::primitive(name) {
            return Some(primitive);
        }
        self.parse_type_name(name)
            .map(|parsed| Type::Class(parsed.to_string()))
    }

    pub fn is_subtype(&self, supertype: &str, subtype: &str) -> bool {
        let mut current = Some(subtype);
        // Bounded so that a malformed graph cannot spin forever.
        for _ in 0..=self.superclasses.len() {
            match current {
                Some(name) if name == supertype => return true,
                Some(name) => current = self.superclass_of(name),
                None => return false,
            }
        }
        false
    }

    /// Whether a value of type `actual` may be stored in a slot declared as
    /// `declared`.
    pub fn compatible(&self, declared: &Type, actual: &Type) -> bool {
        match (declared, actual) {
            (Type::Class(_), Type::Null) => true,
            (Type::Class(declared), Type::Class(actual)) => {
                declared == actual || self.is_subtype(declared, actual)
            }
            (Type::Int, Type::Int)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Nothing, Type::Nothing) => true,
            _ => false,
        }
    }

    /// Whether two class-typed values may be compared for identity.
    pub fn comparable(&self, left: &Type, right: &Type) -> bool {
        match (left, right) {
            (Type::Null, other) | (other, Type::Null) => other.is_class(),
            (Type::Class(l), Type::Class(r)) => {
                l == r || self.is_subtype(l, r) || self.is_subtype(r, l)
            }
            _ => false,
        }
    }

    /// Returns a class that takes part in an inheritance cycle, if any.
    pub fn find_cycle(&self) -> Option<&str> {
        self.superclasses.keys().find_map(|start| {
            let mut current = self.superclass_of(start);
            for _ in 0..self.superclasses.len() {
                match current {
                    Some(name) if name == start => return Some(start.as_str()),
                    Some(name) => current = self.superclass_of(name),
                    None => return None,
                }
            }
            None
        })
    }
}
