use crate::ast::{ClassDecl, Literal};
use crate::callable::MethodDef;
use crate::error::{InterpreterError, Result};
use crate::types::{substitute, Type, TypeRegistry, TYPE_SEPARATOR};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_name: String,
    pub default: Option<Literal>,
    pub line: usize,
}

/// A validated class, or a generic template waiting to be specialized.
#[derive(Debug, Clone)]
pub struct ClassDef {
    name: String,
    superclass: Option<String>,
    type_params: Vec<String>,
    template: bool,
    // Placeholder -> concrete type, filled in by `specialize`.
    bindings: BTreeMap<String, String>,
    fields: Vec<FieldDef>,
    methods: Vec<Rc<MethodDef>>,
    line: usize,
}

impl ClassDef {
    pub fn new(decl: &ClassDecl, registry: &TypeRegistry) -> Result<ClassDef> {
        let class = ClassDef {
            name: decl.name.clone(),
            superclass: decl.superclass.clone(),
            type_params: decl.type_params.clone().unwrap_or_default(),
            template: decl.type_params.is_some(),
            bindings: BTreeMap::new(),
            fields: decl
                .fields
                .iter()
                .map(|f| FieldDef {
                    name: f.name.clone(),
                    type_name: f.type_name.clone(),
                    default: f.default.clone(),
                    line: f.line,
                })
                .collect(),
            methods: decl
                .methods
                .iter()
                .map(|m| Rc::new(MethodDef::from_decl(m)))
                .collect(),
            line: decl.line,
        };
        if class.template {
            // Placeholders are not types yet; only names can be checked.
            class.check_duplicates()?;
            for method in &class.methods {
                method.check_parameter_names()?;
            }
        } else {
            class.validate(registry)?;
        }
        log::debug!(
            "defined {} {} ({} fields, {} methods)",
            if class.template { "template" } else { "class" },
            class.name,
            class.fields.len(),
            class.methods.len()
        );
        Ok(class)
    }

    /// Binds the template's placeholders to `args`, producing an independent,
    /// fully validated class named e.g. `Box@int`.
    pub fn specialize(
        &self,
        args: &[String],
        registry: &TypeRegistry,
        line: Option<usize>,
    ) -> Result<ClassDef> {
        if !self.template {
            return Err(InterpreterError::type_error(
                format!("class {} is not generic", self.name),
                line,
            ));
        }
        if args.len() != self.type_params.len() {
            return Err(InterpreterError::type_error(
                format!(
                    "generic class {} expects {} type argument(s), got {}",
                    self.name,
                    self.type_params.len(),
                    args.len()
                ),
                line,
            ));
        }
        let bindings: BTreeMap<String, String> = self
            .type_params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let mut name = self.name.clone();
        for arg in args {
            name.push(TYPE_SEPARATOR);
            name.push_str(arg);
        }
        let specialized = ClassDef {
            name,
            superclass: None,
            type_params: Vec::new(),
            template: false,
            fields: self
                .fields
                .iter()
                .map(|f| FieldDef {
                    type_name: substitute(&f.type_name, &bindings),
                    ..f.clone()
                })
                .collect(),
            methods: self
                .methods
                .iter()
                .map(|m| Rc::new(m.substituted(&bindings)))
                .collect(),
            bindings,
            line: self.line,
        };
        specialized.validate(registry)?;
        log::debug!("specialized {}", specialized.name);
        Ok(specialized)
    }

    fn check_duplicates(&self) -> Result<()> {
        let mut fields = BTreeSet::new();
        for field in &self.fields {
            if !fields.insert(field.name.as_str()) {
                return Err(InterpreterError::name(
                    format!("duplicate field {}", field.name),
                    Some(field.line),
                ));
            }
        }
        let mut methods = BTreeSet::new();
        for method in &self.methods {
            if !methods.insert(method.name.as_str()) {
                return Err(InterpreterError::name(
                    format!("duplicate method {}", method.name),
                    Some(method.line),
                ));
            }
        }
        Ok(())
    }

    fn validate(&self, registry: &TypeRegistry) -> Result<()> {
        self.check_duplicates()?;
        for field in &self.fields {
            let declared = match registry.resolve(&field.type_name) {
                Some(Type::Nothing) | None => {
                    return Err(InterpreterError::type_error(
                        format!("invalid type {} for field {}", field.type_name, field.name),
                        Some(field.line),
                    ))
                }
                Some(ty) => ty,
            };
            if let Some(default) = &field.default {
                let actual = Value::from_literal(default).runtime_type();
                if !registry.compatible(&declared, &actual) {
                    return Err(InterpreterError::type_error(
                        format!("type mismatch with field {}: {} is not {}", field.name, default, declared),
                        Some(field.line),
                    ));
                }
            }
        }
        for method in &self.methods {
            method.validate(registry)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }
    pub fn is_template(&self) -> bool {
        self.template
    }
    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
    pub fn methods(&self) -> &[Rc<MethodDef>] {
        &self.methods
    }
    pub fn line(&self) -> usize {
        self.line
    }
    /// Resolves a type name written inside one of this class's method bodies.
    pub fn resolve_type_name(&self, type_name: &str) -> String {
        if self.bindings.is_empty() {
            type_name.to_string()
        } else {
            substitute(type_name, &self.bindings)
        }
    }
}

#[cfg(test)]
mod class_tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parser;
    use crate::scanner;

    fn decls(source: &str) -> Vec<ClassDecl> {
        let tokens = scanner::scan_tokens(source).unwrap();
        parser::parse(&tokens).unwrap().classes
    }

    fn registry_for(classes: &[ClassDecl]) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for class in classes {
            match &class.type_params {
                Some(params) => registry.register_template(&class.name, params.len()),
                None => registry.register(&class.name, class.superclass.as_deref()),
            }
        }
        registry
    }

    fn build(source: &str) -> Result<Vec<ClassDef>> {
        let classes = decls(source);
        let registry = registry_for(&classes);
        classes
            .iter()
            .map(|c| ClassDef::new(c, &registry))
            .collect()
    }

    #[test]
    fn plain_class_is_validated() {
        let classes = build(
            "(class Person (field string name \"anon\") (field int age)
               (method string greet ((Person other)) (return name)))",
        )
        .unwrap();
        assert_eq!(classes[0].name(), "Person");
        assert_eq!(classes[0].fields().len(), 2);
        assert_eq!(classes[0].methods()[0].arity(), 1);
    }

    #[test]
    fn duplicate_members() {
        let err = build("(class A (field int x 0) (field bool x true))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
        assert_eq!(err.line, Some(1));
        let err = build(
            "(class A\n (method void f () (return))\n (method int f ((int a)) (return a)))",
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn field_default_must_match() {
        let err = build("(class A (field int x \"zero\"))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        let err = build("(class A (field int x null))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert!(build("(class A (field A next null))").is_ok());
        let err = build("(class A (field Missing m null))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn templates_defer_type_checks() {
        let classes = build(
            "(tclass Box (T) (field T item) (method T get () (return item))
               (method void put ((T value)) (set item value)))",
        )
        .unwrap();
        assert!(classes[0].is_template());
        assert_eq!(classes[0].type_params(), &["T".to_string()]);

        let err = build("(tclass Box (T) (field T item) (field T item))").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
    }

    #[test]
    fn specialization_substitutes_and_validates() {
        let source = "(class Dog) (tclass Pair (K V) (field K first) (field V second)
             (method Pair@V@K swap () (return null)) (method void set_first ((K k)) (set first k)))";
        let classes = decls(source);
        let registry = registry_for(&classes);
        let pair = ClassDef::new(&classes[1], &registry).unwrap();

        let args = vec!["int".to_string(), "Dog".to_string()];
        let specialized = pair.specialize(&args, &registry, Some(9)).unwrap();
        assert_eq!(specialized.name(), "Pair@int@Dog");
        assert!(!specialized.is_template());
        assert_eq!(specialized.fields()[0].type_name, "int");
        assert_eq!(specialized.fields()[1].type_name, "Dog");
        assert_eq!(specialized.methods()[0].return_type, "Pair@Dog@int");
        assert_eq!(specialized.methods()[1].params[0].type_name, "int");
        assert_eq!(specialized.resolve_type_name("Pair@K@K"), "Pair@int@int");
        // The template itself is untouched.
        assert_eq!(pair.fields()[0].type_name, "K");

        let err = pair.specialize(&args[..1], &registry, Some(9)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(9));

        let bad = vec!["int".to_string(), "Cat".to_string()];
        let err = pair.specialize(&bad, &registry, Some(9)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }
}
