use crate::ast::Program;
use crate::class::ClassDef;
use crate::config::Config;
use crate::console::Console;
use crate::environment::Binding;
use crate::error::{InterpreterError, Result};
use crate::instance::Instance;
use crate::parser;
use crate::scanner;
use crate::types::{TypeRegistry, TYPE_SEPARATOR};
use crate::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const MAIN_CLASS: &str = "main";
pub const MAIN_METHOD: &str = "main";

/// Owns everything that lives for one program run: the type registry, the
/// class definitions, the console and the call-depth counter.
pub struct Interpreter {
    registry: TypeRegistry,
    classes: BTreeMap<String, Rc<ClassDef>>,
    console: Box<dyn Console>,
    config: Config,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(config: Config, console: Box<dyn Console>) -> Interpreter {
        Interpreter {
            registry: TypeRegistry::new(),
            classes: BTreeMap::new(),
            console,
            config,
            call_depth: 0,
        }
    }

    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let tokens = scanner::scan_tokens(source)?;
        let program = parser::parse(&tokens)?;
        self.run(&program)
    }

    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.load(program)?;
        let main = self.instantiate(MAIN_CLASS, None)?;
        main.call_method(self, MAIN_METHOD, Vec::new(), None)?;
        Ok(())
    }

    fn load(&mut self, program: &Program) -> Result<()> {
        self.registry = TypeRegistry::new();
        self.classes.clear();

        for class in &program.classes {
            if self.registry.is_registered(&class.name) {
                return Err(InterpreterError::type_error(
                    format!("Duplicate class name {}", class.name),
                    Some(class.line),
                ));
            }
            match &class.type_params {
                Some(params) => self.registry.register_template(&class.name, params.len()),
                None => self
                    .registry
                    .register(&class.name, class.superclass.as_deref()),
            }
            log::debug!("registered class {}", class.name);
        }

        for class in &program.classes {
            if let Some(superclass) = &class.superclass {
                if !self.registry.is_registered(superclass) {
                    return Err(InterpreterError::type_error(
                        format!("class {} inherits from unknown class {}", class.name, superclass),
                        Some(class.line),
                    ));
                }
                if self.registry.template_arity(superclass).is_some() {
                    return Err(InterpreterError::type_error(
                        format!("class {} inherits from generic class {}", class.name, superclass),
                        Some(class.line),
                    ));
                }
            }
        }
        if let Some(class) = self.registry.find_cycle() {
            let line = program
                .classes
                .iter()
                .find(|c| c.name == class)
                .map(|c| c.line);
            return Err(InterpreterError::type_error(
                format!("inheritance cycle through class {}", class),
                line,
            ));
        }

        for class in &program.classes {
            let def = ClassDef::new(class, &self.registry)?;
            self.classes.insert(class.name.clone(), Rc::new(def));
        }
        Ok(())
    }

    /// Finds the definition for a possibly generic class name, specializing a
    /// template on demand.
    fn class_for(&self, name: &str, line: Option<usize>) -> Result<Rc<ClassDef>> {
        let base = name.split(TYPE_SEPARATOR).next().unwrap_or(name);
        let class = self.classes.get(base).ok_or_else(|| {
            InterpreterError::type_error(format!("No class named {} found", name), line)
        })?;
        if !class.is_template() {
            if base != name {
                return Err(InterpreterError::type_error(
                    format!("class {} takes no type arguments", base),
                    line,
                ));
            }
            return Ok(Rc::clone(class));
        }
        let parsed = self.registry.parse_type_name(name).ok_or_else(|| {
            InterpreterError::type_error(format!("invalid generic class name {}", name), line)
        })?;
        let args: Vec<String> = parsed.args.iter().map(ToString::to_string).collect();
        Ok(Rc::new(class.specialize(&args, &self.registry, line)?))
    }

    /// Builds an object for `name`: the superclass chain first, then this
    /// level's fields.
    pub fn instantiate(&mut self, name: &str, line: Option<usize>) -> Result<Instance> {
        let class = self.class_for(name, line)?;
        let superobject = match class.superclass() {
            Some(superclass) => Some(self.instantiate(superclass, line)?),
            None => None,
        };
        let mut fields = BTreeMap::new();
        for field in class.fields() {
            let ty = self.registry.resolve(&field.type_name).ok_or_else(|| {
                InterpreterError::type_error(
                    format!("invalid type {} for field {}", field.type_name, field.name),
                    Some(field.line),
                )
            })?;
            let value = match &field.default {
                Some(literal) => Value::from_literal(literal),
                None => Value::zero(&ty),
            };
            if !self.registry.compatible(&ty, &value.runtime_type()) {
                return Err(InterpreterError::type_error(
                    format!("type mismatch with field {}", field.name),
                    Some(field.line),
                ));
            }
            let value = value.typed_as(&ty);
            fields.insert(field.name.clone(), Binding { ty, value });
        }
        log::debug!("instantiated {}", class.name());
        Ok(Instance::new(class, fields, superobject))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn output(&mut self, text: &str) {
        self.console.output(text);
    }
    pub fn get_input(&mut self) -> Option<String> {
        self.console.get_input()
    }

    pub fn enter_call(&mut self, method: &str, line: Option<usize>) -> Result<()> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(InterpreterError::fault(
                format!("stack overflow calling {}", method),
                line,
            ));
        }
        self.call_depth += 1;
        Ok(())
    }
    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod interpreter_tests {
    use super::*;
    use crate::console::BufferedConsole;
    use crate::error::ErrorKind;

    fn run_with(source: &str, input: Vec<&str>, config: Config) -> (Result<()>, Vec<String>) {
        let console = BufferedConsole::with_input(input);
        let mut interpreter = Interpreter::new(config, Box::new(console.clone()));
        let result = interpreter.run_source(source);
        (result, console.output_lines())
    }

    fn run(source: &str) -> Vec<String> {
        let (result, output) = run_with(source, vec![], Config::default());
        if let Err(err) = result {
            panic!("{}", err);
        }
        output
    }

    fn run_err(source: &str) -> InterpreterError {
        run_with(source, vec![], Config::default()).0.unwrap_err()
    }

    #[test]
    fn overriding_dispatch() {
        let output = run(
            "(class Animal (method string speak () (return \"...\")))
             (class Dog inherits Animal (method string speak () (return \"Woof\")))
             (class main
               (field Animal a null)
               (method void main ()
                 (begin
                   (set a (new Animal))
                   (print (call a speak))
                   (set a (new Dog))
                   (print (call a speak)))))",
        );
        assert_eq!(output, vec!["...", "Woof"]);
    }

    #[test]
    fn falling_off_returns_zero_value() {
        let output = run(
            "(class main
               (method int f () (print \"in f\"))
               (method string g () (begin))
               (method main h () (begin))
               (method void main ()
                 (print (call me f) \"|\" (call me g) \"|\" (call me h))))",
        );
        assert_eq!(output, vec!["in f", "0||null"]);
    }

    #[test]
    fn bare_return_stops_the_body() {
        let output = run(
            "(class main
               (method void main ()
                 (begin (print \"before\") (return) (print \"after\"))))",
        );
        assert_eq!(output, vec!["before"]);
    }

    #[test]
    fn generic_field_rejects_wrong_type() {
        let err = run_err(
            "(tclass Box (T) (field T item)
               (method void put ((T v)) (set item v))
               (method void poke () (set item \"str\")))
             (class main
               (field Box@int b null)
               (method void main ()
                 (begin
                   (set b (new Box@int))
                   (call b poke))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn generic_instances_are_independent() {
        let output = run(
            "(tclass Box (T) (field T item)
               (method void put ((T v)) (set item v))
               (method T get () (return item)))
             (class main
               (method void main ()
                 (let ((Box@int a) (Box@int b))
                   (set a (new Box@int))
                   (set b (new Box@int))
                   (call a put 5)
                   (print (call a get) \" \" (call b get))
                   (print (== a b)))))",
        );
        assert_eq!(output, vec!["5 0", "false"]);
    }

    #[test]
    fn subtype_assignment_is_covariant() {
        let program = "(class Animal) (class Dog inherits Animal)
             (class main
               (field Animal a null) (field Dog d null)
               (method void main ()
                 (begin (set a (new Dog)) (print \"ok\") BODY)))";
        assert_eq!(run(&program.replace("BODY", "")), vec!["ok"]);
        let err = run_err(&program.replace("BODY", "(set d (new Animal))"));
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn dispatch_falls_back_to_ancestor() {
        let source = "(class Base
               (method string f ((int x)) (return \"base int\"))
               (method string g () (return \"base g\")))
             (class Derived inherits Base
               (method string f ((string s)) (return \"derived string\")))
             (class main
               (field Derived d null)
               (method void main ()
                 (begin
                   (set d (new Derived))
                   (print (call d f \"x\"))
                   (print (call d f 3))
                   (print (call d g))
                   CALL)))";
        assert_eq!(
            run(&source.replace("CALL", "")),
            vec!["derived string", "base int", "base g"]
        );

        let err = run_err(&source.replace("CALL", "\n(print (call d f true))"));
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(15));
        let err = run_err(&source.replace("CALL", "(print (call d nope))"));
        assert_eq!(err.kind, ErrorKind::Name);
    }

    #[test]
    fn super_calls_and_me() {
        let output = run(
            "(class A (field string tag \"A\")
               (method string who () (return tag))
               (method string hello () (return (+ \"hello from \" (call me who)))))
             (class B inherits A
               (field string tag \"B\")
               (method string who () (return tag))
               (method string both () (return (+ (call me who) (call super who)))))
             (class main
               (method void main ()
                 (let ((B b))
                   (set b (new B))
                   (print (call b both))
                   (print (call b hello)))))",
        );
        assert_eq!(output, vec!["BA", "hello from A"]);
    }

    #[test]
    fn arithmetic_and_faults() {
        let output = run(
            "(class main (method void main ()
               (print (/ -7 2) \" \" (% -7 2) \" \" (% 7 -2) \" \" (* 3 (- 2 5)))))",
        );
        assert_eq!(output, vec!["-4 1 -1 -9"]);
        let err = run_err("(class main (method void main ()\n (print (/ 1 0))))");
        assert_eq!(err.kind, ErrorKind::Fault);
        assert_eq!(err.line, Some(2));
        let err = run_err("(class main (method void main () (print (+ 1 \"a\"))))");
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err("(class main (method void main () (print (& 1 2))))");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn let_shadows_and_restores() {
        let output = run(
            "(class main
               (field int x 1)
               (method void main ()
                 (begin
                   (let ((int x 2) (string s \"in\"))
                     (print x s)
                     (let ((int y 3)) (set x (+ x y)))
                     (print x))
                   (print x))))",
        );
        assert_eq!(output, vec!["2in", "5", "1"]);
        let err = run_err(
            "(class main (method void main () (let ((int a) (bool a)) (print a))))",
        );
        assert_eq!(err.kind, ErrorKind::Name);
        let err = run_err(
            "(class main (method void main () (let ((int a \"s\")) (print a))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err("(class main (method void main () (print y)))");
        assert_eq!(err.kind, ErrorKind::Name);
    }

    #[test]
    fn typed_null_comparisons() {
        let source = "(class Animal) (class Dog inherits Animal) (class Rock)
             (class main
               (field Animal a null) (field Dog d null) (field Rock r null)
               (method void main ()
                 (begin (print (== a d) (== d null) (!= a null)) BODY)))";
        assert_eq!(run(&source.replace("BODY", "")), vec!["truetruefalse"]);
        let err = run_err(&source.replace("BODY", "(print (== a r))"));
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err(&source.replace("BODY", "(call r anything)"));
        assert_eq!(err.kind, ErrorKind::Fault);
    }

    #[test]
    fn return_type_contract() {
        let err = run_err(
            "(class main
               (method int f ()\n (return \"nope\"))
               (method void main () (print (call me f))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(2));
        let err = run_err(
            "(class main
               (method void f () (return 3))
               (method void main () (call me f)))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err(
            "(class main
               (method void f () (return))
               (method void main () (let ((int x)) (set x (call me f)))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn call_depth_is_bounded() {
        let source = "(class main
               (method int down ((int n))
                 (if (== n 0) (return 0) (return (call me down (- n 1)))))
               (method void main () (print (call me down 50))))";
        let config = Config {
            trace: false,
            max_call_depth: 20,
        };
        let (result, _) = run_with(source, vec![], config);
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fault);
        assert_eq!(run(source), vec!["0"]);
    }

    #[test]
    fn deep_recursion_on_default_stack() {
        let source = "(class main
               (method int down ((int n))
                 (if (== n 0) (return 0) (return (+ 1 (call me down (- n 1))))))
               (method void main () (print (call me down DEPTH))))";
        assert_eq!(run(&source.replace("DEPTH", "1000")), vec!["1000"]);
        let err = run_err(&source.replace("DEPTH", "2000"));
        assert_eq!(err.kind, ErrorKind::Fault);
        assert_eq!(err.line, Some(3));
    }

    #[test]
    fn conditions_must_be_boolean() {
        let err = run_err(
            "(class main (method void main ()
               (begin
                 (print \"start\")
                 (if 1 (print \"yes\")))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(4));
        let err = run_err(
            "(class main (method void main ()
               (while \"x\" (print \"loop\"))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn super_without_superclass() {
        let err = run_err(
            "(class main
               (method void f () (return))
               (method void main ()
                 (call super f)))",
        );
        assert_eq!(err.kind, ErrorKind::Name);
        assert_eq!(err.line, Some(4));
    }

    #[test]
    fn console_input() {
        let source = "(class main (field int n) (field string s)
               (method void main ()
                 (begin (inputi n) (inputs s) (print (+ n 1) s))))";
        let (result, output) = run_with(source, vec!["41", "abc"], Config::default());
        assert!(result.is_ok());
        assert_eq!(output, vec!["42abc"]);
        let (result, _) = run_with(source, vec!["forty", "abc"], Config::default());
        assert_eq!(result.unwrap_err().kind, ErrorKind::Type);
        let (result, _) = run_with(source, vec!["1"], Config::default());
        assert_eq!(result.unwrap_err().kind, ErrorKind::Fault);
    }

    #[test]
    fn load_errors() {
        let err = run_err("(class A) (class A) (class main (method void main () (return)))");
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err(
            "(class A inherits B) (class B inherits A) (class main (method void main () (return)))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err("(class A inherits Nope) (class main (method void main () (return)))");
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err("(class other)");
        assert_eq!(err.kind, ErrorKind::Type);
        assert_eq!(err.line, None);
        let err = run_err("(class main (method void main () (try (print 1) (print 2))))");
        assert_eq!(err.kind, ErrorKind::Syntax);
        let err = run_err("(class main (method void main () (print (new Nope))))");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn nested_generics() {
        let output = run(
            "(tclass Box (T) (field T item)
               (method void put ((T v)) (set item v))
               (method T get () (return item)))
             (tclass Pair (K V) (field K first) (field V second)
               (method void init ((K k) (V v)) (begin (set first k) (set second v)))
               (method V get_second () (return second))
               (method Box@K boxed () (let ((Box@K b)) (set b (new Box@K)) (call b put first) (return b))))
             (class main
               (method void main ()
                 (let ((Box@int inner) (Pair@string@Box@int p))
                   (set inner (new Box@int))
                   (call inner put 7)
                   (set p (new Pair@string@Box@int))
                   (call p init \"k\" inner)
                   (print (call (call p get_second) get))
                   (print (call (call p boxed) get)))))",
        );
        assert_eq!(output, vec!["7", "k"]);
    }

    #[test]
    fn generic_arity_errors() {
        let err = run_err(
            "(tclass Box (T) (field T item))
             (class main (method void main () (print (new Box))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
        let err = run_err(
            "(class Plain)
             (class main (method void main () (print (new Plain@int))))",
        );
        assert_eq!(err.kind, ErrorKind::Type);
    }
}
