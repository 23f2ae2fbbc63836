use crate::callable::MethodDef;
use crate::class::ClassDef;
use crate::environment::Binding;
use crate::error::{InterpreterError, Result};
use crate::interpreter::Interpreter;
use crate::types::Type;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// One level of an object: the fields and methods declared by a single class,
/// plus the object for its superclass.
#[derive(Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceImpl>>,
}

struct InstanceImpl {
    class: Rc<ClassDef>,
    fields: BTreeMap<String, Binding>,
    methods: BTreeMap<String, Rc<MethodDef>>,
    superobject: Option<Instance>,
}

impl Instance {
    pub fn new(
        class: Rc<ClassDef>,
        fields: BTreeMap<String, Binding>,
        superobject: Option<Instance>,
    ) -> Instance {
        let methods = class
            .methods()
            .iter()
            .map(|m| (m.name.clone(), Rc::clone(m)))
            .collect();
        Instance {
            data: Rc::new(RefCell::new(InstanceImpl {
                class,
                fields,
                methods,
                superobject,
            })),
        }
    }
    pub fn class(&self) -> Rc<ClassDef> {
        Rc::clone(&self.data.borrow().class)
    }
    pub fn class_name(&self) -> String {
        self.data.borrow().class.name().to_string()
    }
    pub fn superobject(&self) -> Option<Instance> {
        self.data.borrow().superobject.clone()
    }
    pub fn find_method(&self, name: &str) -> Option<Rc<MethodDef>> {
        self.data.borrow().methods.get(name).cloned()
    }
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.data
            .borrow()
            .fields
            .get(name)
            .map(|binding| binding.value.clone())
    }
    pub fn field_type(&self, name: &str) -> Option<Type> {
        self.data
            .borrow()
            .fields
            .get(name)
            .map(|binding| binding.ty.clone())
    }
    /// Stores into a field of this level. Returns false for unknown fields.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        match self.data.borrow_mut().fields.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                true
            }
            None => false,
        }
    }
    pub fn equals(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Dispatches `name` starting at this level and walking up the superclass
    /// chain. The first level whose method takes these arguments runs it.
    pub fn call_method(
        &self,
        interpreter: &mut Interpreter,
        name: &str,
        arguments: Vec<Value>,
        line: Option<usize>,
    ) -> Result<Value> {
        let mut level = Some(self.clone());
        let mut mismatch: Option<String> = None;
        while let Some(current) = level {
            if let Some(method) = current.find_method(name) {
                match method.check_arguments(interpreter.registry(), &arguments) {
                    Ok(()) => {
                        log::trace!("dispatching {} to {}", name, current.class_name());
                        return method.call(interpreter, &current, arguments, line);
                    }
                    Err(reason) => {
                        mismatch.get_or_insert(reason);
                    }
                }
            }
            level = current.superobject();
        }
        match mismatch {
            Some(reason) => Err(InterpreterError::type_error(reason, line)),
            None => Err(InterpreterError::name(
                format!("unknown method {}", name),
                line,
            )),
        }
    }
}

impl fmt::Debug for Instance {
    // Fields may point back at this object, so only the class is shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class_name())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class_name())
    }
}
