pub mod ast;
pub mod callable;
pub mod class;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod frame;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod types;
pub mod value;
