use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Where `print` output goes and where `inputi`/`inputs` read from.
pub trait Console {
    fn output(&mut self, text: &str);
    fn get_input(&mut self) -> Option<String>;
}

/// Line-oriented stdin/stdout console used by the command line driver.
#[derive(Debug, Default)]
pub struct StdConsole {}

impl Console for StdConsole {
    fn output(&mut self, text: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if writeln!(handle, "{}", text).is_err() {
            log::warn!("failed to write program output");
        }
    }
    fn get_input(&mut self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct BufferedConsoleImpl {
    output: Vec<String>,
    input: VecDeque<String>,
}

/// Records output lines and serves scripted input. Clones share the same
/// buffers, so a caller can keep one handle and give another to the
/// interpreter.
#[derive(Clone, Debug, Default)]
pub struct BufferedConsole {
    data: Rc<RefCell<BufferedConsoleImpl>>,
}

impl BufferedConsole {
    pub fn new() -> BufferedConsole {
        BufferedConsole::default()
    }
    pub fn with_input<I, S>(input: I) -> BufferedConsole
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = BufferedConsole::new();
        console
            .data
            .borrow_mut()
            .input
            .extend(input.into_iter().map(Into::into));
        console
    }
    pub fn output_lines(&self) -> Vec<String> {
        self.data.borrow().output.clone()
    }
}

impl Console for BufferedConsole {
    fn output(&mut self, text: &str) {
        self.data.borrow_mut().output.push(text.to_string());
    }
    fn get_input(&mut self) -> Option<String> {
        self.data.borrow_mut().input.pop_front()
    }
}

#[cfg(test)]
mod console_tests {
    use super::*;

    #[test]
    fn buffered_console_shares_state() {
        let handle = BufferedConsole::with_input(vec!["42", "hello"]);
        let mut console: Box<dyn Console> = Box::new(handle.clone());
        console.output("first");
        assert_eq!(console.get_input(), Some("42".to_string()));
        assert_eq!(console.get_input(), Some("hello".to_string()));
        assert_eq!(console.get_input(), None);
        assert_eq!(handle.output_lines(), vec!["first".to_string()]);
    }
}
