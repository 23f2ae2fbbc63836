/// Knobs for one interpreter run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log every executed statement at `trace` level.
    pub trace: bool,
    /// Method calls that may be active at once before the run fails with a
    /// stack overflow fault.
    pub max_call_depth: usize,
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

impl Default for Config {
    fn default() -> Self {
        Config {
            trace: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}
