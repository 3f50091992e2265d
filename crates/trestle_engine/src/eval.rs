//! Evaluator collaborator interface.
//!
//! The compiler/evaluator is external to the bridge; it is consumed behind
//! this trait and only its value-or-failure result crosses the boundary.

use crate::errors::EngineError;
use crate::heap::Heap;
use crate::value::EngineValue;

/// Source position metadata attached to an evaluation request.
#[derive(Debug, Clone)]
pub struct Origin {
    pub file: String,
    pub line: u32,
}

impl Origin {
    pub fn new(file: &str, line: u32) -> Self {
        Origin {
            file: file.to_string(),
            line,
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::new("noname", 1)
    }
}

pub trait Evaluator {
    /// Compile and run `source`, returning a single engine value or an
    /// engine-level failure.
    fn eval(
        &mut self,
        heap: &mut Heap,
        globals: &EngineValue,
        source: &str,
        origin: &Origin,
    ) -> Result<EngineValue, EngineError>;
}
