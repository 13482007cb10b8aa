//! Operator decisions after a table's rows fail to insert

use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::config::ErrorPolicy;

/// A table whose rows could not be inserted into the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionFailure {
    pub table: String,
    /// The generated insert statement, for replaying the table by hand
    pub statement: String,
    pub error: String,
}

/// Whether the run goes on after an insertion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

/// Decides how a migration run reacts to a failed table
pub trait InsertionDecider {
    fn decide(&mut self, failure: &InsertionFailure) -> Decision;
}

impl<F> InsertionDecider for F
where
    F: FnMut(&InsertionFailure) -> Decision,
{
    fn decide(&mut self, failure: &InsertionFailure) -> Decision {
        self(failure)
    }
}

/// Always answers the same way
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

impl InsertionDecider for FixedDecision {
    fn decide(&mut self, failure: &InsertionFailure) -> Decision {
        tracing::warn!(table = %failure.table, decision = ?self.0, "Applying configured error policy");
        self.0
    }
}

/// Asks the operator on a terminal, or any reader/writer pair.
///
/// Only an answer of `y` continues; anything else, including end of input,
/// aborts the run.
pub struct PromptDecider<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptDecider<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, failure: &InsertionFailure) -> std::io::Result<Decision> {
        writeln!(self.output, "Error migrating {}: {}", failure.table, failure.error)?;
        writeln!(self.output, "Problematic SQL: {}", failure.statement)?;
        write!(self.output, "Continue with migration? (y/n): ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        if answer.trim().eq_ignore_ascii_case("y") {
            Ok(Decision::Continue)
        } else {
            Ok(Decision::Abort)
        }
    }
}

impl PromptDecider<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process's standard streams
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> InsertionDecider for PromptDecider<R, W> {
    fn decide(&mut self, failure: &InsertionFailure) -> Decision {
        match self.ask(failure) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, "Could not read operator decision, aborting");
                Decision::Abort
            }
        }
    }
}

/// Build the decider selected by `policy`
pub fn decider_for(policy: ErrorPolicy) -> Box<dyn InsertionDecider> {
    match policy {
        ErrorPolicy::Prompt => Box::new(PromptDecider::stdio()),
        ErrorPolicy::Abort => Box::new(FixedDecision(Decision::Abort)),
        ErrorPolicy::Continue => Box::new(FixedDecision(Decision::Continue)),
    }
}
