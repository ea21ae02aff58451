//! Filter-compiler seam.
//!
//! The query language itself is external to the gateway: a
//! [`FilterCompiler`] turns a raw filter expression into an executable
//! predicate over a feed's element type, and the gateway treats it as
//! opaque. [`FnFilterCompiler`] adapts a closure so binaries and tests
//! can plug in whatever compiler they use.

use std::fmt;

/// Compiled predicate over a feed's element type.
pub type FilterPredicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// A filter expression the compiler refused.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FilterError {
    message: String,
}

impl FilterError {
    /// Creates a rejection with the given reason.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compiles client-supplied filter expressions for one element type.
pub trait FilterCompiler<T>: Send + Sync {
    /// Turns `expression` into an executable predicate.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] if the expression is not valid for
    /// this compiler; the subscribe request that carried it is dropped.
    fn compile(&self, expression: &str) -> Result<FilterPredicate<T>, FilterError>;
}

type CompileFn<T> = dyn Fn(&str) -> Result<FilterPredicate<T>, FilterError> + Send + Sync;

/// [`FilterCompiler`] backed by a closure.
pub struct FnFilterCompiler<T> {
    compile: Box<CompileFn<T>>,
}

impl<T> FnFilterCompiler<T> {
    /// Wraps a compile function.
    #[must_use]
    pub fn new(
        compile: impl Fn(&str) -> Result<FilterPredicate<T>, FilterError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            compile: Box::new(compile),
        }
    }
}

impl<T> FilterCompiler<T> for FnFilterCompiler<T> {
    fn compile(&self, expression: &str) -> Result<FilterPredicate<T>, FilterError> {
        (self.compile)(expression)
    }
}

impl<T> fmt::Debug for FnFilterCompiler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFilterCompiler").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn threshold_compiler() -> FnFilterCompiler<u64> {
        FnFilterCompiler::new(|expression| {
            let threshold: u64 = expression
                .trim()
                .parse()
                .map_err(|_| FilterError::new(format!("not a number: {expression}")))?;
            Ok(Box::new(move |value: &u64| *value >= threshold) as FilterPredicate<u64>)
        })
    }

    #[test]
    fn compiled_predicate_filters() {
        let compiler = threshold_compiler();
        let predicate = compiler.compile("10").ok();
        let Some(predicate) = predicate else {
            panic!("expected a predicate");
        };
        assert!(predicate(&10));
        assert!(!predicate(&9));
    }

    #[test]
    fn bad_expression_is_rejected() {
        let compiler = threshold_compiler();
        let result = compiler.compile("not a number");
        assert!(result.is_err());
    }
}
