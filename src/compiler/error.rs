use std::fmt;

use super::Pos;

/// Represents all errors that are generated from within the compiler
/// and its submodules.
///
/// This type captures common metadata which is necessarily present for
/// all errors which are caused by input source code: the line and column
/// that the error occurs on.  This also handles formatting all error
/// messages with the universal metadata along with the inner metadata.
///
/// The inner error allows metadata which is specific to a submodule within
/// the compiler.  The errors themselves are submodule specific and are
/// stored in the `inner` field.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilerError<IE: fmt::Display> {
    pos: Pos,
    inner: IE,
}

impl<IE> CompilerError<IE>
where
    IE: fmt::Display,
{
    pub fn new(pos: Pos, inner: IE) -> Self {
        CompilerError { pos, inner }
    }

    pub fn inner(self) -> IE {
        self.inner
    }

    pub fn inner_ref(&self) -> &IE {
        &self.inner
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn take(self) -> (Pos, IE) {
        (self.pos, self.inner)
    }
}

impl<IE> fmt::Display for CompilerError<IE>
where
    IE: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("L{}: {}", self.pos, self.inner))
    }
}

/// Creates an `Err` holding a [`CompilerError`] at the given position.
#[macro_export]
macro_rules! err {
    ($pos: expr, $inner: expr) => {
        Err($crate::compiler::CompilerError::new($pos, $inner))
    };
}
