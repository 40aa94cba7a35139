//! A join point built from owned arguments and the operation to run.

use crate::traits::JoinPoint;

/// One call to an operation: its arguments and the operation itself.
///
/// This is the join point handed to advice when interception is done by hand
/// rather than by a weaving layer.
///
/// # Example
///
/// ```rust
/// use memento_core::{Invocation, JoinPoint};
///
/// let call = Invocation::new((2, 3), |(a, b): (i32, i32)| Ok::<_, ()>(a * b));
/// assert_eq!(call.args(), &(2, 3));
/// assert_eq!(call.proceed(), Ok(6));
/// ```
pub struct Invocation<A, F> {
    args: A,
    target: F,
}

impl<A, F> Invocation<A, F> {
    /// Creates a join point for calling `target` with `args`.
    pub fn new(args: A, target: F) -> Self {
        Self { args, target }
    }
}

impl<A, F, T, E> JoinPoint for Invocation<A, F>
where
    F: FnOnce(A) -> Result<T, E>,
{
    type Args = A;
    type Output = T;
    type Error = E;

    fn args(&self) -> &A {
        &self.args
    }

    fn proceed(self) -> Result<T, E> {
        (self.target)(self.args)
    }
}

impl<A: std::fmt::Debug, F> std::fmt::Debug for Invocation<A, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
