use crate::{Executor, Result};
use std::{borrow::Cow, future::Future};

/// An open handle to the backend.
pub trait Connection: Executor + Sized {
    /// Open a handle to the given URL.
    ///
    /// Drivers may already contact the server here, an error is then a failed liveness check.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>> + Send;

    /// Check the server answers.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Upper bound of idle connections kept by the handle, 0 keeps none.
    fn set_max_idle_connections(&mut self, max: usize);

    fn max_idle_connections(&self) -> usize;

    /// Close the handle, pending requests fail afterwards.
    fn disconnect(self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
