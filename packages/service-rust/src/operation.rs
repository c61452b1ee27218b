//! Request envelope for data-access calls routed through the tower pipeline.

use std::borrow::Cow;

/// A data-access call: the logical method name plus its payload.
///
/// The method name is what the [`MethodClassifier`](rwsplit_core::MethodClassifier)
/// matches against declared patterns, e.g. `"findById"` or `"saveUser"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataCall<R> {
    pub method: Cow<'static, str>,
    pub payload: R,
}

impl<R> DataCall<R> {
    pub fn new(method: impl Into<Cow<'static, str>>, payload: R) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Replaces the payload, keeping the method name.
    pub fn map<T>(self, f: impl FnOnce(R) -> T) -> DataCall<T> {
        DataCall {
            method: self.method,
            payload: f(self.payload),
        }
    }
}
