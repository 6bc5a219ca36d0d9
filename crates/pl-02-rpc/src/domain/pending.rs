//! A call awaiting its response.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_timeout::TimeoutAction;

use super::response::CallResponse;

/// Success path of a call.
pub type SuccessCallback = Box<dyn FnOnce(CallResponse) + Send>;

/// Timeout path of a call.
pub type TimeoutCallback = Box<dyn FnOnce() + Send>;

/// Registry value for an in-flight call.
///
/// Exactly one of the two callbacks runs: `on_success` when the response
/// is taken out of the registry, `on_timeout` when the sweep evicts it.
pub struct PendingCall {
    pub method: String,
    /// Deliver the response body verbatim.
    pub raw: bool,
    on_success: SuccessCallback,
    on_timeout: TimeoutCallback,
}

impl PendingCall {
    pub fn new(
        method: impl Into<String>,
        on_success: impl FnOnce(CallResponse) + Send + 'static,
        on_timeout: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            method: method.into(),
            raw: false,
            on_success: Box::new(on_success),
            on_timeout: Box::new(on_timeout),
        }
    }

    /// Pending entry for a forwarded request.
    pub fn raw(
        on_success: impl FnOnce(CallResponse) + Send + 'static,
        on_timeout: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            raw: true,
            ..Self::new(String::new(), on_success, on_timeout)
        }
    }

    pub fn complete(self, response: CallResponse) {
        (self.on_success)(response);
    }
}

impl TimeoutAction for PendingCall {
    fn on_timeout(self) {
        (self.on_timeout)();
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("method", &self.method)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

/// A response callback that can back both paths of a call.
///
/// Clones share one slot; the first `fire` wins.
pub struct OnceCallback(Arc<Mutex<Option<SuccessCallback>>>);

impl OnceCallback {
    pub fn new(callback: impl FnOnce(CallResponse) + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(Some(Box::new(callback)))))
    }

    /// Run the callback if nothing ran it yet. Returns whether it ran.
    pub fn fire(&self, response: CallResponse) -> bool {
        let callback = self.0.lock().take();
        match callback {
            Some(callback) => {
                callback(response);
                true
            }
            None => false,
        }
    }
}

impl Clone for OnceCallback {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
