//! Thread-scoped "current request" slot.
//!
//! Engine code invoked deep inside the execution pipeline has no parameter
//! carrying "which request is this"; it reads the ambient request from a
//! per-worker-thread slot instead. The slot is managed exclusively through
//! [`ContextGuard`], a scoped swap that restores the previous value on every
//! exit path. Worker threads are pooled and reused across unrelated
//! requests, so a dangling slot would leak one request's context into the
//! next.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::request::ScriptRequest;

thread_local! {
    static CURRENT_REQUEST: RefCell<Option<Arc<ScriptRequest>>> = const { RefCell::new(None) };
}

/// The request currently being answered on this thread, if any.
pub fn current_request() -> Option<Arc<ScriptRequest>> {
    CURRENT_REQUEST.with(|slot| slot.borrow().clone())
}

/// RAII guard that installs a request as the thread's current one and
/// restores the prior value (not a blind clear) when dropped, including
/// during unwinding.
pub struct ContextGuard {
    previous: Option<Arc<ScriptRequest>>,
    // Restoring on a different thread than the one we saved on would corrupt
    // both threads' slots.
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn enter(request: Arc<ScriptRequest>) -> Self {
        let previous = CURRENT_REQUEST.with(|slot| slot.borrow_mut().replace(request));
        Self { previous, _not_send: PhantomData }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_REQUEST.with(|slot| *slot.borrow_mut() = previous);
    }
}
