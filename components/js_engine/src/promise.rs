//! Runtime promises.
//!
//! Reactions run synchronously when the promise settles (or immediately when
//! registered on a settled promise). There is no microtask queue: ordering
//! relative to other work is decided by the task queue that drives the realm.

use crate::realm::Realm;
use crate::value::{JsObject, JsValue, ObjectClass};
use std::cell::Cell;
use std::rc::Rc;

/// Callback run once a promise settles; `Err` carries the rejection reason.
pub type Reaction = Box<dyn FnOnce(&Realm, Result<JsValue, JsValue>)>;

/// Settlement state of a runtime promise.
pub enum PromiseState {
    /// Waiting, with the reactions registered so far
    Pending(Vec<Reaction>),
    /// Resolved with a value
    Fulfilled(JsValue),
    /// Rejected with a reason
    Rejected(JsValue),
}

impl Realm {
    /// Creates a pending promise.
    pub fn new_promise(&self) -> JsObject {
        JsObject::with_class(ObjectClass::Promise(PromiseState::Pending(Vec::new())))
    }

    /// Creates a promise already fulfilled with `value`.
    pub fn resolved_promise(&self, value: JsValue) -> JsValue {
        let promise = self.new_promise();
        self.resolve_promise(&promise, value);
        JsValue::Object(promise)
    }

    /// Creates a promise already rejected with `reason`.
    pub fn rejected_promise(&self, reason: JsValue) -> JsValue {
        let promise = self.new_promise();
        self.reject_promise(&promise, reason);
        JsValue::Object(promise)
    }

    /// Resolves `promise`. A promise or thenable `value` is adopted: the
    /// promise follows it instead of fulfilling with it.
    pub fn resolve_promise(&self, promise: &JsObject, value: JsValue) {
        if value.is_promise() {
            let target = promise.clone();
            self.on_promise_settled(&value, move |realm, result| realm.settle(&target, result));
            return;
        }
        let then = self.get_member(&value, "then");
        if then.is_function() {
            let on_fulfilled = promise.clone();
            let on_rejected = promise.clone();
            // Only the first of the two callbacks may settle.
            let done = Rc::new(Cell::new(false));
            let done_rejected = Rc::clone(&done);
            let resolve = self.new_function("resolve", move |realm, _, args| {
                if !done.replace(true) {
                    realm.resolve_promise(&on_fulfilled, first_arg(args));
                }
                Ok(JsValue::Undefined)
            });
            let reject = self.new_function("reject", move |realm, _, args| {
                if !done_rejected.replace(true) {
                    realm.reject_promise(&on_rejected, first_arg(args));
                }
                Ok(JsValue::Undefined)
            });
            if let Err(thrown) = self.call(&then, &value, &[resolve, reject]) {
                self.reject_promise(promise, thrown);
            }
            return;
        }
        self.settle(promise, Ok(value));
    }

    /// Rejects `promise` with `reason`.
    pub fn reject_promise(&self, promise: &JsObject, reason: JsValue) {
        self.settle(promise, Err(reason));
    }

    fn settle(&self, promise: &JsObject, result: Result<JsValue, JsValue>) {
        let reactions = {
            let mut class = promise.class_mut();
            let ObjectClass::Promise(state) = &mut *class else {
                tracing::warn!("settle called on a non-promise object");
                return;
            };
            if !matches!(state, PromiseState::Pending(_)) {
                tracing::debug!("ignoring settlement of an already settled runtime promise");
                return;
            }
            let settled = match &result {
                Ok(value) => PromiseState::Fulfilled(value.clone()),
                Err(reason) => PromiseState::Rejected(reason.clone()),
            };
            match std::mem::replace(state, settled) {
                PromiseState::Pending(reactions) => reactions,
                _ => Vec::new(),
            }
        };
        for reaction in reactions {
            reaction(self, result.clone());
        }
    }

    /// Registers `reaction` on a promise. Non-promise values count as
    /// already fulfilled with themselves.
    pub fn on_promise_settled<F>(&self, promise: &JsValue, reaction: F)
    where
        F: FnOnce(&Realm, Result<JsValue, JsValue>) + 'static,
    {
        let Some(object) = promise.as_object().filter(|o| o.is_promise()) else {
            reaction(self, Ok(promise.clone()));
            return;
        };
        let ready = {
            let mut class = object.class_mut();
            match &mut *class {
                ObjectClass::Promise(PromiseState::Pending(reactions)) => {
                    reactions.push(Box::new(reaction));
                    return;
                }
                ObjectClass::Promise(PromiseState::Fulfilled(value)) => Ok(value.clone()),
                ObjectClass::Promise(PromiseState::Rejected(reason)) => Err(reason.clone()),
                _ => return,
            }
        };
        reaction(self, ready);
    }

    /// Returns true for a promise that has not settled yet.
    pub fn is_pending_promise(&self, value: &JsValue) -> bool {
        value.as_object().is_some_and(|object| {
            matches!(&*object.class(), ObjectClass::Promise(PromiseState::Pending(_)))
        })
    }
}

fn first_arg(args: &[JsValue]) -> JsValue {
    args.first().cloned().unwrap_or(JsValue::Undefined)
}
