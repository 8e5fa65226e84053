//! Live behavior attached to variable and method nodes.
//!
//! A [`VariableBinding`] bridges process state into reads and writes. A
//! [`MethodBinding`] pairs typed argument contracts with a handler. Both are
//! cheap to clone: handlers are reference-counted so a call can be prepared
//! under the address-space lock and executed after it is released.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use uaflow_core::{Argument, StatusCode, Variant};

// ─────────────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────────────

type Getter = Arc<dyn Fn() -> Variant + Send + Sync>;
type Setter = Arc<dyn Fn(Variant) -> StatusCode + Send + Sync>;

/// Get/set accessors for a variable node.
///
/// Read-only bindings have no setter at all; a write against them is
/// answered with `BadNotWritable` by the address space.
#[derive(Clone)]
pub struct VariableBinding {
    get: Getter,
    set: Option<Setter>,
}

impl VariableBinding {
    /// A binding whose value is recomputed on every read.
    pub fn read_only<G>(get: G) -> Self
    where
        G: Fn() -> Variant + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: None,
        }
    }

    /// A binding with both accessors.
    ///
    /// The setter receives a value already coerced to the variable's
    /// declared data type.
    pub fn read_write<G, S>(get: G, set: S) -> Self
    where
        G: Fn() -> Variant + Send + Sync + 'static,
        S: Fn(Variant) -> StatusCode + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Some(Arc::new(set)),
        }
    }

    /// A read-only binding that always returns `value`.
    pub fn constant(value: Variant) -> Self {
        Self::read_only(move || value.clone())
    }

    /// A read-only view of a shared value.
    pub fn observe(value: SharedValue) -> Self {
        Self::read_only(move || value.get())
    }

    /// A writable binding backed by a shared value.
    pub fn stored(value: SharedValue) -> Self {
        let reader = value.clone();
        Self::read_write(
            move || reader.get(),
            move |v| {
                value.set(v);
                StatusCode::Good
            },
        )
    }

    pub fn read(&self) -> Variant {
        (self.get)()
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    /// Applies a write. `value` must already have the declared type.
    pub(crate) fn write(&self, value: Variant) -> StatusCode {
        match &self.set {
            Some(set) => set(value),
            None => StatusCode::BadNotWritable,
        }
    }
}

impl fmt::Debug for VariableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableBinding")
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// A value shared between a binding and the process that feeds it.
#[derive(Debug, Clone, Default)]
pub struct SharedValue {
    inner: Arc<RwLock<Variant>>,
}

impl SharedValue {
    pub fn new(initial: impl Into<Variant>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.into())),
        }
    }

    pub fn get(&self) -> Variant {
        self.inner.read().clone()
    }

    pub fn set(&self, value: impl Into<Variant>) {
        *self.inner.write() = value.into();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Methods
// ─────────────────────────────────────────────────────────────────────────────

/// The outcome of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub status_code: StatusCode,
    pub output_arguments: Vec<Variant>,
}

impl CallResult {
    pub fn good(outputs: Vec<Variant>) -> Self {
        Self {
            status_code: StatusCode::Good,
            output_arguments: outputs,
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            status_code: status,
            output_arguments: Vec::new(),
        }
    }
}

type SyncHandler = Arc<dyn Fn(&[Variant]) -> CallResult + Send + Sync>;
type AsyncHandler = Arc<dyn Fn(Vec<Variant>) -> BoxFuture<'static, CallResult> + Send + Sync>;

/// The execution callback of a method.
#[derive(Clone)]
pub enum MethodHandler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

impl MethodHandler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&[Variant]) -> CallResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(handler))
    }

    pub fn asynchronous<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<Variant>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |inputs| handler(inputs).boxed()))
    }
}

impl fmt::Debug for MethodHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "MethodHandler::Sync"),
            Self::Async(_) => write!(f, "MethodHandler::Async"),
        }
    }
}

/// Argument contracts plus handler for a method node.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
    handler: MethodHandler,
}

impl MethodBinding {
    pub fn new(inputs: Vec<Argument>, outputs: Vec<Argument>, handler: MethodHandler) -> Self {
        Self {
            inputs,
            outputs,
            handler,
        }
    }

    /// Validates `inputs` against the declared contract.
    ///
    /// Inputs are matched by position and coerced to the declared types.
    pub fn prepare(&self, inputs: &[Variant]) -> Result<PreparedCall, StatusCode> {
        if inputs.len() < self.inputs.len() {
            return Err(StatusCode::BadArgumentsMissing);
        }
        if inputs.len() > self.inputs.len() {
            return Err(StatusCode::BadTooManyArguments);
        }

        let inputs = self
            .inputs
            .iter()
            .zip(inputs)
            .map(|(arg, value)| arg.coerce(value))
            .collect::<Option<Vec<_>>>()
            .ok_or(StatusCode::BadTypeMismatch)?;

        Ok(PreparedCall {
            inputs,
            outputs: self.outputs.clone(),
            handler: self.handler.clone(),
        })
    }
}

/// A validated call, detached from the address space.
#[derive(Debug)]
pub struct PreparedCall {
    inputs: Vec<Variant>,
    outputs: Vec<Argument>,
    handler: MethodHandler,
}

impl PreparedCall {
    pub fn inputs(&self) -> &[Variant] {
        &self.inputs
    }

    /// Runs the handler and checks its result against the output contract.
    ///
    /// A good result whose outputs do not match the declared shape is
    /// replaced with `BadInternalError`; bad results are surfaced as-is.
    pub async fn invoke(self) -> CallResult {
        let result = match &self.handler {
            MethodHandler::Sync(handler) => handler(&self.inputs),
            MethodHandler::Async(handler) => handler(self.inputs.clone()).await,
        };

        if result.status_code.is_bad() {
            return result;
        }

        let shape_ok = result.output_arguments.len() == self.outputs.len()
            && self
                .outputs
                .iter()
                .zip(&result.output_arguments)
                .all(|(arg, value)| arg.matches(value));

        if shape_ok {
            result
        } else {
            tracing::error!(
                "Method handler returned {} outputs not matching the declared contract",
                result.output_arguments.len()
            );
            CallResult::bad(StatusCode::BadInternalError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaflow_core::DataType;

    fn adder() -> MethodBinding {
        MethodBinding::new(
            vec![
                Argument::scalar("a", DataType::Double),
                Argument::scalar("b", DataType::Double),
            ],
            vec![Argument::scalar("sum", DataType::Double)],
            MethodHandler::sync(|inputs| {
                let a = inputs[0].to_f64().unwrap_or_default();
                let b = inputs[1].to_f64().unwrap_or_default();
                CallResult::good(vec![Variant::Double(a + b)])
            }),
        )
    }

    #[test]
    fn test_stored_binding_round_trip() {
        let value = SharedValue::new(1.0);
        let binding = VariableBinding::stored(value.clone());

        assert!(binding.is_writable());
        assert_eq!(binding.write(Variant::Double(2.5)), StatusCode::Good);
        assert_eq!(value.get(), Variant::Double(2.5));
        assert_eq!(binding.read(), Variant::Double(2.5));
    }

    #[test]
    fn test_read_only_binding_rejects_writes() {
        let binding = VariableBinding::constant(Variant::Double(7.0));
        assert!(!binding.is_writable());
        assert_eq!(
            binding.write(Variant::Double(1.0)),
            StatusCode::BadNotWritable
        );
        assert_eq!(binding.read(), Variant::Double(7.0));
    }

    #[test]
    fn test_prepare_checks_argument_count() {
        let method = adder();
        assert_eq!(
            method.prepare(&[Variant::Double(1.0)]).unwrap_err(),
            StatusCode::BadArgumentsMissing
        );
        assert_eq!(
            method
                .prepare(&[Variant::Double(1.0), Variant::Double(1.0), Variant::Empty])
                .unwrap_err(),
            StatusCode::BadTooManyArguments
        );
        assert_eq!(
            method
                .prepare(&[Variant::Double(1.0), Variant::from("two")])
                .unwrap_err(),
            StatusCode::BadTypeMismatch
        );
    }

    #[tokio::test]
    async fn test_sync_handler_invocation() {
        let call = adder()
            .prepare(&[Variant::UInt32(2), Variant::Double(0.5)])
            .unwrap();
        assert_eq!(call.inputs(), &[Variant::Double(2.0), Variant::Double(0.5)]);

        let result = call.invoke().await;
        assert_eq!(result, CallResult::good(vec![Variant::Double(2.5)]));
    }

    #[tokio::test]
    async fn test_async_handler_invocation() {
        let method = MethodBinding::new(
            vec![Argument::scalar("name", DataType::String)],
            vec![Argument::scalar("greeting", DataType::String)],
            MethodHandler::asynchronous(|inputs: Vec<Variant>| async move {
                match &inputs[0] {
                    Variant::String(name) => CallResult::good(vec![format!("hi {}", name).into()]),
                    _ => CallResult::bad(StatusCode::BadTypeMismatch),
                }
            }),
        );

        let result = method
            .prepare(&[Variant::from("pump")])
            .unwrap()
            .invoke()
            .await;
        assert_eq!(result.output_arguments, vec![Variant::from("hi pump")]);
    }

    #[tokio::test]
    async fn test_output_shape_is_enforced() {
        let method = MethodBinding::new(
            vec![],
            vec![Argument::scalar("out", DataType::Double)],
            MethodHandler::sync(|_| CallResult::good(vec![Variant::from("not a double")])),
        );

        let result = method.prepare(&[]).unwrap().invoke().await;
        assert_eq!(result, CallResult::bad(StatusCode::BadInternalError));
    }

    #[tokio::test]
    async fn test_bad_status_is_surfaced() {
        let method = MethodBinding::new(
            vec![],
            vec![Argument::scalar("out", DataType::Double)],
            MethodHandler::sync(|_| CallResult::bad(StatusCode::BadOutOfRange)),
        );

        let result = method.prepare(&[]).unwrap().invoke().await;
        assert_eq!(result.status_code, StatusCode::BadOutOfRange);
    }
}
