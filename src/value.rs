use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Type returned by an exposed or proxied method: a pinned, boxed
/// future, since `ApiValue::Function` must be object-safe.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A callable exposed to, or received from, a peer. Implemented for
/// any `Fn(Vec<ApiValue>) -> BoxFuture<Result<ApiValue>>` via the
/// blanket impl below, and for proxies constructed by the
/// [Reconstructor](crate::reconstructor).
///
/// Exposed functions are always invoked without a bound receiver:
/// callers must pass any required state as arguments, or capture it in
/// the closure that implements this trait.
#[async_trait]
pub trait Method: Send + Sync {
    async fn call(&self, args: Vec<ApiValue>) -> Result<ApiValue>;
}

#[async_trait]
impl<F> Method for F
where
    F: Fn(Vec<ApiValue>) -> BoxFuture<Result<ApiValue>> + Send + Sync,
{
    async fn call(&self, args: Vec<ApiValue>) -> Result<ApiValue> {
        (self)(args).await
    }
}

/// The in-memory value an application exposes to, or receives from, a
/// peer: a tree of primitives, objects, and arrays, with async
/// functions as leaves.
///
/// `Object` uses a `BTreeMap` rather than a `HashMap` so that
/// serialized output (and therefore test assertions and wire
/// snapshots) has a stable key order, even though the specification
/// does not treat key order as semantic.
#[derive(Clone)]
pub enum ApiValue {
    String(String),
    Number(serde_json::Number),
    Object(BTreeMap<String, ApiValue>),
    Array(Vec<ApiValue>),
    Function(Arc<dyn Method>),
}

impl ApiValue {
    pub fn str(s: impl Into<String>) -> Self {
        ApiValue::String(s.into())
    }

    pub fn num(n: impl Into<serde_json::Number>) -> Self {
        ApiValue::Number(n.into())
    }

    pub fn object(entries: impl IntoIterator<Item = (String, ApiValue)>) -> Self {
        ApiValue::Object(entries.into_iter().collect())
    }

    pub fn array(entries: impl IntoIterator<Item = ApiValue>) -> Self {
        ApiValue::Array(entries.into_iter().collect())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(Vec<ApiValue>) -> BoxFuture<Result<ApiValue>> + Send + Sync + 'static,
    {
        ApiValue::Function(Arc::new(f))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ApiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ApiValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ApiValue>> {
        match self {
            ApiValue::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ApiValue]> {
        match self {
            ApiValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, ApiValue::Function(_))
    }
}

/// Structural equality, ignoring `Function` leaves entirely (functions
/// are compared by neither identity nor behavior here — property #1 in
/// the specification only claims this equality for function-free
/// trees; comparing two `Function`s always yields `false`, matching
/// Rust's inability to compare trait objects for equality).
impl PartialEq for ApiValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ApiValue::String(a), ApiValue::String(b)) => a == b,
            (ApiValue::Number(a), ApiValue::Number(b)) => a == b,
            (ApiValue::Object(a), ApiValue::Object(b)) => a == b,
            (ApiValue::Array(a), ApiValue::Array(b)) => a == b,
            (ApiValue::Function(_), ApiValue::Function(_)) => false,
            _ => false,
        }
    }
}

impl fmt::Debug for ApiValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiValue::String(s) => f.debug_tuple("String").field(s).finish(),
            ApiValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            ApiValue::Object(m) => f.debug_tuple("Object").field(m).finish(),
            ApiValue::Array(a) => f.debug_tuple("Array").field(a).finish(),
            ApiValue::Function(_) => write!(f, "Function(..)"),
        }
    }
}
