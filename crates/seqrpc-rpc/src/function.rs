//! Function registration.
//!
//! A [`FunctionTable`] maps unique names to [`Handler`]s. Tables are built
//! once through [`FunctionTableBuilder`] and are immutable afterwards, so a
//! single table can be shared by every connection a listener accepts.
//!
//! ```
//! use seqrpc_rpc::FunctionTable;
//!
//! let table = FunctionTable::builder()
//!     .typed("add", |(a, b): (i64, i64)| Ok::<_, String>(a + b))
//!     .with_prefix("math.", |group| {
//!         group.typed("neg", |(a,): (i64,)| Ok::<_, String>(-a))
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert!(table.contains("add"));
//! assert!(table.contains("math.neg"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RpcError};

/// How a handler failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The function ran and failed. Reported to the caller as an exception.
    #[error("{0}")]
    Exception(String),

    /// The arguments did not fit the function's parameters.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The function's return value could not be turned into a value.
    #[error("unencodable result: {0}")]
    Unencodable(String),
}

impl CallError {
    pub fn exception(message: impl fmt::Display) -> Self {
        Self::Exception(message.to_string())
    }
}

/// Something that can be invoked with positional arguments.
pub trait Handler: Send + Sync {
    fn call(&self, args: &[Value]) -> std::result::Result<Value, CallError>;
}

impl<F> Handler for F
where
    F: Fn(&[Value]) -> std::result::Result<Value, CallError> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> std::result::Result<Value, CallError> {
        self(args)
    }
}

/// A parameter tuple that can be built from positional arguments.
pub trait FromArgs: Sized {
    const ARITY: usize;

    fn from_args(args: &[Value]) -> std::result::Result<Self, CallError>;
}

fn check_arity(args: &[Value], arity: usize) -> std::result::Result<(), CallError> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(CallError::InvalidArguments(format!(
            "expected {arity} argument(s), got {}",
            args.len()
        )))
    }
}

fn decode_arg<T: DeserializeOwned>(
    args: &[Value],
    index: usize,
) -> std::result::Result<T, CallError> {
    T::deserialize(&args[index])
        .map_err(|err| CallError::InvalidArguments(format!("argument {index}: {err}")))
}

macro_rules! impl_from_args {
    ($arity:literal; $($ty:ident => $index:tt),*) => {
        impl<$($ty: DeserializeOwned),*> FromArgs for ($($ty,)*) {
            const ARITY: usize = $arity;

            fn from_args(args: &[Value]) -> std::result::Result<Self, CallError> {
                check_arity(args, $arity)?;
                Ok(($(decode_arg::<$ty>(args, $index)?,)*))
            }
        }
    };
}

impl_from_args!(0;);
impl_from_args!(1; A => 0);
impl_from_args!(2; A => 0, B => 1);
impl_from_args!(3; A => 0, B => 1, C => 2);
impl_from_args!(4; A => 0, B => 1, C => 2, D => 3);
impl_from_args!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_from_args!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

/// Adapts a closure over a typed parameter tuple into a [`Handler`].
///
/// Argument mismatches become [`CallError::InvalidArguments`]; an `Err`
/// from the closure becomes [`CallError::Exception`] carrying its text.
pub struct Typed<F, A, R, E> {
    f: F,
    _marker: PhantomData<fn(A) -> (R, E)>,
}

impl<F, A, R, E> Typed<F, A, R, E>
where
    F: Fn(A) -> std::result::Result<R, E> + Send + Sync,
    A: FromArgs,
    R: Serialize,
    E: fmt::Display,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F, A, R, E> Handler for Typed<F, A, R, E>
where
    F: Fn(A) -> std::result::Result<R, E> + Send + Sync,
    A: FromArgs,
    R: Serialize,
    E: fmt::Display,
{
    fn call(&self, args: &[Value]) -> std::result::Result<Value, CallError> {
        let params = A::from_args(args)?;
        let output = (self.f)(params).map_err(CallError::exception)?;
        serde_json::to_value(output).map_err(|err| CallError::Unencodable(err.to_string()))
    }
}

/// Immutable name to handler mapping.
pub struct FunctionTable {
    functions: BTreeMap<String, Box<dyn Handler>>,
}

impl FunctionTable {
    pub fn builder() -> FunctionTableBuilder {
        FunctionTableBuilder::default()
    }

    /// A table with no functions; every request gets an unknown-function error.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.functions.get(name).map(|handler| handler.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

/// Collects handlers for a [`FunctionTable`].
///
/// Registration is chainable; a duplicate name is remembered and reported
/// by [`build`](Self::build).
#[derive(Default)]
pub struct FunctionTableBuilder {
    functions: BTreeMap<String, Box<dyn Handler>>,
    prefix: String,
    duplicate: Option<String>,
}

impl FunctionTableBuilder {
    /// Register a raw handler over the positional argument slice.
    pub fn register(mut self, name: impl AsRef<str>, handler: impl Handler + 'static) -> Self {
        let name = format!("{}{}", self.prefix, name.as_ref());
        if self.functions.contains_key(&name) {
            self.duplicate.get_or_insert(name);
        } else {
            self.functions.insert(name, Box::new(handler));
        }
        self
    }

    /// Register a closure taking a deserializable parameter tuple.
    pub fn typed<F, A, R, E>(self, name: impl AsRef<str>, f: F) -> Self
    where
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
        A: FromArgs + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
    {
        self.register(name, Typed::new(f))
    }

    /// Register a group of functions whose names all start with `prefix`.
    /// Groups nest; inner prefixes are appended to outer ones.
    pub fn with_prefix(mut self, prefix: &str, group: impl FnOnce(Self) -> Self) -> Self {
        let outer = self.prefix.clone();
        self.prefix.push_str(prefix);
        let mut this = group(self);
        this.prefix = outer;
        this
    }

    pub fn build(self) -> Result<FunctionTable> {
        if let Some(name) = self.duplicate {
            return Err(RpcError::DuplicateFunction(name));
        }
        Ok(FunctionTable {
            functions: self.functions,
        })
    }
}
