//! XML-RPC client for the Access Server agent.

pub mod codec;
pub mod error;
mod transport;
mod value;

use async_trait::async_trait;

pub use self::{
    error::{Error, ErrorKind},
    transport::{UnixSocketConnector, UnixSocketSession},
    value::{FromValue, Members, Value},
};

/// Opens one [`Session`] per collection cycle.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    async fn connect(&self) -> Result<Self::Session, Error>;
}

/// A connection to the XML-RPC endpoint, closed when dropped.
#[async_trait]
pub trait Session: Send {
    async fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, Error>;
}

/// Calls a parameterless method and decodes its result into `T`.
///
/// # Errors
/// Returns an error if the call fails or the result cannot be decoded.
pub async fn call_decoded<T, S>(session: &mut S, method: &str) -> Result<T, Error>
where
    T: FromValue,
    S: Session + ?Sized,
{
    let value = session.call(method, &[]).await?;
    T::from_value(&value)
}
