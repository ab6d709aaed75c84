use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Request};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use openvpnas_exporter_core::config::XmlRpcConfig;
use snafu::{ensure, ResultExt};
use tokio::{net::UnixStream, task::JoinHandle};

use crate::rpc::{codec, error, Connector, Error, Session, Value};

const USER_AGENT: &str = concat!("openvpnas-exporter/", env!("CARGO_PKG_VERSION"));

/// Connects to the XML-RPC endpoint through a Unix domain socket.
///
/// Calls are carried as HTTP/1.1 `POST /` requests over the socket.
#[derive(Clone, Debug)]
pub struct UnixSocketConnector {
    socket_path: PathBuf,

    connect_timeout: Duration,

    call_timeout: Duration,
}

impl UnixSocketConnector {
    #[must_use]
    pub const fn new(
        socket_path: PathBuf,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self { socket_path, connect_timeout, call_timeout }
    }

    #[must_use]
    pub fn from_config(
        XmlRpcConfig { socket_path, connect_timeout, call_timeout }: &XmlRpcConfig,
    ) -> Self {
        Self::new(socket_path.clone(), *connect_timeout, *call_timeout)
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path { &self.socket_path }

    async fn dial(&self) -> Result<Connection, Error> {
        let Self { socket_path, connect_timeout, .. } = self;

        let stream = tokio::time::timeout(*connect_timeout, UnixStream::connect(socket_path))
            .await
            .context(error::ConnectTimeoutSnafu {
                socket_path: socket_path.clone(),
                timeout: *connect_timeout,
            })?
            .context(error::ConnectSnafu { socket_path: socket_path.clone() })?;

        let handshake = http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream));
        let (sender, connection) = tokio::time::timeout(*connect_timeout, handshake)
            .await
            .context(error::ConnectTimeoutSnafu {
                socket_path: socket_path.clone(),
                timeout: *connect_timeout,
            })?
            .context(error::HandshakeSnafu)?;

        let task = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::debug!("XML-RPC connection closed with error: {err}");
            }
        });

        tracing::trace!("Connected to XML-RPC endpoint {}", socket_path.display());

        Ok(Connection { sender, task })
    }
}

#[async_trait]
impl Connector for UnixSocketConnector {
    type Session = UnixSocketSession;

    async fn connect(&self) -> Result<Self::Session, Error> {
        let connection = self.dial().await?;
        Ok(UnixSocketSession { connector: self.clone(), connection: Some(connection) })
    }
}

/// One HTTP/1.1 connection; its task is aborted when dropped.
#[derive(Debug)]
struct Connection {
    sender: SendRequest<Full<Bytes>>,

    task: JoinHandle<()>,
}

impl Connection {
    async fn is_ready(&mut self) -> bool {
        !self.sender.is_closed() && self.sender.ready().await.is_ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) { self.task.abort(); }
}

/// A scoped session with the XML-RPC endpoint.
///
/// Calls share one HTTP/1.1 connection while the endpoint keeps it open. When
/// the endpoint has closed it, the next call redials the same socket before
/// its request is sent, so no request is ever sent twice. Every connection is
/// closed when the session is dropped.
#[derive(Debug)]
pub struct UnixSocketSession {
    connector: UnixSocketConnector,

    connection: Option<Connection>,
}

impl UnixSocketSession {
    async fn ready_connection(&mut self, method: &str) -> Result<Connection, Error> {
        if let Some(mut connection) = self.connection.take() {
            if connection.is_ready().await {
                return Ok(connection);
            }
            tracing::debug!(
                "XML-RPC endpoint closed the connection, redialing {}",
                self.connector.socket_path.display()
            );
        }

        let mut connection = self.connector.dial().await?;
        connection.sender.ready().await.context(error::SendRequestSnafu { method })?;
        Ok(connection)
    }

    async fn round_trip(&mut self, method: &str, params: &[Value]) -> Result<Value, Error> {
        let request = Request::post("/")
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, "text/xml")
            .header(header::USER_AGENT, USER_AGENT)
            .body(Full::new(Bytes::from(codec::encode_method_call(method, params))))
            .context(error::BuildRequestSnafu { method })?;

        let mut connection = self.ready_connection(method).await?;
        let response = connection
            .sender
            .send_request(request)
            .await
            .context(error::SendRequestSnafu { method })?;
        self.connection = Some(connection);

        let status = response.status();
        ensure!(status.is_success(), error::HttpStatusSnafu { method, status });

        let body = response
            .into_body()
            .collect()
            .await
            .context(error::ReadResponseSnafu { method })?
            .to_bytes();

        codec::decode_method_response(&body)
    }
}

#[async_trait]
impl Session for UnixSocketSession {
    async fn call(&mut self, method: &str, params: &[Value]) -> Result<Value, Error> {
        let call_timeout = self.connector.call_timeout;
        tokio::time::timeout(call_timeout, self.round_trip(method, params))
            .await
            .context(error::CallTimeoutSnafu { method, timeout: call_timeout })?
    }
}
