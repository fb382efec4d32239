//! gRPC client for the GCDM data service
//!
//! [`GcdmService`] is the seam between the fetch pipeline and the transport:
//! [`GcdmClient`] implements it over a `tonic` channel, tests implement it in
//! memory.

use crate::config::Config;
use crate::error::{GcdmError, Result};
use crate::proto::{DataRequest, DataResponse, HeaderRequest, HeaderResponse, SERVICE_NAME};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::future::Future;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::GrpcMethod;

/// Name of the unary header call, used in errors and logs
pub const GET_HEADER: &str = "GetNetcdfHeader";

/// Name of the server-streaming data call, used in errors and logs
pub const GET_DATA: &str = "GetNetcdfData";

/// Stream of data chunks for one variable, in server order
pub type DataStream = BoxStream<'static, Result<DataResponse>>;

/// The two remote operations the client consumes
pub trait GcdmService {
    /// Unary call returning file metadata
    fn get_header(
        &mut self,
        request: HeaderRequest,
    ) -> impl Future<Output = Result<HeaderResponse>> + Send;

    /// Server-streaming call returning the chunks of one variable
    fn get_data(&mut self, request: DataRequest)
        -> impl Future<Output = Result<DataStream>> + Send;
}

/// Client for the `ucar.gcdm.Gcdm` service over a plaintext HTTP/2 channel
#[derive(Debug, Clone)]
pub struct GcdmClient {
    inner: tonic::client::Grpc<Channel>,
    server: String,
}

impl GcdmClient {
    /// Connect to the server named in `config`
    ///
    /// # Errors
    ///
    /// Returns [`GcdmError::InvalidEndpoint`] if the URL cannot be parsed and
    /// [`GcdmError::Connection`] if the server cannot be reached. No request
    /// is sent in either case.
    pub async fn connect(config: &Config) -> Result<Self> {
        let server = config.server_url.clone();
        let endpoint = Endpoint::from_shared(server.clone())
            .map_err(|e| GcdmError::InvalidEndpoint {
                server: server.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout());

        tracing::debug!(server = %server, "connecting to GCDM server");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| GcdmError::Connection {
                server: server.clone(),
                reason: describe_transport_error(&e),
            })?;
        tracing::info!(server = %server, "connected");

        let inner = tonic::client::Grpc::new(channel)
            .max_decoding_message_size(config.max_message_bytes);
        Ok(Self { inner, server })
    }

    async fn ready(&mut self, call: &'static str) -> Result<()> {
        self.inner
            .ready()
            .await
            .map_err(|e| GcdmError::Connection {
                server: self.server.clone(),
                reason: format!("service not ready for {call}: {e}"),
            })
    }
}

impl GcdmService for GcdmClient {
    async fn get_header(&mut self, request: HeaderRequest) -> Result<HeaderResponse> {
        self.ready(GET_HEADER).await?;
        let path = PathAndQuery::from_static("/ucar.gcdm.Gcdm/GetNetcdfHeader");
        let mut req = tonic::Request::new(request);
        let _ = req
            .extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, GET_HEADER));

        let response = self
            .inner
            .unary(req, path, ProstCodec::default())
            .await
            .map_err(|status| GcdmError::rpc(GET_HEADER, &status))?;
        Ok(response.into_inner())
    }

    async fn get_data(&mut self, request: DataRequest) -> Result<DataStream> {
        self.ready(GET_DATA).await?;
        let path = PathAndQuery::from_static("/ucar.gcdm.Gcdm/GetNetcdfData");
        let mut req = tonic::Request::new(request);
        let _ = req
            .extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, GET_DATA));

        let response = self
            .inner
            .server_streaming(req, path, ProstCodec::default())
            .await
            .map_err(|status| GcdmError::rpc(GET_DATA, &status))?;

        Ok(response
            .into_inner()
            .map_err(|status| GcdmError::rpc(GET_DATA, &status))
            .boxed())
    }
}

/// Flatten a transport error and its sources into one line
fn describe_transport_error(err: &tonic::transport::Error) -> String {
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Reserve a port, then release it so nothing is listening there
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config {
            server_url: format!("http://127.0.0.1:{port}"),
            connect_timeout_secs: 2,
            ..Config::default()
        };

        match GcdmClient::connect(&config).await {
            Err(GcdmError::Connection { server, .. }) => {
                assert_eq!(server, config.server_url);
            }
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let config = Config {
            server_url: "not a uri".to_string(),
            ..Config::default()
        };
        let err = GcdmClient::connect(&config).await.unwrap_err();
        assert!(matches!(err, GcdmError::InvalidEndpoint { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
