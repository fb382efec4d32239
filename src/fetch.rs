//! Fetch-and-decode pipeline
//!
//! The sequence is fixed: header request, data request, drain the stream,
//! decode. The header must succeed before data is requested, and every
//! failure is returned to the caller without retry.

use crate::client::{GcdmClient, GcdmService, GET_DATA, GET_HEADER};
use crate::config::{ChunkPolicy, Config};
use crate::decode::Decoder;
use crate::error::{GcdmError, Result};
use crate::proto::{DataRequest, DataResponse, HeaderRequest, HeaderResponse};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;

/// What to fetch and how to treat the data stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// File location, resolved by the server against its own storage
    pub location: String,
    /// Variable name, optionally with a section
    pub variable_spec: String,
    /// Whether to keep every chunk or only the first
    pub chunk_policy: ChunkPolicy,
    /// Limit on each of the two calls, stream draining included
    pub timeout: Duration,
}

impl FetchRequest {
    /// Build a request using the chunk policy and timeout from `config`
    pub fn new(location: impl Into<String>, variable_spec: impl Into<String>, config: &Config) -> Self {
        Self {
            location: location.into(),
            variable_spec: variable_spec.into(),
            chunk_policy: config.chunk_policy,
            timeout: config.timeout(),
        }
    }

    /// Reject empty inputs before anything touches the network
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the location or variable spec is blank.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(GcdmError::InvalidArgument("location cannot be empty".to_string()));
        }
        if self.variable_spec.trim().is_empty() {
            return Err(GcdmError::InvalidArgument(
                "variable spec cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connect, fetch and decode. The channel lives only for the duration of
/// this call and is dropped on every return path.
///
/// # Errors
///
/// Returns an error if the request is invalid, the server cannot be reached,
/// either call fails or times out, the stream is empty, or decoding fails.
pub async fn fetch_and_decode<D: Decoder>(
    config: &Config,
    request: &FetchRequest,
    decoder: &D,
) -> Result<D::Output> {
    request.validate()?;
    let mut client = GcdmClient::connect(config).await?;
    fetch_with(&mut client, request, decoder).await
}

/// Connect and fetch only the header of `location`
///
/// # Errors
///
/// Returns an error if `location` is blank, the server cannot be reached,
/// the call fails or times out, or the response carries a server error.
pub async fn fetch_header(config: &Config, location: &str, timeout: Duration) -> Result<HeaderResponse> {
    if location.trim().is_empty() {
        return Err(GcdmError::InvalidArgument("location cannot be empty".to_string()));
    }
    let mut client = GcdmClient::connect(config).await?;
    request_header(&mut client, location, timeout).await
}

/// Run the pipeline over an existing service
///
/// # Errors
///
/// Same as [`fetch_and_decode`], minus connection failures.
pub async fn fetch_with<S, D>(service: &mut S, request: &FetchRequest, decoder: &D) -> Result<D::Output>
where
    S: GcdmService,
    D: Decoder,
{
    request.validate()?;

    let header = request_header(service, &request.location, request.timeout).await?;
    let chunks = request_data(service, request).await?;

    tracing::debug!(chunks = chunks.len(), "decoding response");
    decoder.decode(header, chunks)
}

async fn request_header<S: GcdmService>(
    service: &mut S,
    location: &str,
    timeout: Duration,
) -> Result<HeaderResponse> {
    tracing::info!(location, "requesting header");
    let request = HeaderRequest {
        location: location.to_string(),
    };
    let response = with_timeout(GET_HEADER, timeout, service.get_header(request)).await?;

    if let Some(error) = &response.error {
        tracing::warn!(location, code = error.code, "server rejected header request");
        return Err(GcdmError::Remote {
            location: location.to_string(),
            code: error.code,
            message: error.message.clone(),
        });
    }
    Ok(response)
}

async fn request_data<S: GcdmService>(service: &mut S, request: &FetchRequest) -> Result<Vec<DataResponse>> {
    tracing::info!(
        location = %request.location,
        variable = %request.variable_spec,
        policy = %request.chunk_policy,
        "requesting data"
    );
    let data_request = DataRequest {
        location: request.location.clone(),
        variable_spec: request.variable_spec.clone(),
    };

    let drain = async {
        let stream = service.get_data(data_request).await?;
        collect_chunks(stream, request.chunk_policy).await
    };
    let chunks = with_timeout(GET_DATA, request.timeout, drain).await?;

    if chunks.is_empty() {
        return Err(GcdmError::NoData {
            location: request.location.clone(),
            variable_spec: request.variable_spec.clone(),
        });
    }
    Ok(chunks)
}

/// Drain a data stream to its end. With [`ChunkPolicy::First`] only the first
/// chunk is kept; later chunks are read and discarded, so a stream error
/// after the first chunk still fails the fetch.
///
/// # Errors
///
/// Returns the first error yielded by the stream.
pub async fn collect_chunks<St>(mut stream: St, policy: ChunkPolicy) -> Result<Vec<DataResponse>>
where
    St: futures::Stream<Item = Result<DataResponse>> + Unpin,
{
    let mut chunks = Vec::new();
    let mut discarded = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if policy == ChunkPolicy::First && !chunks.is_empty() {
            discarded += 1;
            continue;
        }
        chunks.push(chunk);
    }
    if discarded > 0 {
        tracing::warn!(
            discarded,
            "data stream returned more than one chunk; keeping only the first"
        );
    }
    Ok(chunks)
}

async fn with_timeout<T>(
    call: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GcdmError::Timeout(format!("{call} did not complete within {limit:?}")))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::client::DataStream;
    use crate::decode::{NetcdfDecoder, Values};
    use crate::proto::{self, DataType};
    use std::cell::Cell;

    const LOCATION: &str = "./test/data/test.nc";
    const VARIABLE: &str = "analysed_sst";

    /// In-memory service recording which calls were made
    #[derive(Default)]
    struct FakeService {
        header: Option<HeaderResponse>,
        header_error: Option<tonic::Status>,
        chunks: Vec<Result<DataResponse>>,
        header_calls: Vec<HeaderRequest>,
        data_calls: Vec<DataRequest>,
        stall_data: bool,
    }

    impl GcdmService for FakeService {
        async fn get_header(&mut self, request: HeaderRequest) -> Result<HeaderResponse> {
            self.header_calls.push(request);
            if let Some(status) = &self.header_error {
                return Err(GcdmError::rpc(GET_HEADER, status));
            }
            Ok(self.header.clone().unwrap_or_default())
        }

        async fn get_data(&mut self, request: DataRequest) -> Result<DataStream> {
            self.data_calls.push(request);
            if self.stall_data {
                return Ok(futures::stream::pending().boxed());
            }
            let chunks: Vec<Result<DataResponse>> = self
                .chunks
                .drain(..)
                .collect();
            Ok(futures::stream::iter(chunks).boxed())
        }
    }

    /// Decoder that returns exactly what it was given
    #[derive(Default)]
    struct EchoDecoder {
        calls: Cell<usize>,
    }

    impl Decoder for EchoDecoder {
        type Output = (HeaderResponse, Vec<DataResponse>);

        fn decode(&self, header: HeaderResponse, data: Vec<DataResponse>) -> Result<Self::Output> {
            self.calls.set(self.calls.get() + 1);
            Ok((header, data))
        }
    }

    fn header_h() -> HeaderResponse {
        HeaderResponse {
            error: None,
            header: Some(proto::Header {
                location: LOCATION.to_string(),
                root: Some(proto::Group {
                    vars: vec![proto::Variable {
                        name: VARIABLE.to_string(),
                        data_type: DataType::Float as i32,
                        shapes: vec![proto::Dimension {
                            name: "lat".to_string(),
                            length: 3,
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                metadata_version: 1,
            }),
            version: 1,
        }
    }

    fn chunk(start: i64, values: Vec<f32>) -> DataResponse {
        DataResponse {
            location: LOCATION.to_string(),
            variable_spec: VARIABLE.to_string(),
            var_full_name: VARIABLE.to_string(),
            section: Some(proto::Section {
                ranges: vec![proto::Range {
                    start,
                    size: i64::try_from(values.len()).unwrap(),
                    stride: 1,
                }],
            }),
            data: Some(proto::Data {
                data_type: DataType::Float as i32,
                shape: vec![u32::try_from(values.len()).unwrap()],
                fdata: values,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn request(policy: ChunkPolicy) -> FetchRequest {
        FetchRequest {
            location: LOCATION.to_string(),
            variable_spec: VARIABLE.to_string(),
            chunk_policy: policy,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_single_chunk_passes_through_unmodified() {
        let d = chunk(0, vec![280.5, 281.0, 279.25]);
        let mut service = FakeService {
            header: Some(header_h()),
            chunks: vec![Ok(d.clone())],
            ..Default::default()
        };
        let decoder = EchoDecoder::default();

        let (header, data) = fetch_with(&mut service, &request(ChunkPolicy::All), &decoder)
            .await
            .unwrap();

        assert_eq!(header, header_h());
        assert_eq!(data, vec![d]);
        assert_eq!(decoder.calls.get(), 1);
        assert_eq!(service.header_calls[0].location, LOCATION);
        assert_eq!(service.data_calls[0].variable_spec, VARIABLE);
    }

    #[tokio::test]
    async fn test_single_chunk_decodes_to_netcdf_decoder_output() {
        let d = chunk(0, vec![280.5, 281.0, 279.25]);
        let mut service = FakeService {
            header: Some(header_h()),
            chunks: vec![Ok(d.clone())],
            ..Default::default()
        };

        let fetched = fetch_with(&mut service, &request(ChunkPolicy::First), &NetcdfDecoder)
            .await
            .unwrap();
        let direct = NetcdfDecoder.decode(header_h(), vec![d]).unwrap();
        assert_eq!(fetched, direct);
    }

    #[tokio::test]
    async fn test_empty_stream_is_no_data_and_skips_decoder() {
        let mut service = FakeService {
            header: Some(header_h()),
            ..Default::default()
        };
        let decoder = EchoDecoder::default();

        let err = fetch_with(&mut service, &request(ChunkPolicy::First), &decoder)
            .await
            .unwrap_err();

        assert!(matches!(err, GcdmError::NoData { .. }));
        assert_ne!(err.exit_code(), 0);
        assert_eq!(decoder.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_first_policy_always_keeps_first_chunk() {
        for _ in 0..10 {
            let first = chunk(0, vec![1.0]);
            let mut service = FakeService {
                header: Some(header_h()),
                chunks: vec![Ok(first.clone()), Ok(chunk(1, vec![2.0])), Ok(chunk(2, vec![3.0]))],
                ..Default::default()
            };
            let decoder = EchoDecoder::default();

            let (_, data) = fetch_with(&mut service, &request(ChunkPolicy::First), &decoder)
                .await
                .unwrap();
            assert_eq!(data, vec![first]);
        }
    }

    #[tokio::test]
    async fn test_all_policy_assembles_every_chunk() {
        let mut service = FakeService {
            header: Some(header_h()),
            chunks: vec![
                Ok(chunk(2, vec![3.0])),
                Ok(chunk(0, vec![1.0, 2.0])),
            ],
            ..Default::default()
        };

        let decoded = fetch_with(&mut service, &request(ChunkPolicy::All), &NetcdfDecoder)
            .await
            .unwrap();
        assert_eq!(decoded.variable.values, Values::Float(vec![1.0, 2.0, 3.0]));
        assert_eq!(decoded.variable.shape, vec![3]);
    }

    #[tokio::test]
    async fn test_header_failure_skips_data_call() {
        let mut service = FakeService {
            header_error: Some(tonic::Status::unavailable("server restarting")),
            chunks: vec![Ok(chunk(0, vec![1.0]))],
            ..Default::default()
        };
        let decoder = EchoDecoder::default();

        let err = fetch_with(&mut service, &request(ChunkPolicy::All), &decoder)
            .await
            .unwrap_err();

        assert!(matches!(err, GcdmError::Rpc { call: GET_HEADER, .. }));
        assert_eq!(service.header_calls.len(), 1);
        assert!(service.data_calls.is_empty());
        assert_eq!(decoder.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_header_error_in_response_skips_data_call() {
        let mut service = FakeService {
            header: Some(HeaderResponse {
                error: Some(proto::Error {
                    message: "file not found".to_string(),
                    code: 404,
                }),
                header: None,
                version: 1,
            }),
            ..Default::default()
        };
        let decoder = EchoDecoder::default();

        let err = fetch_with(&mut service, &request(ChunkPolicy::All), &decoder)
            .await
            .unwrap_err();

        match &err {
            GcdmError::Remote {
                location,
                code,
                message,
            } => {
                assert_eq!(location, LOCATION);
                assert_eq!(*code, 404);
                assert_eq!(message, "file not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.exit_code(), 5);
        assert!(service.data_calls.is_empty());
        assert_eq!(decoder.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_after_first_chunk_fails() {
        let mut service = FakeService {
            header: Some(header_h()),
            chunks: vec![
                Ok(chunk(0, vec![1.0])),
                Err(GcdmError::rpc(GET_DATA, &tonic::Status::internal("disk error"))),
            ],
            ..Default::default()
        };
        let decoder = EchoDecoder::default();

        let err = fetch_with(&mut service, &request(ChunkPolicy::First), &decoder)
            .await
            .unwrap_err();
        assert!(matches!(err, GcdmError::Rpc { call: GET_DATA, .. }));
        assert_eq!(decoder.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_before_any_call() {
        let mut service = FakeService::default();
        let mut req = request(ChunkPolicy::All);
        req.variable_spec = "  ".to_string();

        let err = fetch_with(&mut service, &req, &EchoDecoder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GcdmError::InvalidArgument(_)));
        assert!(service.header_calls.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let mut service = FakeService {
            header: Some(header_h()),
            stall_data: true,
            ..Default::default()
        };
        let mut req = request(ChunkPolicy::All);
        req.timeout = Duration::from_millis(50);

        let err = fetch_with(&mut service, &req, &EchoDecoder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GcdmError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_sends_nothing() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config {
            server_url: format!("http://127.0.0.1:{port}"),
            connect_timeout_secs: 2,
            ..Config::default()
        };
        let decoder = EchoDecoder::default();
        let err = fetch_and_decode(&config, &FetchRequest::new(LOCATION, VARIABLE, &config), &decoder)
            .await
            .unwrap_err();
        assert!(matches!(err, GcdmError::Connection { .. }));
        assert_eq!(decoder.calls.get(), 0);
    }
}
