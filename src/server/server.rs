use crate::controller::{SdnConnection, SdnControllerManager};
use crate::grpc::p4::v1::p4_runtime_server::{P4Runtime, P4RuntimeServer};
use crate::grpc::p4::v1::{
    set_forwarding_pipeline_config_request, CapabilitiesRequest, CapabilitiesResponse,
    GetForwardingPipelineConfigRequest, GetForwardingPipelineConfigResponse, ReadRequest, ReadResponse,
    SetForwardingPipelineConfigRequest, SetForwardingPipelineConfigResponse, StreamMessageRequest,
    StreamMessageResponse, WriteRequest, WriteResponse,
};
use crate::server::stream_channel::{OpenStreamLimit, StreamSession};
use crate::server::P4rtServerShutdownSignal;
use crate::target::{SwitchTarget, TargetError};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

const P4RUNTIME_API_VERSION: &str = "1.3.0";

/// P4rtServer is the type that implements the P4Runtime gRPC interface for one device.
pub struct P4rtServer {
    logger: slog::Logger,
    manager: Arc<SdnControllerManager>,
    target: Arc<dyn SwitchTarget>,
    stream_buffer_size: usize,
    open_streams: Arc<OpenStreamLimit>,
}

impl P4rtServer {
    pub fn new(
        logger: slog::Logger,
        manager: Arc<SdnControllerManager>,
        target: Arc<dyn SwitchTarget>,
        stream_buffer_size: usize,
        max_open_streams: usize,
    ) -> Self {
        P4rtServer {
            logger,
            manager,
            target,
            stream_buffer_size,
            open_streams: Arc::new(OpenStreamLimit::new(max_open_streams)),
        }
    }

    pub(crate) async fn run(self, listener: TcpListener, shutdown_signal: P4rtServerShutdownSignal) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", listener.local_addr());

        let result = Server::builder()
            .add_service(P4RuntimeServer::new(self))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown_signal)
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    fn check_device_id(&self, device_id: u64) -> Result<(), Status> {
        if device_id != self.manager.device_id() {
            return Err(Status::not_found(format!("Unknown device ID {}.", device_id)));
        }
        Ok(())
    }

    async fn handle_write(&self, request: WriteRequest) -> Result<WriteResponse, Status> {
        self.check_device_id(request.device_id)?;
        self.manager.allow_write_request(&request)?;

        self.target.write(request.updates).await?;
        Ok(WriteResponse {})
    }

    async fn handle_read(&self, request: ReadRequest) -> Result<ReadResponse, Status> {
        self.check_device_id(request.device_id)?;
        self.manager.allow_read_request(&request)?;

        let p4info = self
            .target
            .get_forwarding_pipeline_config()
            .await?
            .and_then(|config| config.p4info)
            .ok_or(TargetError::PipelineNotInstalled)?;
        let request = self.manager.expand_wildcards_in_read_request(&request, &p4info)?;

        let entities = self.target.read(request.entities).await?;
        Ok(ReadResponse { entities })
    }

    async fn handle_set_pipeline(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> Result<SetForwardingPipelineConfigResponse, Status> {
        self.check_device_id(request.device_id)?;
        self.manager.allow_set_pipeline_request(&request)?;

        let action = set_forwarding_pipeline_config_request::Action::from_i32(request.action)
            .ok_or_else(|| Status::invalid_argument(format!("Unknown pipeline action {}.", request.action)))?;
        self.target.push_forwarding_pipeline_config(action, request.config).await?;

        slog::info!(self.logger, "Forwarding pipeline config pushed with action {:?}.", action);
        Ok(SetForwardingPipelineConfigResponse {})
    }

    async fn handle_get_pipeline(
        &self,
        request: GetForwardingPipelineConfigRequest,
    ) -> Result<GetForwardingPipelineConfigResponse, Status> {
        self.check_device_id(request.device_id)?;

        let config = self
            .target
            .get_forwarding_pipeline_config()
            .await?
            .ok_or(TargetError::PipelineNotInstalled)?;
        Ok(GetForwardingPipelineConfigResponse { config: Some(config) })
    }

    fn open_stream_channel(
        &self,
        peer: String,
        inbound: Streaming<StreamMessageRequest>,
    ) -> Result<ReceiverStream<Result<StreamMessageResponse, Status>>, Status> {
        let permit = self
            .open_streams
            .try_acquire()
            .ok_or_else(|| Status::resource_exhausted("Too many open StreamChannel streams."))?;

        let (tx, rx) = mpsc::channel(self.stream_buffer_size);
        let session = StreamSession {
            logger: self.logger.clone(),
            manager: self.manager.clone(),
            target: self.target.clone(),
            connection: SdnConnection::new(peer, tx.clone()),
            outbound: tx,
            _permit: permit,
        };
        tokio::spawn(session.run(inbound));

        Ok(ReceiverStream::new(rx))
    }
}

#[async_trait::async_trait]
impl P4Runtime for P4rtServer {
    async fn write(&self, rpc_request_wrapped: Request<WriteRequest>) -> Result<Response<WriteResponse>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_write(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    type ReadStream = tokio_stream::Iter<std::vec::IntoIter<Result<ReadResponse, Status>>>;

    async fn read(&self, rpc_request_wrapped: Request<ReadRequest>) -> Result<Response<Self::ReadStream>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        let rpc_result = self.handle_read(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(|response| Response::new(tokio_stream::iter(vec![Ok(response)])))
    }

    async fn set_forwarding_pipeline_config(
        &self,
        rpc_request_wrapped: Request<SetForwardingPipelineConfigRequest>,
    ) -> Result<Response<SetForwardingPipelineConfigResponse>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        // Pipeline blobs are large, only log the envelope.
        slog::debug!(
            self.logger,
            "ServerWire - SetForwardingPipelineConfig(device_id: {}, role: {:?}, action: {})",
            rpc_request.device_id,
            rpc_request.role,
            rpc_request.action
        );
        let rpc_result = self.handle_set_pipeline(rpc_request).await;
        slog::debug!(self.logger, "ServerWire - {:?}", rpc_result);

        rpc_result.map(Response::new)
    }

    async fn get_forwarding_pipeline_config(
        &self,
        rpc_request_wrapped: Request<GetForwardingPipelineConfigRequest>,
    ) -> Result<Response<GetForwardingPipelineConfigResponse>, Status> {
        let rpc_request = rpc_request_wrapped.into_inner();

        slog::debug!(self.logger, "ServerWire - {:?}", rpc_request);
        self.handle_get_pipeline(rpc_request).await.map(Response::new)
    }

    type StreamChannelStream = ReceiverStream<Result<StreamMessageResponse, Status>>;

    async fn stream_channel(
        &self,
        rpc_request_wrapped: Request<Streaming<StreamMessageRequest>>,
    ) -> Result<Response<Self::StreamChannelStream>, Status> {
        let peer = rpc_request_wrapped
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        self.open_stream_channel(peer, rpc_request_wrapped.into_inner())
            .map(Response::new)
    }

    async fn capabilities(
        &self,
        _: Request<CapabilitiesRequest>,
    ) -> Result<Response<CapabilitiesResponse>, Status> {
        Ok(Response::new(CapabilitiesResponse {
            p4runtime_api_version: P4RUNTIME_API_VERSION.to_string(),
        }))
    }
}
