use p4rt::p4::config::v1::{P4Info, Preamble, Table};
use p4rt::p4::v1::p4_runtime_client::P4RuntimeClient;
use p4rt::p4::v1::{
    entity, set_forwarding_pipeline_config_request, stream_message_request, stream_message_response, update,
    CapabilitiesRequest, Entity, ForwardingPipelineConfig, GetForwardingPipelineConfigRequest,
    MasterArbitrationUpdate, PacketIn, PacketOut, ReadRequest, Role, SetForwardingPipelineConfigRequest,
    StreamMessageRequest, StreamMessageResponse, TableEntry, Uint128, Update, WriteRequest,
};
use p4rt::{InMemorySwitch, P4rtServerConfig, P4rtServerHandle, P4rtServerOptions};
use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Streaming};

const DEVICE_ID: u64 = 183807201;
const TABLE_ID: u32 = 33554433;

#[tokio::test]
async fn primary_controls_the_pipeline_and_backup_can_only_read() -> Result<(), Box<dyn Error>> {
    let (server, _switch) = start_server(P4rtServerOptions::default()).await?;
    let mut client = connect(&server).await?;

    // First in with an election ID takes the empty primary slot, then gets outbid.
    let mut backup = Controller::open(&mut client).await?;
    let response = backup.arbitrate(Some(1)).await;
    assert_eq!(Code::Ok as i32, response.status.unwrap().code);

    let mut primary = Controller::open(&mut client).await?;
    let response = primary.arbitrate(Some(2)).await;
    assert_eq!(Code::Ok as i32, response.status.unwrap().code);
    assert_eq!(Code::AlreadyExists as i32, backup.next_arbitration().await.status.unwrap().code);

    // Backup can't push a pipeline.
    let err = client
        .set_forwarding_pipeline_config(set_pipeline_request(1))
        .await
        .unwrap_err();
    assert_eq!(Code::PermissionDenied, err.code());

    client.set_forwarding_pipeline_config(set_pipeline_request(2)).await?;
    let installed = client
        .get_forwarding_pipeline_config(GetForwardingPipelineConfigRequest { device_id: DEVICE_ID })
        .await?
        .into_inner();
    assert_eq!(Some(pipeline()), installed.config);

    client.write(insert_request(2, 1)).await?;
    let err = client.write(insert_request(1, 2)).await.unwrap_err();
    assert_eq!(Code::PermissionDenied, err.code());

    // Reads need no election ID, and a wildcard covers every table.
    let mut read_stream = client
        .read(ReadRequest {
            device_id: DEVICE_ID,
            entities: vec![table_entity(0, 0)],
            role: String::new(),
        })
        .await?
        .into_inner();
    let read_response = read_stream.message().await?.unwrap();
    assert_eq!(vec![table_entity(TABLE_ID, 1)], read_response.entities);

    Ok(())
}

#[tokio::test]
async fn packet_io_follows_primacy() -> Result<(), Box<dyn Error>> {
    let (server, switch) = start_server(P4rtServerOptions::default()).await?;
    let mut client = connect(&server).await?;

    let mut primary = Controller::open(&mut client).await?;
    primary.arbitrate(Some(10)).await;
    let mut backup = Controller::open(&mut client).await?;
    backup.arbitrate(Some(5)).await;

    switch.inject_packet_in(PacketIn {
        payload: b"to-controller".to_vec(),
        metadata: vec![],
    })?;
    match primary.next().await.update {
        Some(stream_message_response::Update::Packet(packet)) => assert_eq!(b"to-controller".to_vec(), packet.payload),
        other => panic!("Expected packet-in, got {:?}", other),
    }

    backup.send_packet_out(b"from-backup").await;
    primary.send_packet_out(b"from-primary").await;

    // Packet-outs are handled off the request path, so poll until one lands.
    let transmitted = timeout(Duration::from_secs(5), async {
        loop {
            let packets = switch.transmitted_packets();
            if !packets.is_empty() {
                return packets;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    assert_eq!(vec![b"from-primary".to_vec()], transmitted.into_iter().map(|p| p.payload).collect::<Vec<_>>());
    backup.assert_no_messages().await;

    Ok(())
}

#[tokio::test]
async fn primary_disconnect_is_broadcast() -> Result<(), Box<dyn Error>> {
    let (server, _switch) = start_server(P4rtServerOptions::default()).await?;
    let mut client = connect(&server).await?;

    let mut backup = Controller::open(&mut client).await?;
    backup.arbitrate(None).await;
    let mut primary = Controller::open(&mut client).await?;
    primary.arbitrate(Some(1)).await;
    backup.next_arbitration().await;

    drop(primary);

    let response = backup.next_arbitration().await;
    assert_eq!(Code::NotFound as i32, response.status.unwrap().code);
    assert_eq!(1, response.election_id.unwrap().low);
    assert_eq!(1, server.manager().active_connections());

    Ok(())
}

#[tokio::test]
async fn bad_arbitration_ends_the_stream() -> Result<(), Box<dyn Error>> {
    let (server, _switch) = start_server(P4rtServerOptions::default()).await?;
    let mut client = connect(&server).await?;

    let mut controller = Controller::open(&mut client).await?;
    controller.send(arbitration(DEVICE_ID + 1, Some(1))).await;

    let status = timeout(Duration::from_secs(5), controller.responses.message())
        .await?
        .unwrap_err();
    assert_eq!(Code::NotFound, status.code());
    assert_eq!(0, server.manager().active_connections());

    Ok(())
}

#[tokio::test]
async fn open_streams_are_limited() -> Result<(), Box<dyn Error>> {
    let options = P4rtServerOptions {
        max_open_streams: Some(1),
        ..P4rtServerOptions::default()
    };
    let (server, _switch) = start_server(options).await?;
    let mut client = connect(&server).await?;

    let mut first = Controller::open(&mut client).await?;
    first.arbitrate(Some(1)).await;

    let (_tx, rx) = mpsc::channel::<StreamMessageRequest>(1);
    let err = client.stream_channel(ReceiverStream::new(rx)).await.unwrap_err();
    assert_eq!(Code::ResourceExhausted, err.code());

    Ok(())
}

#[tokio::test]
async fn wrong_device_and_capabilities() -> Result<(), Box<dyn Error>> {
    let (server, _switch) = start_server(P4rtServerOptions::default()).await?;
    let mut client = connect(&server).await?;

    let mut request = insert_request(1, 1);
    request.device_id = DEVICE_ID + 1;
    let err = client.write(request).await.unwrap_err();
    assert_eq!(Code::NotFound, err.code());

    let capabilities = client.capabilities(CapabilitiesRequest {}).await?.into_inner();
    assert!(!capabilities.p4runtime_api_version.is_empty());

    Ok(())
}

// ------- Helpers --------

struct Controller {
    requests: mpsc::Sender<StreamMessageRequest>,
    responses: Streaming<StreamMessageResponse>,
}

impl Controller {
    async fn open(client: &mut P4RuntimeClient<Channel>) -> Result<Self, Box<dyn Error>> {
        let (tx, rx) = mpsc::channel(16);
        let responses = client.stream_channel(ReceiverStream::new(rx)).await?.into_inner();

        Ok(Controller {
            requests: tx,
            responses,
        })
    }

    async fn send(&self, update: stream_message_request::Update) {
        self.requests
            .send(StreamMessageRequest { update: Some(update) })
            .await
            .expect("Stream request channel closed");
    }

    async fn send_packet_out(&self, payload: &[u8]) {
        self.send(stream_message_request::Update::Packet(PacketOut {
            payload: payload.to_vec(),
            metadata: vec![],
        }))
        .await;
    }

    async fn arbitrate(&mut self, election_id: Option<u64>) -> MasterArbitrationUpdate {
        self.send(arbitration(DEVICE_ID, election_id)).await;
        self.next_arbitration().await
    }

    async fn next(&mut self) -> StreamMessageResponse {
        timeout(Duration::from_secs(5), self.responses.message())
            .await
            .expect("Timed out waiting for a stream response")
            .expect("Stream failed")
            .expect("Stream ended")
    }

    async fn next_arbitration(&mut self) -> MasterArbitrationUpdate {
        match self.next().await.update {
            Some(stream_message_response::Update::Arbitration(update)) => update,
            other => panic!("Expected arbitration response, got {:?}", other),
        }
    }

    async fn assert_no_messages(&mut self) {
        if let Ok(message) = timeout(Duration::from_millis(100), self.responses.message()).await {
            panic!("Expected no stream responses, got {:?}", message);
        }
    }
}

async fn start_server(options: P4rtServerOptions) -> Result<(P4rtServerHandle, Arc<InMemorySwitch>), Box<dyn Error>> {
    let logger = slog::Logger::root(slog::Discard, slog::o!());
    let switch = Arc::new(InMemorySwitch::new(logger.clone()));

    let config = P4rtServerConfig {
        device_id: DEVICE_ID,
        listen_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)),
        info_logger: logger,
        options,
    };
    let server = p4rt::try_create_p4rt_server(config, switch.clone()).await?;

    Ok((server, switch))
}

async fn connect(server: &P4rtServerHandle) -> Result<P4RuntimeClient<Channel>, Box<dyn Error>> {
    Ok(P4RuntimeClient::connect(format!("http://{}", server.local_addr())).await?)
}

fn election_id(id: u64) -> Uint128 {
    Uint128 { high: 0, low: id }
}

fn arbitration(device_id: u64, id: Option<u64>) -> stream_message_request::Update {
    stream_message_request::Update::Arbitration(MasterArbitrationUpdate {
        device_id,
        role: Some(Role {
            name: String::new(),
            config: None,
        }),
        election_id: id.map(election_id),
        status: None,
    })
}

fn pipeline() -> ForwardingPipelineConfig {
    ForwardingPipelineConfig {
        p4info: Some(P4Info {
            tables: vec![Table {
                preamble: Some(Preamble {
                    id: TABLE_ID,
                    name: "ingress.acl".to_string(),
                    alias: "acl".to_string(),
                }),
                size: 1024,
            }],
            ..P4Info::default()
        }),
        p4_device_config: b"device-config".to_vec(),
        cookie: None,
    }
}

fn set_pipeline_request(id: u64) -> SetForwardingPipelineConfigRequest {
    SetForwardingPipelineConfigRequest {
        device_id: DEVICE_ID,
        election_id: Some(election_id(id)),
        action: set_forwarding_pipeline_config_request::Action::VerifyAndCommit as i32,
        config: Some(pipeline()),
        role: String::new(),
    }
}

fn table_entity(table_id: u32, priority: i32) -> Entity {
    Entity {
        entity: Some(entity::Entity::TableEntry(TableEntry {
            table_id,
            priority,
            ..TableEntry::default()
        })),
    }
}

fn insert_request(id: u64, priority: i32) -> WriteRequest {
    WriteRequest {
        device_id: DEVICE_ID,
        election_id: Some(election_id(id)),
        updates: vec![Update {
            r#type: update::Type::Insert as i32,
            entity: Some(table_entity(TABLE_ID, priority)),
        }],
        role: String::new(),
    }
}
