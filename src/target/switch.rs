use crate::grpc::p4::v1::{
    set_forwarding_pipeline_config_request, Entity, ForwardingPipelineConfig, PacketIn, PacketOut, Update,
};
use crate::target::TargetError;
use tokio::sync::mpsc;

/// Where a target pushes the packet-ins it receives from the data plane.
pub type PacketInWriter = mpsc::Sender<PacketIn>;

/// SwitchTarget is the device behind the P4Runtime service. Arbitration and RBAC have already been
/// applied by the time any of these are called, so a target only validates contents.
#[async_trait::async_trait]
pub trait SwitchTarget: Send + Sync + 'static {
    async fn push_forwarding_pipeline_config(
        &self,
        action: set_forwarding_pipeline_config_request::Action,
        config: Option<ForwardingPipelineConfig>,
    ) -> Result<(), TargetError>;

    /// The committed pipeline, if any.
    async fn get_forwarding_pipeline_config(&self) -> Result<Option<ForwardingPipelineConfig>, TargetError>;

    /// Applies `updates` in order and stops at the first failure. Updates before it stay applied.
    async fn write(&self, updates: Vec<Update>) -> Result<(), TargetError>;

    /// Entities must already be free of wildcards the target can't resolve on its own.
    async fn read(&self, entities: Vec<Entity>) -> Result<Vec<Entity>, TargetError>;

    async fn transmit_packet(&self, packet: PacketOut) -> Result<(), TargetError>;

    /// Replaces any previously registered writer.
    fn register_packet_in_writer(&self, writer: PacketInWriter);
}
