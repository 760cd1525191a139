/// Role configuration carried (packed in a google.protobuf.Any) by the Role of
/// a MasterArbitrationUpdate. It scopes what a P4Runtime role may touch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct P4RoleConfig {
    /// P4 object IDs only this role may access.
    #[prost(uint32, repeated, tag = "1")]
    pub exclusive_p4_ids: ::prost::alloc::vec::Vec<u32>,
    /// P4 object IDs this role may access alongside other roles.
    #[prost(uint32, repeated, tag = "2")]
    pub shared_p4_ids: ::prost::alloc::vec::Vec<u32>,
    /// Whether the primary of this role receives PacketIn messages.
    #[prost(bool, tag = "3")]
    pub receives_packet_ins: bool,
    /// Only PacketIns carrying this exact metadata are delivered. Must be unset
    /// unless receives_packet_ins is true.
    #[prost(message, optional, tag = "4")]
    pub packet_in_filter: ::core::option::Option<p4_role_config::PacketFilter>,
    /// Whether this role may call SetForwardingPipelineConfig.
    #[prost(bool, tag = "5")]
    pub can_push_pipeline: bool,
}
/// Nested message and enum types in `P4RoleConfig`.
pub mod p4_role_config {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PacketFilter {
        #[prost(uint32, tag = "1")]
        pub metadata_id: u32,
        #[prost(bytes = "vec", tag = "2")]
        pub value: ::prost::alloc::vec::Vec<u8>,
    }
}
