use std::convert::TryFrom;

#[derive(Clone, Debug, Default)]
pub struct P4rtServerOptions {
    // Responses queued per StreamChannel before further ones are dropped.
    pub stream_buffer_size: Option<usize>,
    // StreamChannel streams beyond this are refused with RESOURCE_EXHAUSTED.
    pub max_open_streams: Option<usize>,
    // Packet-ins queued between the target and the router.
    pub packet_in_buffer_size: Option<usize>,
}

#[derive(Debug, Eq, PartialEq)]
pub(super) struct P4rtServerOptionsValidated {
    pub stream_buffer_size: usize,
    pub max_open_streams: usize,
    pub packet_in_buffer_size: usize,
}

impl P4rtServerOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.stream_buffer_size == 0 {
            return Err("Stream buffer size must be greater than 0");
        }
        if self.max_open_streams == 0 {
            return Err("Maximum number of open streams must be greater than 0");
        }
        if self.packet_in_buffer_size == 0 {
            return Err("Packet-in buffer size must be greater than 0");
        }

        Ok(())
    }
}

impl TryFrom<P4rtServerOptions> for P4rtServerOptionsValidated {
    type Error = &'static str;

    fn try_from(options: P4rtServerOptions) -> Result<Self, Self::Error> {
        let values = P4rtServerOptionsValidated {
            stream_buffer_size: options.stream_buffer_size.unwrap_or(128),
            max_open_streams: options.max_open_streams.unwrap_or(16),
            packet_in_buffer_size: options.packet_in_buffer_size.unwrap_or(128),
        };

        values.validate()?;
        Ok(values)
    }
}
