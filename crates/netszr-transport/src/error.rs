use crate::ChannelId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote end closed the channel.
    #[error("channel {0} closed")]
    Closed(ChannelId),

    /// Sending a frame failed.
    #[error("send failed on channel {channel}: {reason}")]
    SendFailed {
        /// The channel the frame was meant for.
        channel: ChannelId,
        /// Why delivery failed.
        reason: String,
    },

    /// Receiving a frame failed.
    #[error("receive failed on channel {channel}: {reason}")]
    ReceiveFailed {
        /// The channel being read.
        channel: ChannelId,
        /// Why the read failed.
        reason: String,
    },
}
