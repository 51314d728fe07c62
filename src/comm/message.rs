//! Wire types exchanged between ranks.

use crate::config::RunConfig;
use crate::error::{try_to_vec, Result};

/// Collective operation a message belongs to.
///
/// Messages are matched on (source, tag); per-sender FIFO order does the
/// rest, since every rank issues collectives in the same order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tag {
    Broadcast,
    Scatter,
    Gather,
    Barrier,
    Abort,
}

/// Body of a message.
#[derive(Clone, Debug)]
pub enum Payload {
    Config(Box<RunConfig>),
    Floats(Vec<f32>),
    Indices(Vec<u32>),
    Count(usize),
    Seconds(f64),
    Token,
    Abort(String),
}

impl Payload {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Config(_) => "config",
            Payload::Floats(_) => "floats",
            Payload::Indices(_) => "indices",
            Payload::Count(_) => "count",
            Payload::Seconds(_) => "seconds",
            Payload::Token => "token",
            Payload::Abort(_) => "abort",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Envelope {
    pub source: usize,
    pub tag: Tag,
    pub payload: Payload,
}

/// A value that can travel between ranks.
pub trait Transferable: Sized + Send {
    /// Payload variant name, used in protocol errors.
    const KIND: &'static str;

    /// Wrap the value for sending.
    fn into_payload(self) -> Payload;

    /// Unwrap a received payload, or `None` if it holds another type.
    fn from_payload(payload: Payload) -> Option<Self>;

    /// Copy the value for one more recipient.
    ///
    /// Buffers allocate fallibly so that replicating a large reference set
    /// reports an error instead of aborting the process.
    fn duplicate(&self) -> Result<Self>;
}

impl Transferable for RunConfig {
    const KIND: &'static str = "config";

    fn into_payload(self) -> Payload {
        Payload::Config(Box::new(self))
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Config(config) => Some(*config),
            _ => None,
        }
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

impl Transferable for Vec<f32> {
    const KIND: &'static str = "floats";

    fn into_payload(self) -> Payload {
        Payload::Floats(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Floats(data) => Some(data),
            _ => None,
        }
    }

    fn duplicate(&self) -> Result<Self> {
        try_to_vec(self, "float buffer")
    }
}

impl Transferable for Vec<u32> {
    const KIND: &'static str = "indices";

    fn into_payload(self) -> Payload {
        Payload::Indices(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Indices(data) => Some(data),
            _ => None,
        }
    }

    fn duplicate(&self) -> Result<Self> {
        try_to_vec(self, "index buffer")
    }
}

impl Transferable for usize {
    const KIND: &'static str = "count";

    fn into_payload(self) -> Payload {
        Payload::Count(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Count(n) => Some(n),
            _ => None,
        }
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(*self)
    }
}

impl Transferable for f64 {
    const KIND: &'static str = "seconds";

    fn into_payload(self) -> Payload {
        Payload::Seconds(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Seconds(s) => Some(s),
            _ => None,
        }
    }

    fn duplicate(&self) -> Result<Self> {
        Ok(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_payload() {
        let data = vec![1.0f32, 2.0];
        let payload = data.clone().into_payload();
        assert_eq!(payload.kind(), "floats");
        assert_eq!(Vec::<f32>::from_payload(payload), Some(data));
    }

    #[test]
    fn test_wrong_variant_rejected() {
        assert_eq!(Vec::<u32>::from_payload(Payload::Count(3)), None);
        assert_eq!(usize::from_payload(Payload::Token), None);
    }

    #[test]
    fn test_config_payload() {
        let config = RunConfig::default().with_k(5);
        let back = RunConfig::from_payload(config.duplicate().unwrap().into_payload());
        assert_eq!(back, Some(config));
    }
}
