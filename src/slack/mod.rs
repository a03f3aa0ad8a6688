pub mod blocks;
pub mod digest;
pub mod webhook;

use crate::error::Result;
use async_trait::async_trait;
use digest::Digest;

/// Destination for the rendered digest
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver the digest as a single message
    async fn send(&self, digest: &Digest) -> Result<()>;
}
