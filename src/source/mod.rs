// src/source/mod.rs
pub mod crtsh;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::targets::TargetDomain;

pub use crtsh::{CrtShClient, DEFAULT_CRTSH_URL};
pub use types::CertificateRecord;

/// A queryable index of Certificate Transparency logs
#[async_trait]
pub trait CertSource: Send + Sync {
    /// Most recent certificates issued under `*.domain` within `window`,
    /// newest first and capped by the implementation
    async fn query(&self, domain: &TargetDomain, window: Duration) -> Result<Vec<CertificateRecord>>;
}
