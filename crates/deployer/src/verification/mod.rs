//! Publishing deployed contracts to block explorers.

use {
    crate::chain::DeployedContract,
    alloy::primitives::Bytes,
    anyhow::Result,
    serde::Deserialize,
    std::{collections::HashMap, sync::Arc},
};

pub mod etherscan;
pub mod tenderly;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationService {
    Etherscan,
    Tenderly,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Verifier: Send + Sync + 'static {
    /// Submits a deployed contract and returns a service specific reference
    /// to the submission.
    async fn verify(
        &self,
        contract: &DeployedContract,
        constructor_args: Option<Bytes>,
    ) -> Result<String>;
}

pub type Verifiers = HashMap<VerificationService, Arc<dyn Verifier>>;
