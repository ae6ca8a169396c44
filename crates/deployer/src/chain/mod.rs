//! Access to the chain the contracts get deployed to.

use {
    crate::{
        interface::{ArgumentError, ContractInterface},
        request::{Libraries, Overrides},
    },
    alloy::primitives::{Address, Bytes, TxHash, U256},
    anyhow::Result,
    serde_json::Value,
};

pub mod compiled;
pub mod rpc;

pub use self::rpc::RpcChainClient;

/// Everything the deployer needs from a chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync + 'static {
    async fn chain_id(&self) -> Result<u64>;

    /// Resolves the deployable representation of a contract with all library
    /// references linked.
    async fn contract_factory(&self, contract: &str, libraries: &Libraries) -> Result<Factory>;

    /// Submits the deployment transaction. Returns once the node accepted
    /// the transaction, which does not imply that it was mined.
    async fn deploy(
        &self,
        factory: &Factory,
        args: &[Value],
        overrides: &Overrides,
    ) -> Result<DeployedContract>;

    /// Sends native currency from the deployer account.
    async fn send_value(&self, to: Address, value: U256) -> Result<TxHash>;
}

/// A compiled contract ready to be deployed.
#[derive(Clone, Debug)]
pub struct Factory {
    pub name: String,
    /// `source:name`, unique within a compilation.
    pub qualified_name: String,
    pub interface: ContractInterface,
    /// Creation bytecode with libraries linked.
    pub bytecode: Bytes,
}

impl Factory {
    /// Creation code followed by the ABI encoded constructor arguments.
    pub fn deploy_code(&self, args: &[Value]) -> Result<Bytes, ArgumentError> {
        let encoded = self.interface.encode_constructor_args(args)?;
        Ok([self.bytecode.as_ref(), encoded.as_ref()].concat().into())
    }
}

#[derive(Clone, Debug)]
pub struct DeployedContract {
    pub name: String,
    pub qualified_name: String,
    pub address: Address,
    pub interface: ContractInterface,
    /// Not every chain client knows the transaction that created the
    /// contract.
    pub transaction: Option<DeployTransaction>,
}

impl DeployedContract {
    pub fn new(factory: &Factory, address: Address) -> Self {
        Self {
            name: factory.name.clone(),
            qualified_name: factory.qualified_name.clone(),
            address,
            interface: factory.interface.clone(),
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: DeployTransaction) -> Self {
        self.transaction = Some(transaction);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployTransaction {
    pub hash: TxHash,
    pub gas_limit: u64,
    pub gas_price: u128,
}

impl DeployTransaction {
    /// Upper bound of what the deployment costs.
    pub fn cost(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.gas_price)
    }
}
