use {
    super::{ChainClient, DeployTransaction, DeployedContract, Factory, compiled::CompiledArtifacts},
    crate::{
        interface::ContractInterface,
        request::{Libraries, Overrides},
    },
    alloy::{
        network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
        primitives::{Address, TxHash, U256},
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
    },
    anyhow::{Context, Result, ensure},
    serde_json::Value,
    std::sync::Arc,
    url::Url,
};

/// Deploys Hardhat artifacts through an Ethereum node, signing with a local
/// key.
pub struct RpcChainClient {
    provider: DynProvider,
    sender: Address,
    compiled: Arc<CompiledArtifacts>,
    confirmations: u64,
}

impl RpcChainClient {
    /// `confirmations` is the number of blocks to wait for after a deployment
    /// got mined. With 0 the deployment returns as soon as the node accepted
    /// the transaction.
    pub fn new(
        node_url: Url,
        signer: PrivateKeySigner,
        compiled: Arc<CompiledArtifacts>,
        confirmations: u64,
    ) -> Self {
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::new(signer))
            .connect_http(node_url)
            .erased();
        Self {
            provider,
            sender,
            compiled,
            confirmations,
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }
}

#[async_trait::async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.provider
            .get_chain_id()
            .await
            .context("could not fetch current chain id")
    }

    async fn contract_factory(&self, contract: &str, libraries: &Libraries) -> Result<Factory> {
        let artifact = self.compiled.load(contract).await?;
        let bytecode = artifact.link(libraries)?;
        ensure!(
            !bytecode.is_empty(),
            "{contract} has no creation code, is it abstract or an interface?"
        );

        Ok(Factory {
            name: artifact.contract_name.clone(),
            qualified_name: artifact.qualified_name(),
            interface: ContractInterface::new(artifact.abi),
            bytecode,
        })
    }

    async fn deploy(
        &self,
        factory: &Factory,
        args: &[Value],
        overrides: &Overrides,
    ) -> Result<DeployedContract> {
        for option in overrides.other.keys() {
            tracing::warn!(%option, "ignoring override unsupported by the node client");
        }

        let code = factory
            .deploy_code(args)
            .with_context(|| format!("invalid constructor arguments for {}", factory.name))?;

        let nonce = match overrides.nonce {
            Some(nonce) => nonce,
            None => self
                .provider
                .get_transaction_count(self.sender)
                .pending()
                .await
                .context("could not fetch deployer nonce")?,
        };
        let gas_price = match overrides.gas_price {
            Some(price) => u128::try_from(price.wei()).context("gas price override too large")?,
            None => self
                .provider
                .get_gas_price()
                .await
                .context("could not fetch gas price")?,
        };

        let mut tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_deploy_code(code)
            .with_nonce(nonce)
            .with_gas_price(gas_price);
        if let Some(value) = overrides.value {
            tx.set_value(value.wei());
        }
        let gas_limit = match overrides.gas_limit {
            Some(gas_limit) => gas_limit,
            None => self
                .provider
                .estimate_gas(tx.clone())
                .await
                .with_context(|| format!("could not estimate gas to deploy {}", factory.name))?,
        };
        tx.set_gas_limit(gas_limit);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("deployment of {} was rejected", factory.name))?;
        let hash = *pending.tx_hash();
        tracing::debug!(contract = %factory.name, ?hash, nonce, "deployment transaction sent");

        let address = if self.confirmations > 0 {
            let receipt = pending
                .with_required_confirmations(self.confirmations)
                .get_receipt()
                .await
                .with_context(|| format!("could not confirm deployment transaction {hash}"))?;
            ensure!(receipt.status(), "deployment transaction {hash} reverted");
            receipt
                .contract_address()
                .with_context(|| format!("receipt of {hash} has no contract address"))?
        } else {
            self.sender.create(nonce)
        };

        Ok(DeployedContract::new(factory, address).with_transaction(DeployTransaction {
            hash,
            gas_limit,
            gas_price,
        }))
    }

    async fn send_value(&self, to: Address, value: U256) -> Result<TxHash> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_value(value);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("transfer to {to} was rejected"))?;
        Ok(*pending.tx_hash())
    }
}
