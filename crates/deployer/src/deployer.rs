use {
    crate::{
        artifacts::ArtifactStore,
        chain::{ChainClient, DeployedContract},
        request::DeploymentRequest,
        status::{Status, StatusSink},
        verification::{VerificationService, Verifier, Verifiers},
    },
    alloy::primitives::{Address, Bytes, TxHash, U256},
    anyhow::Result,
    serde_json::Value,
    std::sync::Arc,
};

/// Deploys contracts and records where they ended up.
pub struct Deployer {
    chain: Arc<dyn ChainClient>,
    artifacts: Arc<dyn ArtifactStore>,
    status: Arc<dyn StatusSink>,
    verifiers: Verifiers,
}

impl Deployer {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        artifacts: Arc<dyn ArtifactStore>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            chain,
            artifacts,
            status,
            verifiers: Default::default(),
        }
    }

    pub fn with_verifier(
        mut self,
        service: VerificationService,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        self.verifiers.insert(service, verifier);
        self
    }

    pub fn report(&self, status: Status) {
        self.status.emit(status);
    }

    pub fn artifacts_location(&self) -> String {
        self.artifacts.location()
    }

    /// Deploys a contract, writes its address and encoded constructor
    /// arguments to the artifact store and reports the outcome.
    ///
    /// Errors of the chain client are returned as they are. Nothing is
    /// written for a contract whose deployment failed.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<DeployedContract> {
        let name = request.artifact_name();
        self.status.emit(Status::Deploying {
            contract: name.to_string(),
        });

        let factory = self
            .chain
            .contract_factory(&request.contract, &request.libraries)
            .await?;
        let deployed = self
            .chain
            .deploy(&factory, &request.args, &request.overrides)
            .await?;
        let encoded = encode_constructor_args(&deployed, &request.args);

        self.artifacts.write_address(name, deployed.address).await?;
        match &encoded {
            Some(encoded) => {
                self.artifacts
                    .write_args(name, &const_hex::encode(encoded))
                    .await?
            }
            None => self.artifacts.remove_args(name).await?,
        }

        self.status.emit(Status::Deployed {
            contract: name.to_string(),
            address: deployed.address,
            transaction: deployed.transaction,
        });
        tracing::info!(contract = %name, address = %deployed.address, "deployed");

        for service in &request.verify {
            self.verify(*service, &deployed, encoded.clone()).await;
        }

        Ok(deployed)
    }

    /// Sends native currency from the deployer account.
    pub async fn transfer(&self, to: Address, value: U256) -> Result<TxHash> {
        let hash = self.chain.send_value(to, value).await?;
        self.status.emit(Status::Transferred { to, value, hash });
        Ok(hash)
    }

    async fn verify(
        &self,
        service: VerificationService,
        contract: &DeployedContract,
        constructor_args: Option<Bytes>,
    ) {
        let Some(verifier) = self.verifiers.get(&service) else {
            tracing::warn!(
                contract = %contract.name,
                %service,
                "verification requested but the service is not configured"
            );
            return;
        };
        match verifier.verify(contract, constructor_args).await {
            Ok(reference) => self.status.emit(Status::Verified {
                contract: contract.name.clone(),
                service,
                reference,
            }),
            Err(err) => tracing::warn!(
                contract = %contract.name,
                %service,
                ?err,
                "verification failed"
            ),
        }
    }
}

/// ABI encodes the constructor arguments with the constructor schema the
/// deployed contract exposes. `None` if there is nothing to record.
fn encode_constructor_args(deployed: &DeployedContract, args: &[Value]) -> Option<Bytes> {
    deployed
        .interface
        .try_encode_constructor_args(args)
        .filter(|encoded| !encoded.is_empty())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            artifacts::MockArtifactStore,
            chain::{DeployTransaction, Factory, MockChainClient},
            interface::ContractInterface,
            status::MockStatusSink,
            verification::MockVerifier,
        },
        alloy::{
            json_abi::JsonAbi,
            primitives::{address, bytes},
            sol_types::SolValue,
        },
        anyhow::anyhow,
        mockall::{Sequence, predicate::eq},
        serde_json::json,
    };

    const WALLET: Address = address!("0x00000000000000000000000000000000DeaDBeef");
    const OWNER: Address = address!("0xa41b0eb64de9bf96532fd51117e4af4e72394e48");

    fn wallet_factory() -> Factory {
        let abi: JsonAbi = serde_json::from_value(json!([{
            "type": "constructor",
            "stateMutability": "nonpayable",
            "inputs": [
                { "name": "chainId", "type": "uint256", "internalType": "uint256" },
                { "name": "owners", "type": "address[]", "internalType": "address[]" },
                { "name": "signaturesRequired", "type": "uint256", "internalType": "uint256" },
            ],
        }]))
        .unwrap();
        Factory {
            name: "Wallet".to_string(),
            qualified_name: "contracts/Wallet.sol:Wallet".to_string(),
            interface: ContractInterface::new(abi),
            bytecode: bytes!("6080604052"),
        }
    }

    fn wallet_args() -> Vec<Value> {
        vec![json!(31337), json!([OWNER.to_string()]), json!(1)]
    }

    fn deploy_transaction() -> DeployTransaction {
        DeployTransaction {
            hash: TxHash::repeat_byte(1),
            gas_limit: 1_000_000,
            gas_price: 1_000_000_000,
        }
    }

    fn chain_deploying(factory: Factory, transaction: Option<DeployTransaction>) -> MockChainClient {
        let mut chain = MockChainClient::new();
        let resolved = factory.clone();
        chain
            .expect_contract_factory()
            .withf(|contract, libraries| contract == "Wallet" && libraries.is_empty())
            .times(1)
            .returning(move |_, _| Ok(resolved.clone()));
        chain
            .expect_deploy()
            .times(1)
            .returning(move |factory, _, _| {
                let deployed = DeployedContract::new(factory, WALLET);
                Ok(match transaction {
                    Some(transaction) => deployed.with_transaction(transaction),
                    None => deployed,
                })
            });
        chain
    }

    #[tokio::test]
    async fn deploys_and_records_artifacts() {
        let mut seq = Sequence::new();
        let mut status = MockStatusSink::new();
        let mut artifacts = MockArtifactStore::new();

        status
            .expect_emit()
            .with(eq(Status::Deploying {
                contract: "Wallet".to_string(),
            }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        artifacts
            .expect_write_address()
            .with(eq("Wallet"), eq(WALLET))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let expected_args = const_hex::encode(
            (U256::from(31337), vec![OWNER], U256::from(1)).abi_encode_params(),
        );
        artifacts
            .expect_write_args()
            .withf(move |name, encoded| name == "Wallet" && encoded == expected_args)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        status
            .expect_emit()
            .with(eq(Status::Deployed {
                contract: "Wallet".to_string(),
                address: WALLET,
                transaction: Some(deploy_transaction()),
            }))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let deployer = Deployer::new(
            Arc::new(chain_deploying(wallet_factory(), Some(deploy_transaction()))),
            Arc::new(artifacts),
            Arc::new(status),
        );
        let deployed = deployer
            .deploy(&DeploymentRequest::new("Wallet").with_args(wallet_args()))
            .await
            .unwrap();
        assert_eq!(deployed.address, WALLET);
    }

    #[tokio::test]
    async fn deploy_errors_write_nothing() {
        let mut chain = MockChainClient::new();
        chain
            .expect_contract_factory()
            .returning(|_, _| Ok(wallet_factory()));
        chain
            .expect_deploy()
            .returning(|_, _, _| Err(anyhow!("insufficient funds for gas * price + value")));
        let mut status = MockStatusSink::new();
        status
            .expect_emit()
            .with(eq(Status::Deploying {
                contract: "Wallet".to_string(),
            }))
            .times(1)
            .return_const(());

        // No expectations: any write panics.
        let artifacts = MockArtifactStore::new();

        let deployer = Deployer::new(Arc::new(chain), Arc::new(artifacts), Arc::new(status));
        let err = deployer
            .deploy(&DeploymentRequest::new("Wallet").with_args(wallet_args()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn resolution_errors_propagate() {
        let mut chain = MockChainClient::new();
        chain
            .expect_contract_factory()
            .returning(|contract, _| Err(anyhow!("no compiled artifact found for contract {contract}")));
        chain.expect_deploy().never();
        let mut status = MockStatusSink::new();
        status.expect_emit().times(1).return_const(());

        let deployer = Deployer::new(
            Arc::new(chain),
            Arc::new(MockArtifactStore::new()),
            Arc::new(status),
        );
        assert!(deployer.deploy(&DeploymentRequest::new("Missing")).await.is_err());
    }

    #[tokio::test]
    async fn removes_stale_args_without_encoding() {
        let factory = Factory {
            interface: ContractInterface::new(JsonAbi::default()),
            ..wallet_factory()
        };
        let mut artifacts = MockArtifactStore::new();
        artifacts
            .expect_write_address()
            .times(1)
            .returning(|_, _| Ok(()));
        artifacts.expect_write_args().never();
        artifacts
            .expect_remove_args()
            .with(eq("Wallet"))
            .times(1)
            .returning(|_| Ok(()));
        let mut status = MockStatusSink::new();
        status
            .expect_emit()
            .withf(|status| {
                matches!(
                    status,
                    Status::Deploying { .. } | Status::Deployed { transaction: None, .. }
                )
            })
            .times(2)
            .return_const(());

        let deployer = Deployer::new(
            Arc::new(chain_deploying(factory, None)),
            Arc::new(artifacts),
            Arc::new(status),
        );
        let deployed = deployer.deploy(&DeploymentRequest::new("Wallet")).await.unwrap();
        assert!(deployed.transaction.is_none());
    }

    #[tokio::test]
    async fn verification_failures_are_not_fatal() {
        let mut artifacts = MockArtifactStore::new();
        artifacts.expect_write_address().returning(|_, _| Ok(()));
        artifacts.expect_write_args().returning(|_, _| Ok(()));
        let mut status = MockStatusSink::new();
        status
            .expect_emit()
            .withf(|status| !matches!(status, Status::Verified { .. }))
            .times(2)
            .return_const(());

        let mut etherscan = MockVerifier::new();
        etherscan
            .expect_verify()
            .withf(|contract, args| contract.address == WALLET && args.is_some())
            .times(1)
            .returning(|_, _| Err(anyhow!("rate limited")));

        let deployer = Deployer::new(
            Arc::new(chain_deploying(wallet_factory(), Some(deploy_transaction()))),
            Arc::new(artifacts),
            Arc::new(status),
        )
        .with_verifier(VerificationService::Etherscan, Arc::new(etherscan));
        let request = DeploymentRequest::new("Wallet")
            .with_args(wallet_args())
            .with_verification(VerificationService::Etherscan)
            // Not configured, skipped with a warning.
            .with_verification(VerificationService::Tenderly);

        assert!(deployer.deploy(&request).await.is_ok());
    }

    #[tokio::test]
    async fn reports_verification() {
        let mut artifacts = MockArtifactStore::new();
        artifacts.expect_write_address().returning(|_, _| Ok(()));
        artifacts.expect_write_args().returning(|_, _| Ok(()));
        let mut status = MockStatusSink::new();
        status
            .expect_emit()
            .withf(|status| !matches!(status, Status::Verified { .. }))
            .times(2)
            .return_const(());
        status
            .expect_emit()
            .with(eq(Status::Verified {
                contract: "Wallet".to_string(),
                service: VerificationService::Tenderly,
                reference: "https://dashboard.tenderly.co/contract".to_string(),
            }))
            .times(1)
            .return_const(());

        let mut tenderly = MockVerifier::new();
        tenderly
            .expect_verify()
            .returning(|_, _| Ok("https://dashboard.tenderly.co/contract".to_string()));

        let deployer = Deployer::new(
            Arc::new(chain_deploying(wallet_factory(), None)),
            Arc::new(artifacts),
            Arc::new(status),
        )
        .with_verifier(VerificationService::Tenderly, Arc::new(tenderly));
        let request = DeploymentRequest::new("Wallet")
            .with_args(wallet_args())
            .with_verification(VerificationService::Tenderly);

        deployer.deploy(&request).await.unwrap();
    }

    #[tokio::test]
    async fn transfers_value() {
        let to = Address::repeat_byte(0x34);
        let value = U256::from(10_u64.pow(15));
        let mut chain = MockChainClient::new();
        chain
            .expect_send_value()
            .with(eq(to), eq(value))
            .times(1)
            .returning(|_, _| Ok(TxHash::repeat_byte(2)));
        let mut status = MockStatusSink::new();
        status
            .expect_emit()
            .with(eq(Status::Transferred {
                to,
                value,
                hash: TxHash::repeat_byte(2),
            }))
            .times(1)
            .return_const(());

        let deployer = Deployer::new(
            Arc::new(chain),
            Arc::new(MockArtifactStore::new()),
            Arc::new(status),
        );
        assert_eq!(
            deployer.transfer(to, value).await.unwrap(),
            TxHash::repeat_byte(2)
        );
    }
}
