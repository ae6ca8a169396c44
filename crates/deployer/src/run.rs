use {
    crate::{
        arguments::Arguments,
        artifacts::ArtifactsDir,
        chain::{ChainClient, RpcChainClient, compiled::CompiledArtifacts},
        config::{Addresses, Plan},
        deployer::Deployer,
        status::{Console, Status},
        verification::VerificationService,
    },
    anyhow::{Context, Result},
    std::sync::Arc,
};

pub async fn run(args: Arguments) -> Result<()> {
    let plan = Plan::from_path(&args.plan).await?.validate()?;
    let compiled = Arc::new(CompiledArtifacts::new(&args.compiled_dir));
    let chain = Arc::new(RpcChainClient::new(
        args.node_url.clone(),
        args.signer()?,
        compiled.clone(),
        args.confirmations,
    ));
    tracing::info!(sender = %chain.sender(), "deploying from account");

    let mut deployer = Deployer::new(
        chain.clone(),
        Arc::new(ArtifactsDir::new(&args.artifacts_dir)),
        Arc::new(Console),
    );

    let etherscan = plan.requires_verification(VerificationService::Etherscan);
    let tenderly = plan.requires_verification(VerificationService::Tenderly);
    if etherscan || tenderly {
        let chain_id = chain
            .chain_id()
            .await
            .context("could not determine chain id for verification")?;
        if etherscan {
            match args.etherscan.verifier(chain_id, compiled.clone()) {
                Some(verifier) => {
                    deployer = deployer.with_verifier(VerificationService::Etherscan, verifier)
                }
                None => tracing::warn!("etherscan verification requested without an API key"),
            }
        }
        if tenderly {
            match args.tenderly.verifier(chain_id)? {
                Some(verifier) => {
                    deployer = deployer.with_verifier(VerificationService::Tenderly, verifier)
                }
                None => tracing::warn!("tenderly verification requested without credentials"),
            }
        }
    }

    execute(&plan, &deployer).await?;
    Ok(())
}

/// Performs the transfers and deployments of a plan in order, stopping at the
/// first failure. Returns the addresses of all deployed contracts.
pub async fn execute(plan: &Plan, deployer: &Deployer) -> Result<Addresses> {
    deployer.report(Status::Started);

    for transfer in &plan.transfers {
        deployer
            .transfer(transfer.to, transfer.value.wei())
            .await
            .with_context(|| format!("transfer of {} to {} failed", transfer.value, transfer.to))?;
    }

    let mut deployed = Addresses::new();
    for deployment in &plan.deployments {
        let request = deployment.request(&deployed)?;
        let contract = deployer
            .deploy(&request)
            .await
            .with_context(|| format!("deployment of {} failed", request.contract))?;
        deployed.insert(request.artifact_name().to_string(), contract.address);
    }

    deployer.report(Status::ArtifactsSaved {
        location: deployer.artifacts_location(),
    });
    Ok(deployed)
}
