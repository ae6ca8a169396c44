//! Source code verification through the Etherscan API.

use {
    super::Verifier,
    crate::chain::{DeployedContract, compiled::CompiledArtifacts},
    alloy::primitives::Bytes,
    anyhow::{Context, Result, ensure},
    clap::Parser,
    serde::Deserialize,
    std::{
        fmt::{self, Display, Formatter},
        sync::Arc,
    },
    url::Url,
};

pub struct Etherscan {
    client: reqwest::Client,
    url: Url,
    api_key: String,
    chain_id: u64,
    compiled: Arc<CompiledArtifacts>,
}

impl Etherscan {
    pub fn new(url: Url, api_key: String, chain_id: u64, compiled: Arc<CompiledArtifacts>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            chain_id,
            compiled,
        }
    }
}

#[async_trait::async_trait]
impl Verifier for Etherscan {
    async fn verify(
        &self,
        contract: &DeployedContract,
        constructor_args: Option<Bytes>,
    ) -> Result<String> {
        let build_info = self
            .compiled
            .build_info(&contract.qualified_name)
            .await
            .context("verification needs the build info of the contract")?;
        let request = VerifySourceCode {
            source_code: serde_json::to_string(&build_info.input)?,
            contract_address: contract.address.to_string(),
            contract_name: contract.qualified_name.clone(),
            compiler_version: format!("v{}", build_info.solc_long_version),
            constructor_arguments: constructor_args
                .map(const_hex::encode)
                .unwrap_or_default(),
        };

        let response: Response = self
            .client
            .post(self.url.clone())
            .query(&[("chainid", self.chain_id.to_string())])
            .form(&request.form(&self.api_key))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let guid = response.into_result()?;
        tracing::debug!(contract = %contract.name, %guid, "submitted source code to etherscan");
        Ok(guid)
    }
}

struct VerifySourceCode {
    source_code: String,
    contract_address: String,
    contract_name: String,
    compiler_version: String,
    constructor_arguments: String,
}

impl VerifySourceCode {
    fn form<'a>(&'a self, api_key: &'a str) -> Vec<(&'static str, &'a str)> {
        vec![
            ("apikey", api_key),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("codeformat", "solidity-standard-json-input"),
            ("sourceCode", &self.source_code),
            ("contractaddress", &self.contract_address),
            ("contractname", &self.contract_name),
            ("compilerversion", &self.compiler_version),
            // Etherscan spells it this way.
            ("constructorArguements", &self.constructor_arguments),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    message: String,
    result: String,
}

impl Response {
    fn into_result(self) -> Result<String> {
        ensure!(
            self.status == "1",
            "etherscan rejected the verification: {} ({})",
            self.result,
            self.message
        );
        Ok(self.result)
    }
}

/// Etherscan API arguments.
#[derive(Debug, Parser)]
#[group(skip)]
pub struct Arguments {
    /// API key for source verification on Etherscan. Verification is skipped
    /// without it.
    #[clap(long, env)]
    pub etherscan_api_key: Option<String>,

    /// Etherscan API endpoint. The chain is selected with a query parameter.
    #[clap(long, env, default_value = "https://api.etherscan.io/v2/api")]
    pub etherscan_url: Url,
}

impl Arguments {
    pub fn verifier(
        &self,
        chain_id: u64,
        compiled: Arc<CompiledArtifacts>,
    ) -> Option<Arc<dyn Verifier>> {
        let api_key = self.etherscan_api_key.clone()?;
        Some(Arc::new(Etherscan::new(
            self.etherscan_url.clone(),
            api_key,
            chain_id,
            compiled,
        )))
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Self {
            etherscan_api_key,
            etherscan_url,
        } = self;

        crate::arguments::display_secret_option(f, "etherscan_api_key", etherscan_api_key)?;
        writeln!(f, "etherscan_url: {etherscan_url}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn accepted_submission_returns_guid() {
        let response: Response = serde_json::from_value(json!({
            "status": "1",
            "message": "OK",
            "result": "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn",
        }))
        .unwrap();
        assert_eq!(
            response.into_result().unwrap(),
            "ezq878u486pzijkvvmerl6a9mzwhv6sefgvqi5tkwceejc7tvn"
        );
    }

    #[test]
    fn rejected_submission_is_an_error() {
        let response: Response = serde_json::from_value(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Contract source code already verified",
        }))
        .unwrap();
        let err = response.into_result().unwrap_err();
        assert!(err.to_string().contains("already verified"));
    }

    #[test]
    fn form_contains_verification_fields() {
        let request = VerifySourceCode {
            source_code: "{}".to_string(),
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            contract_name: "contracts/Wallet.sol:Wallet".to_string(),
            compiler_version: "v0.8.4+commit.c7e474f2".to_string(),
            constructor_arguments: "00ff".to_string(),
        };
        let form = request.form("key");
        assert!(form.contains(&("apikey", "key")));
        assert!(form.contains(&("contractname", "contracts/Wallet.sol:Wallet")));
        assert!(form.contains(&("constructorArguements", "00ff")));
    }
}
