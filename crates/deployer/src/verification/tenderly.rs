//! Registers deployed contracts with a Tenderly project.

use {
    super::Verifier,
    crate::chain::DeployedContract,
    alloy::primitives::Bytes,
    anyhow::Result,
    clap::Parser,
    reqwest::header::{HeaderMap, HeaderValue},
    serde::Serialize,
    std::{
        fmt::{self, Display, Formatter},
        sync::Arc,
    },
    url::Url,
};

const BASE_URL: &str = "https://api.tenderly.co/api";
const DASHBOARD_URL: &str = "https://dashboard.tenderly.co";

pub struct Tenderly {
    client: reqwest::Client,
    url: Url,
    dashboard: String,
    network_id: String,
}

impl Tenderly {
    pub fn new(user: &str, project: &str, api_key: &str, chain_id: u64) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(api_key)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-access-key", api_key);

        Ok(Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .build()?,
            url: Url::parse(&format!("{BASE_URL}/v1/account/{user}/project/{project}/"))?,
            dashboard: format!("{DASHBOARD_URL}/{user}/{project}"),
            network_id: chain_id.to_string(),
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct AddContract<'a> {
    network_id: &'a str,
    address: String,
    display_name: &'a str,
}

#[async_trait::async_trait]
impl Verifier for Tenderly {
    async fn verify(&self, contract: &DeployedContract, _: Option<Bytes>) -> Result<String> {
        let address = const_hex::encode_prefixed(contract.address);
        self.client
            .post(self.url.join("address")?)
            .json(&AddContract {
                network_id: &self.network_id,
                address: address.clone(),
                display_name: &contract.name,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(format!(
            "{}/contract/{}/{address}",
            self.dashboard, self.network_id
        ))
    }
}

/// Tenderly API arguments.
#[derive(Debug, Parser)]
#[group(skip)]
pub struct Arguments {
    /// The Tenderly user associated with the API key.
    #[clap(long, env)]
    pub tenderly_user: Option<String>,

    /// The Tenderly project deployed contracts get added to.
    #[clap(long, env)]
    pub tenderly_project: Option<String>,

    /// Tenderly API key. Contracts are not added to Tenderly without it.
    #[clap(long, env)]
    pub tenderly_api_key: Option<String>,
}

impl Arguments {
    pub fn verifier(&self, chain_id: u64) -> Result<Option<Arc<dyn Verifier>>> {
        Some(())
            .and_then(|_| {
                Some(
                    Tenderly::new(
                        self.tenderly_user.as_deref()?,
                        self.tenderly_project.as_deref()?,
                        self.tenderly_api_key.as_deref()?,
                        chain_id,
                    )
                    .map(|api| Arc::new(api) as _),
                )
            })
            .transpose()
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use crate::arguments::{display_option, display_secret_option};

        display_option(f, "tenderly_user", &self.tenderly_user)?;
        display_option(f, "tenderly_project", &self.tenderly_project)?;
        display_secret_option(f, "tenderly_api_key", &self.tenderly_api_key)?;
        Ok(())
    }
}
