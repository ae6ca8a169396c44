//! Deployment plans.
//!
//! A plan is a TOML file listing native currency transfers and contract
//! deployments:
//!
//! ```toml
//! [[transfers]]
//! to = "0x34aA3F359A9D614239015126635CE7732c18fDF3"
//! value = "0.001 ether"
//!
//! [[deployments]]
//! contract = "ExampleToken"
//!
//! [[deployments]]
//! contract = "SmartContractWallet"
//! args = ["${ExampleToken}", 1]
//! overrides = { value = "0.05 ether" }
//! verify = ["etherscan"]
//! ```
//!
//! A string of the form `${Name}` in `args` or `libraries` stands for the
//! address of the earlier deployment `Name`.

use {
    crate::{
        request::{Amount, DeploymentRequest, Libraries, Overrides, artifact_name},
        verification::VerificationService,
    },
    alloy::primitives::Address,
    anyhow::{Context, Result, anyhow, ensure},
    serde::Deserialize,
    serde_json::Value,
    std::{
        collections::{BTreeMap, HashMap, HashSet},
        path::Path,
    },
};

/// Addresses of the contracts deployed so far, by artifact name.
pub type Addresses = HashMap<String, Address>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Plan {
    /// Transfers happen before any contract gets deployed.
    #[serde(default)]
    pub transfers: Vec<Transfer>,
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Transfer {
    pub to: Address,
    pub value: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Deployment {
    pub contract: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub overrides: Overrides,
    /// Library name to address or `${Name}` reference.
    #[serde(default)]
    pub libraries: BTreeMap<String, String>,
    #[serde(default)]
    pub verify: Vec<VerificationService>,
}

impl Plan {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read deployment plan {}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|err| anyhow!("failed to parse deployment plan at {}: {err}", path.display()))
    }

    pub fn validate(self) -> Result<Self> {
        ensure!(
            !self.deployments.is_empty() || !self.transfers.is_empty(),
            "deployment plan contains neither transfers nor deployments"
        );
        let mut names = HashSet::new();
        for deployment in &self.deployments {
            let name = artifact_name(&deployment.contract);
            ensure!(
                names.insert(name),
                "{name} is deployed more than once, its artifacts would be overwritten"
            );
        }
        Ok(self)
    }

    pub fn requires_verification(&self, service: VerificationService) -> bool {
        self.deployments
            .iter()
            .any(|deployment| deployment.verify.contains(&service))
    }
}

impl Deployment {
    /// Builds the request for this deployment, replacing references with the
    /// addresses of earlier deployments.
    pub fn request(&self, deployed: &Addresses) -> Result<DeploymentRequest> {
        let args = self
            .args
            .iter()
            .map(|arg| resolve_arg(arg, deployed))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("invalid arguments for {}", self.contract))?;
        let libraries = self
            .libraries
            .iter()
            .map(|(library, address)| Ok((library.clone(), resolve_address(address, deployed)?)))
            .collect::<Result<Libraries>>()
            .with_context(|| format!("invalid libraries for {}", self.contract))?;

        Ok(DeploymentRequest {
            contract: self.contract.clone(),
            args,
            overrides: self.overrides.clone(),
            libraries,
            verify: self.verify.clone(),
        })
    }
}

fn reference(text: &str) -> Option<&str> {
    text.strip_prefix("${")?.strip_suffix('}')
}

fn lookup(name: &str, deployed: &Addresses) -> Result<Address> {
    deployed
        .get(name)
        .copied()
        .with_context(|| format!("{name} is referenced before it was deployed"))
}

fn resolve_address(text: &str, deployed: &Addresses) -> Result<Address> {
    match reference(text) {
        Some(name) => lookup(name, deployed),
        None => text
            .parse()
            .with_context(|| format!("{text:?} is not an address")),
    }
}

fn resolve_arg(arg: &Value, deployed: &Addresses) -> Result<Value> {
    Ok(match arg {
        Value::String(text) => match reference(text) {
            Some(name) => Value::String(lookup(name, deployed)?.to_string()),
            None => arg.clone(),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_arg(item, deployed))
                .collect::<Result<Vec<_>>>()?,
        ),
        _ => arg.clone(),
    })
}
