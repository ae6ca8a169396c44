//! Inputs of a single contract deployment.

use {
    crate::verification::VerificationService,
    alloy::primitives::{
        Address,
        U256,
        utils::{ParseUnits, parse_units},
    },
    anyhow::{Context, Result, bail},
    serde::{Deserialize, Deserializer},
    serde_json::Value,
    std::{
        collections::BTreeMap,
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
};

/// Library name to the address of the deployed library.
pub type Libraries = BTreeMap<String, Address>;

/// Everything needed to deploy one contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeploymentRequest {
    /// Contract identifier, either `Name` or `path/to/Source.sol:Name`.
    pub contract: String,
    /// Constructor arguments in declaration order. Coerced into ABI values
    /// with the types of the contract's constructor.
    pub args: Vec<Value>,
    pub overrides: Overrides,
    pub libraries: Libraries,
    /// Services the contract gets verified with after a successful
    /// deployment.
    pub verify: Vec<VerificationService>,
}

impl DeploymentRequest {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_libraries(mut self, libraries: Libraries) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_verification(mut self, service: VerificationService) -> Self {
        self.verify.push(service);
        self
    }

    /// Name the artifact files of this deployment are stored under.
    pub fn artifact_name(&self) -> &str {
        artifact_name(&self.contract)
    }
}

/// Strips the source qualifier from a fully-qualified contract name.
pub fn artifact_name(contract: &str) -> &str {
    contract
        .rsplit_once(':')
        .map_or(contract, |(_, name)| name)
}

/// Transaction parameters to use instead of the ones the chain client would
/// pick.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Overrides {
    /// Native currency sent along with the deployment. The constructor must
    /// be payable.
    pub value: Option<Amount>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<Amount>,
    pub nonce: Option<u64>,
    /// Options this tool does not interpret itself. Handed to the chain
    /// client as they are.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// An amount of native currency in wei.
///
/// Parses plain integers (wei), `0x` prefixed hex (wei) and decimals with a
/// unit like `0.05 ether` or `30gwei`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Amount(pub U256);

impl Amount {
    pub fn wei(&self) -> U256 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x") {
            return U256::from_str_radix(hex, 16)
                .map(Self)
                .with_context(|| format!("invalid hex amount {s:?}"));
        }

        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let unit = match unit.trim() {
            "" => "wei",
            unit => unit,
        };
        let amount = parse_units(number.trim(), unit)
            .with_context(|| format!("invalid amount {s:?}"))?;
        match amount {
            ParseUnits::U256(amount) => Ok(Self(amount)),
            ParseUnits::I256(amount) if !amount.is_negative() => Ok(Self(amount.into_raw())),
            ParseUnits::I256(_) => bail!("amount {s:?} is negative"),
        }
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Wei(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Wei(wei) => Ok(Self(U256::from(wei))),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
