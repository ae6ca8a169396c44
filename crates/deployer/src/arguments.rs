use {
    crate::verification::{etherscan, tenderly},
    alloy::signers::local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    anyhow::{Context, Result},
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
    },
    tracing::level_filters::LevelFilter,
    url::Url,
};

/// Mnemonic of the accounts local development nodes are funded with.
const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

#[derive(clap::Parser)]
pub struct LoggingArguments {
    #[clap(long, env, default_value = "warn,deployer=info")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        Ok(())
    }
}

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    #[clap(flatten)]
    pub etherscan: etherscan::Arguments,

    #[clap(flatten)]
    pub tenderly: tenderly::Arguments,

    /// The Ethereum node URL to connect to.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub node_url: Url,

    /// TOML file listing the transfers and deployments to perform.
    #[clap(long, env, default_value = "deploy.toml")]
    pub plan: PathBuf,

    /// Directory the `.address` and `.args` files get written to.
    #[clap(long, env, default_value = "artifacts")]
    pub artifacts_dir: PathBuf,

    /// Directory containing the Hardhat compilation artifacts.
    #[clap(long, env, default_value = "artifacts")]
    pub compiled_dir: PathBuf,

    /// Hex private key of the deployer account. Takes precedence over
    /// `--mnemonic`.
    #[clap(long, env)]
    pub private_key: Option<String>,

    /// Mnemonic the deployer account is derived from.
    #[clap(long, env, default_value = DEV_MNEMONIC)]
    pub mnemonic: String,

    /// Derivation index of the deployer account within the mnemonic.
    #[clap(long, env, default_value = "0")]
    pub account_index: u32,

    /// Number of confirmations to wait for after each deployment. With 0 the
    /// deployment only waits for the node to accept the transaction.
    #[clap(long, env, default_value = "0")]
    pub confirmations: u64,
}

impl Arguments {
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        match &self.private_key {
            Some(key) => key.parse().context("invalid private key"),
            None => MnemonicBuilder::<English>::default()
                .phrase(self.mnemonic.as_str())
                .index(self.account_index)
                .context("invalid account index")?
                .build()
                .context("could not derive deployer account from mnemonic"),
        }
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            etherscan,
            tenderly,
            node_url,
            plan,
            artifacts_dir,
            compiled_dir,
            private_key,
            mnemonic: _,
            account_index,
            confirmations,
        } = self;

        write!(f, "{logging}")?;
        write!(f, "{etherscan}")?;
        write!(f, "{tenderly}")?;
        writeln!(f, "node_url: {node_url}")?;
        writeln!(f, "plan: {}", plan.display())?;
        writeln!(f, "artifacts_dir: {}", artifacts_dir.display())?;
        writeln!(f, "compiled_dir: {}", compiled_dir.display())?;
        display_secret_option(f, "private_key", private_key)?;
        writeln!(f, "mnemonic: SECRET")?;
        writeln!(f, "account_index: {account_index}")?;
        writeln!(f, "confirmations: {confirmations}")?;
        Ok(())
    }
}

pub fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

pub fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address, clap::Parser};

    #[test]
    fn defaults_to_first_dev_account() {
        let args = Arguments::parse_from(["deploy"]);
        assert_eq!(
            args.signer().unwrap().address(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
    }

    #[test]
    fn private_key_takes_precedence() {
        let args = Arguments::parse_from([
            "deploy",
            "--private-key",
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        ]);
        assert_eq!(
            args.signer().unwrap().address(),
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")
        );
    }

    #[test]
    fn hides_secrets() {
        let args = Arguments::parse_from([
            "deploy",
            "--private-key",
            "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
            "--etherscan-api-key",
            "ETHERSCAN",
        ]);
        let text = args.to_string();
        assert!(text.contains("private_key: SECRET"));
        assert!(text.contains("etherscan_api_key: SECRET"));
        assert!(!text.contains("59c6995e"));
        assert!(!text.contains("ETHERSCAN"));
        assert!(!text.contains("junk"));
    }
}
