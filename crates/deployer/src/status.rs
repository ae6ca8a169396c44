//! Human readable progress output.

use {
    crate::{chain::DeployTransaction, verification::VerificationService},
    alloy::primitives::{Address, TxHash, U256, utils::format_ether},
    std::fmt::{self, Display, Formatter},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Started,
    Deploying {
        contract: String,
    },
    Deployed {
        contract: String,
        address: Address,
        transaction: Option<DeployTransaction>,
    },
    Transferred {
        to: Address,
        value: U256,
        hash: TxHash,
    },
    Verified {
        contract: String,
        service: VerificationService,
        reference: String,
    },
    ArtifactsSaved {
        location: String,
    },
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "\n\n 📡 Deploying...\n"),
            Self::Deploying { contract } => write!(f, " 🛰  Deploying: {contract}"),
            Self::Deployed {
                contract,
                address,
                transaction,
            } => {
                write!(f, " 📄 {contract} deployed to: {address}")?;
                if let Some(transaction) = transaction {
                    write!(
                        f,
                        "\n ⛽ {} ETH, tx hash {}",
                        format_ether(transaction.cost()),
                        transaction.hash
                    )?;
                }
                Ok(())
            }
            Self::Transferred { to, value, hash } => {
                write!(f, " 💸 Sent {} ETH to {to}, tx hash {hash}", format_ether(*value))
            }
            Self::Verified {
                contract,
                service,
                reference,
            } => write!(f, " ✅ {contract} submitted to {service}: {reference}"),
            Self::ArtifactsSaved { location } => {
                write!(f, " 💾 Artifacts (address and args) saved to: {location}\n\n")
            }
        }
    }
}

/// Ordered sink for status updates.
#[cfg_attr(test, mockall::automock)]
pub trait StatusSink: Send + Sync + 'static {
    fn emit(&self, status: Status);
}

/// Prints status updates to stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct Console;

impl StatusSink for Console {
    fn emit(&self, status: Status) {
        tracing::debug!(?status, "deployment progress");
        println!("{status}");
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::address};

    #[test]
    fn formats_deployment_with_cost() {
        let status = Status::Deployed {
            contract: "Wallet".to_string(),
            address: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            transaction: Some(DeployTransaction {
                hash: TxHash::repeat_byte(0xab),
                gas_limit: 1_000_000,
                gas_price: 2_000_000_000,
            }),
        };

        let text = status.to_string();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            " 📄 Wallet deployed to: 0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
        assert!(lines[1].starts_with(" ⛽ 0.002"));
        assert!(lines[1].contains(" ETH, tx hash "));
        assert!(lines[1].ends_with(&TxHash::repeat_byte(0xab).to_string()));
    }

    #[test]
    fn omits_cost_without_transaction() {
        let status = Status::Deployed {
            contract: "Wallet".to_string(),
            address: Address::ZERO,
            transaction: None,
        };
        assert_eq!(status.to_string().lines().count(), 1);
    }
}
