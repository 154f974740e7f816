//! Simulation scenarios.

use serde::{Deserialize, Serialize};

use zkbank_common::TransactionStatus;

/// Names accepted by [`Scenario::load`].
pub const SCENARIO_NAMES: [&str; 5] = [
    "happy-path",
    "no-notary",
    "duplicate-signer",
    "premature-complete",
    "double-notarize",
];

/// A simulation scenario. Steps run in order against the transaction
/// created by the most recent `Create` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Create a transaction between the two scenario parties.
    Create {
        amount: u64,
        required_signatures: u32,
        notary_required: bool,
    },
    /// Sign as `signer`.
    Sign { signer: String },
    /// Notarize as `notary`.
    Notarize { notary: String },
    /// Complete the transaction.
    Complete,
    /// The transaction's status must equal `status`.
    ExpectStatus { status: TransactionStatus },
    /// The previous step must have failed with `code`.
    ExpectError { code: String },
}

impl ScenarioStep {
    fn sign(signer: &str) -> Self {
        ScenarioStep::Sign {
            signer: signer.to_string(),
        }
    }

    fn notarize() -> Self {
        ScenarioStep::Notarize {
            notary: NOTARY.to_string(),
        }
    }

    fn expect(status: TransactionStatus) -> Self {
        ScenarioStep::ExpectStatus { status }
    }

    fn expect_error(code: &str) -> Self {
        ScenarioStep::ExpectError {
            code: code.to_string(),
        }
    }

    /// Check if this step calls the API with a mutation.
    pub fn is_action(&self) -> bool {
        !matches!(
            self,
            ScenarioStep::ExpectStatus { .. } | ScenarioStep::ExpectError { .. }
        )
    }
}

/// Scenario initiator address.
pub const INITIATOR: &str = "0xa11ce00000000000000000000000000000000001";
/// Scenario counterparty address.
pub const COUNTERPARTY: &str = "0xb0b0000000000000000000000000000000000002";
/// Scenario notary address.
pub const NOTARY: &str = "0x0a7a000000000000000000000000000000000003";

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "happy-path" => Ok(Self::happy_path()),
            "no-notary" => Ok(Self::no_notary()),
            "duplicate-signer" => Ok(Self::duplicate_signer()),
            "premature-complete" => Ok(Self::premature_complete()),
            "double-notarize" => Ok(Self::double_notarize()),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (expected one of {})",
                name,
                SCENARIO_NAMES.join(", ")
            )),
        }
    }

    /// Two signers and a notary, through to completion.
    fn happy_path() -> Self {
        Self {
            name: "happy-path".to_string(),
            description: "Two signatures, notary, completion".to_string(),
            steps: vec![
                ScenarioStep::Create {
                    amount: 1_000_000,
                    required_signatures: 2,
                    notary_required: true,
                },
                ScenarioStep::expect(TransactionStatus::Pending),
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::expect(TransactionStatus::Pending),
                ScenarioStep::sign(COUNTERPARTY),
                ScenarioStep::expect(TransactionStatus::ReadyForNotary),
                ScenarioStep::notarize(),
                ScenarioStep::expect(TransactionStatus::ReadyForCompletion),
                ScenarioStep::Complete,
                ScenarioStep::expect(TransactionStatus::Completed),
            ],
        }
    }

    /// Single signer without a notary gate.
    fn no_notary() -> Self {
        Self {
            name: "no-notary".to_string(),
            description: "One signature, no notary, completion".to_string(),
            steps: vec![
                ScenarioStep::Create {
                    amount: 250_000,
                    required_signatures: 1,
                    notary_required: false,
                },
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::expect(TransactionStatus::ReadyForCompletion),
                ScenarioStep::notarize(),
                ScenarioStep::expect_error("NOTARY_NOT_REQUIRED"),
                ScenarioStep::Complete,
                ScenarioStep::expect(TransactionStatus::Completed),
            ],
        }
    }

    /// The same signer twice.
    fn duplicate_signer() -> Self {
        Self {
            name: "duplicate-signer".to_string(),
            description: "A repeated signer is rejected".to_string(),
            steps: vec![
                ScenarioStep::Create {
                    amount: 5_000,
                    required_signatures: 2,
                    notary_required: true,
                },
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::expect_error("DUPLICATE_SIGNER"),
                ScenarioStep::expect(TransactionStatus::Pending),
            ],
        }
    }

    /// Completion attempted before each gate is satisfied.
    fn premature_complete() -> Self {
        Self {
            name: "premature-complete".to_string(),
            description: "Completion before the threshold and before the notary".to_string(),
            steps: vec![
                ScenarioStep::Create {
                    amount: 75_000,
                    required_signatures: 2,
                    notary_required: true,
                },
                ScenarioStep::Complete,
                ScenarioStep::expect_error("INSUFFICIENT_SIGNATURES"),
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::sign(COUNTERPARTY),
                ScenarioStep::Complete,
                ScenarioStep::expect_error("MISSING_NOTARY"),
                ScenarioStep::expect(TransactionStatus::ReadyForNotary),
            ],
        }
    }

    /// A second notarization, then a second completion.
    fn double_notarize() -> Self {
        Self {
            name: "double-notarize".to_string(),
            description: "Repeated notary and completion are rejected".to_string(),
            steps: vec![
                ScenarioStep::Create {
                    amount: 42_000,
                    required_signatures: 2,
                    notary_required: true,
                },
                ScenarioStep::sign(INITIATOR),
                ScenarioStep::sign(COUNTERPARTY),
                ScenarioStep::notarize(),
                ScenarioStep::notarize(),
                ScenarioStep::expect_error("NOTARY_ALREADY_SET"),
                ScenarioStep::Complete,
                ScenarioStep::Complete,
                ScenarioStep::expect_error("ALREADY_COMPLETED"),
                ScenarioStep::expect(TransactionStatus::Completed),
            ],
        }
    }
}
