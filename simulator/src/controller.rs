//! Simulation controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use tracing::{info, warn};

use zkbank_client::ApiClient;
use zkbank_common::{CreateTransaction, TransactionId, TransactionRecord, ZkBankError};
use zkbank_crypto::to_prefixed_hex;

use crate::metrics::SimulationMetrics;
use crate::scenario::{Scenario, ScenarioStep, COUNTERPARTY, INITIATOR};

/// Number of addresses in the continuous-mode party pool.
const PARTY_POOL: usize = 6;

/// Address length in bytes.
const ADDRESS_BYTES: usize = 20;

/// One randomly generated workflow for continuous mode.
#[derive(Debug, Clone)]
struct WorkflowPlan {
    request: CreateTransaction,
    signers: Vec<String>,
    notary: Option<String>,
}

/// Controls the simulation.
pub struct SimulationController {
    /// API client.
    client: Arc<ApiClient>,
    /// Workflows started per second in continuous mode.
    rate: f64,
    /// Delay between workflow starts, derived from `rate`.
    interval: Duration,
    /// Interval between stats polls.
    refresh: Duration,
    /// Random number generator.
    rng: Arc<RwLock<StdRng>>,
    /// Addresses used as parties in continuous mode.
    parties: Vec<String>,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
    /// Running flag.
    running: Arc<RwLock<bool>>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(
        client: ApiClient,
        rate: f64,
        refresh: Duration,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let interval = Duration::try_from_secs_f64(1.0 / rate)
            .map_err(|e| anyhow!("rate {} gives no usable interval: {}", rate, e))?;
        if interval.is_zero() {
            bail!("rate {} is too high", rate);
        }

        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let parties = (0..PARTY_POOL)
            .map(|_| {
                let mut bytes = [0u8; ADDRESS_BYTES];
                rng.fill(&mut bytes[..]);
                to_prefixed_hex(&bytes)
            })
            .collect();

        Ok(Self {
            client: Arc::new(client),
            rate,
            interval,
            refresh,
            rng: Arc::new(RwLock::new(rng)),
            parties,
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Check the API is reachable and healthy.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        let health = self.client.health().await?;
        if !health.is_ok() {
            bail!("API at {} reports status {}", self.client.base_url(), health.status);
        }

        info!(
            api_url = %self.client.base_url(),
            network = %health.network,
            version = %health.version,
            "Connected to zkBank API"
        );
        Ok(())
    }

    /// Run a scenario. Any step whose outcome differs from the script fails
    /// the run.
    pub async fn run_scenario(&self, scenario: &Scenario) -> anyhow::Result<()> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        *self.running.write().await = true;
        let start = Instant::now();
        let result = self.execute_steps(&scenario.steps).await;
        let latency = start.elapsed().as_millis() as u64;
        *self.running.write().await = false;

        match &result {
            Ok(()) => {
                self.metrics.write().await.record_success(latency);
                info!(scenario = %scenario.name, latency_ms = latency, "Scenario passed");
            }
            Err(e) => {
                self.metrics.write().await.record_failure(latency);
                warn!(scenario = %scenario.name, error = %e, "Scenario failed");
            }
        }

        result
    }

    async fn execute_steps(&self, steps: &[ScenarioStep]) -> anyhow::Result<()> {
        let mut current: Option<TransactionId> = None;
        let mut index = 0;

        while index < steps.len() {
            if !*self.running.read().await {
                break;
            }

            let step = &steps[index];
            let expected_error = match steps.get(index + 1) {
                Some(ScenarioStep::ExpectError { code }) if step.is_action() => Some(code.as_str()),
                _ => None,
            };

            match (self.execute_step(step, &mut current).await, expected_error) {
                (Ok(()), None) => index += 1,
                (Ok(()), Some(code)) => {
                    bail!("Step {} ({:?}) succeeded, expected {}", index, step, code);
                }
                (Err(e), Some(code)) if e.error_code() == code => {
                    info!(step = index, code = %code, "Rejected as expected");
                    index += 2;
                }
                (Err(e), _) => {
                    return Err(anyhow!("Step {} ({:?}) failed: {}", index, step, e));
                }
            }
        }

        Ok(())
    }

    /// Execute a single scenario step.
    async fn execute_step(
        &self,
        step: &ScenarioStep,
        current: &mut Option<TransactionId>,
    ) -> Result<(), ZkBankError> {
        match step {
            ScenarioStep::Create {
                amount,
                required_signatures,
                notary_required,
            } => {
                let request = CreateTransaction::new(INITIATOR, COUNTERPARTY, *amount)
                    .with_required_signatures(*required_signatures)
                    .with_notary_required(*notary_required);
                let record = self.client.create(&request).await?;
                info!(transaction_id = %record.id.short(), "Created transaction");
                *current = Some(record.id);
            }
            ScenarioStep::Sign { signer } => {
                let record = self
                    .client
                    .sign_with_placeholder(&current_id(current)?, signer.as_str())
                    .await?;
                log_progress("Signed", &record);
            }
            ScenarioStep::Notarize { notary } => {
                let record = self
                    .client
                    .notarize_with_placeholder(&current_id(current)?, notary.as_str())
                    .await?;
                log_progress("Notarized", &record);
            }
            ScenarioStep::Complete => {
                let record = self.client.complete(&current_id(current)?).await?;
                log_progress("Completed", &record);
            }
            ScenarioStep::ExpectStatus { status } => {
                let view = self.client.status(&current_id(current)?).await?;
                if view.status != *status {
                    return Err(ZkBankError::Internal(format!(
                        "Expected status {}, found {}",
                        status, view.status
                    )));
                }
            }
            ScenarioStep::ExpectError { code } => {
                return Err(ZkBankError::Internal(format!(
                    "Expected {} without a preceding action",
                    code
                )));
            }
        }

        Ok(())
    }

    /// Run in continuous mode.
    pub async fn run(&self, duration: Option<Duration>) -> anyhow::Result<()> {
        info!(rate = self.rate, "Running simulation in continuous mode");

        *self.running.write().await = true;

        let generator = {
            let client = self.client.clone();
            let metrics = self.metrics.clone();
            let rng = self.rng.clone();
            let running = self.running.clone();
            let parties = self.parties.clone();
            let delay = self.interval;

            tokio::spawn(async move {
                loop {
                    if !*running.read().await {
                        break;
                    }

                    let plan = {
                        let mut rng_guard = rng.write().await;
                        random_plan(&mut *rng_guard, &parties)
                    };

                    let start = Instant::now();
                    let result = run_workflow(&client, &plan).await;
                    let latency = start.elapsed().as_millis() as u64;

                    match result {
                        Ok(record) => {
                            info!(
                                transaction_id = %record.id.short(),
                                signers = plan.signers.len(),
                                notary = plan.notary.is_some(),
                                latency_ms = latency,
                                "Workflow completed"
                            );
                            metrics.write().await.record_success(latency);
                        }
                        Err(e) => {
                            warn!(error = %e, code = e.error_code(), "Workflow failed");
                            metrics.write().await.record_failure(latency);
                        }
                    }

                    tokio::time::sleep(delay).await;
                }
            })
        };

        let refresher = {
            let client = self.client.clone();
            let metrics = self.metrics.clone();
            let running = self.running.clone();
            let refresh = self.refresh;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(refresh);
                loop {
                    interval.tick().await;
                    if !*running.read().await {
                        break;
                    }

                    match client.stats().await {
                        Ok(stats) => {
                            metrics.write().await.record_poll();
                            info!(
                                total = stats.total,
                                pending = stats.pending,
                                completed = stats.completed,
                                notarized = stats.notarized,
                                "Ledger stats"
                            );
                        }
                        Err(e) => warn!(error = %e, "Stats refresh failed"),
                    }
                }
            })
        };

        // Wait for duration or Ctrl+C
        match duration {
            Some(d) => {
                tokio::time::sleep(d).await;
            }
            None => {
                tokio::signal::ctrl_c().await?;
            }
        }

        self.stop().await;
        generator.await?;
        refresher.abort();

        Ok(())
    }

    /// Get simulation metrics.
    pub async fn metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    /// Stop the simulation.
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}

fn current_id(current: &Option<TransactionId>) -> Result<TransactionId, ZkBankError> {
    current
        .clone()
        .ok_or_else(|| ZkBankError::Internal("No transaction created yet".to_string()))
}

fn log_progress(action: &str, record: &TransactionRecord) {
    info!(
        transaction_id = %record.id.short(),
        status = %record.status,
        signatures = record.signature_count(),
        progress = record.progress(),
        "{}",
        action
    );
}

/// Draw a workflow: random parties and amount, a threshold of one to three
/// signers, and the notary gate on or off.
fn random_plan<R: Rng + ?Sized>(rng: &mut R, parties: &[String]) -> WorkflowPlan {
    let initiator = rng.gen_range(0..parties.len());
    let mut counterparty = rng.gen_range(0..parties.len());
    while counterparty == initiator {
        counterparty = rng.gen_range(0..parties.len());
    }

    let required = rng.gen_range(1..=3u32);
    let notary_required = rng.gen_bool(0.5);

    let mut signers = vec![parties[initiator].clone(), parties[counterparty].clone()];
    while signers.len() < required as usize {
        let candidate = &parties[rng.gen_range(0..parties.len())];
        if !signers.contains(candidate) {
            signers.push(candidate.clone());
        }
    }
    signers.truncate(required as usize);

    let notary = if notary_required {
        let mut notary = rng.gen_range(0..parties.len());
        while notary == initiator || notary == counterparty {
            notary = rng.gen_range(0..parties.len());
        }
        Some(parties[notary].clone())
    } else {
        None
    };

    WorkflowPlan {
        request: CreateTransaction::new(
            parties[initiator].clone(),
            parties[counterparty].clone(),
            rng.gen_range(1_000..1_000_000_000u64),
        )
        .with_required_signatures(required)
        .with_notary_required(notary_required),
        signers,
        notary,
    }
}

/// Drive one planned workflow from creation to completion.
async fn run_workflow(client: &ApiClient, plan: &WorkflowPlan) -> Result<TransactionRecord, ZkBankError> {
    let record = client.create(&plan.request).await?;
    for signer in &plan.signers {
        client.sign_with_placeholder(&record.id, signer.as_str()).await?;
    }
    if let Some(notary) = &plan.notary {
        client.notarize_with_placeholder(&record.id, notary.as_str()).await?;
    }
    client.complete(&record.id).await
}
