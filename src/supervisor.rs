//! Supervisor driver.
//!
//! Owns one instance per launch: the spawned process, its lifecycle state
//! machine and the event loop that feeds it. The loop multiplexes the
//! tagged output stream, the exit signal, the failure grace timer and
//! shutdown-call results, and interprets the effects the machine returns.
//! Restart-on-conflict is an instance outcome, not recursion: the driver
//! loop launches a fresh instance carrying the still-unfired ready sender.

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::classifier::Classifier;
use crate::config::Options;
use crate::error::SupervisorError;
use crate::launcher;
use crate::machine::{Effect, Lifecycle, StopIntent, FAILURE_GRACE};
use crate::shutdown::ShutdownClient;

type ReadySender = oneshot::Sender<Result<String, SupervisorError>>;

/// How one instance resolved without a terminal failure.
enum Outcome {
    /// Conflict shutdown succeeded; launch a fresh instance.
    Restart,
    /// Graceful drain stop completed and the process exited.
    Stopped,
}

/// Handle to a supervised server that has reported ready.
#[derive(Debug)]
pub struct ServerHandle {
    endpoint: String,
    task: tokio::task::JoinHandle<Result<(), SupervisorError>>,
}

impl ServerHandle {
    /// Address WebDriver clients should connect to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Wait for supervision to end. Post-ready fatal conditions (an
    /// exception, a fatal marker, unexpected termination) surface here as
    /// the error value; a graceful drain stop resolves to `Ok`.
    pub async fn wait(self) -> Result<(), SupervisorError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(SupervisorError::Internal(anyhow::anyhow!(
                "supervision task failed: {}",
                e
            ))),
        }
    }
}

/// Supervises the lifecycle of one Selenium server at a time.
pub struct Supervisor {
    options: Options,
    classifier: Classifier,
    shutdown: ShutdownClient,
}

impl Supervisor {
    pub fn new(options: Options) -> Result<Self, SupervisorError> {
        Ok(Self {
            options,
            classifier: Classifier::new()?,
            shutdown: ShutdownClient::new(),
        })
    }

    /// Launch the server and resolve once it reports ready or fails.
    ///
    /// The ready-or-fatal signal fires exactly once per supervision run,
    /// even across a conflict restart: the abandoned instance hands the
    /// unfired sender to its successor.
    pub async fn start(self) -> Result<ServerHandle, SupervisorError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(self.drive(ready_tx));

        match ready_rx.await {
            Ok(Ok(endpoint)) => Ok(ServerHandle { endpoint, task }),
            Ok(Err(e)) => Err(e),
            // Sender dropped without firing: surface the task's own error.
            Err(_) => match task.await {
                Ok(Ok(())) => Err(SupervisorError::Internal(anyhow::anyhow!(
                    "supervision ended before the server became ready"
                ))),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(SupervisorError::Internal(anyhow::anyhow!(
                    "supervision task failed: {}",
                    e
                ))),
            },
        }
    }

    async fn drive(self, ready: ReadySender) -> Result<(), SupervisorError> {
        let mut ready = Some(ready);
        let mut restarted = false;
        loop {
            match self.run_instance(restarted, &mut ready).await {
                Ok(Outcome::Restart) => restarted = true,
                Ok(Outcome::Stopped) => return Ok(()),
                Err(e) => {
                    // Pre-ready failures resolve through the ready signal;
                    // later ones through the task result.
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(e));
                        return Ok(());
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Run one instance from launch to its resolution.
    async fn run_instance(
        &self,
        restarted: bool,
        ready: &mut Option<ReadySender>,
    ) -> Result<Outcome, SupervisorError> {
        tracing::info!(
            "{} Selenium server",
            if restarted { "Restarting" } else { "Starting" }
        );

        let mut server = launcher::launch(&self.options.command_line())?;
        let mut machine = Lifecycle::new();

        // Shutdown calls run in spawned tasks so the loop stays
        // responsive; results come back through this channel.
        let (result_tx, mut result_rx) = mpsc::channel::<(StopIntent, bool)>(4);

        // Single reusable grace timer, reset on every arm.
        let grace_timer = tokio::time::sleep(FAILURE_GRACE);
        tokio::pin!(grace_timer);
        let mut grace_armed = false;

        let mut lines_open = true;
        let mut exit_seen = false;

        loop {
            let mut effects: Vec<Effect> = Vec::new();

            tokio::select! {
                maybe_line = server.lines.recv(), if lines_open => {
                    match maybe_line {
                        Some(line) => {
                            tracing::debug!(">> {}", line.text);
                            if let Some(event) = self.classifier.classify(&line.text) {
                                effects = machine.on_event(event);
                            }
                        }
                        None => lines_open = false,
                    }
                }
                _ = server.exited.changed(), if !exit_seen => {
                    exit_seen = true;
                    effects = machine.on_process_exit();
                }
                () = &mut grace_timer, if grace_armed => {
                    grace_armed = false;
                    effects = machine.on_grace_elapsed();
                }
                Some((intent, success)) = result_rx.recv() => {
                    effects = machine.on_shutdown_result(intent, success);
                }
            }

            // The process may already be gone by the time a stop result
            // resolves; re-check so the instance cannot linger.
            let late_exit = if exit_seen && !machine.is_stopped() {
                machine.on_process_exit()
            } else {
                Vec::new()
            };

            for effect in effects.into_iter().chain(late_exit) {
                match effect {
                    Effect::FireReady => {
                        tracing::info!(
                            "{} Selenium server: {}",
                            if restarted { "Restarted" } else { "Started" },
                            machine.endpoint()
                        );
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Ok(machine.endpoint().to_string()));
                        }
                    }
                    Effect::FireFatal(err) => return Err(err),
                    Effect::CallShutdown { endpoint, intent } => {
                        let client = self.shutdown.clone();
                        let tx = result_tx.clone();
                        tokio::spawn(async move {
                            let success = client.shutdown(&endpoint).await;
                            let _ = tx.send((intent, success)).await;
                        });
                    }
                    Effect::ArmGraceTimer => {
                        grace_timer.as_mut().reset(Instant::now() + FAILURE_GRACE);
                        grace_armed = true;
                    }
                    Effect::CancelGraceTimer => grace_armed = false,
                    Effect::Restart => return Ok(Outcome::Restart),
                }
            }

            if machine.is_stopped() && exit_seen {
                return Ok(Outcome::Stopped);
            }
        }
    }
}
