//! Parallel delivery of a command sequence to every device.
//!
//! Each address gets its own task. A device's steps run in order; a failed
//! step is logged and the following steps are still attempted. Devices never
//! wait on, or fail because of, one another.

use crate::errors::ControlError;
use crate::transport::{ControlCommand, ControlTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of one step on one device
#[derive(Debug)]
pub struct StepOutcome {
    pub command: ControlCommand,
    pub result: Result<(), ControlError>,
}

/// Everything that happened on one device during a cycle
#[derive(Debug)]
pub struct DeviceReport {
    pub address: String,
    pub steps: Vec<StepOutcome>,
}

impl DeviceReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.result.is_err())
    }
}

pub struct FanOut {
    transport: Arc<dyn ControlTransport>,
    step_timeout: Duration,
}

impl FanOut {
    pub fn new(transport: Arc<dyn ControlTransport>, step_timeout: Duration) -> Self {
        Self {
            transport,
            step_timeout,
        }
    }

    /// Runs `sequence` on every address concurrently and waits for all of
    /// them. Reports come back in address order.
    pub async fn run(&self, addresses: &[String], sequence: &[ControlCommand]) -> Vec<DeviceReport> {
        let sequence: Arc<[ControlCommand]> = Arc::from(sequence);
        let mut tasks = JoinSet::new();

        for (index, address) in addresses.iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            let sequence = Arc::clone(&sequence);
            let address = address.clone();
            let step_timeout = self.step_timeout;

            tasks.spawn(async move {
                let report =
                    run_device_sequence(transport.as_ref(), &address, &sequence, step_timeout)
                        .await;
                (index, report)
            });
        }

        let mut reports: Vec<Option<DeviceReport>> = addresses.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => warn!("❌ Device task aborted: {}", e),
            }
        }

        let reports: Vec<DeviceReport> = reports.into_iter().flatten().collect();
        let ok = reports.iter().filter(|r| r.succeeded()).count();
        info!(
            "📢 Broadcast delivered to {}/{} device(s)",
            ok,
            addresses.len()
        );
        reports
    }
}

/// Runs the whole sequence on one device, each step bounded by `step_timeout`.
pub async fn run_device_sequence(
    transport: &dyn ControlTransport,
    address: &str,
    sequence: &[ControlCommand],
    step_timeout: Duration,
) -> DeviceReport {
    let mut steps = Vec::with_capacity(sequence.len());

    for command in sequence {
        let result = match tokio::time::timeout(step_timeout, transport.execute(address, command))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ControlError::Timeout {
                action: command.action().to_string(),
                secs: step_timeout.as_secs(),
            }),
        };

        match &result {
            Ok(()) => debug!(address, step = %command, "✅ step done"),
            Err(e) => warn!(address, step = %command, "❌ step failed: {}", e),
        }

        steps.push(StepOutcome {
            command: command.clone(),
            result,
        });
    }

    DeviceReport {
        address: address.to_string(),
        steps,
    }
}
