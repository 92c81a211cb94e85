// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-force-sensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::acquisition::{
    ConnectionState, ForceSensor, PollingController, SensorObserver, SharedController, Wrench,
};
use crate::config::{Config, PollingConfig};

/// Period of the heartbeat log line.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Background polling of one force sensor.
///
/// The daemon owns a [`SharedController`]; its poll task takes the lock once
/// per tick, so on-demand commands issued through [`PollingDaemon::controller`]
/// never overlap an in-flight poll.
pub struct PollingDaemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: watch::Sender<bool>,
    polling: PollingConfig,
    controller: Option<SharedController>,
}

impl Default for PollingDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingDaemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        PollingDaemon {
            tasks: Vec::new(),
            shutdown,
            polling: PollingConfig::default(),
            controller: None,
        }
    }

    /// Build the sensor described by `config` and start polling it.
    pub fn launch(
        &mut self,
        config: &Config,
        observer: Box<dyn SensorObserver>,
    ) -> Result<SharedController> {
        let sensor = ForceSensor::from_config(&config.sensor)
            .context("Failed to build the force sensor from the configuration")?;
        self.launch_with_sensor(&config.polling, sensor, observer)
    }

    /// Start polling an already built sensor.
    pub fn launch_with_sensor(
        &mut self,
        polling: &PollingConfig,
        sensor: ForceSensor,
        observer: Box<dyn SensorObserver>,
    ) -> Result<SharedController> {
        if self.controller.is_some() {
            anyhow::bail!("Polling daemon is already running");
        }

        let controller = PollingController::new(sensor, observer).into_shared();
        self.polling = polling.clone();
        self.controller = Some(controller.clone());

        self.start_polling(controller.clone(), polling.interval())?;
        self.start_heartbeat(controller.clone())?;

        Ok(controller)
    }

    /// Start the poll task
    fn start_polling(&mut self, controller: SharedController, period: Duration) -> Result<()> {
        if period.is_zero() {
            anyhow::bail!("Poll interval must be > 0");
        }
        info!("Starting poll task every {:?}", period);

        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while !*shutdown.borrow() {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                let sample = controller.lock().await.poll().await;
                if !sample.connected {
                    debug!("Poll without sensor: {}", sample.message);
                }
            }
            debug!("Poll task stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the link status periodically
    fn start_heartbeat(&mut self, controller: SharedController) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            while !*shutdown.borrow() {
                tokio::select! {
                    _ = time::sleep(HEARTBEAT_INTERVAL) => {}
                    _ = shutdown.changed() => break,
                }
                let controller = controller.lock().await;
                match controller.state() {
                    ConnectionState::Connected => debug!(
                        "Daemon heartbeat: sensor {} connected",
                        controller.sensor().endpoint()
                    ),
                    ConnectionState::Disconnected => debug!(
                        "Daemon heartbeat: sensor {} disconnected ({})",
                        controller.sensor().endpoint(),
                        controller.last_error()
                    ),
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Shared handle on the running controller.
    pub fn controller(&self) -> Option<SharedController> {
        self.controller.clone()
    }

    /// Tare with the configured sample count and inter-sample delay.
    pub async fn tare(&self) -> Option<Wrench> {
        let controller = self.controller.as_ref()?;
        let mut controller = controller.lock().await;
        controller
            .tare_with_delay(self.polling.tare_samples, self.polling.bias_delay())
            .await
    }

    /// Drop the bias.
    pub async fn clear(&self) {
        if let Some(controller) = &self.controller {
            controller.lock().await.clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_some() && !*self.shutdown.borrow()
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.shutdown.send_replace(true);
    }

    /// Wait for all tasks to complete, then close the sensor link
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }

        if let Some(controller) = self.controller {
            controller.lock().await.close().await;
            info!("Sensor link closed");
        }
        Ok(())
    }
}
