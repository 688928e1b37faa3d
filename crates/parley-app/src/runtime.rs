//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop between the [`App`] state machine and a
//! platform [`Driver`].

use std::collections::VecDeque;

use parley_core::identity::ClientIdentity;

use crate::{App, AppAction, AppConfig, AppEvent, Driver, Phase};

/// Generic runtime that orchestrates App and Driver.
pub struct Runtime<D>
where
    D: Driver,
{
    driver: D,
    app: App,
}

impl<D> Runtime<D>
where
    D: Driver,
{
    /// Create a new runtime with an unmounted app.
    pub fn new(driver: D, config: AppConfig) -> Self {
        Self { driver, app: App::new(config) }
    }

    /// Mount the app and run until it closes.
    ///
    /// Returns the closed app so callers can inspect the final view.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll, render or redirect.
    /// Connect and send failures are reported to the app as disconnects.
    pub async fn run(mut self, identity: Option<ClientIdentity>) -> Result<App, D::Error> {
        let actions = self.app.mount(identity);
        self.process_actions(actions).await?;

        while self.app.phase() != Phase::Closed {
            let actions = match self.driver.poll_event().await? {
                Some(event) => self.app.handle(event),
                None => self.app.unmount(),
            };
            self.process_actions(actions).await?;
        }

        self.driver.stop();
        Ok(self.app)
    }

    /// Execute actions, feeding any events they cause back into the app
    /// before returning.
    async fn process_actions(&mut self, initial: Vec<AppAction>) -> Result<(), D::Error> {
        let mut pending = VecDeque::from(initial);

        while let Some(action) = pending.pop_front() {
            match action {
                AppAction::Render => self.driver.render(&self.app)?,

                AppAction::Connect { server_addr } => {
                    let event = match self.driver.connect(&server_addr).await {
                        Ok(transport) => AppEvent::Connected { transport },
                        Err(e) => {
                            tracing::warn!("connect to {} failed: {}", server_addr, e);
                            AppEvent::Disconnected { reason: e.to_string() }
                        },
                    };
                    pending.extend(self.app.handle(event));
                },

                AppAction::Send(event) => {
                    let name = event.name();
                    if let Err(e) = self.driver.send(event).await {
                        tracing::warn!("send {} failed: {}", name, e);
                        pending.extend(self.app.handle(AppEvent::Disconnected {
                            reason: e.to_string(),
                        }));
                    }
                },

                AppAction::StartTimer { timer, delay } => self.driver.start_timer(timer, delay),

                AppAction::RedirectToNameEntry => self.driver.redirect_to_name_entry()?,

                AppAction::Release => tracing::debug!("chat view released"),
            }
        }

        Ok(())
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }
}
