use crate::buttons::TaskButtons;
use crate::config::{ButtonsConfig, CONFIGURATION_SECTION};
use crate::host::{ConfigurationChangeEvent, Disposable, Host};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Registrations that live as long as the extension and are released by the host.
#[derive(Debug, Default)]
pub struct ExtensionContext {
    pub subscriptions: Vec<Disposable>,
}

impl ExtensionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription, dropping entries that were already released.
    pub fn push(&mut self, disposable: Disposable) {
        self.subscriptions.retain(|s| !s.is_disposed());
        self.subscriptions.push(disposable);
    }

    pub fn dispose(&mut self) {
        for mut subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
    }
}

pub struct Extension {
    host: Arc<dyn Host>,
    buttons: Option<Arc<Mutex<TaskButtons>>>,
    subscription: Option<Disposable>,
}

impl Extension {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            buttons: None,
            subscription: None,
        }
    }

    /// Builds the buttons from the current configuration and rebuilds them
    /// whenever the `taskButtons` section changes.
    pub fn activate(&mut self, context: &mut ExtensionContext) {
        if self.buttons.is_some() {
            log::warn!("Extension already active, restarting");
            self.deactivate();
        }
        if let Some(mut previous) = self.subscription.take() {
            previous.dispose();
        }

        let config =
            ButtonsConfig::from_configuration(&self.host.get_configuration(CONFIGURATION_SECTION));
        let buttons = Arc::new(Mutex::new(TaskButtons::new(Arc::clone(&self.host), config)));

        let weak_buttons = Arc::downgrade(&buttons);
        let weak_host = Arc::downgrade(&self.host);
        let subscription = self.host.on_did_change_configuration(Arc::new(
            move |event: &ConfigurationChangeEvent| {
                reload_on_change(event, &weak_buttons, &weak_host);
            },
        ));
        context.push(subscription.clone());
        self.subscription = Some(subscription);

        buttons.lock().unwrap_or_else(PoisonError::into_inner).activate();
        self.buttons = Some(buttons);
        log::info!("Task buttons extension activated");
    }

    pub fn deactivate(&mut self) {
        if let Some(buttons) = self.buttons.take() {
            buttons.lock().unwrap_or_else(PoisonError::into_inner).deactivate();
            log::info!("Task buttons extension deactivated");
        }
    }

    pub fn buttons(&self) -> Option<Arc<Mutex<TaskButtons>>> {
        self.buttons.clone()
    }
}

fn reload_on_change(
    event: &ConfigurationChangeEvent,
    buttons: &Weak<Mutex<TaskButtons>>,
    host: &Weak<dyn Host>,
) {
    if !event.affects_configuration(CONFIGURATION_SECTION) {
        return;
    }
    let (Some(buttons), Some(host)) = (buttons.upgrade(), host.upgrade()) else {
        return;
    };

    let config =
        ButtonsConfig::from_configuration(&host.get_configuration(CONFIGURATION_SECTION));
    buttons.lock().unwrap_or_else(PoisonError::into_inner).update(config);
}
