use std::sync::Arc;

use crate::config::Config;
use crate::mail::Mailer;
use crate::revalidate::Revalidator;
use crate::store::Store;

/// Everything a request handler needs, shared across requests.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub mailer: Arc<dyn Mailer>,
    pub revalidator: Arc<dyn Revalidator>,
    pub config: Arc<Config>,
}

impl<S: Store> AppState<S> {
    pub fn new(
        store: S,
        mailer: Arc<dyn Mailer>,
        revalidator: Arc<dyn Revalidator>,
        config: Config,
    ) -> Self {
        Self {
            store,
            mailer,
            revalidator,
            config: Arc::new(config),
        }
    }
}
