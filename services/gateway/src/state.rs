use std::sync::Arc;

use crate::{
    config::{AppConfig, StatusMode},
    mirror::{DemoStatus, ProviderMirror, StatusSource},
    provider::{BuildProvider, ProviderInfo},
    push::ExpoPushClient,
    store::BuildStore,
    submitter::{DetailLinks, Submitter},
};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: AppConfig,
    pub store: BuildStore,
    pub submitter: Submitter,
    pub status: Arc<dyn StatusSource>,
    pub push: ExpoPushClient,
    pub provider_info: Option<ProviderInfo>,
}

impl AppState {
    /// `provider` is `None` when EAS credentials are missing; submissions then
    /// fail as a configuration fault.
    pub fn new(
        config: AppConfig,
        store: BuildStore,
        provider: Option<Arc<dyn BuildProvider>>,
        push: ExpoPushClient,
    ) -> Self {
        let links = DetailLinks {
            account: config.expo_account.clone(),
            project_slug: config.expo_project_slug.clone(),
        };
        let status: Arc<dyn StatusSource> = match config.status_mode {
            StatusMode::Live => Arc::new(ProviderMirror::new(store.clone(), provider.clone())),
            StatusMode::Demo => Arc::new(DemoStatus),
        };
        let provider_info = provider.as_ref().map(|p| p.info());

        Self {
            submitter: Submitter::new(provider, store.clone(), links),
            config,
            store,
            status,
            push,
            provider_info,
        }
    }
}
