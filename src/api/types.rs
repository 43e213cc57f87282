//! Shared state for the API layer.

use std::sync::{Arc, Mutex};

use crate::auth::{OAuthClient, SessionStore, SessionUser};
use crate::config::Settings;
use crate::feed::FeedClient;
use crate::mail::MailClient;
use crate::poll::{DeviceVitalsPanel, VitalsPanel};
use crate::store::BackendClient;
use crate::summary::GeminiClient;

/// Shared context for all routes and middleware. Every upstream client is
/// constructed here, once, from the injected settings.
#[derive(Clone)]
pub struct ApiContext {
    pub settings: Arc<Settings>,
    pub store: Arc<BackendClient>,
    pub feed: FeedClient,
    pub mail: Arc<MailClient>,
    pub generator: Arc<GeminiClient>,
    pub oauth: Arc<OAuthClient>,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub vitals: DeviceVitalsPanel,
}

impl ApiContext {
    pub fn new(settings: Arc<Settings>) -> Self {
        let feed = FeedClient::new(&settings);
        Self {
            store: Arc::new(BackendClient::new(&settings)),
            mail: Arc::new(MailClient::new(&settings)),
            generator: Arc::new(GeminiClient::new(&settings)),
            oauth: Arc::new(OAuthClient::new(&settings)),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            vitals: VitalsPanel::new(feed.clone()),
            feed,
            settings,
        }
    }
}

/// Authenticated user context, injected into request extensions by the
/// session middleware.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: SessionUser,
}
