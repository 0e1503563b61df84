//! Application state shared by all handlers.

use crate::auth::JwtKeys;
use crate::services::{AssetService, DeliveryService};
use streamsure_core::Config;
use streamsure_moderation::EventBroadcaster;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub assets: AssetService,
    pub delivery: DeliveryService,
    pub events: EventBroadcaster,
    pub jwt: JwtKeys,
}
