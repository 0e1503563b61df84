pub mod asset_delete;
pub mod asset_get;
pub mod asset_review;
pub mod asset_stream;
pub mod asset_update;
pub mod asset_upload;
pub mod events;
pub mod health;
pub mod settings;
