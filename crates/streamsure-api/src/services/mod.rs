pub mod assets;
pub mod delivery;

pub use assets::{AssetService, Submission, UploadedFile};
pub use delivery::{Delivery, DeliveryService};
