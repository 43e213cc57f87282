pub mod profile;
pub mod visit;
pub mod vitals;

pub use profile::{ProfileFields, ProfileRecord};
pub use visit::{ClientMetadata, DeviceClass, VisitRecord};
pub use vitals::VitalsReading;
