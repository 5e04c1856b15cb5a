mod application_info;
mod application_status;
mod capabilities;
mod certificate;
mod exported_key;
mod metadata;
mod pairing_info;
mod signature;
mod version;

pub use application_info::{ApplicationInfo, SelectResponse};
pub use application_status::ApplicationStatus;
pub use capabilities::{Capabilities, Capability};
pub use certificate::{verify_identity, Certificate};
pub use exported_key::Keypair;
pub use metadata::Metadata;
pub use pairing_info::PairingInfo;
pub use signature::{RecoveredSignature, Signature};
pub use version::Version;
