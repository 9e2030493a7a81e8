//! CertVault core — domain types, anchor status state machine, and the
//! canonical metadata document model.

pub mod anchor_state;
pub mod error;
pub mod metadata;
pub mod types;

pub use anchor_state::{AnchorEvent, AnchorStateMachine, AnchorStatus};
pub use error::CoreError;
pub use metadata::MetadataValue;
pub use types::{
    new_certificate_id, new_user_id, Certificate, CertificateContent, PublicCertificate, Role,
    ShareLink, User,
};
