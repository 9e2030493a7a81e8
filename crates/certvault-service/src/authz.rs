//! Capability checks, evaluated per operation.
//!
//! Role is authoritative and comes from the user directory; nothing here is
//! derived from certificate ownership. A failed check is always a
//! `Forbidden` error, never a silently narrower view — the public
//! certificate view is a designed capability of the verification paths,
//! not a fallback.

use certvault_core::{Certificate, Role, User};

use crate::error::ServiceError;

pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Issue capability: the caller must hold the issuer role.
    pub fn require_issuer(caller: &User) -> Result<(), ServiceError> {
        if caller.role == Role::Issuer {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only issuers can perform this operation".into(),
            ))
        }
    }

    /// Revoke capability: issuer role and the certificate's issuer of
    /// record.
    pub fn require_issuer_of_record(
        caller: &User,
        certificate: &Certificate,
    ) -> Result<(), ServiceError> {
        Self::require_issuer(caller)?;
        if caller.id == certificate.issuer_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only the issuing authority can revoke this certificate".into(),
            ))
        }
    }

    /// Share capability: the certificate's current owner.
    pub fn require_owner(caller: &User, certificate: &Certificate) -> Result<(), ServiceError> {
        if caller.id == certificate.owner_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only the certificate owner can perform this operation".into(),
            ))
        }
    }

    /// Whether the caller gets the full view of a certificate (owner or
    /// issuer of record); everyone else gets the public view.
    pub fn can_view_full(caller: &User, certificate: &Certificate) -> bool {
        caller.id == certificate.owner_id || caller.id == certificate.issuer_id
    }
}
