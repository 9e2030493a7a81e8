//! Share-token generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a share token (64 hex chars on the wire).
const TOKEN_BYTES: usize = 32;

/// Generate an unguessable share token from OS-provided entropy.
///
/// Tokens are independent of certificate content: knowing a certificate's
/// hash gives no advantage in guessing its share links.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
