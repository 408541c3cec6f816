use crate::domain::model::{KeyFile, KeyHalf, NetworkKeyPair};
use crate::foundation::{Point, Result, TillerError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::SigningKey;

/// Derivation of network key material from a ticket/seed. The concrete
/// ticket-to-seed scheme is a collaborator seam; the default implementation
/// below is deterministic so that re-derivation with the same inputs always
/// produces identical material.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, point: Point, life: u64, ticket: &str) -> Result<NetworkKeyPair>;
}

const CRYPT_CONTEXT: &str = "tiller v1 network crypt key";
const AUTH_CONTEXT: &str = "tiller v1 network auth key";
const KEYFILE_CONTEXT: &str = "tiller v1 keyfile";

/// Deterministic deriver: a blake3 KDF expands (ticket, point, life) into two
/// ed25519 keypairs, one for encryption and one for authentication.
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketKeyDeriver;

impl TicketKeyDeriver {
    fn half(context: &str, material: &[u8]) -> KeyHalf {
        let secret = blake3::derive_key(context, material);
        let public = SigningKey::from_bytes(&secret).verifying_key().to_bytes();
        KeyHalf { public: hex::encode(public), private: hex::encode(secret) }
    }
}

impl KeyDeriver for TicketKeyDeriver {
    fn derive(&self, point: Point, life: u64, ticket: &str) -> Result<NetworkKeyPair> {
        let ticket = ticket.trim();
        if ticket.is_empty() {
            return Err(TillerError::KeyDerivation { point, details: "empty ticket".to_string() });
        }

        let mut material = Vec::with_capacity(ticket.len() + 16);
        material.extend_from_slice(ticket.as_bytes());
        material.extend_from_slice(&point.value().to_be_bytes());
        material.extend_from_slice(&life.to_be_bytes());

        Ok(NetworkKeyPair {
            crypt: Self::half(CRYPT_CONTEXT, &material),
            auth: Self::half(AUTH_CONTEXT, &material),
            life,
            rift: life,
        })
    }
}

/// Builds the boot keyfile: a pure function of its inputs, safe to
/// regenerate, treated as generate-once for efficiency.
pub fn derive_keyfile(keys: &NetworkKeyPair, point: Point, life: u64) -> Result<KeyFile> {
    let crypt_private = hex::decode(keys.crypt.private.trim())?;
    let auth_private = hex::decode(keys.auth.private.trim())?;

    let mut payload = Vec::with_capacity(16 + crypt_private.len() + auth_private.len());
    payload.extend_from_slice(&point.value().to_be_bytes());
    payload.extend_from_slice(&life.to_be_bytes());
    payload.extend_from_slice(&crypt_private);
    payload.extend_from_slice(&auth_private);

    // Checksum binds the artifact to its inputs so a truncated file is
    // detectable at boot.
    let checksum = blake3::derive_key(KEYFILE_CONTEXT, &payload);
    payload.extend_from_slice(&checksum[..8]);

    Ok(KeyFile { point, life, contents: BASE64.encode(payload) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_per_inputs() {
        let deriver = TicketKeyDeriver;
        let point = Point::new(65792);

        let a = deriver.derive(point, 4, "~marbud-tidsev-litsut-hidfep").unwrap();
        let b = deriver.derive(point, 4, "~marbud-tidsev-litsut-hidfep").unwrap();
        assert_eq!(a, b);

        let other_life = deriver.derive(point, 5, "~marbud-tidsev-litsut-hidfep").unwrap();
        assert_ne!(a.crypt, other_life.crypt);
        let other_ticket = deriver.derive(point, 4, "~dozzod-dozzod-dozzod-dozzod").unwrap();
        assert_ne!(a.auth, other_ticket.auth);

        assert_eq!(a.life, 4);
        assert_eq!(a.rift, 4);
        assert_ne!(a.crypt, a.auth);
    }

    #[test]
    fn empty_ticket_is_rejected() {
        assert!(TicketKeyDeriver.derive(Point::new(0), 0, "  ").is_err());
    }

    #[test]
    fn keyfile_is_pure_in_its_inputs() {
        let deriver = TicketKeyDeriver;
        let point = Point::new(0);
        let keys = deriver.derive(point, 1, "ticket").unwrap();

        let first = derive_keyfile(&keys, point, 1).unwrap();
        let second = derive_keyfile(&keys, point, 1).unwrap();
        assert_eq!(first, second);

        let bumped = deriver.derive(point, 2, "ticket").unwrap();
        assert_ne!(derive_keyfile(&bumped, point, 2).unwrap().contents, first.contents);
    }
}
