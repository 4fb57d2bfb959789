use crate::message::{PublicKeyBytes, SignatureBytes};

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine};
use ed25519::pkcs8::{DecodePrivateKey, EncodePrivateKey, KeypairBytes};
use ed25519_dalek::{PublicKey, SecretKey, Signature, Signer, Verifier};
pub use ed25519_dalek::Keypair;
use rand::rngs::OsRng;

pub fn generate_keypair() -> Keypair {
    let mut rng = OsRng {};
    Keypair::generate(&mut rng)
}

pub fn keypair_to_pem(keypair: &Keypair) -> Result<String> {
    let kpb = KeypairBytes {
        secret_key: keypair.secret.to_bytes(),
        public_key: Some(keypair.public.to_bytes()),
    };
    let pem = kpb
        .to_pkcs8_pem(pkcs8::LineEnding::LF)
        .map_err(|e| anyhow!("keypair PEM encode failed: {e}"))?;
    Ok(pem.to_string())
}

pub fn keypair_from_pem(pem: &str) -> Result<Keypair> {
    let kpb =
        KeypairBytes::from_pkcs8_pem(pem).map_err(|e| anyhow!("keypair PEM parse failed: {e}"))?;
    let secret = SecretKey::from_bytes(&kpb.secret_key)?;
    let public = match kpb.public_key {
        Some(pubkey) => PublicKey::from_bytes(&pubkey)?,
        None => (&secret).into(),
    };
    Ok(Keypair { secret, public })
}

pub fn publickey_to_base64(pubkey: PublicKeyBytes) -> String {
    general_purpose::STANDARD.encode(pubkey)
}

pub fn publickey_from_base64(b64: &str) -> Result<PublicKeyBytes> {
    let key_vec = general_purpose::STANDARD.decode(b64)?;
    key_vec
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("public key must be 32 bytes"))
}

pub fn sign(keypair: &Keypair, msg: &[u8]) -> SignatureBytes {
    keypair.sign(msg).to_bytes()
}

pub fn verify(pubkey: PublicKeyBytes, msg: &[u8], signature: &SignatureBytes) -> Result<()> {
    let pubkey = PublicKey::from_bytes(&pubkey)?;
    let signature = Signature::try_from(&signature[..])?;
    pubkey.verify(msg, &signature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{CallMode, TransactionCall, TransactionRequest};

    #[test]
    fn pem_round_trip_preserves_keys() {
        let keypair = generate_keypair();
        let pem = keypair_to_pem(&keypair).unwrap();
        let restored = keypair_from_pem(&pem).unwrap();
        assert_eq!(keypair.public.to_bytes(), restored.public.to_bytes());
        assert_eq!(keypair.secret.to_bytes(), restored.secret.to_bytes());
    }

    #[test]
    fn signed_request_verifies() {
        let keypair = generate_keypair();
        let call = TransactionCall::new("ReadPayment", &["payment1"]);
        let payload =
            TransactionRequest::signing_bytes("run-1-0", CallMode::Evaluate, &call).unwrap();
        let signature = sign(&keypair, &payload);
        verify(keypair.public.to_bytes(), &payload, &signature).unwrap();
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let keypair = generate_keypair();
        let signature = sign(&keypair, b"original");
        assert!(verify(keypair.public.to_bytes(), b"tampered", &signature).is_err());
    }
}
