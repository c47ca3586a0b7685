//! Property tests for signed and ECDH envelopes.

use proptest::prelude::*;

use vanellus_core::{ecdh_decrypt, ecdh_encrypt, ecdh_encrypt_ephemeral, sign, verify, KeyPair};

/// Which part of an ECDH envelope to corrupt.
#[derive(Debug, Clone, Copy)]
enum EnvelopeField {
    Iv,
    EphemeralKey,
    Mac,
    Data,
}

fn envelope_field() -> impl Strategy<Value = EnvelopeField> {
    prop_oneof![
        Just(EnvelopeField::Iv),
        Just(EnvelopeField::EphemeralKey),
        Just(EnvelopeField::Mac),
        Just(EnvelopeField::Data),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn signature_verifies_only_under_signer(payload in ".{0,256}") {
        let signer = KeyPair::generate_ecdsa();
        let other = KeyPair::generate_ecdsa();

        let signed = sign(&payload, &signer.private_key, &signer.public_key).unwrap();

        prop_assert_eq!(&signed.data, &payload);
        prop_assert!(verify(&[signer.public_key.clone()], &signed));
        prop_assert!(!verify(&[other.public_key], &signed));
    }

    #[test]
    fn flipped_signature_byte_fails(payload in ".{0,64}", index in 0usize..64, bit in 0u8..8) {
        let signer = KeyPair::generate_ecdsa();
        let mut signed = sign(&payload, &signer.private_key, &signer.public_key).unwrap();

        signed.signature[index] ^= 1 << bit;
        prop_assert!(!verify(&[signer.public_key], &signed));
    }

    #[test]
    fn altered_data_fails(payload in ".{1,64}", suffix in ".{1,8}") {
        let signer = KeyPair::generate_ecdsa();
        let mut signed = sign(&payload, &signer.private_key, &signer.public_key).unwrap();

        signed.data.push_str(&suffix);
        prop_assert!(!verify(&[signer.public_key], &signed));
    }

    #[test]
    fn ecdh_roundtrip(payload in ".{0,512}") {
        let sender = KeyPair::generate_ecdh();
        let recipient = KeyPair::generate_ecdh();

        let envelope = ecdh_encrypt(&payload, &sender, &recipient.public_key).unwrap();
        prop_assert_eq!(ecdh_decrypt(&envelope, &recipient.private_key).unwrap(), payload.clone());

        let envelope = ecdh_encrypt_ephemeral(&payload, &recipient.public_key).unwrap();
        prop_assert_eq!(ecdh_decrypt(&envelope, &recipient.private_key).unwrap(), payload);
    }

    #[test]
    fn ecdh_wrong_recipient_fails(payload in ".{0,128}") {
        let sender = KeyPair::generate_ecdh();
        let recipient = KeyPair::generate_ecdh();
        let eve = KeyPair::generate_ecdh();

        let envelope = ecdh_encrypt(&payload, &sender, &recipient.public_key).unwrap();
        prop_assert!(ecdh_decrypt(&envelope, &eve.private_key).is_err());
    }

    #[test]
    fn ecdh_single_flip_fails(
        payload in ".{1,128}",
        field in envelope_field(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let sender = KeyPair::generate_ecdh();
        let recipient = KeyPair::generate_ecdh();
        let mut envelope = ecdh_encrypt(&payload, &sender, &recipient.public_key).unwrap();

        match field {
            EnvelopeField::Iv => {
                let i = position.index(envelope.iv.len());
                envelope.iv[i] ^= 1 << bit;
            }
            EnvelopeField::Mac => {
                let i = position.index(envelope.mac.len());
                envelope.mac[i] ^= 1 << bit;
            }
            EnvelopeField::Data => {
                let i = position.index(envelope.data.len());
                envelope.data[i] ^= 1 << bit;
            }
            EnvelopeField::EphemeralKey => {
                let mut bytes = envelope.ephemeral_public_key.as_bytes().to_vec();
                let i = position.index(bytes.len());
                bytes[i] ^= 1 << bit;
                envelope.ephemeral_public_key = vanellus_core::PublicKey::from_bytes(bytes);
            }
        }

        prop_assert!(ecdh_decrypt(&envelope, &recipient.private_key).is_err());
    }
}
