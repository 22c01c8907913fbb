#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::ecies::{open, seal, seal_to, MIN_SEALED_LEN};
    use crate::encoding::{decode_sealed, encode_sealed, TransportEncoding};
    use crate::error::EciesError;
    use crate::keys::{normalize_public_key, KeyPair};

    proptest! {
        // Open(Seal(pk, P, A), sk, A) == P
        #[test]
        fn test_seal_open_round_trip(
            key_seed in any::<u64>(),
            eph_seed in any::<u64>(),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            aad in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..64)),
            compressed in any::<bool>(),
        ) {
            let kp = KeyPair::generate(&mut StdRng::seed_from_u64(key_seed));
            let pk_hex = if compressed {
                kp.public_hex_compressed()
            } else {
                kp.public_hex_uncompressed()
            };
            let pk = hex::decode(&pk_hex[2..]).unwrap();

            let mut rng = StdRng::seed_from_u64(eph_seed);
            let sealed = seal(&mut rng, &pk, &payload, aad.as_deref()).unwrap();
            prop_assert_eq!(sealed.len(), MIN_SEALED_LEN + payload.len());

            let opened = open(sealed.as_bytes(), kp.secret(), aad.as_deref()).unwrap();
            prop_assert_eq!(opened, payload);
        }

        // Any single-bit flip after the IV is caught by the tag.
        #[test]
        fn test_ciphertext_bit_flip_fails_authentication(
            key_seed in any::<u64>(),
            payload in proptest::collection::vec(any::<u8>(), 0..128),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let kp = KeyPair::generate(&mut StdRng::seed_from_u64(key_seed));
            let sealed = seal_to(&mut rand_core::OsRng, kp.public(), &payload, None).unwrap();

            let mut bytes = sealed.as_bytes().to_vec();
            let ct_start = 33 + 12;
            let idx = ct_start + position.index(bytes.len() - ct_start);
            bytes[idx] ^= 1u8 << bit;

            prop_assert_eq!(open(&bytes, kp.secret(), None), Err(EciesError::Authentication));
        }

        // Sealing under A and opening under B != A fails even with the right key.
        #[test]
        fn test_aad_binding(
            key_seed in any::<u64>(),
            aad_a in proptest::collection::vec(any::<u8>(), 0..32),
            aad_b in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assume!(aad_a != aad_b);
            let kp = KeyPair::generate(&mut StdRng::seed_from_u64(key_seed));
            let sealed =
                seal_to(&mut rand_core::OsRng, kp.public(), b"payload", Some(aad_a.as_slice()))
                    .unwrap();

            prop_assert_eq!(
                open(sealed.as_bytes(), kp.secret(), Some(aad_b.as_slice())),
                Err(EciesError::Authentication)
            );
        }

        // Anything under 61 bytes is rejected before the AEAD runs.
        #[test]
        fn test_short_input_is_format_error(
            key_seed in any::<u64>(),
            input in proptest::collection::vec(any::<u8>(), 0..MIN_SEALED_LEN),
        ) {
            let kp = KeyPair::generate(&mut StdRng::seed_from_u64(key_seed));
            let result = open(&input, kp.secret(), None);
            prop_assert!(matches!(result, Err(EciesError::Format(_))));
        }

        #[test]
        fn test_key_normalization_agrees(key_seed in any::<u64>()) {
            let kp = KeyPair::generate(&mut StdRng::seed_from_u64(key_seed));
            prop_assert_eq!(
                normalize_public_key(&kp.public_hex_compressed()).unwrap(),
                normalize_public_key(&kp.public_hex_uncompressed()).unwrap()
            );
        }

        #[test]
        fn test_transport_encodings_agree(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let b64 = encode_sealed(&bytes, TransportEncoding::Base64);
            let b64url = encode_sealed(&bytes, TransportEncoding::Base64Url);
            prop_assert_eq!(decode_sealed(&b64).unwrap(), bytes.clone());
            prop_assert_eq!(decode_sealed(&b64url).unwrap(), bytes);
        }
    }
}
