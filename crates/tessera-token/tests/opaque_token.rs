//! Opaque token codec: golden vectors, tamper resistance and bulk behaviour

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use tessera_core::{EntropySource, FixedEntropy, SeededEntropy};
use tessera_token::{
    FixedPayload, RandomPayload, TokenGenerator, TokenKind, TokenRouter, TokenVerifier,
};

const SECRET: &str = "my-very-secret-key-for-mac";
const PAYLOAD_HEX: &str = "2f8282cbe2f9496fb144c0aa4ced56db";
const NONCE_HEX: &str = "52fdfc072182654f163f5f0f";

const GOLDEN: &str =
    "1rEhxXi9mBwmkGpXxD4Njd_wHOKGDkYTeOIHSFgC17Gf4afDf4Cmj28d4tJXIarvgzgOPHYRJPEOVm4QGW";
const GOLDEN_ACCESS: &str =
    "at_1rEhxXi9mBwmkGpXxD4Njd_wHOKGDkYTeOIHSFgBgJOoVNdzNn7njIoE90xmNFWpWBNcAuttuQvJNaID9f";

// Payload block plus the nonce digits of the sealed block; these depend only
// on the payload, the nonce and the base62 layout, not on the MAC constants
const PAYLOAD_AND_NONCE_HEAD: &str = "1rEhxXi9mBwmkGpXxD4Njd_wHOKGDkYTeOIHSFg";

fn payload() -> [u8; 16] {
    hex::decode(PAYLOAD_HEX).unwrap().try_into().unwrap()
}

fn golden_generator() -> TokenGenerator {
    TokenGenerator::new(SECRET)
        .unwrap()
        .with_payload_source(Arc::new(FixedPayload(payload())))
        .with_entropy(Arc::new(FixedEntropy::new(hex::decode(NONCE_HEX).unwrap())))
}

#[test]
fn test_golden_token() {
    let token = golden_generator().generate(None).unwrap();
    assert_eq!(token, GOLDEN);
    assert!(token.starts_with(PAYLOAD_AND_NONCE_HEAD));

    let verifier = TokenVerifier::new(SECRET).unwrap();
    assert_eq!(hex::encode(verifier.extract(GOLDEN).unwrap()), PAYLOAD_HEX);
}

#[test]
fn test_golden_token_with_prefix() {
    let token = golden_generator().generate(Some("at")).unwrap();
    assert_eq!(token, GOLDEN_ACCESS);

    let verifier = TokenVerifier::new(SECRET).unwrap();
    let opened = verifier.open(GOLDEN_ACCESS).unwrap();
    assert_eq!(opened.prefix.as_deref(), Some("at"));
    assert_eq!(opened.payload, payload());
}

#[test]
fn test_golden_token_from_deterministic_rng() {
    // Payload drawn first, then the nonce, from one scripted stream
    let mut script = hex::decode(PAYLOAD_HEX).unwrap();
    script.extend(hex::decode(NONCE_HEX).unwrap());
    let entropy: Arc<dyn EntropySource> = Arc::new(FixedEntropy::new(script));

    let generator = TokenGenerator::new(SECRET)
        .unwrap()
        .with_payload_source(Arc::new(RandomPayload::new(Arc::clone(&entropy))))
        .with_entropy(entropy);

    assert_eq!(generator.generate(None).unwrap(), GOLDEN);
}

#[test]
fn test_every_bit_flip_is_rejected() {
    let verifier = TokenVerifier::new(SECRET).unwrap();

    for original in [GOLDEN, GOLDEN_ACCESS] {
        for index in 0..original.len() {
            for bit in 0..7 {
                let mut bytes = original.as_bytes().to_vec();
                bytes[index] ^= 1 << bit;
                let tampered = String::from_utf8(bytes).unwrap();

                let err = verifier.extract(&tampered).unwrap_err();
                assert!(
                    matches!(err.category(), "format" | "authentication"),
                    "byte {index} bit {bit}: {err}"
                );
            }
        }
    }
}

#[test]
fn test_invalid_prefix_emits_no_token() {
    let generator = golden_generator();
    for prefix in ["At", "a t", "a_b", "", "tok/en"] {
        let err = generator.generate(Some(prefix)).unwrap_err();
        assert_eq!(err.category(), "argument", "{prefix:?}");
    }
    // The nonce script was never touched
    assert_eq!(generator.generate(None).unwrap(), GOLDEN);
}

#[test]
fn test_entropy_exhaustion_is_reported() {
    let generator = TokenGenerator::new(SECRET)
        .unwrap()
        .with_payload_source(Arc::new(FixedPayload(payload())))
        .with_entropy(Arc::new(FixedEntropy::exhausted()));
    assert_eq!(generator.generate(Some("at")).unwrap_err().category(), "entropy");
}

#[test]
fn test_shape_violations_are_format_errors() {
    let verifier = TokenVerifier::new(SECRET).unwrap();
    let cases = [
        String::new(),
        "at_".to_string(),
        GOLDEN.replace('_', "-"),
        format!("{GOLDEN}0"),
        GOLDEN[1..].to_string(),
        format!("AT_{GOLDEN}"),
        format!("at_rt_{GOLDEN}"),
    ];
    for token in &cases {
        assert_eq!(verifier.verify(token).unwrap_err().category(), "format", "{token:?}");
    }
}

#[test]
fn test_bulk_generation_and_prefix_substitution() {
    let router = TokenRouter::new(
        TokenGenerator::new("bulk-secret")
            .unwrap()
            .with_entropy(Arc::new(SeededEntropy::new(42))),
    );
    let verifier = TokenVerifier::new("bulk-secret").unwrap();

    for _ in 0..10_000 {
        let token = router.generate(TokenKind::AccessToken).unwrap();
        verifier.verify(&token).unwrap();

        let substituted = token.replacen("at_", "rt_", 1);
        assert_eq!(
            verifier.verify(&substituted).unwrap_err().category(),
            "authentication"
        );
    }
}

#[test]
fn test_prefix_removal_is_rejected() {
    let verifier = TokenVerifier::new(SECRET).unwrap();
    let stripped = GOLDEN_ACCESS.trim_start_matches("at_");
    assert_eq!(
        verifier.verify(stripped).unwrap_err().category(),
        "authentication"
    );
}

proptest! {
    #[test]
    fn prop_extract_recovers_payload(
        prefix in proptest::option::of("[a-z0-9-]{1,16}"),
        payload in proptest::array::uniform16(any::<u8>()),
        seed in any::<u64>(),
    ) {
        let generator = TokenGenerator::new(SECRET)
            .unwrap()
            .with_payload_source(Arc::new(FixedPayload(payload)))
            .with_entropy(Arc::new(SeededEntropy::new(seed)));

        let token = generator.generate(prefix.as_deref()).unwrap();
        let opened = generator.verifier().open(&token).unwrap();

        prop_assert_eq!(opened.payload, payload);
        prop_assert_eq!(opened.prefix, prefix);
    }

    #[test]
    fn prop_foreign_prefixes_are_arguments(prefix in "[^a-z0-9-]{1,4}") {
        let generator = TokenGenerator::new(SECRET).unwrap();
        prop_assert_eq!(
            generator.generate(Some(&prefix)).unwrap_err().category(),
            "argument"
        );
    }
}
