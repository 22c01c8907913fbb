#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Map, Value};

    use crate::canonical::to_canonical_json;
    use crate::schema::{select_schema, SchemaTag};
    use crate::signer::{build_envelope, LocalWallet, MessageSigner};

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                proptest::collection::hash_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    proptest! {
        // Canonical output reparses to an equal value and is a fixed point.
        #[test]
        fn test_canonical_is_stable(value in arb_json()) {
            let text = to_canonical_json(&value);
            let reparsed: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(&reparsed, &value);
            prop_assert_eq!(to_canonical_json(&reparsed), text);
        }

        // Selection is total: arbitrary text never panics and yields a known tier.
        #[test]
        fn test_select_schema_is_total(message in ".{0,64}") {
            let tag = select_schema(&message, None);
            prop_assert!(SchemaTag::ALL.contains(&tag));
        }

        #[test]
        fn test_ssn_presence_decides_tier(ssn in "[0-9-]{0,11}", name in "[A-Za-z]{1,8}") {
            let message = to_canonical_json(&json!({ "form": { "name": name, "ssn": ssn } }));
            let expected = if ssn.is_empty() { SchemaTag::KycLevel1 } else { SchemaTag::KycLevel2 };
            prop_assert_eq!(select_schema(&message, None), expected);
        }

        // Verify(build(payload)) recovers the signer; altering the message breaks it.
        #[test]
        fn test_envelope_binds_signer(seed in any::<u64>(), value in arb_json()) {
            let wallet = LocalWallet::random(&mut StdRng::seed_from_u64(seed));
            let mut env = build_envelope(&wallet, &json!({ "form": value }), None).unwrap();
            prop_assert_eq!(env.verify().unwrap(), wallet.address());

            env.message.push(' ');
            prop_assert!(env.verify().is_err());
        }
    }
}
