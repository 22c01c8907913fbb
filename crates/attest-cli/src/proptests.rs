#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::strategy::LazyJust;

    use attest_core::errors::{EnvelopeError, ProviderError, PublishError, ScanError};
    use attest_core::CoreError;
    use attest_crypto::EciesError;

    use crate::input::read_arg;
    use crate::output::{OutputFormat, OutputFormatter};
    use crate::ExitCode;

    fn arb_output_format() -> impl Strategy<Value = OutputFormat> {
        prop_oneof![
            Just(OutputFormat::Table),
            Just(OutputFormat::Json),
            Just(OutputFormat::Quiet),
        ]
    }

    fn arb_core_error() -> impl Strategy<Value = CoreError> {
        let text = "[a-z ]{0,16}";
        prop_oneof![
            text.prop_map(|s| CoreError::from(EciesError::Format(s))),
            text.prop_map(|s| CoreError::from(EciesError::KeyFormat(s))),
            LazyJust::new(|| CoreError::from(EciesError::Authentication)),
            text.prop_map(|s| CoreError::from(EnvelopeError::Malformed(s))),
            text.prop_map(|s| CoreError::from(EnvelopeError::SignatureMismatch {
                declared: s,
                recovered: None,
            })),
            (0usize..8, 0usize..8).prop_map(|(keys, values)| CoreError::from(
                PublishError::FieldLengthMismatch { keys, values }
            )),
            text.prop_map(|s| CoreError::from(ScanError::Validation(s))),
            text.prop_map(|s| CoreError::from(ScanError::Provider(ProviderError::Http(s)))),
            (any::<u64>(), any::<u64>()).prop_map(|(budget, stopped_above)| CoreError::from(
                ScanError::WindowBudgetExceeded { budget, stopped_above }
            )),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_output_format_display_parses_back(format in arb_output_format()) {
            let parsed: OutputFormat = format.to_string().to_uppercase().parse().unwrap();
            prop_assert_eq!(parsed, format);
        }

        // No failure ever maps to a success exit code.
        #[test]
        fn prop_errors_never_exit_zero(error in arb_core_error()) {
            prop_assert_ne!(ExitCode::for_error(&error), ExitCode::Success);
        }

        // JSON error output always parses and carries the same code.
        #[test]
        fn prop_json_error_is_parseable(error in arb_core_error()) {
            let formatter = OutputFormatter::new(OutputFormat::Json, false);
            let code = ExitCode::for_error(&error);
            let out = formatter.render_error("test", error.kind(), &error.to_string(), code);
            let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
            prop_assert_eq!(parsed["error"]["exit_code"].as_i64(), Some(code as i64));
            prop_assert_eq!(parsed["error"]["kind"].as_str(), Some(error.kind()));
        }

        #[test]
        fn prop_literal_args_pass_through(value in "[A-Za-z0-9+/={}\":, ]{1,40}") {
            prop_assert_eq!(read_arg(&value).unwrap(), value);
        }
    }
}
