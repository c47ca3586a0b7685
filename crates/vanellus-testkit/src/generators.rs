//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vanellus_core::{ContactData, ProviderInput};

/// A five-digit zip code.
pub fn zip_code() -> impl Strategy<Value = String> {
    (10_000u32..100_000).prop_map(|zip| zip.to_string())
}

/// Free text, including non-ASCII.
pub fn text(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_len).prop_map(|chars| chars.into_iter().collect())
}

/// Payload strings for envelopes.
pub fn payload(max_len: usize) -> impl Strategy<Value = String> {
    text(max_len)
}

/// Contact details with any subset of fields set.
pub fn contact_data() -> impl Strategy<Value = ContactData> {
    (
        prop::option::of(text(40)),
        prop::option::of("[a-z]{1,12}@[a-z]{1,12}\\.org"),
        prop::option::of("\\+49[0-9]{6,11}"),
    )
        .prop_map(|(name, email, phone)| ContactData { name, email, phone })
}

/// Parameters for a provider submission.
#[derive(Debug, Clone)]
pub struct ProviderParams {
    pub input: ProviderInput,
}

impl Arbitrary for ProviderParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            text(60),
            text(60),
            text(30),
            zip_code(),
            text(200),
            "[a-z]{1,12}@[a-z]{1,12}\\.de",
            any::<bool>(),
        )
            .prop_map(
                |(name, street, city, zip_code, description, email, accessible)| ProviderParams {
                    input: ProviderInput {
                        name,
                        street,
                        city,
                        zip_code,
                        description,
                        email,
                        accessible,
                    },
                },
            )
            .boxed()
    }
}
