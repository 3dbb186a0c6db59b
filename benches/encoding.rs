//! Benchmarks for encoding / decoding logic.

use criterion::{criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};

use jwt_pipeline::{
    Codec, DefaultClaims, Signer, TokenConfig, UntrustedToken, ValidationOptions,
};

// Fairly small list of claims.
#[derive(Serialize, Deserialize)]
struct CustomClaims {
    #[serde(rename = "aud")]
    audience: String,
    #[serde(rename = "sub")]
    user_id: String,
    name: String,
    email: String,
    roles: Vec<Role>,
}

impl Default for CustomClaims {
    fn default() -> Self {
        Self {
            audience: "content_management".to_owned(),
            user_id: "4f4d1f8f-1c1d-4e8a-9a0b-0c5b1b0a3e6f".to_owned(),
            name: "John Doe".to_owned(),
            email: "john.doe@example.com".to_string(),
            roles: vec![Role::ContentManager],
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Role {
    ContentManager,
    Janitor,
    Admin,
}

fn create_config(codec: Codec) -> TokenConfig {
    let defaults = DefaultClaims::default().with_audience("content_management");
    TokenConfig::new(Signer::hs256(b"super_secret_key_donut_steel_and_then_some"))
        .with_default_claims(&defaults)
        .with_codec(codec)
}

fn encoding_benches(criterion: &mut Criterion) {
    let claims = CustomClaims::default();

    let config = create_config(Codec::Json);
    criterion.bench_function("encoding/full", |bencher| {
        bencher.iter(|| config.encode_token(&claims).unwrap());
    });

    #[cfg(feature = "ciborium")]
    {
        let config = create_config(Codec::Cbor);
        criterion.bench_function("encoding_cbor/full", |bencher| {
            bencher.iter(|| config.encode_token(&claims).unwrap());
        });
    }
}

fn decoding_benches(criterion: &mut Criterion) {
    let claims = CustomClaims::default();
    let options = ValidationOptions::default();

    #[cfg(feature = "ciborium")]
    {
        let config = create_config(Codec::Cbor);
        let compact_token = config.encode_token(&claims).unwrap();
        criterion.bench_function("decoding_cbor", |bencher| {
            bencher.iter(|| UntrustedToken::new(&compact_token).unwrap())
        });
        criterion.bench_function("decoding_cbor/full", |bencher| {
            bencher.iter(|| config.decode_token(&compact_token, &options).unwrap());
        });
    }

    let config = create_config(Codec::Json);
    let token = config.encode_token(&claims).unwrap();
    criterion.bench_function("decoding", |bencher| {
        bencher.iter(|| UntrustedToken::new(&token).unwrap())
    });
    criterion.bench_function("decoding/full", |bencher| {
        bencher.iter(|| config.decode_token(&token, &options).unwrap());
    });
    criterion.bench_function("decoding/record", |bencher| {
        bencher.iter(|| {
            config
                .decode_token_as::<CustomClaims>(&token, &options)
                .unwrap()
        });
    });
}

criterion_group!(benches, encoding_benches, decoding_benches);
criterion_main!(benches);
