use he_context::prelude::*;

fn master() -> HomomorphicContext {
    HomomorphicContext::create_default().unwrap()
}

/// Context over the master's parameters holding only its public key.
fn public_only(master: &HomomorphicContext) -> HomomorphicContext {
    let mut ctx = HomomorphicContext::from_serialized_params(&master.encryption_parameters()).unwrap();
    ctx.set_public_key(&master.public_key().unwrap()).unwrap();
    ctx
}

#[test]
fn master_roundtrip_and_arithmetic() {
    let ctx = master();
    let a = ctx.encrypt(5).unwrap();
    let b = ctx.encrypt(-7).unwrap();

    assert_eq!(ctx.decrypt(&a).unwrap(), 5);
    assert_eq!(ctx.decrypt(&ctx.add(&a, &b).unwrap()).unwrap(), -2);
    assert_eq!(ctx.decrypt(&ctx.sub(&a, &b).unwrap()).unwrap(), 12);
    assert_eq!(ctx.decrypt(&ctx.multiply(&a, &b).unwrap()).unwrap(), -35);
    assert_eq!(ctx.decrypt(&ctx.square(&b).unwrap()).unwrap(), 49);
}

#[test]
fn unrelated_context_cannot_decrypt() {
    let ctx = master();
    let stranger = master();
    let ct = ctx.encrypt(42).unwrap();

    let err = stranger.decrypt(&ct).unwrap_err();
    assert!(matches!(err, HeError::DecryptionRange));
    assert_eq!(err.to_string(), "output out of range");
}

#[test]
fn public_key_alone_cannot_decrypt() {
    let ctx = master();
    let worker = public_only(&ctx);
    let ct = worker.encrypt(9).unwrap();

    assert!(matches!(worker.decrypt(&ct), Err(HeError::MissingKey("secret"))));
    assert!(matches!(worker.secret_key(), Err(HeError::MissingKey("secret"))));
    assert_eq!(ctx.decrypt(&ct).unwrap(), 9);
}

#[test]
fn keyless_context_cannot_encrypt() {
    let ctx = master();
    let bare = HomomorphicContext::with_params(ctx.params().clone());
    assert!(matches!(bare.encrypt(1), Err(HeError::MissingKey("public"))));
}

#[test]
fn keys_from_other_parameters_are_rejected() {
    let ctx = master();
    let mut other = HomomorphicContext::create(4096, "coeff_modulus_128", 1024u64).unwrap();

    let err = other.set_public_key(&ctx.public_key().unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "public key data is invalid");
    let err = other.set_secret_key(&ctx.secret_key().unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "secret key data is invalid");
}

#[test]
fn cross_context_add_under_shared_public_key() {
    let ctx = master();
    let worker = public_only(&ctx);

    let a = ctx.encrypt(-5).unwrap();
    let b = worker.encrypt(-7).unwrap();
    // either context can evaluate, only the secret key holder decrypts
    let sum = worker.add(&a, &b).unwrap();
    assert_eq!(ctx.decrypt(&sum).unwrap(), -12);

    let prod = ctx.multiply(&a, &b).unwrap();
    assert_eq!(ctx.decrypt(&prod).unwrap(), 35);
}

#[test]
fn mixed_key_sum_fails_to_decrypt() {
    let alice = master();
    let bob = HomomorphicContext::create_default().unwrap();
    assert_eq!(alice.encryption_parameters(), bob.encryption_parameters());

    let sum = alice.add(&alice.encrypt(1).unwrap(), &bob.encrypt(2).unwrap()).unwrap();
    assert!(matches!(alice.decrypt(&sum), Err(HeError::DecryptionRange)));
    assert!(matches!(bob.decrypt(&sum), Err(HeError::DecryptionRange)));
}

#[test]
fn imported_secret_key_decrypts() {
    let ctx = master();
    let mut copy = HomomorphicContext::from_serialized_params(&ctx.encryption_parameters()).unwrap();
    copy.set_secret_key(&ctx.secret_key().unwrap()).unwrap();
    assert_eq!(copy.decrypt(&ctx.encrypt(-123).unwrap()).unwrap(), -123);
}

#[test]
fn int32_boundaries() {
    let ctx = master();
    let min = ctx.encrypt(i32::MIN).unwrap();
    let max = ctx.encrypt(i32::MAX).unwrap();
    let one = ctx.encrypt(1).unwrap();

    assert_eq!(ctx.decrypt(&ctx.add(&min, &max).unwrap()).unwrap(), -1);
    assert_eq!(ctx.decrypt(&ctx.negate(&max).unwrap()).unwrap(), -i32::MAX);

    let err = ctx.decrypt(&ctx.negate(&min).unwrap()).unwrap_err();
    assert!(matches!(err, HeError::DecodeCast(CastFailure::Int32Overflow(_))));
    assert!(err.to_string().starts_with("cast failed"));

    let err = ctx.decrypt(&ctx.sub(&min, &one).unwrap()).unwrap_err();
    assert!(err.is_cast_failure());
}

#[test]
fn serialized_parameters_are_value_equal() {
    for ctx in [
        master(),
        HomomorphicContext::create(8192, "128-bit", 40961u64).unwrap(),
    ] {
        let text = ctx.encryption_parameters();
        let a = HomomorphicContext::from_serialized_params(&text).unwrap();
        let b = HomomorphicContext::from_serialized_params(&text).unwrap();
        assert_eq!(a.encryption_parameters(), b.encryption_parameters());
        assert_eq!(a.encryption_parameters(), text);
        assert!(compatible(a.params(), ctx.params()));
    }
}

#[test]
fn four_context_pipeline() {
    let master = HomomorphicContext::create(4096, "coeff_modulus_192", 1024u64).unwrap();
    let params = master.encryption_parameters();

    let mut producer = HomomorphicContext::from_serialized_params(&params).unwrap();
    let evaluator = HomomorphicContext::from_serialized_params(&params).unwrap();
    let mut reader = HomomorphicContext::from_serialized_params(&params).unwrap();
    producer.set_public_key(&master.public_key().unwrap()).unwrap();
    reader.set_secret_key(&master.secret_key().unwrap()).unwrap();

    // ((-5 + -7) * -7) - 5 * 5
    let c1 = producer.encrypt_text(5).unwrap();
    let c2 = master.encrypt_text(-7).unwrap();

    let c01 = evaluator.negate_text(&c1).unwrap();
    let c02 = evaluator.add_text(&c01, &c2).unwrap();
    let c03 = evaluator.multiply_text(&c02, &c2).unwrap();
    let c04 = evaluator.square_text(&c1).unwrap();
    let c05 = evaluator.sub_text(&c03, &c04).unwrap();

    assert_eq!(reader.decrypt_text(&c02).unwrap(), -12);
    assert_eq!(reader.decrypt_text(&c03).unwrap(), 84);
    assert_eq!(reader.decrypt_text(&c04).unwrap(), 25);
    assert_eq!(reader.decrypt_text(&c05).unwrap(), 59);
    assert!(matches!(evaluator.decrypt_text(&c05), Err(HeError::MissingKey("secret"))));

    let out = evaluator.deserialize_ciphertext(&c05).unwrap();
    assert_eq!(out.size(), 3);
    assert!(reader.noise_budget(&out).unwrap() > 0);
}

#[test]
fn full_chain_on_default_parameters() {
    let ctx = master();
    let c1 = ctx.encrypt(5).unwrap();
    let c2 = ctx.encrypt(-7).unwrap();

    let c03 = ctx.multiply(&ctx.add(&ctx.negate(&c1).unwrap(), &c2).unwrap(), &c2).unwrap();
    let c05 = ctx.sub(&c03, &ctx.square(&c1).unwrap()).unwrap();

    assert_eq!(ctx.decrypt(&c05).unwrap(), 59);
    assert!(ctx.noise_budget(&c05).unwrap() > 0);
}

#[test]
fn ciphertext_from_other_parameters() {
    let ctx = master();
    let other = HomomorphicContext::create(4096, "128", 1024u64).unwrap();
    let foreign = other.encrypt(3).unwrap();

    assert!(matches!(ctx.decrypt(&foreign), Err(HeError::DecryptionRange)));
    assert!(matches!(ctx.negate(&foreign), Err(HeError::IncompatibleParameters)));
    let text = other.serialize_ciphertext(&foreign);
    assert!(matches!(ctx.decrypt_text(&text), Err(HeError::DecryptionRange)));
    assert!(matches!(ctx.deserialize_ciphertext(&text), Err(HeError::IncompatibleParameters)));
}

#[test]
fn repeated_multiplication_exhausts_noise_budget() {
    let ctx = master();
    let one = ctx.encrypt(1).unwrap();
    let mut acc = ctx.encrypt(2).unwrap();
    let mut budgets = vec![ctx.noise_budget(&acc).unwrap()];

    let mut failure = None;
    for _ in 0..8 {
        acc = ctx.multiply(&acc, &one).unwrap();
        match ctx.decrypt(&acc) {
            Ok(v) => {
                assert_eq!(v, 2);
                budgets.push(ctx.noise_budget(&acc).unwrap());
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    assert!(budgets.windows(2).all(|w| w[1] < w[0]), "budgets = {budgets:?}");
    assert!(matches!(
        failure,
        Some(HeError::DecodeCast(CastFailure::NoiseBudgetExhausted))
    ));
}

#[test]
fn malformed_text_is_rejected() {
    let ctx = master();
    assert!(matches!(ctx.deserialize_ciphertext("%%%"), Err(HeError::Deserialization(_))));
    assert!(HomomorphicContext::from_serialized_params("bm90IHBhcmFtcw==").is_err());

    let mut bytes = ctx.encrypt(1).unwrap().to_bytes();
    bytes.truncate(bytes.len() - 8);
    assert!(Ciphertext::from_bytes(&bytes, ctx.params()).is_err());
}

#[tokio::test]
async fn async_wrapper_computes_expression() {
    let actx = AsyncContext::new(master());
    let u = actx.encrypt(8).await.unwrap();
    let v = actx.encrypt(-12).await.unwrap();

    let neg = actx.negate(u).await.unwrap();
    let sum = actx.add(neg, v.clone()).await.unwrap();
    let prod = actx.multiply(sum, v).await.unwrap();

    assert_eq!(actx.decrypt(prod).await.unwrap(), 240);
}
