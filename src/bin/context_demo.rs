use std::time::Instant;

use he_context::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Master context plus three contexts bound to the same parameters: the
/// workers only see the public key, the last one also gets the secret key.
fn pipeline() -> AppResult<i32> {
    let master = HomomorphicContext::create(4096, "coeff_modulus_192", 1024u64)?;
    let params = master.encryption_parameters();

    let mut producer = HomomorphicContext::from_serialized_params(&params)?;
    let evaluator = HomomorphicContext::from_serialized_params(&params)?;
    let mut reader = HomomorphicContext::from_serialized_params(&params)?;
    producer.set_public_key(&master.public_key()?)?;
    reader.set_secret_key(&master.secret_key()?)?;

    let c1 = producer.encrypt_text(5)?;
    let c2 = master.encrypt_text(-7)?;

    let c01 = evaluator.negate_text(&c1)?;
    let c02 = evaluator.add_text(&c01, &c2)?;
    let c03 = evaluator.multiply_text(&c02, &c2)?;
    let c04 = evaluator.square_text(&c1)?;
    let out = evaluator.sub_text(&c03, &c04)?;

    Ok(reader.decrypt_text(&out)?)
}

fn boundaries(ctx: &HomomorphicContext) -> AppResult<()> {
    let min = ctx.encrypt(i32::MIN)?;
    let max = ctx.encrypt(i32::MAX)?;

    info!(result = ctx.decrypt(&ctx.negate(&max)?)?, "-(MAX_INT32)");
    info!(result = ctx.decrypt(&ctx.add(&min, &max)?)?, "MIN_INT32 + MAX_INT32");
    match ctx.decrypt(&ctx.negate(&min)?) {
        Ok(v) => warn!(v, "-(MIN_INT32) unexpectedly decoded"),
        Err(e) => info!(error = %e, "-(MIN_INT32) rejected"),
    }
    Ok(())
}

fn exhaust(ctx: &HomomorphicContext) -> AppResult<()> {
    let one = ctx.encrypt(1)?;
    let mut acc = ctx.encrypt(2)?;
    for depth in 1..=8 {
        acc = ctx.multiply(&acc, &one)?;
        match ctx.decrypt(&acc) {
            Ok(v) => info!(depth, v, budget = ctx.noise_budget(&acc)?, "multiplied"),
            Err(e) => {
                info!(depth, error = %e, "decryption failed");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "he_context=info,context_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let start = Instant::now();
    let ctx = HomomorphicContext::create_default()?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "default context ready");

    let a = ctx.encrypt(5)?;
    let b = ctx.encrypt(-7)?;
    info!(result = ctx.decrypt(&ctx.multiply(&a, &b)?)?, "5 * -7");

    boundaries(&ctx)?;

    let stranger = HomomorphicContext::create_default()?;
    match stranger.decrypt(&a) {
        Ok(v) => warn!(v, "unrelated context decrypted"),
        Err(e) => info!(error = %e, "unrelated context cannot decrypt"),
    }

    let start = Instant::now();
    info!(result = pipeline()?, elapsed_ms = start.elapsed().as_millis() as u64, "((-5 + -7) * -7) - 5 * 5 across four contexts");

    exhaust(&ctx)?;

    let actx = AsyncContext::new(ctx);
    let u = actx.encrypt(8).await?;
    let v = actx.encrypt(-12).await?;
    let neg = actx.negate(u).await?;
    let sum = actx.add(neg, v.clone()).await?;
    let prod = actx.multiply(sum, v).await?;
    info!(result = actx.decrypt(prod).await?, "async (-u + v) * v");

    Ok(())
}
