//! Deferred execution of context calls.
//!
//! [`AsyncContext`] offers the same operations as [`HomomorphicContext`] as
//! `async fn`s. Each call runs the blocking operation on tokio's blocking
//! pool and resolves once it completes. Calls are not cancellable: dropping
//! the future detaches the job, which still runs to completion.

use std::sync::Arc;

use crate::backend::{BfvBackend, HeBackend};
use crate::context::HomomorphicContext;
use crate::error::{HeError, Result};

pub struct AsyncContext<B: HeBackend = BfvBackend> {
    inner: Arc<HomomorphicContext<B>>,
}

impl<B: HeBackend> Clone for AsyncContext<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: HeBackend> From<HomomorphicContext<B>> for AsyncContext<B> {
    fn from(context: HomomorphicContext<B>) -> Self {
        Self::new(context)
    }
}

impl<B: HeBackend> AsyncContext<B> {
    pub fn new(context: HomomorphicContext<B>) -> Self {
        Self { inner: Arc::new(context) }
    }

    /// The wrapped context, for the cheap synchronous accessors.
    pub fn context(&self) -> &HomomorphicContext<B> {
        &self.inner
    }

    async fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&HomomorphicContext<B>) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || job(inner.as_ref()))
            .await
            .map_err(|e| HeError::TaskFailed(e.to_string()))?
    }

    pub async fn encrypt(&self, value: i32) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.encrypt(value)).await
    }

    pub async fn decrypt(&self, ciphertext: B::Ciphertext) -> Result<i32> {
        self.run(move |ctx| ctx.decrypt(&ciphertext)).await
    }

    pub async fn negate(&self, ciphertext: B::Ciphertext) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.negate(&ciphertext)).await
    }

    pub async fn add(&self, a: B::Ciphertext, b: B::Ciphertext) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.add(&a, &b)).await
    }

    pub async fn sub(&self, a: B::Ciphertext, b: B::Ciphertext) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.sub(&a, &b)).await
    }

    pub async fn multiply(&self, a: B::Ciphertext, b: B::Ciphertext) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.multiply(&a, &b)).await
    }

    pub async fn square(&self, ciphertext: B::Ciphertext) -> Result<B::Ciphertext> {
        self.run(move |ctx| ctx.square(&ciphertext)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    #[tokio::test]
    async fn test_async_matches_sync() {
        let ctx = HomomorphicContext::create_default_with_backend(MockBackend).unwrap();
        let sync_result = {
            let u = ctx.encrypt(8).unwrap();
            let v = ctx.encrypt(-12).unwrap();
            let sum = ctx.add(&ctx.negate(&u).unwrap(), &v).unwrap();
            ctx.decrypt(&ctx.multiply(&sum, &v).unwrap()).unwrap()
        };

        let actx = AsyncContext::new(ctx);
        let u = actx.encrypt(8).await.unwrap();
        let v = actx.encrypt(-12).await.unwrap();
        let neg = actx.negate(u).await.unwrap();
        let sum = actx.add(neg, v.clone()).await.unwrap();
        let prod = actx.multiply(sum, v).await.unwrap();
        let out = actx.decrypt(prod).await.unwrap();

        assert_eq!(out, 240);
        assert_eq!(out, sync_result);
    }

    #[tokio::test]
    async fn test_async_errors_propagate() {
        let ctx = HomomorphicContext::create_default_with_backend(MockBackend).unwrap();
        let keyless = HomomorphicContext::with_params_and_backend(ctx.params().clone(), MockBackend);
        let actx = AsyncContext::from(keyless);
        assert!(matches!(actx.encrypt(1).await, Err(HeError::MissingKey("public"))));

        let ct = ctx.encrypt(3).unwrap();
        let clone = actx.clone();
        assert!(matches!(clone.square(ct).await, Ok(_)));
    }
}
