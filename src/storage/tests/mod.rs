// src/storage/tests/mod.rs


// Contract checks that every counter store must pass
pub(crate) mod common {
    use futures::future::join_all;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::Result;
    use crate::storage::CounterStore;

    const WINDOW: Duration = Duration::from_secs(30);

    pub async fn test_increment_get_reset<S: CounterStore>(storage: &S, prefix: &str) -> Result<()> {
        let key = format!("{}counter", prefix);
        storage.reset(&key).await?;

        assert_eq!(storage.get(&key).await?, 0, "absent key reads as zero");

        assert_eq!(storage.increment(&key, 1, WINDOW).await?, 1);
        assert_eq!(storage.increment(&key, 3, WINDOW).await?, 4);
        assert_eq!(storage.increment(&key, -2, WINDOW).await?, 2);
        assert_eq!(storage.get(&key).await?, 2);

        storage.reset(&key).await?;
        assert_eq!(storage.get(&key).await?, 0);

        Ok(())
    }

    pub async fn test_reset_is_idempotent<S: CounterStore>(storage: &S, prefix: &str) -> Result<()> {
        let key = format!("{}never_written", prefix);

        storage.reset(&key).await?;
        storage.reset(&key).await?;
        assert_eq!(storage.get(&key).await?, 0);

        Ok(())
    }

    pub async fn test_negative_first_increment<S: CounterStore>(
        storage: &S,
        prefix: &str,
    ) -> Result<()> {
        let key = format!("{}starts_negative", prefix);
        storage.reset(&key).await?;

        assert_eq!(storage.increment(&key, -3, WINDOW).await?, -3);
        assert_eq!(storage.get(&key).await?, -3);

        storage.reset(&key).await?;
        Ok(())
    }

    pub async fn test_keys_are_independent<S: CounterStore>(
        storage: &S,
        prefix: &str,
    ) -> Result<()> {
        let a = format!("{}user_a", prefix);
        let b = format!("{}user_b", prefix);
        storage.reset(&a).await?;
        storage.reset(&b).await?;

        storage.increment(&a, 5, WINDOW).await?;
        storage.increment(&b, 1, WINDOW).await?;
        storage.reset(&a).await?;

        assert_eq!(storage.get(&a).await?, 0);
        assert_eq!(storage.get(&b).await?, 1);

        storage.reset(&b).await?;
        Ok(())
    }

    pub async fn test_concurrent_increments_lose_nothing<S>(
        storage: Arc<S>,
        prefix: &str,
    ) -> Result<()>
    where
        S: CounterStore + 'static,
    {
        let key = format!("{}contended", prefix);
        storage.reset(&key).await?;

        let tasks = (0..50).map(|_| {
            let storage = Arc::clone(&storage);
            let key = key.clone();
            tokio::spawn(async move { storage.increment(&key, 1, WINDOW).await })
        });

        let mut seen = Vec::new();
        for result in join_all(tasks).await {
            seen.push(result.expect("task panicked")?);
        }
        seen.sort_unstable();

        // every increment observed a distinct intermediate value
        assert_eq!(seen, (1..=50).collect::<Vec<i64>>());
        assert_eq!(storage.get(&key).await?, 50);

        storage.reset(&key).await?;
        Ok(())
    }
}
