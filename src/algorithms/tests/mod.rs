// src/algorithms/tests/mod.rs



/// Common tests for all algorithms
#[cfg(test)]
mod common_tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::algorithms::{AlgorithmKind, RateLimiter};
    use crate::config::LimiterOptions;
    use crate::storage::CounterStore;
    use crate::test_utils::memory_store;

    fn options() -> LimiterOptions {
        LimiterOptions {
            rate: 5,
            burst: 5,
            window_size: Duration::from_secs(1),
            key_prefix: "common:".to_string(),
        }
    }

    /// Test consistent behavior across all algorithm implementations
    #[tokio::test]
    async fn test_algorithm_trait_consistency() {
        for kind in [AlgorithmKind::TokenBucket, AlgorithmKind::LeakyBucket] {
            let limiter = kind.build(memory_store(), options());
            let name = kind.name();

            for i in 0..5 {
                assert!(
                    limiter.allow(name).await.unwrap(),
                    "{}: Request {} should be allowed",
                    name,
                    i
                );
            }
            assert!(
                !limiter.allow(name).await.unwrap(),
                "{}: 6th request should be denied",
                name
            );

            let other = format!("{}_other", name);
            assert!(
                limiter.allow(&other).await.unwrap(),
                "{}: Different key should be allowed",
                name
            );

            limiter.reset(name).await.unwrap();
            assert!(
                limiter.allow(name).await.unwrap(),
                "{}: Request after reset should be allowed",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_limiters_share_one_store_through_the_prefix() {
        let store = Arc::new(memory_store());
        let token = AlgorithmKind::TokenBucket.build(Arc::clone(&store), options());
        let leaky = AlgorithmKind::LeakyBucket.build(Arc::clone(&store), options());

        // same prefix, same counter
        for _ in 0..3 {
            assert!(token.allow("shared").await.unwrap());
        }
        for _ in 0..2 {
            assert!(leaky.allow("shared").await.unwrap());
        }
        assert!(!token.allow("shared").await.unwrap());
        assert!(!leaky.allow("shared").await.unwrap());
        assert_eq!(store.get("common:shared").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_allow_n_zero_only_checks_the_ceiling() {
        for kind in [AlgorithmKind::TokenBucket, AlgorithmKind::LeakyBucket] {
            let store = Arc::new(memory_store());
            let limiter = kind.build(Arc::clone(&store), options());

            assert!(limiter.allow_n("peek", 0).await.unwrap());
            assert!(limiter.allow_n("peek", 5).await.unwrap());
            assert!(
                limiter.allow_n("peek", 0).await.unwrap(),
                "{}: a zero-unit request at the ceiling is still within it",
                kind
            );
            assert_eq!(store.get("common:peek").await.unwrap(), 5);
        }
    }

    #[test]
    fn test_algorithm_kind_parsing() {
        assert_eq!(
            AlgorithmKind::from_str("token").unwrap(),
            AlgorithmKind::TokenBucket
        );
        assert_eq!(
            AlgorithmKind::from_str("Leaky_Bucket").unwrap(),
            AlgorithmKind::LeakyBucket
        );
        assert!(AlgorithmKind::from_str("sliding_window").is_err());
        assert_eq!(AlgorithmKind::LeakyBucket.to_string(), "leaky_bucket");
    }
}
