use tokio::task;

use crate::error::AppError;

/// Hash a password with bcrypt at the given cost.
///
/// Runs on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored bcrypt hash on the blocking pool.
///
/// A malformed hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let outcome = task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(match outcome {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!("Password verification failed: {e}");
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("testpass123", 4).await.unwrap();
        assert_ne!(hash, "testpass123");
        assert!(verify_password("testpass123", &hash).await.unwrap());
        assert!(!verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        assert!(!verify_password("testpass123", "not-a-bcrypt-hash").await.unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_runtime_thread_free() {
        let hashing = tokio::spawn(hash_password("testpass123", 10));
        // With a single runtime thread this only runs while bcrypt is off-thread
        let ticker = tokio::spawn(async { tokio::task::yield_now().await });

        ticker.await.unwrap();
        assert!(!hashing.is_finished());
        let hash = hashing.await.unwrap().unwrap();
        assert!(verify_password("testpass123", &hash).await.unwrap());
    }
}
