use async_trait::async_trait;
use bson::{doc, DateTime};

use crate::auth::models::PlanType;
use crate::db::models::{Preferences, User};
use crate::error::AppError;

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn insert(&self, user: User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Look up by (already lowercased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn set_plan(
        &self,
        id: &str,
        plan: PlanType,
        expires_at: Option<DateTime>,
    ) -> Result<(), AppError>;

    async fn set_preferences(&self, id: &str, preferences: &Preferences) -> Result<(), AppError>;

    /// Atomically count one AI generation in `month`, starting the counter
    /// over when the stored month differs. Returns `false` without counting
    /// when the counter already reached `limit` (`None` is unlimited).
    async fn try_consume_ai_generation(
        &self,
        id: &str,
        month: &str,
        limit: Option<i64>,
    ) -> Result<bool, AppError>;

    /// Give back a generation counted in `month` that did not complete.
    async fn release_ai_generation(&self, id: &str, month: &str) -> Result<(), AppError>;

    async fn record_login(&self, id: &str, at: DateTime) -> Result<(), AppError>;
}

/// MongoDB implementation of the UserRepository.
pub struct MongoUserRepository {
    collection: mongodb::Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    async fn set_fields(&self, id: &str, fields: bson::Document) -> Result<(), AppError> {
        self.collection
            .update_one(doc! { "id": id }, doc! { "$set": fields })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Run a single-document update, reporting whether it matched.
    async fn update_matched(
        &self,
        filter: bson::Document,
        update: bson::Document,
    ) -> Result<bool, AppError> {
        let result = self
            .collection
            .update_one(filter, update)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.matched_count > 0)
    }
}

/// Whether a MongoDB error is a unique index violation.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(AppError::Conflict("Email already registered".into()))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.collection
            .find_one(doc! { "id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.collection
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_plan(
        &self,
        id: &str,
        plan: PlanType,
        expires_at: Option<DateTime>,
    ) -> Result<(), AppError> {
        let expires = expires_at.map(bson::Bson::DateTime).unwrap_or(bson::Bson::Null);
        self.set_fields(
            id,
            doc! { "plan_type": plan.to_string(), "pro_expires_at": expires },
        )
        .await
    }

    async fn set_preferences(&self, id: &str, preferences: &Preferences) -> Result<(), AppError> {
        let value =
            bson::to_bson(preferences).map_err(|e| AppError::Database(e.to_string()))?;
        self.set_fields(id, doc! { "preferences": value }).await
    }

    async fn try_consume_ai_generation(
        &self,
        id: &str,
        month: &str,
        limit: Option<i64>,
    ) -> Result<bool, AppError> {
        if limit.is_some_and(|l| l <= 0) {
            return Ok(false);
        }

        let mut same_month = doc! { "id": id, "ai_usage.month": month };
        if let Some(limit) = limit {
            same_month.insert("ai_usage.count", doc! { "$lt": limit });
        }
        let increment = doc! { "$inc": { "ai_usage.count": 1_i64 } };

        if self
            .update_matched(same_month.clone(), increment.clone())
            .await?
        {
            return Ok(true);
        }

        // Counter from an earlier month: only one request can start the new one.
        let rolled_over = self
            .update_matched(
                doc! { "id": id, "ai_usage.month": { "$ne": month } },
                doc! { "$set": { "ai_usage": { "month": month, "count": 1_i64 } } },
            )
            .await?;
        if rolled_over {
            return Ok(true);
        }

        // Another request rolled the month over in between.
        self.update_matched(same_month, increment).await
    }

    async fn release_ai_generation(&self, id: &str, month: &str) -> Result<(), AppError> {
        self.update_matched(
            doc! { "id": id, "ai_usage.month": month, "ai_usage.count": { "$gt": 0_i64 } },
            doc! { "$inc": { "ai_usage.count": -1_i64 } },
        )
        .await?;
        Ok(())
    }

    async fn record_login(&self, id: &str, at: DateTime) -> Result<(), AppError> {
        self.set_fields(id, doc! { "last_login_at": at }).await
    }
}
