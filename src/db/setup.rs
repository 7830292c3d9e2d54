use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use crate::error::AppError;

/// Connect to MongoDB and return the application database.
pub async fn connect(uri: &str, database: &str) -> Result<mongodb::Database, AppError> {
    let client = mongodb::Client::with_uri_str(uri)
        .await
        .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {e}")))?;

    Ok(client.database(database))
}

/// Create the indexes the repositories rely on. Idempotent.
pub async fn ensure_indexes(db: &mongodb::Database) -> Result<(), AppError> {
    let unique = IndexOptions::builder().unique(true).build();

    db.collection::<bson::Document>("users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;
    db.collection::<bson::Document>("users")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<bson::Document>("items")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
        )
        .await?;
    db.collection::<bson::Document>("items")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(unique.clone())
                .build(),
        )
        .await?;

    db.collection::<bson::Document>("collections")
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": 1 })
                .build(),
        )
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}
