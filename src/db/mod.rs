use log::{error, info};
use mongodb::{Client, Database};
use rocket::fairing::AdHoc;
use std::sync::Arc;

use crate::config::Config;
use crate::lifecycle::TaskLifecycle;
use crate::store::mongo::{
    self, MongoPetDirectory, MongoReviewStore, MongoTaskStore, MongoUserRatings,
};

/// Connects to MongoDB and puts the lifecycle engine into managed state.
/// Launch is aborted when the database is unreachable.
pub fn init() -> AdHoc {
    AdHoc::try_on_ignite("MongoDB", |rocket| async {
        let database = match connect().await {
            Ok(database) => {
                info!("✓ MongoDB connected successfully");
                database
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                return Err(rocket);
            }
        };

        if let Err(e) = mongo::ensure_indexes(&database).await {
            error!("✗ Failed to create MongoDB indexes: {}", e);
            return Err(rocket);
        }

        Ok(rocket.manage(engine(&database)))
    })
}

async fn connect() -> Result<Database, mongodb::error::Error> {
    let uri = Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! {"ping": 1}, None)
        .await?;

    Ok(client.database(&Config::database_name()))
}

fn engine(database: &Database) -> TaskLifecycle {
    TaskLifecycle::new(
        Arc::new(MongoTaskStore::new(database)),
        Arc::new(MongoReviewStore::new(database)),
        Arc::new(MongoUserRatings::new(database)),
        Arc::new(MongoPetDirectory::new(database)),
    )
    .with_cas_retries(Config::cas_retries())
}
