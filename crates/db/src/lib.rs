pub mod entities;
pub mod events;
pub mod models;
pub mod types;

pub use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};

pub type DbPool = DatabaseConnection;

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connect and bring the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let pool = sea_orm::Database::connect(database_url).await?;
        <db_migration::Migrator as sea_orm_migration::MigratorTrait>::up(&pool, None).await?;
        Ok(DBService { pool })
    }
}
