use cucumber::World;
use fundaction_engine::{
    settlement_objects::SettlementOutcome,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    SettlementApi,
    SettlementError,
    SqliteDatabase,
};
use log::*;
use tokio::time::sleep;

#[derive(Default, Debug, World)]
pub struct FundActionWorld {
    pub system: Option<SettlementSystem>,
    pub last_result: Option<Result<SettlementOutcome, SettlementError>>,
}

#[derive(Debug)]
pub struct SettlementSystem {
    pub db_path: String,
    pub api: SettlementApi<SqliteDatabase>,
}

impl FundActionWorld {
    pub fn api(&self) -> &SettlementApi<SqliteDatabase> {
        &self.system.as_ref().expect("SettlementApi not initialised").api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn last_outcome(&self) -> &SettlementOutcome {
        match &self.last_result {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => panic!("The last notification failed: {e}"),
            None => panic!("No notification has been processed"),
        }
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let api = SettlementApi::new(db, Default::default());
        Self { db_path: url, api }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
