use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tokio::sync::Mutex;

use crate::auth::registration::PendingRegistrationStore;
use crate::config::Config;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub pending: Arc<Mutex<PendingRegistrationStore>>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let pending = PendingRegistrationStore::new(config.auth.verification_minutes);
        Self {
            db,
            config,
            pending: Arc::new(Mutex::new(pending)),
        }
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.config.is_production()
    }
}
