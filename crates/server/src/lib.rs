use std::sync::Arc;

use db::DBService;
use services::notify::{Mailer, TracingMailer};

pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    db: DBService,
    mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            mailer: Arc::new(TracingMailer),
        }
    }

    pub fn with_mailer(db: DBService, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }
}
