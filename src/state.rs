use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::db::models::{Comment, Review};
use crate::likes::LikeService;
use crate::resource::ResourceService;
use crate::store::{
    MovieCatalog, SqliteCommentStore, SqliteLikeSet, SqliteMovieCatalog, SqliteReviewStore,
    SqliteUserDirectory, Store, UserDirectory,
};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub movies: Arc<dyn MovieCatalog>,
    pub reviews: ResourceService<Review>,
    pub comments: ResourceService<Comment>,
    pub likes: LikeService,
}

impl AppState {
    /// Wire the SQLite-backed stores onto one pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let reads = config.access.read_policy;
        let review_store: Arc<dyn Store<Review>> = Arc::new(SqliteReviewStore::new(db.clone()));

        Self {
            users: Arc::new(SqliteUserDirectory::new(db.clone())),
            movies: Arc::new(SqliteMovieCatalog::new(db.clone())),
            reviews: ResourceService::new(review_store.clone(), reads),
            comments: ResourceService::new(Arc::new(SqliteCommentStore::new(db.clone())), reads),
            likes: LikeService::new(Arc::new(SqliteLikeSet::new(db.clone())), review_store),
            db,
            config,
        }
    }
}
