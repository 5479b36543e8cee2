use std::sync::Arc;

use voyage_planner::TravelPlanner;
use voyage_store::RedisClient;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TravelPlanner>,
    /// Rate limiting is skipped when no redis is configured
    pub redis: Option<Arc<RedisClient>>,
}
