// Role → status policy
//
// Assigning a staff member with an operationally significant role moves the
// booking to that role's status. The mapping lives in `role_status_policies`
// and is served through a time-based cache.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::BookingResult;
use super::models::BookingStatus;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Role name → status lookup, case-insensitive on the role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleStatusPolicy {
    by_role: HashMap<String, BookingStatus>,
}

impl RoleStatusPolicy {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, BookingStatus)>,
        S: AsRef<str>,
    {
        Self {
            by_role: entries
                .into_iter()
                .map(|(role, status)| (role.as_ref().trim().to_lowercase(), status))
                .collect(),
        }
    }

    pub fn status_for(&self, role: &str) -> Option<BookingStatus> {
        self.by_role.get(&role.trim().to_lowercase()).copied()
    }
}

impl Default for RoleStatusPolicy {
    fn default() -> Self {
        Self::from_entries([
            ("Phlebo", BookingStatus::FieldAgentAssigned),
            ("Root Manager", BookingStatus::RootManager),
            ("Health Manager", BookingStatus::HealthManagerAssigned),
            ("Dietitian", BookingStatus::DietitianAssigned),
        ])
    }
}

/// Where the policy rows come from
#[async_trait]
pub trait RoleStatusPolicySource: Send + Sync {
    async fn load(&self) -> BookingResult<Vec<(String, BookingStatus)>>;
}

pub struct PgRoleStatusPolicySource {
    pool: PgPool,
}

impl PgRoleStatusPolicySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStatusPolicySource for PgRoleStatusPolicySource {
    async fn load(&self) -> BookingResult<Vec<(String, BookingStatus)>> {
        let rows = sqlx::query_as::<_, (String, BookingStatus)>(
            "SELECT role_name, status FROM role_status_policies",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

struct CachedPolicy {
    policy: Arc<RoleStatusPolicy>,
    loaded_at: Instant,
}

/// Policy source fronted by a TTL cache; an empty table falls back to the default seeds
pub struct CachedRolePolicy {
    source: Arc<dyn RoleStatusPolicySource>,
    cache: RwLock<Option<CachedPolicy>>,
    ttl: Duration,
}

impl CachedRolePolicy {
    pub fn new(source: Arc<dyn RoleStatusPolicySource>) -> Self {
        Self::with_ttl(source, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(source: Arc<dyn RoleStatusPolicySource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            ttl,
        }
    }

    pub async fn current(&self) -> BookingResult<Arc<RoleStatusPolicy>> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.loaded_at.elapsed() <= self.ttl {
                    return Ok(cached.policy.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // another task may have refreshed while we waited for the write lock
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() <= self.ttl {
                return Ok(cached.policy.clone());
            }
        }

        let rows = self.source.load().await?;
        let policy = if rows.is_empty() {
            RoleStatusPolicy::default()
        } else {
            RoleStatusPolicy::from_entries(rows)
        };
        debug!("Loaded role status policy with {} roles", policy.by_role.len());

        let policy = Arc::new(policy);
        *cache = Some(CachedPolicy {
            policy: policy.clone(),
            loaded_at: Instant::now(),
        });

        Ok(policy)
    }
}
