//! Redis read-through cache for templates and locations.
//!
//! Failures are logged and treated as misses so lookups fall back to Postgres.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::db;
use crate::domain::{Location, Template};

/// Redis cache client with connection pooling.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    /// Create a new Redis cache connection.
    pub async fn new(redis_url: &str, ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            conn,
            ttl: Duration::from_secs(ttl_seconds),
        })
    }

    /// Get a value from cache.
    #[instrument(skip(self), fields(cache_hit))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => {
                match serde_json::from_str(&data) {
                    Ok(value) => {
                        debug!(key = key, "Cache hit");
                        tracing::Span::current().record("cache_hit", true);
                        Some(value)
                    }
                    Err(e) => {
                        warn!(key = key, error = %e, "Failed to deserialize cached value");
                        tracing::Span::current().record("cache_hit", false);
                        None
                    }
                }
            }
            Ok(None) => {
                debug!(key = key, "Cache miss");
                tracing::Span::current().record("cache_hit", false);
                None
            }
            Err(e) => {
                error!(key = key, error = %e, "Redis get error");
                tracing::Span::current().record("cache_hit", false);
                None
            }
        }
    }

    /// Set a value in cache with the default TTL.
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut conn = self.conn.clone();

        let data = serde_json::to_string(value)
            .context("Failed to serialize value for cache")?;

        conn.set_ex::<_, _, ()>(key, data, self.ttl.as_secs())
            .await
            .context("Failed to set cache value")?;

        debug!(key = key, ttl_secs = self.ttl.as_secs(), "Cached value");
        Ok(())
    }

    /// Delete a specific key from cache.
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let deleted: i32 = conn.del(key).await.context("Failed to delete cache key")?;

        debug!(key = key, deleted = deleted > 0, "Cache delete");
        Ok(deleted > 0)
    }

    /// Delete several keys in one round trip.
    #[instrument(skip(self))]
    pub async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let deleted: i32 = conn.del(keys).await.context("Failed to delete cache keys")?;

        debug!(keys = keys.len(), deleted = deleted, "Cache multi delete");
        Ok(deleted as usize)
    }

    /// Check if Redis is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

impl RedisCache {
    /// Template by id, served from cache when possible
    pub async fn template(&self, pool: &PgPool, id: Uuid) -> Result<Option<Template>, sqlx::Error> {
        let key = keys::template(id);
        if let Some(template) = self.get::<Template>(&key).await {
            return Ok(Some(template));
        }

        let template = db::templates::fetch(pool, id).await?;
        if let Some(template) = &template {
            if let Err(e) = self.set(&key, template).await {
                warn!(key = %key, error = %e, "Failed to cache template");
            }
        }
        Ok(template)
    }

    /// Location by case-insensitive name, served from cache when possible
    pub async fn location_by_name(
        &self,
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<Location>, sqlx::Error> {
        let key = keys::location(name);
        if let Some(location) = self.get::<Location>(&key).await {
            return Ok(Some(location));
        }

        let location = db::locations::fetch_by_name(pool, name).await?;
        if let Some(location) = &location {
            if let Err(e) = self.set(&key, location).await {
                warn!(key = %key, error = %e, "Failed to cache location");
            }
        }
        Ok(location)
    }

    pub async fn invalidate_template(&self, id: Uuid) {
        if let Err(e) = self.delete(&keys::template(id)).await {
            warn!(template_id = %id, error = %e, "Failed to invalidate template cache");
        }
    }

    /// Drop the cached entries for the given location names.
    ///
    /// A rename must pass both the old and the new name.
    pub async fn invalidate_locations(&self, names: &[&str]) {
        if let Err(e) = self.delete_many(&keys::locations(names)).await {
            warn!(error = %e, "Failed to invalidate location cache");
        }
    }
}

/// Cache key builders for consistent key formats.
pub mod keys {
    use uuid::Uuid;

    /// Template cache key
    pub fn template(template_id: Uuid) -> String {
        format!("template:{}", template_id)
    }

    /// Location cache key; names are matched case-insensitively
    pub fn location(name: &str) -> String {
        format!("location:name:{}", name.trim().to_lowercase())
    }

    /// Distinct location keys for a set of names
    pub fn locations(names: &[&str]) -> Vec<String> {
        let mut keys: Vec<String> = names.iter().map(|name| location(name)).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn location_keys_ignore_case_and_padding() {
            assert_eq!(location(" Cebu City "), location("cebu city"));
            assert!(location("Manila").starts_with("location:name:"));
        }

        #[test]
        fn rename_invalidates_old_and_new_name() {
            let keys = locations(&["Cebu", "Cebu City"]);
            assert_eq!(keys.len(), 2);
            assert!(keys.contains(&location("cebu")));
            assert!(keys.contains(&location("cebu city")));
        }

        #[test]
        fn case_only_rename_yields_one_key() {
            assert_eq!(locations(&["Davao", " DAVAO "]), vec![location("davao")]);
        }
    }
}
