/// Read-through caching against the Redis [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background write with `$ttl` seconds to live, and
/// returns it. A failed cache read is logged and handled as a miss; errors from
/// `$block` are propagated.
///
/// # Example
/// ```rust,ignore
/// let vector: Vec<f32> = cached!(self.cache, key, 3600, async move {
///     self.inner.embed(text, TaskType::Query).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.get_from_cache(&$key).await {
            Ok(Some(cached)) => Ok(cached),
            result => {
                if let Err(e) = result {
                    ::tracing::warn!(key = %$key, error = %e, "Cache read failed, computing value");
                }
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
