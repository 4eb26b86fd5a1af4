use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// true  => CPF is TAKEN
/// false => CPF is AVAILABLE (usually we store only taken)
pub static CPF_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000) // tune based on memory
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single CPF as taken
pub async fn mark_taken(cpf: &str) {
    CPF_CACHE.insert(cpf.to_string(), true).await;
}

/// Forget a CPF (client deleted or CPF corrected)
pub async fn mark_free(cpf: &str) {
    CPF_CACHE.invalidate(&cpf.to_string()).await;
}

/// Check if a CPF is taken
pub async fn is_taken(cpf: &str) -> bool {
    CPF_CACHE.get(&cpf.to_string()).await.unwrap_or(false)
}

/// Batch mark CPFs as taken
async fn batch_mark(cpfs: &[String]) {
    let futures: Vec<_> = cpfs
        .iter()
        .map(|c| CPF_CACHE.insert(c.clone(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load only RECENT client CPFs into the in-memory cache (batched)
pub async fn warmup_cpf_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT cpf
        FROM clients
        WHERE created_at >= NOW() - INTERVAL ? DAY
        ORDER BY created_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (cpf,) = row?;
        batch.push(cpf);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_mark(&batch).await;
            batch.clear();
        }
    }

    // Insert any remaining CPFs
    if !batch.is_empty() {
        batch_mark(&batch).await;
    }

    log::info!(
        "CPF cache warmup complete: {} recent clients (last {} days)",
        total_count,
        days
    );

    Ok(())
}
