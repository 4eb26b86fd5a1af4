use crate::utils::cpf;
use anyhow::{anyhow, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected capacity and false-positive rate.
/// Tune these based on real client counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static CPF_FILTER: Lazy<RwLock<CuckooFilter<String>>> = Lazy::new(|| {
    RwLock::new(CuckooFilter::new(
        FILTER_CAPACITY,
        FALSE_POSITIVE_RATE,
    ))
});

#[inline]
fn normalize(value: &str) -> String {
    cpf::normalize(value)
}

/// Check if a CPF might already be registered (false positives possible)
pub fn might_exist(value: &str) -> bool {
    let value = normalize(value);
    CPF_FILTER
        .read()
        .expect("cpf filter poisoned")
        .contains(&value)
}

/// Insert a single CPF into the filter
pub fn insert(value: &str) {
    let value = normalize(value);
    CPF_FILTER
        .write()
        .expect("cpf filter poisoned")
        .add(&value);
}

/// Remove a CPF from the filter (client deleted or CPF corrected)
pub fn remove(value: &str) {
    let value = normalize(value);
    CPF_FILTER
        .write()
        .expect("cpf filter poisoned")
        .remove(&value);
}

/// Warm up the CPF filter using streaming + batching
pub async fn warmup_cpf_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream =
        sqlx::query_as::<_, (String,)>("SELECT cpf FROM clients").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (value,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&value));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("CPF filter warmup complete: {} clients", total);
    Ok(())
}

/// Insert a batch of normalized CPFs
fn insert_batch(values: &[String]) {
    let mut filter = CPF_FILTER
        .write()
        .expect("cpf filter poisoned");

    for value in values {
        filter.add(value);
    }
}
