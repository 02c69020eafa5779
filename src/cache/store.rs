//! The local data cache: fingerprint in, path to a parquet file out.
//!
//! On a miss the store fetches the raw CSV from the repository, converts it
//! to parquet and records it in a JSON index carrying per-entry sizes and
//! last-access times. After every insert, least-recently-used entries are
//! evicted until the cache fits its configured budget again.

use crate::cache::error::CacheError;
use crate::cache::fingerprint::Fingerprint;
use crate::repository::ResourceRepository;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::{fs, task};
use tracing::{debug, info, warn};

const INDEX_FILE_NAME: &str = "cache_index.json";

/// One cached raw data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub file_name: String,
    pub size_bytes: u64,
    pub last_access: DateTime<Utc>,
}

pub struct CacheStore {
    root: PathBuf,
    max_size_bytes: Option<u64>,
    index: Mutex<HashMap<String, CacheEntry>>,
    /// Per-fingerprint locks so a fingerprint is fetched at most once even
    /// when requested concurrently.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheStore {
    /// Opens (or creates) a cache directory and loads its index. Index rows
    /// whose file disappeared are dropped; parquet files missing from the
    /// index are removed so the size accounting stays truthful.
    pub async fn open(root: &Path, max_size_bytes: Option<u64>) -> Result<Self, CacheError> {
        fs::create_dir_all(root)
            .await
            .map_err(|e| CacheError::DirCreation(root.to_path_buf(), e))?;

        let index_path = root.join(INDEX_FILE_NAME);
        let mut index: HashMap<String, CacheEntry> = if fs::metadata(&index_path).await.is_ok() {
            let bytes = fs::read(&index_path)
                .await
                .map_err(|e| CacheError::IndexRead(index_path.clone(), e))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| CacheError::IndexDecode(index_path.clone(), e.to_string()))?
        } else {
            HashMap::new()
        };

        let mut stale: Vec<String> = Vec::new();
        for (key, entry) in &index {
            if fs::metadata(root.join(&entry.file_name)).await.is_err() {
                stale.push(key.clone());
            }
        }
        for key in stale {
            warn!("dropping cache index row for missing file {key}");
            index.remove(&key);
        }

        let mut dir = fs::read_dir(root)
            .await
            .map_err(|e| CacheError::IndexRead(root.to_path_buf(), e))?;
        loop {
            let next = dir
                .next_entry()
                .await
                .map_err(|e| CacheError::IndexRead(root.to_path_buf(), e))?;
            let Some(dir_entry) = next else { break };
            let name = dir_entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".parquet") && !index.contains_key(&name) {
                warn!("removing orphaned cache file {name}");
                let path = dir_entry.path();
                fs::remove_file(&path)
                    .await
                    .map_err(|e| CacheError::EntryDelete(path, e))?;
            }
        }

        let store = Self {
            root: root.to_path_buf(),
            max_size_bytes,
            index: Mutex::new(index),
            inflight: Mutex::new(HashMap::new()),
        };
        store.persist_index(&*store.index.lock().await).await?;
        Ok(store)
    }

    /// Resolves a fingerprint to the path of its cached parquet file,
    /// fetching from `repository` on a miss.
    pub async fn resolve(
        &self,
        fingerprint: &Fingerprint,
        repository: &dyn ResourceRepository,
    ) -> Result<PathBuf, CacheError> {
        let key = fingerprint.cache_file_name();

        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _fetch_guard = key_lock.lock().await;

        {
            let mut index = self.index.lock().await;
            if let Some(entry) = index.get_mut(&key) {
                let path = self.root.join(&key);
                if fs::metadata(&path).await.is_ok() {
                    debug!("cache hit for {key}");
                    entry.last_access = Utc::now();
                    self.persist_index(&index).await?;
                    return Ok(path);
                }
                warn!("cache index row for {key} had no file; refetching");
                index.remove(&key);
            }
        }

        info!("cache miss for {key}; fetching from repository");
        let bytes = repository.fetch_series(fingerprint).await?;
        let frame = csv_to_frame(bytes, fingerprint).await?;

        let path = self.root.join(&key);
        write_parquet(frame, &path).await?;
        let size_bytes = fs::metadata(&path)
            .await
            .map_err(|e| CacheError::EntryMetadata(path.clone(), e))?
            .len();

        if let Some(budget) = self.max_size_bytes {
            if size_bytes > budget {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| CacheError::EntryDelete(path.clone(), e))?;
                return Err(CacheError::CacheFull {
                    needed_bytes: size_bytes,
                    budget_bytes: budget,
                });
            }
        }

        let mut index = self.index.lock().await;
        index.insert(
            key.clone(),
            CacheEntry {
                fingerprint: fingerprint.clone(),
                file_name: key.clone(),
                size_bytes,
                last_access: Utc::now(),
            },
        );
        self.evict_locked(&mut index).await?;
        self.persist_index(&index).await?;
        Ok(path)
    }

    /// Total size of all cached data files in bytes.
    pub async fn size_bytes(&self) -> u64 {
        total_bytes(&*self.index.lock().await)
    }

    /// Number of cached entries.
    pub async fn entry_count(&self) -> usize {
        self.index.lock().await.len()
    }

    pub fn budget_bytes(&self) -> Option<u64> {
        self.max_size_bytes
    }

    async fn evict_locked(
        &self,
        index: &mut HashMap<String, CacheEntry>,
    ) -> Result<(), CacheError> {
        let Some(budget) = self.max_size_bytes else {
            return Ok(());
        };
        while total_bytes(index) > budget {
            let oldest = index
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else {
                break;
            };
            if let Some(entry) = index.remove(&key) {
                let path = self.root.join(&entry.file_name);
                match fs::remove_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(CacheError::EntryDelete(path, e)),
                }
                info!("evicted {key} ({} bytes)", entry.size_bytes);
            }
        }
        Ok(())
    }

    async fn persist_index(&self, index: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        let index_path = self.root.join(INDEX_FILE_NAME);
        let json = serde_json::to_vec_pretty(index)
            .map_err(|e| CacheError::IndexDecode(index_path.clone(), e.to_string()))?;
        fs::write(&index_path, json)
            .await
            .map_err(|e| CacheError::IndexWrite(index_path, e))
    }
}

fn total_bytes(index: &HashMap<String, CacheEntry>) -> u64 {
    index.values().map(|entry| entry.size_bytes).sum()
}

/// Parses raw headerless CSV bytes into a DataFrame with a millisecond
/// `datetime` column and float value columns, using a blocking task.
async fn csv_to_frame(bytes: Vec<u8>, fingerprint: &Fingerprint) -> Result<DataFrame, CacheError> {
    let file = fingerprint.cache_file_name();
    let mut column_names: Vec<&'static str> = vec!["timestamp"];
    column_names.extend(
        fingerprint
            .kind
            .schema_column_names(fingerprint.dataset),
    );

    task::spawn_blocking(move || {
        let mut temp_file = NamedTempFile::new().map_err(|e| CacheError::CsvReadIo {
            file: file.clone(),
            source: e,
        })?;
        temp_file
            .write_all(&bytes)
            .map_err(|e| CacheError::CsvReadIo {
                file: file.clone(),
                source: e,
            })?;
        temp_file.flush().map_err(|e| CacheError::CsvReadIo {
            file: file.clone(),
            source: e,
        })?;

        let mut df = CsvReadOptions::default()
            .with_has_header(false)
            .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
            .map_err(|e| CacheError::CsvReadPolars {
                file: file.clone(),
                source: e,
            })?
            .finish()
            .map_err(|e| CacheError::CsvReadPolars {
                file: file.clone(),
                source: e,
            })?;

        if df.width() != column_names.len() {
            return Err(CacheError::SchemaMismatch {
                file,
                expected: column_names.len(),
                found: df.width(),
            });
        }

        df.set_column_names(column_names.iter().copied())
            .map_err(|e| CacheError::CsvReadPolars {
                file: file.clone(),
                source: e,
            })?;

        let mut exprs: Vec<Expr> = vec![(col("timestamp") * lit(1000i64))
            .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
            .alias("datetime")];
        for name in &column_names[1..] {
            exprs.push(col(*name).cast(DataType::Float64));
        }

        df.lazy()
            .with_columns(exprs)
            .collect()
            .map_err(|e| CacheError::CsvReadPolars { file, source: e })
    })
    .await?
}

/// Writes a DataFrame to a parquet file using a blocking task.
async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), CacheError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path_buf)
            .map_err(|e| CacheError::ParquetWriteIo(path_buf.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut df)
            .map_err(|e| CacheError::ParquetWritePolars(path_buf, e))?;
        Ok::<(), CacheError>(())
    })
    .await??;
    Ok(())
}
