//! Upload of validation results to S3.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for uploaded objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str)
    -> Result<()>;
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the standard AWS environment.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await?;
        Ok(())
    }
}

fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

fn content_type(file_name: &str) -> &'static str {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("log") | Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Files under `dir`, recursing into subdirectories, in path order.
fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(collect_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Uploads every file under `dir` to `prefix`, keeping paths relative to
/// `dir`. With `gzip`, bodies are compressed and keys get a `.gz` suffix.
/// Returns the number of files uploaded.
#[tracing::instrument(skip(store), fields(bucket, prefix, dir = %dir.display(), gzip))]
pub async fn upload_directory(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    dir: &Path,
    gzip: bool,
) -> Result<usize> {
    let mut upload_count = 0;

    for path in collect_files(dir)? {
        let relative = path
            .strip_prefix(dir)
            .unwrap_or(path.as_path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let file_contents = std::fs::read(&path)?;

        let (body, key, mime) = if gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&file_contents)?;
            let compressed = encoder.finish()?;
            (
                compressed,
                object_key(prefix, &format!("{relative}.gz")),
                "application/gzip",
            )
        } else {
            (file_contents, object_key(prefix, &relative), content_type(&relative))
        };

        debug!(key = %key, bytes = body.len(), "Uploading");
        store
            .put(bucket, &key, body, mime)
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        upload_count += 1;
    }

    info!(upload_count, "S3 upload complete");
    Ok(upload_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<Vec<(String, String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put(
            &self,
            bucket: &str,
            key: &str,
            body: Vec<u8>,
            content_type: &str,
        ) -> Result<()> {
            self.objects.lock().unwrap().push((
                bucket.to_string(),
                key.to_string(),
                body,
                content_type.to_string(),
            ));
            Ok(())
        }
    }

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("", "a.json"), "a.json");
        assert_eq!(object_key("reports/", "a.json"), "reports/a.json");
        assert_eq!(object_key("/qw/bcv13/", "a.json"), "qw/bcv13/a.json");
    }

    #[tokio::test]
    async fn test_upload_directory_plain() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.validation_results.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.csv"), "x,y\n").unwrap();
        std::fs::create_dir(dir.path().join("plots")).unwrap();
        std::fs::write(dir.path().join("plots").join("HNZ.png"), [0u8, 1, 2]).unwrap();

        let store = MemoryStore::default();
        let count = upload_directory(&store, "bucket", "reports", dir.path(), false)
            .await
            .unwrap();

        assert_eq!(count, 3);
        let objects = store.objects.lock().unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.1.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "reports/a.csv",
                "reports/b.validation_results.json",
                "reports/plots/HNZ.png"
            ]
        );
        assert_eq!(objects[0].3, "text/csv");
        assert_eq!(objects[1].2, b"{}");
        assert_eq!(objects[1].3, "application/json");
        assert_eq!(objects[2].3, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_upload_directory_gzip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("r.json"), "{\"passed\":true}").unwrap();

        let store = MemoryStore::default();
        upload_directory(&store, "bucket", "", dir.path(), true)
            .await
            .unwrap();

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects[0].1, "r.json.gz");
        let mut decoded = String::new();
        GzDecoder::new(objects[0].2.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "{\"passed\":true}");
    }
}
