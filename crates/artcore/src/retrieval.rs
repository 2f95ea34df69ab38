//! Retrieval pipeline: image listings and downloads into the scratch directory

use itertools::Itertools;
use std::path::{Path, PathBuf};

use crate::core::error::AppResult;
use crate::naming::{is_image_key, scratch_path};
use crate::storage::{ImageStore, StoredObject};

/// Lists image objects in `bucket`, in the order storage returned them.
///
/// `prefix` restricts the listing; `None` or an empty prefix covers the
/// whole bucket.
pub async fn list_images(store: &dyn ImageStore, bucket: &str, prefix: Option<&str>) -> AppResult<Vec<StoredObject>> {
    let objects = store.list(bucket, prefix).await?;
    let total = objects.len();
    let images: Vec<StoredObject> = objects.into_iter().filter(|o| is_image_key(&o.key)).collect();
    log::debug!("Listing {} (prefix {:?}): {} of {} objects are images", bucket, prefix, images.len(), total);
    Ok(images)
}

/// The `limit` most recently modified objects, newest first.
///
/// Objects with equal timestamps keep their listing order.
pub fn most_recent(objects: Vec<StoredObject>, limit: usize) -> Vec<StoredObject> {
    objects
        .into_iter()
        .sorted_by(|a, b| b.last_modified.cmp(&a.last_modified))
        .take(limit)
        .collect()
}

/// Downloads `bucket/key` under `scratch_root` and returns the local path.
///
/// The file is left in place after the caller sends it.
pub async fn download_image(store: &dyn ImageStore, bucket: &str, key: &str, scratch_root: &Path) -> AppResult<PathBuf> {
    let dest = scratch_path(scratch_root, key);
    let size = store.download_to_file(bucket, key, &dest).await?;
    log::info!("Downloaded {}/{} to {} ({} bytes)", bucket, key, dest.display(), size);
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn object(key: &str, minute: u32) -> StoredObject {
        StoredObject {
            key: key.to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            size: 1,
        }
    }

    #[test]
    fn test_most_recent_orders_and_truncates() {
        let objects = (0..15).map(|i| object(&format!("mj/{i}.png"), i)).collect();
        let recent = most_recent(objects, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].key, "mj/14.png");
        assert_eq!(recent[9].key, "mj/5.png");
    }

    #[test]
    fn test_most_recent_stable_for_equal_times() {
        let recent = most_recent(vec![object("a.png", 1), object("b.png", 1)], 10);
        let keys: Vec<_> = recent.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn test_list_images_filters_extensions() {
        let store = MemoryStore::new();
        let t = Utc::now();
        for key in ["mj/a.jpg", "mj/b.jpeg", "mj/c.png", "mj/d.gif", "mj/E.PNG", "mj/notes.txt"] {
            store.insert("art", key, b"x".to_vec(), t);
        }

        let images = list_images(&store, "art", None).await.unwrap();
        let keys: Vec<_> = images.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["mj/a.jpg", "mj/b.jpeg", "mj/c.png"]);
    }

    #[tokio::test]
    async fn test_download_image_into_scratch() {
        let store = MemoryStore::new();
        store.insert("art", "mj/a.png", b"png".to_vec(), Utc::now());
        let dir = tempfile::tempdir().unwrap();

        let path = download_image(&store, "art", "mj/a.png", dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("mj/a.png"));
        assert_eq!(std::fs::read(path).unwrap(), b"png");
    }
}
