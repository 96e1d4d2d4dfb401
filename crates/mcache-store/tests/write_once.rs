//! Concurrent duplicate writes against a shared store.

use std::sync::Arc;

use mcache_core::{sha256_digest, CacheTag, Identity, MediaType};
use mcache_store::{ContentAddressedStore, WriteOutcome};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_writes_create_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let cas = Arc::new(ContentAddressedStore::new(dir.path()));
    let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let id = Identity::new(sha256_digest(&payload), MediaType::Png);

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let cas = Arc::clone(&cas);
        let payload = payload.clone();
        tasks.push(tokio::spawn(async move {
            cas.write(&id, &CacheTag::primary(), &payload).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == WriteOutcome::Created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let stored = cas.read(&id, &CacheTag::primary()).await.unwrap().unwrap();
    assert_eq!(stored.len(), payload.len());
    assert!(cas.verify(&id).await.unwrap());

    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .ends_with(".tmp")
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_of_different_tags_do_not_interfere() {
    let dir = tempfile::tempdir().unwrap();
    let cas = ContentAddressedStore::new(dir.path());
    let id = Identity::new(sha256_digest(b"raster"), MediaType::Jpg);
    let tags = [
        CacheTag::primary(),
        CacheTag::format(MediaType::Webp),
        CacheTag::format(MediaType::Jpg),
    ];

    let payloads: Vec<Vec<u8>> = tags.iter().map(|t| t.to_string().into_bytes()).collect();
    let (a, b, c) = tokio::join!(
        cas.write(&id, &tags[0], &payloads[0]),
        cas.write(&id, &tags[1], &payloads[1]),
        cas.write(&id, &tags[2], &payloads[2]),
    );
    for outcome in [a, b, c] {
        assert!(outcome.unwrap().is_created());
    }

    for (tag, payload) in tags.iter().zip(&payloads) {
        let bytes = cas.read(&id, tag).await.unwrap().unwrap();
        assert_eq!(&bytes, payload);
    }
}
