//! Integration tests for the envelope-encryption key hierarchy.
//!
//! This test suite validates:
//! - Content round-trips and identity binding through associated data
//! - Wrong-key and wrong-identity rejection
//! - DEK wrapping under the master key
//! - Master key configuration gate
//! - Provisioning, caching and invalidation against a counting store
//! - Concurrent first-use provisioning converging on a single DEK

use std::sync::Arc;

use futures::future::join_all;
use ragvault_core::defaults::{DEK_CACHE_CAPACITY_ENV, MASTER_KEY_ENV};
use ragvault_core::WrappedKeyStore;
use ragvault_crypto::{
    base64_encode, decrypt_content, encrypt_content, hash_content, unwrap_key, validate_integrity,
    wrap_key, ChunkVault, CryptoError, DataKey, KeyManager, KeyringConfig, MasterKey,
    MemoryKeyStore,
};

fn manager_with(store: Arc<MemoryKeyStore>, master: MasterKey) -> KeyManager {
    KeyManager::new(KeyringConfig::new(master), store)
}

// ============================================================================
// Content Cipher
// ============================================================================

#[test]
fn test_roundtrip_across_inputs() {
    let large = "x".repeat(64 * 1024);
    let plaintexts: [&str; 6] = [
        "",
        "a",
        "plain ascii chunk",
        "multi\nline\tchunk",
        "ünïcödé 日本語 🚀",
        large.as_str(),
    ];
    let aads = ["orgA|doc1|0", "", "org|doc|4294967295"];

    for plaintext in plaintexts {
        for aad in aads {
            let dek = DataKey::generate();
            let sealed = encrypt_content(plaintext, &dek, aad).unwrap();
            let opened = decrypt_content(&sealed.ciphertext, &sealed.nonce, aad, &dek).unwrap();
            assert_eq!(opened, plaintext);
        }
    }
}

#[test]
fn test_aad_binding() {
    let dek = DataKey::generate();
    let sealed = encrypt_content("bound", &dek, "orgA|doc1|0").unwrap();

    for other in ["orgA|doc1|1", "orgA|doc2|0", "orgA|doc1|0 ", ""] {
        let result = decrypt_content(&sealed.ciphertext, &sealed.nonce, other, &dek);
        assert!(
            matches!(result, Err(CryptoError::Decryption)),
            "aad {:?} should not authenticate",
            other
        );
    }
}

#[test]
fn test_wrong_key_rejection() {
    let k1 = DataKey::generate();
    let k2 = DataKey::generate();
    let sealed = encrypt_content("secret", &k1, "orgA|doc1|0").unwrap();

    let result = decrypt_content(&sealed.ciphertext, &sealed.nonce, "orgA|doc1|0", &k2);
    assert!(matches!(result, Err(CryptoError::Decryption)));
}

#[test]
fn test_nonce_freshness() {
    let dek = DataKey::generate();
    let sealed: Vec<_> = (0..16)
        .map(|_| encrypt_content("same", &dek, "orgA|doc1|0").unwrap())
        .collect();

    for (i, a) in sealed.iter().enumerate() {
        for b in &sealed[i + 1..] {
            assert_ne!(a.nonce, b.nonce);
            assert_ne!(a.ciphertext, b.ciphertext);
        }
    }
}

#[tokio::test]
async fn test_cross_tenant_isolation() {
    let keys = manager_with(Arc::new(MemoryKeyStore::new()), MasterKey::generate());
    let org_a_key = keys.resolve_or_create_data_key("orgA").await.unwrap();

    let sealed = encrypt_content("secret-for-A", &org_a_key, "orgA|doc1|0").unwrap();
    let result = decrypt_content(&sealed.ciphertext, &sealed.nonce, "orgB|doc1|0", &org_a_key);
    assert!(matches!(result, Err(CryptoError::Decryption)));
}

// ============================================================================
// Integrity Verifier
// ============================================================================

#[test]
fn test_hash_determinism_and_sensitivity() {
    let corpus = ["", "a", "b", "ab", "ba", "chunk 1", "chunk 2", "Chunk 1"];
    for x in corpus {
        assert_eq!(hash_content(x), hash_content(x));
        assert!(validate_integrity(x, &hash_content(x)));
        for y in corpus {
            if x != y {
                assert_ne!(hash_content(x), hash_content(y));
                assert!(!validate_integrity(y, &hash_content(x)));
            }
        }
    }
}

// ============================================================================
// Key Hierarchy
// ============================================================================

#[test]
fn test_dek_wrap_roundtrip() {
    for _ in 0..8 {
        let kek = MasterKey::generate();
        let dek = DataKey::generate();
        let unwrapped = unwrap_key(&kek, &wrap_key(&kek, &dek).unwrap()).unwrap();
        assert_eq!(unwrapped.as_bytes(), dek.as_bytes());
    }
}

#[test]
fn test_master_key_length_gate() {
    for len in [0usize, 1, 24, 31, 33, 48] {
        let vars = [(MASTER_KEY_ENV, base64_encode(&vec![0xABu8; len]))];
        let result = KeyringConfig::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
        });
        assert!(
            matches!(result, Err(CryptoError::Config(_))),
            "{}-byte key should be rejected",
            len
        );
    }

    let vars = [
        (MASTER_KEY_ENV, base64_encode(&[0xABu8; 32])),
        (DEK_CACHE_CAPACITY_ENV, "16".to_string()),
    ];
    let config = KeyringConfig::from_lookup(|name| {
        vars.iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.clone())
    })
    .unwrap();
    assert_eq!(config.cache_capacity.map(|c| c.get()), Some(16));
}

#[tokio::test]
async fn test_fresh_org_provisioning_persists_wrapped_form() {
    let store = Arc::new(MemoryKeyStore::new());
    let master = MasterKey::generate();
    let keys = manager_with(store.clone(), master.clone());

    let dek = keys.resolve_or_create_data_key("org-A").await.unwrap();

    let record = store.get_wrapped_dek("org-A").await.unwrap().unwrap();
    assert_eq!(record.key_version, 1);
    assert_ne!(record.wrapped_dek, base64_encode(dek.as_bytes()));
    assert_eq!(
        unwrap_key(&master, &record.wrapped_dek).unwrap().as_bytes(),
        dek.as_bytes()
    );

    keys.invalidate_cache(None).await;
    let again = keys.resolve_or_create_data_key("org-A").await.unwrap();
    assert_eq!(again.as_bytes(), dek.as_bytes());
}

#[tokio::test]
async fn test_cache_hit_avoids_store_io() {
    let store = Arc::new(MemoryKeyStore::new());
    let keys = manager_with(store.clone(), MasterKey::generate());

    let first = keys.resolve_or_create_data_key("org-B").await.unwrap();
    let (reads, writes) = (store.read_count(), store.write_count());

    let second = keys.resolve_or_create_data_key("org-B").await.unwrap();
    let third = keys.resolve_existing_data_key("org-B").await.unwrap();

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first.as_bytes(), third.as_bytes());
    assert_eq!(store.read_count(), reads);
    assert_eq!(store.write_count(), writes);
}

#[tokio::test]
async fn test_second_process_sees_same_key() {
    let store = Arc::new(MemoryKeyStore::new());
    let master = MasterKey::generate();

    let a = manager_with(store.clone(), master.clone());
    let b = manager_with(store.clone(), master);

    let from_a = a.resolve_or_create_data_key("org-shared").await.unwrap();
    let from_b = b.resolve_existing_data_key("org-shared").await.unwrap();
    assert_eq!(from_a.as_bytes(), from_b.as_bytes());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_converges() {
    let store = Arc::new(MemoryKeyStore::new());
    let master = MasterKey::generate();

    // Separate managers model separate processes with independent caches.
    let managers: Vec<Arc<KeyManager>> = (0..8)
        .map(|_| Arc::new(manager_with(store.clone(), master.clone())))
        .collect();

    let tasks = managers.iter().cloned().map(|keys| {
        tokio::spawn(async move { keys.resolve_or_create_data_key("org-new").await })
    });
    let keys: Vec<DataKey> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    for key in &keys[1..] {
        assert_eq!(key.as_bytes(), keys[0].as_bytes());
    }
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_resolve_existing_never_provisions() {
    let store = Arc::new(MemoryKeyStore::new());
    let keys = manager_with(store.clone(), MasterKey::generate());

    let result = keys.resolve_existing_data_key("org-missing").await;
    assert!(matches!(result, Err(CryptoError::KeyNotFound(_))));
    assert_eq!(store.write_count(), 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_vault_roundtrip_through_shared_store() {
    let store = Arc::new(MemoryKeyStore::new());
    let master = MasterKey::generate();

    let writer = ChunkVault::new(Arc::new(manager_with(store.clone(), master.clone())));
    let reader = ChunkVault::new(Arc::new(manager_with(store, master)));

    let chunks = [
        "Section 1: scope.",
        "Section 2: terms.",
        "Section 3: signatures.",
    ];
    let mut sealed = Vec::new();
    for (i, text) in chunks.iter().enumerate() {
        sealed.push(
            writer
                .seal_chunk("org-A", "contract-7", i as i32, text)
                .await
                .unwrap(),
        );
    }

    for (record, text) in sealed.iter().zip(chunks) {
        assert_eq!(reader.open_chunk(record).await.unwrap(), text);
    }

    // A chunk swapped into another slot does not authenticate.
    let result = reader
        .open_chunk_as("org-A", "contract-7", 1, &sealed[0])
        .await;
    assert!(matches!(result, Err(CryptoError::Decryption)));
}

#[tokio::test]
async fn test_wrong_master_key_is_loud() {
    let store = Arc::new(MemoryKeyStore::new());
    let writer = ChunkVault::new(Arc::new(manager_with(
        store.clone(),
        MasterKey::generate(),
    )));
    let chunk = writer.seal_chunk("org-A", "doc", 0, "text").await.unwrap();

    let misconfigured = ChunkVault::new(Arc::new(manager_with(store, MasterKey::generate())));
    let result = misconfigured.open_chunk(&chunk).await;
    assert!(matches!(result, Err(CryptoError::Unwrap)));
}
