use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use companion_crypto::{CryptoError, EncryptedEnvelope, QueueCipher, KEY_RECORD_KEY, KEY_SIZE};
use companion_storage::KvStore;

fn make_cipher() -> QueueCipher {
    QueueCipher::new(KvStore::open_in_memory().unwrap())
}

#[tokio::test]
async fn roundtrip_returns_original_plaintext() {
    let cipher = make_cipher();
    let payload = r#"{"time_of_day":"Morning","mood":"Sad"}"#;

    let envelope = cipher.encrypt(payload).await.unwrap();
    let decrypted = cipher.decrypt(&envelope).await.unwrap();

    assert_eq!(decrypted, payload);
}

#[tokio::test]
async fn roundtrip_empty_string() {
    let cipher = make_cipher();
    let envelope = cipher.encrypt("").await.unwrap();
    assert_eq!(cipher.decrypt(&envelope).await.unwrap(), "");
}

#[tokio::test]
async fn roundtrip_unicode() {
    let cipher = make_cipher();
    let payload = "mood: 😞 — später prüfen";
    let envelope = cipher.encrypt(payload).await.unwrap();
    assert_eq!(cipher.decrypt(&envelope).await.unwrap(), payload);
}

#[tokio::test]
async fn each_encryption_draws_a_fresh_nonce() {
    let cipher = make_cipher();
    let env1 = cipher.encrypt("same plaintext").await.unwrap();
    let env2 = cipher.encrypt("same plaintext").await.unwrap();

    assert_ne!(env1.iv, env2.iv);
    assert_ne!(env1.ciphertext, env2.ciphertext);

    assert_eq!(cipher.decrypt(&env1).await.unwrap(), "same plaintext");
    assert_eq!(cipher.decrypt(&env2).await.unwrap(), "same plaintext");
}

#[tokio::test]
async fn tampered_ciphertext_fails() {
    let cipher = make_cipher();
    let mut envelope = cipher.encrypt("sensitive entry").await.unwrap();

    let mut raw = STANDARD.decode(&envelope.ciphertext).unwrap();
    raw[0] ^= 0xFF;
    envelope.ciphertext = STANDARD.encode(raw);

    assert!(matches!(
        cipher.decrypt(&envelope).await,
        Err(CryptoError::Decrypt)
    ));
}

#[tokio::test]
async fn tampered_nonce_fails() {
    let cipher = make_cipher();
    let mut envelope = cipher.encrypt("sensitive entry").await.unwrap();

    let mut raw = STANDARD.decode(&envelope.iv).unwrap();
    raw[0] ^= 0xFF;
    envelope.iv = STANDARD.encode(raw);

    assert!(matches!(
        cipher.decrypt(&envelope).await,
        Err(CryptoError::Decrypt)
    ));
}

#[tokio::test]
async fn envelope_with_invalid_base64_fails() {
    let cipher = make_cipher();
    // Force key creation so the failure is about the envelope
    let _ = cipher.encrypt("x").await.unwrap();

    let envelope = EncryptedEnvelope {
        iv: "not-valid-base64!!!".to_string(),
        ciphertext: "also-not-valid!!!".to_string(),
    };

    assert!(matches!(
        cipher.decrypt(&envelope).await,
        Err(CryptoError::Decrypt)
    ));
}

#[tokio::test]
async fn wrong_key_fails_to_decrypt() {
    let cipher_a = make_cipher();
    let cipher_b = make_cipher();

    let envelope = cipher_a.encrypt("secret").await.unwrap();
    assert!(matches!(
        cipher_b.decrypt(&envelope).await,
        Err(CryptoError::Decrypt)
    ));
}

#[tokio::test]
async fn key_is_shared_across_ciphers_over_one_store() {
    let store = KvStore::open_in_memory().unwrap();
    let cipher_a = QueueCipher::new(store.clone());
    let cipher_b = QueueCipher::new(store);

    let envelope = cipher_a.encrypt("shared key").await.unwrap();
    assert_eq!(cipher_b.decrypt(&envelope).await.unwrap(), "shared key");
}

#[tokio::test]
async fn key_record_is_base64_key_material() {
    let store = KvStore::open_in_memory().unwrap();
    let cipher = QueueCipher::new(store.clone());
    let _ = cipher.encrypt("trigger key creation").await.unwrap();

    let stored = store.get(KEY_RECORD_KEY).await.unwrap().unwrap();
    let raw = STANDARD.decode(&stored).unwrap();
    assert_eq!(raw.len(), KEY_SIZE);
}

#[tokio::test]
async fn key_is_generated_once() {
    let store = KvStore::open_in_memory().unwrap();
    let cipher = QueueCipher::new(store.clone());

    let _ = cipher.encrypt("first").await.unwrap();
    let first_key = store.get(KEY_RECORD_KEY).await.unwrap();
    let _ = cipher.encrypt("second").await.unwrap();
    let second_key = store.get(KEY_RECORD_KEY).await.unwrap();

    assert_eq!(first_key, second_key);
}

#[tokio::test]
async fn corrupt_key_material_is_classified_as_key_load() {
    let store = KvStore::open_in_memory().unwrap();
    store.put(KEY_RECORD_KEY, "%%% not base64 %%%").await.unwrap();

    let cipher = QueueCipher::new(store);
    assert!(matches!(
        cipher.encrypt("x").await,
        Err(CryptoError::KeyLoad(_))
    ));
}

#[tokio::test]
async fn truncated_key_material_is_classified_as_key_load() {
    let store = KvStore::open_in_memory().unwrap();
    store
        .put(KEY_RECORD_KEY, &STANDARD.encode([0u8; 16]))
        .await
        .unwrap();

    let cipher = QueueCipher::new(store);
    assert!(matches!(
        cipher.encrypt("x").await,
        Err(CryptoError::KeyLoad(_))
    ));
}

#[tokio::test]
async fn envelope_serializes_with_iv_and_ciphertext_fields() {
    let cipher = make_cipher();
    let envelope = cipher.encrypt("wire shape").await.unwrap();

    let json = serde_json::to_value(&envelope).unwrap();
    assert!(json.get("iv").is_some());
    assert!(json.get("ciphertext").is_some());
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn roundtrip_arbitrary_strings(plaintext in ".*") {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let cipher = make_cipher();
                let envelope = cipher.encrypt(&plaintext).await.unwrap();
                prop_assert_eq!(cipher.decrypt(&envelope).await.unwrap(), plaintext);
                Ok(())
            })?;
        }
    }
}
