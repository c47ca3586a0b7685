//! Secret-based backups and the sealed local cache.

use vanellus::{ProviderBackup, SealedCache, UserBackup, VanellusError};
use vanellus_core::{Appointment, Secret};
use vanellus_store::{MemoryStore, SqliteStore};
use vanellus_testkit::fixtures::{default_provider_input, tomorrow_at, TestContext};

#[tokio::test]
async fn test_provider_backup_round_trip() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let unpublished = ctx
        .create_appointments(&provider, 2, 3, tomorrow_at(15))
        .unwrap();

    let state = ProviderBackup {
        key_pairs: Some(provider.keys.clone()),
        verified_provider: Some(provider.provider.clone()),
        unpublished_appointments: unpublished,
    };
    let secret = ctx.provider.generate_secret();
    ctx.provider.backup_data(&state, &secret).await.unwrap();

    let restored = ctx.provider.restore_from_backup(&secret).await.unwrap();
    assert_eq!(restored, state);

    // Restored keys still speak for the provider.
    let keys = restored.key_pairs.unwrap();
    assert_eq!(
        ctx.provider.check_provider(&keys).await.unwrap(),
        Some(provider.provider)
    );
}

#[tokio::test]
async fn test_provider_backup_wrong_secret() {
    let ctx = TestContext::new().await.unwrap();
    let secret = ctx.provider.generate_secret();
    ctx.provider
        .backup_data(&ProviderBackup::default(), &secret)
        .await
        .unwrap();

    let other = ctx.provider.generate_secret();
    assert!(ctx.provider.restore_from_backup(&other).await.is_err());
}

#[tokio::test]
async fn test_user_backup_round_trip() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 1, 2, tomorrow_at(16))
        .await
        .unwrap();

    let secret = ctx.user.generate_secret();
    let token = ctx.user.get_token(&secret, None).await.unwrap();
    ctx.user.book_appointment(&published[0], &token).await.unwrap();

    let state = UserBackup {
        token_data: Some(token),
        booked_appointments: published,
    };
    ctx.user.backup_data(&state, &secret).await.unwrap();

    let typed = Secret::parse(&secret.as_str().to_lowercase()).unwrap();
    assert_eq!(ctx.user.restore_from_backup(&typed).await.unwrap(), state);
}

#[tokio::test]
async fn test_restore_without_backup_is_state_error() {
    let ctx = TestContext::new().await.unwrap();
    let secret = ctx.user.generate_secret();
    assert!(matches!(
        ctx.user.restore_from_backup(&secret).await,
        Err(VanellusError::State(_))
    ));
}

#[tokio::test]
async fn test_tampered_backup_fails_to_decrypt() {
    let ctx = TestContext::new().await.unwrap();
    let secret = ctx.user.generate_secret();
    ctx.user
        .backup_data(&UserBackup::default(), &secret)
        .await
        .unwrap();

    // Overwrite the stored backup with one sealed under another secret.
    let other = ctx.user.generate_secret();
    let forged = vanellus_core::seal_backup(&UserBackup::default(), &other).unwrap();
    let transport = ctx.anonymous.transport();
    vanellus_transport::Transport::call(
        transport.as_ref(),
        vanellus_transport::methods::STORE_SETTINGS,
        serde_json::json!({ "id": secret.storage_id().unwrap(), "data": forged }),
        None,
    )
    .await
    .unwrap();

    assert!(matches!(
        ctx.user.restore_from_backup(&secret).await,
        Err(VanellusError::Decryption(_))
    ));
}

#[tokio::test]
async fn test_provider_state_in_sqlite_cache() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let unpublished = ctx
        .create_appointments(&provider, 3, 1, tomorrow_at(17))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("provider.db");
    {
        let cache = SealedCache::for_provider(SqliteStore::open(&path).unwrap(), &provider.keys);
        cache.put("appointments", &unpublished).await.unwrap();
    }

    let cache = SealedCache::for_provider(SqliteStore::open(&path).unwrap(), &provider.keys);
    let restored: Option<Vec<Appointment>> = cache.get("appointments").await.unwrap();
    assert_eq!(restored, Some(unpublished));
}

#[tokio::test]
async fn test_cache_of_another_provider_fails() {
    let ctx = TestContext::new().await.unwrap();
    let first = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let second = ctx
        .create_unverified_provider(default_provider_input())
        .await
        .unwrap();

    let cache = SealedCache::for_provider(MemoryStore::new(), &first.keys);
    cache.put("provider", &first.provider).await.unwrap();
    let raw = vanellus_store::SettingsStore::get(cache.store(), "provider")
        .await
        .unwrap()
        .unwrap();

    let foreign = SealedCache::for_provider(MemoryStore::new(), &second.keys);
    vanellus_store::SettingsStore::set(foreign.store(), "provider", &raw)
        .await
        .unwrap();
    assert!(matches!(
        foreign.get::<vanellus_core::Provider>("provider").await,
        Err(VanellusError::Decryption(_))
    ));
}
