//! Appointment publishing, discovery, booking and cancellation, end to end.

use std::collections::HashSet;

use vanellus::VanellusError;
use vanellus_core::{ecdh_decrypt, BookingData, ContactData, ProviderKeyPairs};
use vanellus_testkit::fixtures::{default_provider_input, tomorrow, tomorrow_at, TestContext, DAY};

#[tokio::test]
async fn test_five_slots_are_distinct_and_open() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();

    let appointments = ctx
        .publish_appointments(&provider, 1, 5, tomorrow_at(10))
        .await
        .unwrap();
    let slots = &appointments[0].slot_data;

    assert_eq!(slots.len(), 5);
    assert!(slots.iter().all(|s| s.open));
    let ids: HashSet<_> = slots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn test_discovery_finds_published_appointments() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 3, 2, tomorrow_at(9))
        .await
        .unwrap();

    let found = ctx
        .anonymous
        .get_appointments_by_zip_code("10707", 10, tomorrow(), tomorrow() + DAY)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].provider.id, provider.provider.id);
    assert_eq!(found[0].key_data.signing, provider.keys.signing.public_key);
    assert_eq!(found[0].appointments.len(), 3);

    let far_away = ctx
        .anonymous
        .get_appointments_by_zip_code("80331", 10, tomorrow(), tomorrow() + DAY)
        .await
        .unwrap();
    assert!(far_away.is_empty());

    let single = ctx
        .anonymous
        .get_appointment(&published[1].id, &provider.provider.id)
        .await
        .unwrap();
    assert_eq!(single, published[1]);
}

#[tokio::test]
async fn test_cancel_appointment() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 1, 5, tomorrow_at(8))
        .await
        .unwrap();

    ctx.provider
        .cancel_appointment(&published[0], &provider.keys)
        .await
        .unwrap();

    let own = ctx
        .provider
        .get_provider_appointments(tomorrow(), tomorrow() + DAY, &provider.keys)
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, published[0].id);
    assert!(own[0].slot_data.is_empty());

    let found = ctx
        .anonymous
        .get_appointments_by_zip_code("10707", 0, tomorrow(), tomorrow() + DAY)
        .await
        .unwrap();
    assert!(found
        .iter()
        .flat_map(|p| &p.appointments)
        .all(|a| a.id != published[0].id));
}

#[tokio::test]
async fn test_series_every_five_minutes() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();

    let series = ctx
        .provider
        .create_appointment_series(
            tomorrow_at(7),
            tomorrow_at(23),
            5,
            1,
            "moderna",
            &provider.provider.public(),
            &provider.keys,
        )
        .unwrap();

    assert_eq!(series.appointments.len(), 192);
    let series_ids: HashSet<_> = series
        .appointments
        .iter()
        .map(|a| a.series_id())
        .collect();
    assert_eq!(series_ids, HashSet::from([Some(series.id.as_str())]));

    ctx.provider
        .publish_appointments(&series.appointments, &provider.keys)
        .await
        .unwrap();
    let own = ctx
        .provider
        .get_provider_appointments(tomorrow(), tomorrow() + DAY, &provider.keys)
        .await
        .unwrap();
    assert_eq!(own.len(), 192);
}

#[tokio::test]
async fn test_booking_round_trip() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 1, 3, tomorrow_at(11))
        .await
        .unwrap();

    let secret = ctx.user.generate_secret();
    let contact = ContactData {
        name: Some("Erika Mustermann".into()),
        email: Some("erika@example.org".into()),
        phone: None,
    };
    let token = ctx.user.get_token(&secret, Some(contact.clone())).await.unwrap();
    assert_eq!(token.user_token.code, &secret.as_str()[..4]);

    let found = ctx
        .anonymous
        .get_appointment(&published[0].id, &provider.provider.id)
        .await
        .unwrap();
    let booking = ctx.user.book_appointment(&found, &token).await.unwrap();

    let own = ctx
        .provider
        .get_provider_appointments(tomorrow(), tomorrow() + DAY, &provider.keys)
        .await
        .unwrap();
    let bookings = &own[0].bookings;
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].slot_id, booking.slot_id);
    assert_eq!(
        bookings[0].data,
        Some(BookingData {
            user_token: token.user_token.clone(),
            contact: Some(contact),
        })
    );

    let other = ProviderKeyPairs::generate();
    assert!(ecdh_decrypt(&booking.encrypted_data, &other.encryption.private_key).is_err());

    let after = ctx
        .anonymous
        .get_appointment(&published[0].id, &provider.provider.id)
        .await
        .unwrap();
    assert_eq!(after.open_slots().count(), 2);
    assert!(after.bookings.is_empty());
}

#[tokio::test]
async fn test_token_books_once() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 2, 1, tomorrow_at(12))
        .await
        .unwrap();

    let secret = ctx.user.generate_secret();
    let token = ctx.user.get_token(&secret, None).await.unwrap();

    ctx.user.book_appointment(&published[0], &token).await.unwrap();
    let second = ctx.user.book_appointment(&published[1], &token).await;
    assert!(matches!(second, Err(VanellusError::Transport(_))));
}

#[tokio::test]
async fn test_full_appointment_cannot_be_booked() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 1, 1, tomorrow_at(13))
        .await
        .unwrap();

    let first = ctx.user.get_token(&ctx.user.generate_secret(), None).await.unwrap();
    ctx.user.book_appointment(&published[0], &first).await.unwrap();

    let found = ctx
        .anonymous
        .get_appointment(&published[0].id, &provider.provider.id)
        .await
        .unwrap();
    let second = ctx.user.get_token(&ctx.user.generate_secret(), None).await.unwrap();
    assert!(matches!(
        ctx.user.book_appointment(&found, &second).await,
        Err(VanellusError::State(_))
    ));
}

#[tokio::test]
async fn test_cancel_booking_reopens_slot() {
    let ctx = TestContext::new().await.unwrap();
    let provider = ctx
        .create_verified_provider(default_provider_input())
        .await
        .unwrap();
    let published = ctx
        .publish_appointments(&provider, 1, 1, tomorrow_at(14))
        .await
        .unwrap();

    let token = ctx.user.get_token(&ctx.user.generate_secret(), None).await.unwrap();
    ctx.user.book_appointment(&published[0], &token).await.unwrap();
    ctx.user.cancel_booking(&published[0], &token).await.unwrap();

    let own = ctx
        .provider
        .get_provider_appointments(tomorrow(), tomorrow() + DAY, &provider.keys)
        .await
        .unwrap();
    assert!(own[0].bookings.is_empty());

    let found = ctx
        .anonymous
        .get_appointment(&published[0].id, &provider.provider.id)
        .await
        .unwrap();
    assert_eq!(found.open_slots().count(), 1);

    assert!(ctx.user.cancel_booking(&published[0], &token).await.is_err());
}

#[tokio::test]
async fn test_offline_relay_is_transport_error() {
    let ctx = TestContext::new().await.unwrap();
    ctx.relay.set_offline(true);

    let result = ctx
        .anonymous
        .get_appointments_by_zip_code("10707", 0, tomorrow(), tomorrow() + DAY)
        .await;
    assert!(matches!(result, Err(VanellusError::Transport(_))));

    ctx.relay.set_offline(false);
    assert!(ctx.anonymous.get_keys().await.is_ok());
}
