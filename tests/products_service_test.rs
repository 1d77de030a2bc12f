extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate listings_lib;
extern crate r2d2;
extern crate r2d2_sqlite;

mod common;

use futures::Future;

use listings_lib::errors::Error;
use listings_lib::models::*;
use listings_lib::repos::repo_factory::{ReposFactory, ReposFactoryImpl};
use listings_lib::services::products::check_entitlement;
use listings_lib::services::{CheckoutService, ProductsService};

use common::{create_store, seed_user, service_as};

fn new_product(owner_email: &str, name: &str, tags: &[&str]) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        image: None,
        description: "Something useful".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        external_link: None,
        owner_email: owner_email.to_string(),
        owner_name: Some("Seeded User".to_string()),
    }
}

fn is_forbidden(err: &failure::Error) -> bool {
    err.iter_chain().any(|c| match common::error_ref(c) {
        Some(&Error::Forbidden) => true,
        _ => false,
    })
}

fn is_not_found(err: &failure::Error) -> bool {
    err.iter_chain().any(|c| match common::error_ref(c) {
        Some(&Error::NotFound) => true,
        _ => false,
    })
}

fn is_validate(err: &failure::Error) -> bool {
    err.iter_chain().any(|c| match common::error_ref(c) {
        Some(&Error::Validate(_)) => true,
        _ => false,
    })
}

#[test]
fn test_unverified_user_hits_free_tier_cap() {
    let ctx = create_store();
    let free_id = seed_user(&ctx, "free@example.com", UserRole::User, false);
    let service = service_as(&ctx, Some(free_id), Some("free@example.com"));

    let first = service
        .create_product(new_product("free@example.com", "First", &["tools"]))
        .wait()
        .unwrap();
    assert_eq!(first.status, ModerationStatus::Pending);

    let err = service
        .create_product(new_product("free@example.com", "Second", &["tools"]))
        .wait()
        .unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    // paying lifts the cap
    service
        .confirm_payment(ConfirmPayment {
            email: "free@example.com".to_string(),
            coupon_code: None,
        })
        .wait()
        .unwrap();
    let second = service
        .create_product(new_product("free@example.com", "Second", &["tools"]))
        .wait()
        .unwrap();
    assert_eq!(second.status, ModerationStatus::Pending);
}

#[test]
fn test_submission_requires_matching_owner() {
    let ctx = create_store();
    let user_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    seed_user(&ctx, "other@example.com", UserRole::User, true);
    let service = service_as(&ctx, Some(user_id), Some("pro@example.com"));

    let err = service
        .create_product(new_product("other@example.com", "Not mine", &[]))
        .wait()
        .unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);
}

#[test]
fn test_moderation_flow() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let moderator_id = seed_user(&ctx, "mod@example.com", UserRole::Moderator, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let moderator = service_as(&ctx, Some(moderator_id), Some("mod@example.com"));
    let anonymous = service_as(&ctx, None, None);

    let product = owner
        .create_product(new_product("pro@example.com", "Widget", &["tools"]))
        .wait()
        .unwrap();

    let pending = moderator.list_pending().wait().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, product.id);

    // only pending/published/declined are acceptable values
    let err = moderator
        .set_moderation_status(product.id, "approved".to_string())
        .wait()
        .unwrap_err();
    assert!(is_validate(&err), "expected Validate, got: {}", err);

    // the owner is not a moderator
    let err = owner
        .set_moderation_status(product.id, "published".to_string())
        .wait()
        .unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    let published = moderator
        .set_moderation_status(product.id, "published".to_string())
        .wait()
        .unwrap();
    assert_eq!(published.status, ModerationStatus::Published);

    let page = anonymous.list_published(1, 6, None).wait().unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.products[0].id, product.id);

    assert!(moderator.list_pending().wait().unwrap().is_empty());

    let err = anonymous.list_pending().wait().unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    let err = moderator
        .set_moderation_status(ProductId(999), "published".to_string())
        .wait()
        .unwrap_err();
    assert!(is_not_found(&err), "expected NotFound, got: {}", err);
}

#[test]
fn test_update_touches_content_only() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let stranger_id = seed_user(&ctx, "stranger@example.com", UserRole::User, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let stranger = service_as(&ctx, Some(stranger_id), Some("stranger@example.com"));

    let product = owner
        .create_product(new_product("pro@example.com", "Widget", &["tools"]))
        .wait()
        .unwrap();

    let err = stranger
        .update_product(
            product.id,
            UpdateProduct {
                name: "Hijacked".to_string(),
                image: None,
                description: "nope".to_string(),
                tags: vec![],
                external_link: None,
            },
        )
        .wait()
        .unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    let updated = owner
        .update_product(
            product.id,
            UpdateProduct {
                name: "Widget v2".to_string(),
                image: Some("https://img.example.com/w.png".to_string()),
                description: "Better widget".to_string(),
                tags: vec!["tools".to_string(), "update".to_string()],
                external_link: Some("https://example.com".to_string()),
            },
        )
        .wait()
        .unwrap();
    assert_eq!(updated.name, "Widget v2");
    assert_eq!(updated.status, ModerationStatus::Pending);
    assert!(updated.updated_at >= product.updated_at);
}

#[test]
fn test_delete_by_owner_or_admin_only() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let stranger_id = seed_user(&ctx, "stranger@example.com", UserRole::User, true);
    let admin_id = seed_user(&ctx, "admin@example.com", UserRole::Admin, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let stranger = service_as(&ctx, Some(stranger_id), Some("stranger@example.com"));
    let admin = service_as(&ctx, Some(admin_id), Some("admin@example.com"));

    let product = owner
        .create_product(new_product("pro@example.com", "Widget", &[]))
        .wait()
        .unwrap();

    let err = stranger.delete_product(product.id).wait().unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);

    admin.delete_product(product.id).wait().unwrap();

    let err = owner.get_product(product.id).wait().unwrap_err();
    assert!(is_not_found(&err), "expected NotFound, got: {}", err);

    let err = admin.delete_product(product.id).wait().unwrap_err();
    assert!(is_not_found(&err), "expected NotFound, got: {}", err);
}

#[test]
fn test_published_listing_pages_in_id_order() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let admin_id = seed_user(&ctx, "admin@example.com", UserRole::Admin, true);

    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));
    let admin = service_as(&ctx, Some(admin_id), Some("admin@example.com"));
    let anonymous = service_as(&ctx, None, None);

    let mut ids = vec![];
    for i in 0..7 {
        let tags: &[&str] = if i % 2 == 0 { &["ai"] } else { &["web"] };
        let product = owner
            .create_product(new_product("pro@example.com", &format!("Widget {}", i), tags))
            .wait()
            .unwrap();
        admin
            .set_moderation_status(product.id, "published".to_string())
            .wait()
            .unwrap();
        ids.push(product.id);
    }

    let page1 = anonymous.list_published(1, 3, None).wait().unwrap();
    assert_eq!(page1.total, 7);
    assert_eq!(
        page1.products.iter().map(|p| p.id).collect::<Vec<_>>(),
        ids[0..3].to_vec()
    );

    let page3 = anonymous.list_published(3, 3, None).wait().unwrap();
    assert_eq!(page3.total, 7);
    assert_eq!(page3.products.len(), 1);
    assert_eq!(page3.products[0].id, ids[6]);

    // tag search is case-insensitive, empty matches all
    let ai_page = anonymous.list_published(1, 10, Some("AI".to_string())).wait().unwrap();
    assert_eq!(ai_page.total, 4);
    let none_page = anonymous.list_published(1, 10, Some("nope".to_string())).wait().unwrap();
    assert_eq!(none_page.total, 0);
}

#[test]
fn test_list_by_owner_is_owner_only_and_newest_first() {
    let ctx = create_store();
    let owner_id = seed_user(&ctx, "pro@example.com", UserRole::User, true);
    let owner = service_as(&ctx, Some(owner_id), Some("pro@example.com"));

    let first = owner
        .create_product(new_product("pro@example.com", "Older", &[]))
        .wait()
        .unwrap();
    let second = owner
        .create_product(new_product("pro@example.com", "Newer", &[]))
        .wait()
        .unwrap();

    let mine = owner.list_by_owner("pro@example.com".to_string()).wait().unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].id, second.id);
    assert_eq!(mine[1].id, first.id);

    let err = owner.list_by_owner("someone@example.com".to_string()).wait().unwrap_err();
    assert!(is_forbidden(&err), "expected Forbidden, got: {}", err);
}

#[test]
fn test_entitlement_is_pure_over_inputs() {
    let ctx = create_store();
    let free_id = seed_user(&ctx, "free@example.com", UserRole::User, false);
    let conn = ctx.db_pool.get().unwrap();
    let users_repo = ReposFactoryImpl::default().create_users_repo_with_sys_acl(&conn);
    let user = users_repo.find(free_id).unwrap().unwrap();

    assert_eq!(check_entitlement(&user, 0), Entitlement::Allowed);
    assert_eq!(check_entitlement(&user, 1), Entitlement::FreeTierLimitReached);
    assert_eq!(check_entitlement(&user, 7), Entitlement::FreeTierLimitReached);
}
