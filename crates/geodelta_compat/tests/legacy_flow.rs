//! End-to-end legacy editing flow: changeset create, edit upload, map
//! download, all against one coordinator.

use std::sync::Arc;

use geodelta_compat::{create_changeset, map, parse_bbox, upload, CompatError};
use geodelta_core::{
    Batch, BatchItem, Coordinator, CoreError, DeltaLog, FeatureId, FeatureStore, Geometry,
    Properties, UserId, UserLedger, Version,
};

fn coordinator_with_user(username: &str) -> (Coordinator, UserId) {
    let coordinator = Coordinator::new(
        Arc::new(FeatureStore::new()),
        Arc::new(DeltaLog::new()),
        Arc::new(UserLedger::new()),
    );
    let user = coordinator
        .users()
        .register(username, "yeaheh", "ingalls@protonmail.com")
        .unwrap();
    (coordinator, user.id)
}

const CHANGESET_BODY: &str =
    r#"<osm><changeset><tag k="created_by" v="geodelta-client"/></changeset></osm>"#;

#[test]
fn create_upload_then_map() {
    let (coordinator, author) = coordinator_with_user("ingalls");

    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();

    let diff = upload(
        &coordinator,
        author,
        delta,
        r#"<osmChange>
            <create>
                <node id="-1" lon="-77.03" lat="38.9" changeset="1">
                    <tag k="shop" v="true"/>
                </node>
            </create>
        </osmChange>"#,
    )
    .unwrap();
    assert!(diff.contains(r#"<node old_id="-1" new_id="1" new_version="1"/>"#));

    let bbox = parse_bbox("-77.1,38.8,-77.0,39.0").unwrap();
    let body = map(coordinator.store(), &bbox);
    assert!(body.contains(r#"<node id="1" version="1""#));
    assert!(body.contains(r#"<tag k="shop" v="true"/>"#));

    // The delta carries the changeset metadata and is finalized.
    let delta = coordinator.log().get(delta).unwrap();
    assert!(delta.finalized);
    assert_eq!(
        delta.metadata.get("created_by"),
        Some(&serde_json::Value::String("geodelta-client".into()))
    );
}

#[test]
fn second_upload_into_same_changeset_rejected() {
    let (coordinator, author) = coordinator_with_user("ingalls");
    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();

    let body = r#"<osmChange><create><node id="-1" lon="0" lat="0"/></create></osmChange>"#;
    upload(&coordinator, author, delta, body).unwrap();

    let err = upload(&coordinator, author, delta, body).unwrap_err();
    assert_eq!(
        err,
        CompatError::Core(CoreError::DeltaFinalized { id: delta })
    );
}

#[test]
fn upload_into_another_users_changeset_rejected() {
    let (coordinator, owner) = coordinator_with_user("ingalls");
    let other = coordinator
        .users()
        .register("wilder", "pa", "wilder@example.com")
        .unwrap()
        .id;

    let delta = create_changeset(&coordinator, owner, CHANGESET_BODY).unwrap();
    let err = upload(
        &coordinator,
        other,
        delta,
        r#"<osmChange><create><node id="-1" lon="0" lat="0"/></create></osmChange>"#,
    )
    .unwrap_err();
    assert_eq!(err, CompatError::Core(CoreError::DeltaNotOwned { id: delta }));
}

#[test]
fn stale_delete_reports_delete_mismatch() {
    let (coordinator, author) = coordinator_with_user("ingalls");

    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();
    upload(
        &coordinator,
        author,
        delta,
        r#"<osmChange><create><node id="-1" lon="0" lat="0"/></create></osmChange>"#,
    )
    .unwrap();

    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();
    let err = upload(
        &coordinator,
        author,
        delta,
        r#"<osmChange><delete><node id="1" version="9"/></delete></osmChange>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompatError::Core(CoreError::DeleteVersionMismatch { .. })
    ));
    // The failed upload leaves the changeset open and the feature intact.
    assert!(!coordinator.log().get(delta).unwrap().finalized);
    assert_eq!(
        coordinator
            .store()
            .get(FeatureId::new(1))
            .unwrap()
            .version,
        Version::INITIAL
    );
}

#[test]
fn changeset_finalized_after_native_commit_survives_replay() {
    let (coordinator, author) = coordinator_with_user("ingalls");

    // Changeset 1 opens before the feature it will edit exists.
    let changeset = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();

    // A native commit lands while the changeset is still open.
    coordinator
        .commit(
            author,
            Properties::new(),
            &Batch::from_items(vec![BatchItem::create(
                Geometry::point(0.5, 0.5),
                Properties::new(),
            )]),
        )
        .unwrap();

    // The upload finalizes the earlier changeset with a modify of that
    // feature, so the changeset commits second despite opening first.
    upload(
        &coordinator,
        author,
        changeset,
        r#"<osmChange><modify><node id="1" lon="0.25" lat="0.25" version="1"/></modify></osmChange>"#,
    )
    .unwrap();

    let before = coordinator.store().get(FeatureId::new(1)).unwrap();
    assert_eq!(before.version, Version::new(2));

    coordinator.recover().unwrap();

    let after = coordinator.store().get(FeatureId::new(1)).unwrap();
    assert_eq!(after.version, before.version);
    assert_eq!(after.geometry, before.geometry);
    assert_eq!(after.history, before.history);
}

#[test]
fn modify_through_upload_bumps_version_in_map_output() {
    let (coordinator, author) = coordinator_with_user("ingalls");

    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();
    upload(
        &coordinator,
        author,
        delta,
        r#"<osmChange><create><node id="-1" lon="0.5" lat="0.5">
            <tag k="shop" v="true"/>
        </node></create></osmChange>"#,
    )
    .unwrap();

    let delta = create_changeset(&coordinator, author, CHANGESET_BODY).unwrap();
    let diff = upload(
        &coordinator,
        author,
        delta,
        r#"<osmChange><modify><node id="1" lon="0.5" lat="0.5" version="1">
            <tag k="shop" v="false"/>
        </node></modify></osmChange>"#,
    )
    .unwrap();
    assert!(diff.contains(r#"<node old_id="1" new_id="1" new_version="2"/>"#));

    let bbox = parse_bbox("0,0,1,1").unwrap();
    let body = map(coordinator.store(), &bbox);
    assert!(body.contains(r#"<node id="1" version="2""#));
    assert!(body.contains(r#"<tag k="shop" v="false"/>"#));
}
