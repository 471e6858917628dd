// SPDX-License-Identifier: PMPL-1.0-or-later
//! Capability behaviour shared by every backend family the factory builds.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tarifa_storage::config::{CacheConfig, ConnectionParams, DataDbConfig, StorDbConfig};
use tarifa_storage::contracts::{CdrStorage, DataDb, LoadStorage, Storage};
use tarifa_storage::factory::{configure_cdr_db, configure_data_db, configure_load_db};
use tarifa_storage::model::{AttrCdrsStoreSmCost, CostFilter, LoadInstance, SmCost};
use tarifa_storage::{StatQueueProfile, StorageError};

const STOR_TAGS: [&str; 3] = ["mysql", "mongo", "postgres"];

fn data_dbs() -> Vec<Arc<dyn DataDb>> {
    let redis = configure_data_db(DataDbConfig::default()).unwrap();
    let mongo = configure_data_db(DataDbConfig {
        db_type: "mongo".to_string(),
        conn: ConnectionParams {
            name: "tarifa".to_string(),
            marshaler: "cbor".to_string(),
            ..ConnectionParams::default()
        },
        cache: CacheConfig::disabled(),
        load_history_size: 3,
    })
    .unwrap();
    vec![redis, mongo]
}

fn stor_cfg(db_type: &str) -> StorDbConfig {
    StorDbConfig {
        db_type: db_type.to_string(),
        ..StorDbConfig::default()
    }
}

fn sqp(id: &str) -> StatQueueProfile {
    StatQueueProfile {
        tenant: "cgrates.org".to_string(),
        id: id.to_string(),
        filter_ids: vec!["*string:~Account:1001".to_string()],
        queue_length: 100,
        ttl_secs: Some(60),
        metrics: vec!["*asr".to_string(), "*acd".to_string()],
        thresholds: vec!["TH1".to_string()],
        stored: true,
        weight: 20.0,
        min_items: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_data_db_profile_lifecycle_on_every_family() {
    for db in data_dbs() {
        let profile = sqp("SQ1");
        db.set_stat_queue_profile(&profile).await.unwrap();
        assert_eq!(
            db.get_stat_queue_profile("cgrates.org", "SQ1", false).await.unwrap(),
            profile,
            "{}",
            db.backend()
        );

        db.rem_stat_queue_profile("cgrates.org", "SQ1").await.unwrap();
        let err = db
            .get_stat_queue_profile("cgrates.org", "SQ1", false)
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{}: {err}", db.backend());
        db.close().await.unwrap();
    }
}

#[tokio::test]
async fn test_data_db_load_history_on_every_family() {
    for db in data_dbs() {
        for day in 1..=12 {
            db.add_load_history(LoadInstance {
                load_id: format!("L{day}"),
                rating_load_id: String::new(),
                accounting_load_id: String::new(),
                tariff_plan_id: "TP1".to_string(),
                load_time: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            })
            .await
            .unwrap();
        }
        let history = db.get_load_history(0, true).await.unwrap();
        assert!(history.len() <= 10);
        assert_eq!(history[0].load_id, "L12");
    }
}

#[tokio::test]
async fn test_load_db_staging_on_every_family() {
    for tag in STOR_TAGS {
        let load: Arc<dyn LoadStorage> = configure_load_db(stor_cfg(tag)).unwrap();
        load.set_tp_stat_queue_profiles("TP1", &[sqp("SQ1"), sqp("SQ2")])
            .await
            .unwrap();

        let rows = load
            .get_tp_stat_queue_profiles("TP1", "cgrates.org", "")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2, "{tag}");
        assert_eq!(load.remove_tp_data("TP1").await.unwrap(), 2, "{tag}");
        assert!(load.get_tp_ids().await.unwrap().is_empty(), "{tag}");
    }
}

#[tokio::test]
async fn test_cdr_db_duplicate_check_on_every_family() {
    for tag in STOR_TAGS {
        let cdrs: Arc<dyn CdrStorage> = configure_cdr_db(stor_cfg(tag)).unwrap();
        let cost = SmCost {
            cgrid: "cgrid-1".to_string(),
            run_id: "*default".to_string(),
            origin_id: "sess-1".to_string(),
            usage: 120.0,
            ..Default::default()
        };
        let args = AttrCdrsStoreSmCost {
            cost: cost.clone(),
            check_duplicate: true,
        };

        cdrs.store_sm_cost(args.clone()).await.unwrap();
        assert!(
            matches!(
                cdrs.store_sm_cost(args).await,
                Err(StorageError::Duplicate(_))
            ),
            "{tag}"
        );
        assert_eq!(
            cdrs.get_sm_costs(CostFilter::by_id("cgrid-1", "")).await.unwrap(),
            vec![cost],
            "{tag}"
        );
    }
}
