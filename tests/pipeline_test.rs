use anyhow::Result;
use serde_json::json;
use tempfile::tempdir;

use kamptrail_dedupe::pipeline::orchestrator::{
    run_partition, run_partitions, PartitionInput, PartitionSource,
};
use kamptrail_dedupe::ingestion::geojson;
use kamptrail_dedupe::DedupeConfig;

fn feature(name: &str, lat: f64, lon: f64, extra: serde_json::Value) -> serde_json::Value {
    let mut properties = json!({"name": name});
    if let (Some(target), Some(source)) = (properties.as_object_mut(), extra.as_object()) {
        for (k, v) in source {
            target.insert(k.clone(), v.clone());
        }
    }
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [lon, lat]},
        "properties": properties
    })
}

fn write_collection(path: &std::path::Path, features: Vec<serde_json::Value>) -> Result<()> {
    let collection = json!({"type": "FeatureCollection", "features": features});
    std::fs::write(path, serde_json::to_string_pretty(&collection)?)?;
    Ok(())
}

#[test]
fn merges_two_source_files_end_to_end() -> Result<()> {
    let temp_dir = tempdir()?;
    let gov_path = temp_dir.path().join("CO.geojson");
    let osm_path = temp_dir.path().join("CO_osm.geojson");
    let out_path = temp_dir.path().join("CO_merged.geojson");

    write_collection(
        &gov_path,
        vec![
            feature(
                "Pine Ridge Campground",
                40.0000,
                -105.0000,
                json!({"rating": 4.2, "source": "recreation.gov"}),
            ),
            feature(
                "Granite Basin Campground",
                40.5000,
                -105.5000,
                json!({"source": "recreation.gov"}),
            ),
            // placeholder row seeded upstream, must be dropped
            feature("Sample Campsite", 40.2, -105.2, json!({"source": "recreation.gov"})),
        ],
    )?;
    write_collection(
        &osm_path,
        vec![
            // ~22 m from the gov record: automatic duplicate
            feature(
                "Pine Ridge Campground",
                40.0002,
                -105.0000,
                json!({"phone": "555-0100", "amenities": ["water"]}),
            ),
            // null island sentinel, must be dropped
            feature("Drifting Buoy Camp", 0.0, 0.0, json!({})),
        ],
    )?;

    let partition = PartitionInput {
        id: "CO".to_string(),
        inputs: vec![
            PartitionSource {
                path: gov_path,
                source_label: Some("recreation.gov".to_string()),
            },
            PartitionSource {
                path: osm_path,
                source_label: Some("opencampingmap".to_string()),
            },
        ],
        output: out_path.clone(),
    };

    let outcome = run_partition(&partition, &DedupeConfig::default())?;
    assert_eq!(outcome.summary.input_records, 5);
    assert_eq!(outcome.summary.rejected_total(), 2);
    assert_eq!(outcome.summary.unique_records, 2);
    assert_eq!(outcome.summary.duplicates_merged, 1);

    let merged = geojson::load_collection(&out_path)?;
    assert_eq!(merged.features.len(), 2);

    let pine = merged
        .features
        .iter()
        .find(|f| f.properties["name"] == json!("Pine Ridge Campground"))
        .expect("pine ridge survives");
    // canonical is the higher-scoring gov record, gap-filled from OSM
    assert_eq!(pine.properties["source"], json!("recreation.gov"));
    assert_eq!(pine.properties["rating"], json!(4.2));
    assert_eq!(pine.properties["phone"], json!("555-0100"));
    assert_eq!(
        pine.properties["_sources"],
        json!("recreation.gov, opencampingmap")
    );
    assert_eq!(pine.properties["_dedupe_group_size"], json!(2));
    assert_eq!(pine.properties["_deduped"], json!(true));

    let granite = merged
        .features
        .iter()
        .find(|f| f.properties["name"] == json!("Granite Basin Campground"))
        .expect("granite basin survives");
    assert!(!granite.properties.contains_key("_deduped"));

    Ok(())
}

#[tokio::test]
async fn failed_partitions_are_isolated() -> Result<()> {
    let temp_dir = tempdir()?;

    let good_input = temp_dir.path().join("WA.geojson");
    write_collection(
        &good_input,
        vec![feature("Eagle Creek Camp", 47.5, -121.5, json!({}))],
    )?;
    let bad_input = temp_dir.path().join("OR.geojson");
    std::fs::write(&bad_input, "{this is not geojson")?;

    let partitions = vec![
        PartitionInput {
            id: "WA".to_string(),
            inputs: vec![PartitionSource {
                path: good_input,
                source_label: Some("recreation.gov".to_string()),
            }],
            output: temp_dir.path().join("WA_merged.geojson"),
        },
        PartitionInput {
            id: "OR".to_string(),
            inputs: vec![PartitionSource {
                path: bad_input,
                source_label: Some("recreation.gov".to_string()),
            }],
            output: temp_dir.path().join("OR_merged.geojson"),
        },
        // partition whose inputs don't exist at all
        PartitionInput {
            id: "ID".to_string(),
            inputs: vec![PartitionSource {
                path: temp_dir.path().join("ID.geojson"),
                source_label: None,
            }],
            output: temp_dir.path().join("ID_merged.geojson"),
        },
    ];

    let report = run_partitions(partitions, &DedupeConfig::coarse()).await?;

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].partition, "WA");
    assert!(report.outcomes[0].output.exists());

    let mut failed: Vec<&str> = report
        .failed
        .iter()
        .map(|f| f.partition.as_str())
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["ID", "OR"]);

    Ok(())
}

#[tokio::test]
async fn invalid_configuration_aborts_before_any_partition() -> Result<()> {
    let temp_dir = tempdir()?;
    let input = temp_dir.path().join("WA.geojson");
    write_collection(
        &input,
        vec![feature("Eagle Creek Camp", 47.5, -121.5, json!({}))],
    )?;
    let output = temp_dir.path().join("WA_merged.geojson");

    let config = DedupeConfig {
        name_similarity_threshold: 2.0,
        ..Default::default()
    };
    let partitions = vec![PartitionInput {
        id: "WA".to_string(),
        inputs: vec![PartitionSource {
            path: input,
            source_label: None,
        }],
        output: output.clone(),
    }];

    assert!(run_partitions(partitions, &config).await.is_err());
    assert!(!output.exists());

    Ok(())
}
