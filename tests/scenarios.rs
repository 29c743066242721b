//! Cross-module scenarios (S1-S6) driven through the public `viaduct` API,
//! end to end from catalogue ingest through dispatch responses.

use serde_json::json;

use viaduct::dispatch::{self, StatRequest};
use viaduct::geo::Coordinate;
use viaduct::persist::{self, Artifact};
use viaduct::render::RenderSettings;
use viaduct::router::{RoutingSettings, TransportRouter};
use viaduct::Catalogue;

fn two_stop_network(bus_velocity: f64) -> (Catalogue, TransportRouter) {
    let mut catalogue = Catalogue::new();
    catalogue.add_stop("A", Coordinate::new(0.0, 0.0));
    catalogue.add_stop("B", Coordinate::new(0.0, 1.0));
    catalogue.set_distance("A", "B", 1000.0);
    catalogue.add_bus("1", &["A", "B"], false).unwrap();

    let settings = RoutingSettings::new(6, bus_velocity).unwrap();
    let router = TransportRouter::build(&catalogue, settings);
    (catalogue, router)
}

#[test]
fn s1_wait_then_bus_totals_seven_minutes() {
    let (catalogue, router) = two_stop_network(60.0);
    let a = catalogue.stop("A").unwrap().index;
    let b = catalogue.stop("B").unwrap().index;

    let (total, items) = router.route_info(a, b).unwrap();
    assert_eq!(total, 7.0);
    assert_eq!(items[0].time(), 6.0);
    assert_eq!(items[1].time(), 1.0);
}

#[test]
fn s2_slower_velocity_raises_total_to_eight() {
    let (catalogue, router) = two_stop_network(30.0);
    let a = catalogue.stop("A").unwrap().index;
    let b = catalogue.stop("B").unwrap().index;

    let (total, _) = router.route_info(a, b).unwrap();
    assert_eq!(total, 8.0);
}

#[test]
fn s3_unknown_stop_request_is_not_found() {
    let catalogue = Catalogue::new();
    let requests = vec![StatRequest::Stop { id: 1, name: "X".to_string() }];
    let responses = dispatch::answer_all(&requests, &catalogue, None, &RenderSettings::default());
    assert_eq!(responses[0], json!({ "request_id": 1, "error_message": "not found" }));
}

#[test]
fn s4_unknown_bus_request_is_not_found() {
    let catalogue = Catalogue::new();
    let requests = vec![StatRequest::Bus { id: 1, name: "X".to_string() }];
    let responses = dispatch::answer_all(&requests, &catalogue, None, &RenderSettings::default());
    assert_eq!(responses[0], json!({ "request_id": 1, "error_message": "not found" }));
}

#[test]
fn s5_empty_catalogue_round_trips_and_renders_bare_svg() {
    let catalogue = Catalogue::new();
    let settings = RoutingSettings::new(1, 1.0).unwrap();
    let router = TransportRouter::build(&catalogue, settings);
    let artifact = Artifact::from_runtime(&catalogue, &router, RenderSettings::default());

    let bytes = bincode::serialize(&artifact).unwrap();
    let decoded: Artifact = bincode::deserialize(&bytes).unwrap();
    let (loaded_catalogue, _loaded_router, render_settings) = decoded.rehydrate();

    assert_eq!(loaded_catalogue.stop_count(), 0);
    assert_eq!(loaded_catalogue.bus_count(), 0);

    let requests = vec![StatRequest::Map { id: 1 }];
    let responses = dispatch::answer_all(&requests, &loaded_catalogue, None, &render_settings);
    assert_eq!(
        responses[0]["map"],
        json!("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\">\n</svg>")
    );
}

#[test]
fn s6_roundtrip_bus_stat_matches_expected_route_length() {
    let mut catalogue = Catalogue::new();
    catalogue.add_stop("A", Coordinate::new(0.0, 0.0));
    catalogue.add_stop("B", Coordinate::new(0.0, 1.0));
    catalogue.add_stop("C", Coordinate::new(1.0, 1.0));
    catalogue.set_distance("A", "B", 100.0);
    catalogue.set_distance("B", "C", 200.0);
    catalogue.set_distance("C", "A", 300.0);
    catalogue.add_bus("2", &["A", "B", "C", "A"], true).unwrap();

    let requests = vec![StatRequest::Bus { id: 1, name: "2".to_string() }];
    let responses = dispatch::answer_all(&requests, &catalogue, None, &RenderSettings::default());
    assert_eq!(responses[0]["stop_count"], json!(4));
    assert_eq!(responses[0]["unique_stop_count"], json!(3));
    assert_eq!(responses[0]["route_length"], json!(600.0));
}

#[test]
fn stop_with_no_buses_is_found_but_empty() {
    let mut catalogue = Catalogue::new();
    catalogue.add_stop("Lonely", Coordinate::new(3.0, 4.0));

    let requests = vec![StatRequest::Stop { id: 9, name: "Lonely".to_string() }];
    let responses = dispatch::answer_all(&requests, &catalogue, None, &RenderSettings::default());
    assert_eq!(responses[0], json!({ "request_id": 9, "buses": [] }));
}

#[test]
fn ingest_base_requests_builds_working_catalogue() {
    let document = json!({
        "base_requests": [
            {"type": "Stop", "name": "A", "latitude": 0.0, "longitude": 0.0, "road_distances": {"B": 1000.0}},
            {"type": "Stop", "name": "B", "latitude": 0.0, "longitude": 1.0},
            {"type": "Bus", "name": "1", "is_roundtrip": false, "stops": ["A", "B"]}
        ]
    });
    let base_requests: Vec<dispatch::BaseRequest> =
        serde_json::from_value(document["base_requests"].clone()).unwrap();

    let mut catalogue = Catalogue::new();
    dispatch::ingest_base_requests(&mut catalogue, &base_requests).unwrap();

    assert_eq!(catalogue.stop_count(), 2);
    assert_eq!(catalogue.bus_count(), 1);
    assert_eq!(catalogue.distance("A", "B"), 1000.0);
}

#[test]
fn save_and_load_round_trip_via_persist_module() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("viaduct-scenario-test-{}.bin", std::process::id()));
    let path_str = path.to_str().unwrap();

    let (catalogue, router) = two_stop_network(60.0);
    let artifact = Artifact::from_runtime(&catalogue, &router, RenderSettings::default());
    persist::save(path_str, &artifact).unwrap();

    let loaded = persist::load(path_str).unwrap();
    let (loaded_catalogue, loaded_router, _) = loaded.rehydrate();
    let a = loaded_catalogue.stop("A").unwrap().index;
    let b = loaded_catalogue.stop("B").unwrap().index;
    let (total, _) = loaded_router.route_info(a, b).unwrap();
    assert_eq!(total, 7.0);

    std::fs::remove_file(path).ok();
}
