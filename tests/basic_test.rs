use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::io::Write;

use engagement_dashboard::api::{self, AppState};
use engagement_dashboard::backend::{AnalysisClient, AnalysisContext};
use engagement_dashboard::data::{frames_from_statuses, load_frames_csv};
use engagement_dashboard::database::Database;
use engagement_dashboard::model::{CategorySet, EngagementStatus, OverallStatus, SeverityCategory};
use engagement_dashboard::EngagementSummarizer;

async fn state() -> web::Data<AppState> {
    web::Data::new(AppState {
        db: Database::in_memory().await.unwrap(),
        client: AnalysisClient::new("http://127.0.0.1:9").unwrap(),
        categories: CategorySet::binary(),
        heatmap_bucket: 10,
    })
}

fn student_body(roll_no: &str, department: &str) -> Value {
    json!({
        "name": "Denis Lemayian",
        "roll_no": roll_no,
        "subject": "Data Structures",
        "section": "A",
        "session": "2024",
        "teacher": "Dr. Otieno",
        "department": department,
    })
}

fn frames_body(engaged: usize, distracted: usize) -> Vec<Value> {
    std::iter::repeat("Engaged")
        .take(engaged)
        .chain(std::iter::repeat("Distracted").take(distracted))
        .map(|s| json!({ "engagement_status": s }))
        .collect()
}

#[::core::prelude::v1::test]
fn sum_of_counts_matches_total() {
    let cases: Vec<Vec<&str>> = vec![
        vec![],
        vec!["Engaged"],
        vec!["Engaged", "Distracted", "Neutral", "??", "Distracted"],
        vec!["Neutral", "Neutral"],
    ];
    for labels in cases {
        let frames = frames_from_statuses(&labels);
        for categories in [CategorySet::binary(), CategorySet::with_neutral()] {
            let summary = EngagementSummarizer::new().summarize(&frames, &categories);
            let sum: usize = summary.counts.iter().map(|(_, c)| c).sum();
            assert_eq!(sum, summary.total);
            assert!(summary.percentages.iter().all(|(_, p)| (0.0..=100.0).contains(&p)));
        }
    }
}

#[::core::prelude::v1::test]
fn summarize_is_repeatable() {
    let frames = frames_from_statuses(&["Engaged", "Distracted", "Engaged", "Neutral"]);
    let categories = CategorySet::with_neutral();
    let summarizer = EngagementSummarizer::new();
    assert_eq!(summarizer.summarize(&frames, &categories), summarizer.summarize(&frames, &categories));
}

#[::core::prelude::v1::test]
fn engaged_percentage_bands() {
    // 1 of 5 engaged = 20.00
    let frames = frames_from_statuses(&["Engaged", "Distracted", "Distracted", "Distracted", "Distracted"]);
    let summary = EngagementSummarizer::new().summarize(&frames, &CategorySet::binary());
    assert_eq!(summary.engagement_percentage, 20.0);
    assert_eq!(summary.severity_category, SeverityCategory::VeryLow);

    // 3 of 5 engaged = 60.00
    let frames = frames_from_statuses(&["Engaged", "Engaged", "Engaged", "Distracted", "Distracted"]);
    let summary = EngagementSummarizer::new().summarize(&frames, &CategorySet::binary());
    assert_eq!(summary.severity_category, SeverityCategory::Moderate);
    assert_eq!(summary.overall_status, OverallStatus::Engaged);

    // 4 of 5 engaged = 80.00
    let frames = frames_from_statuses(&["Engaged", "Engaged", "Engaged", "Engaged", "Distracted"]);
    let summary = EngagementSummarizer::new().summarize(&frames, &CategorySet::binary());
    assert_eq!(summary.severity_category, SeverityCategory::High);

    let frames = frames_from_statuses(&["Engaged", "Engaged"]);
    let summary = EngagementSummarizer::new().summarize(&frames, &CategorySet::binary());
    assert_eq!(summary.engagement_percentage, 100.0);
    assert_eq!(summary.severity_category, SeverityCategory::VeryHigh);
}

#[actix_web::test]
async fn health_endpoint() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn summarize_endpoint_returns_summary_and_charts() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;
    let req = test::TestRequest::post()
        .uri("/summarize")
        .set_json(json!({ "frames": frames_body(7, 3) }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["summary"]["counts"], json!({ "Engaged": 7, "Distracted": 3 }));
    assert_eq!(body["summary"]["percentages"], json!({ "Engaged": 70.0, "Distracted": 30.0 }));
    assert_eq!(body["summary"]["overall_status"], "Engaged");
    assert_eq!(body["summary"]["severity_category"], "High Engagement");
    assert_eq!(body["charts"]["timeline"][0], json!({ "frame": 1, "engaged": 1, "distracted": 0 }));
    assert_eq!(body["charts"]["pie"][1], json!({ "name": "Distracted", "value": 30.0 }));
    assert_eq!(body["charts"]["scatter"].as_array().unwrap().len(), 10);
}

#[actix_web::test]
async fn summarize_endpoint_can_track_neutral() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;
    let req = test::TestRequest::post()
        .uri("/summarize")
        .set_json(json!({
            "frames": [
                { "engagement_status": "Engaged" },
                { "engagement_status": "Neutral" }
            ],
            "track_neutral": true
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["summary"]["counts"]["Neutral"], 1);
    assert_eq!(body["charts"]["scatter"], json!([{ "x": 1, "y": 2 }, { "x": 2, "y": 1 }]));
}

#[actix_web::test]
async fn saving_results_requires_frames_and_a_student() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;

    let req = test::TestRequest::post()
        .uri("/engagement-results")
        .set_json(json!({ "video_name": "144.mp4", "frames": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::post()
        .uri("/engagement-results")
        .set_json(json!({ "video_name": "144.mp4", "frames": frames_body(1, 1) }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn saved_results_show_up_in_the_filtered_view() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;

    for (roll_no, department) in [("144", "Computing"), ("145", "Electrical")] {
        let req = test::TestRequest::post()
            .uri("/students")
            .set_json(student_body(roll_no, department))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 201);
    }

    let req = test::TestRequest::post()
        .uri("/engagement-results")
        .set_json(json!({ "video_name": "144.mp4", "frames": frames_body(9, 1) }))
        .to_request();
    let saved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(saved["roll_no"], "144");
    assert_eq!(saved["final_engagement_status"], "Engaged");
    assert_eq!(saved["engagement_category"], "Very High Engagement");
    assert_eq!(saved["engagement_percentage"], 90.0);

    let req = test::TestRequest::get()
        .uri("/engagement-results?department=Computing")
        .to_request();
    let view: Value = test::call_and_read_body_json(&app, req).await;
    let rows = view.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["roll_no"], "144");
    assert_eq!(rows[0]["results"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri("/students/filters").to_request();
    let options: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(options["departments"], json!(["Computing", "Electrical"]));
}

#[actix_web::test]
async fn student_endpoints_validate_and_update() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;

    let mut incomplete = student_body("200", "Computing");
    incomplete["teacher"] = json!("");
    let req = test::TestRequest::post().uri("/students").set_json(incomplete).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "All fields are required");

    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(student_body("200", "Computing"))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/students/{}", id))
        .set_json(student_body("200", "Mechanical"))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["department"], "Mechanical");

    let req = test::TestRequest::delete().uri(&format!("/students/{}", id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    let req = test::TestRequest::get().uri("/students").to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn unreachable_backend_is_a_bad_gateway() {
    let app = test::init_service(App::new().app_data(state().await).configure(api::configure)).await;
    let req = test::TestRequest::get()
        .uri("/analysis-result?video_name=144.mp4")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 502);
}

#[::core::prelude::v1::test]
fn neutral_frames_do_not_count_for_binary_sessions() {
    let frames = frames_from_statuses(&["Neutral", "Engaged"]);
    let summary = EngagementSummarizer::new().summarize(&frames, &CategorySet::binary());
    assert_eq!(summary.counts.get(EngagementStatus::Neutral), None);
    assert_eq!(summary.total, 1);
}

#[::core::prelude::v1::test]
fn csv_file_summarizes_into_a_report() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "frame,engagement_status").unwrap();
    for (i, label) in ["Engaged", "Engaged", "Distracted", "Neutral", "Engaged"].iter().enumerate() {
        writeln!(file, "{},{}", i + 1, label).unwrap();
    }
    file.flush().unwrap();

    let frames = load_frames_csv(file.path()).unwrap();
    assert_eq!(frames.len(), 5);

    let report = AnalysisContext::new(CategorySet::binary(), 2).report(&frames);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.engagement_percentage, 75.0);
    assert_eq!(report.summary.overall_status, OverallStatus::Engaged);
    assert_eq!(report.summary.severity_category, SeverityCategory::High);
    assert_eq!(report.charts.timeline.len(), 5);
    assert_eq!(report.charts.heatmap.rows.len(), 3);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["summary"]["counts"], json!({ "Engaged": 3, "Distracted": 1 }));
}
