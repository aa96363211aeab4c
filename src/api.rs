use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;

use crate::backend::{AnalysisClient, AnalysisContext};
use crate::data::{frames_from_raw, roll_no_from_video_name};
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::model::{CategorySet, EngagementResult, RawFrame, ResultFilters, StudentInput};

pub struct AppState {
    pub db: Database,
    pub client: AnalysisClient,
    pub categories: CategorySet,
    pub heatmap_bucket: usize,
}

impl AppState {
    fn context(&self, track_neutral: Option<bool>) -> AnalysisContext {
        let categories = match track_neutral {
            Some(flag) => CategorySet::from_flag(flag),
            None => self.categories.clone(),
        };
        AnalysisContext::new(categories, self.heatmap_bucket)
    }
}

#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub frames: Vec<RawFrame>,
    #[serde(default)]
    pub track_neutral: Option<bool>,
}

#[derive(Deserialize)]
pub struct AnalysisQuery {
    pub video_name: String,
}

#[derive(Deserialize)]
pub struct SaveResultRequest {
    pub video_name: String,
    #[serde(default)]
    pub frames: Vec<RawFrame>,
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Engagement Dashboard API is running!")
}

async fn summarize(req: web::Json<SummarizeRequest>, state: web::Data<AppState>) -> HttpResponse {
    let frames = frames_from_raw(&req.frames);
    let report = state.context(req.track_neutral).report(&frames);
    HttpResponse::Ok().json(report)
}

async fn analysis_result(
    query: web::Query<AnalysisQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if query.video_name.trim().is_empty() {
        return Err(AppError::Validation("video_name is required".to_string()));
    }
    let context = state.context(None).for_video(query.video_name.clone());
    let report = state.client.fetch_report(&context).await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn save_engagement_result(
    req: web::Json<SaveResultRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if req.frames.is_empty() {
        return Err(AppError::Validation("No results available to save.".to_string()));
    }

    let roll_no = roll_no_from_video_name(&req.video_name);
    let frames = frames_from_raw(&req.frames);
    let report = state.context(None).for_video(req.video_name.clone()).report(&frames);
    let result = EngagementResult::from_summary(roll_no, &report.summary);

    info!(
        "Saving engagement result for video: {} with status: {}, category: {}, and engagement percentage: {}",
        req.video_name,
        result.final_engagement_status.as_str(),
        result.engagement_category,
        result.engagement_percentage
    );
    state.db.save_engagement_result(&result).await?;

    Ok(HttpResponse::Created().json(result))
}

async fn engagement_results(
    filters: web::Query<ResultFilters>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let results = state.db.get_student_results(&filters).await?;
    Ok(HttpResponse::Ok().json(results))
}

async fn list_students(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.db.get_students().await?))
}

async fn add_student(
    req: web::Json<StudentInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let student = state.db.add_student(&req).await?;
    Ok(HttpResponse::Created().json(student))
}

async fn update_student(
    path: web::Path<i64>,
    req: web::Json<StudentInput>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let student = state.db.update_student(path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(student))
}

async fn delete_student(path: web::Path<i64>, state: web::Data<AppState>) -> Result<HttpResponse> {
    state.db.delete_student(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn filter_options(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.db.get_filter_options().await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/summarize", web::post().to(summarize))
        .route("/analysis-result", web::get().to(analysis_result))
        .route("/engagement-results", web::post().to(save_engagement_result))
        .route("/engagement-results", web::get().to(engagement_results))
        .route("/students/filters", web::get().to(filter_options))
        .route("/students", web::get().to(list_students))
        .route("/students", web::post().to(add_student))
        .route("/students/{id}", web::put().to(update_student))
        .route("/students/{id}", web::delete().to(delete_student));
}
