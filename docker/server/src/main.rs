// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use medai_inference::{
    DetectorBackend, DetectorConfig, EstimatorConfig, ImageInput, Keypoint, PoseCatalog,
    PoseEstimate, PoseEstimator, PoseSnapshot, ReferencePose, ReferenceSource, lookup_medication,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

// Shared application state
struct AppState {
    estimator: Arc<PoseEstimator>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// Body of POST /api/yoga/estimate
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct EstimateRequest {
    /// Base64 image, optionally a `data:image/...;base64,` URI
    image: Option<String>,
    /// Pose id from the catalogue, e.g. "2-1"
    pose_id: Option<String>,
}

// Body of POST /api/yoga/feedback
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest {
    /// Base64 image, optionally a `data:image/...;base64,` URI
    image: Option<String>,
    /// Pose id from the catalogue
    pose_id: Option<String>,
    /// Last feedback of the session
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
struct MedicationParams {
    /// Medication name, matched case-insensitively
    name: Option<String>,
}

// Position in normalized image coordinates
#[derive(Serialize, ToSchema)]
struct PositionData {
    /// X coordinate in 0..1
    x: f32,
    /// Y coordinate in 0..1
    y: f32,
}

// Keypoint as `{part, position: {x, y}, score}`
#[derive(Serialize, ToSchema)]
struct KeypointData {
    /// Body part name, e.g. "left_shoulder"
    part: String,
    position: PositionData,
    /// Landmark confidence (0.0 - 1.0)
    score: f32,
}

impl From<&Keypoint> for KeypointData {
    fn from(kp: &Keypoint) -> Self {
        Self {
            part: kp.part.as_str().to_string(),
            position: PositionData {
                x: kp.position.x,
                y: kp.position.y,
            },
            score: kp.score,
        }
    }
}

fn keypoint_list(snapshot: &PoseSnapshot) -> Vec<KeypointData> {
    snapshot.iter().map(KeypointData::from).collect()
}

#[derive(Serialize, ToSchema)]
struct EstimateData {
    pose_id: String,
    /// Similarity to the reference pose (0 - 100)
    accuracy: f32,
    /// Detected keypoints
    keypoints: Vec<KeypointData>,
    /// Reference keypoints the detection was scored against
    reference_keypoints: Vec<KeypointData>,
}

impl From<&PoseEstimate> for EstimateData {
    fn from(estimate: &PoseEstimate) -> Self {
        Self {
            pose_id: estimate.pose_id.clone(),
            accuracy: estimate.accuracy,
            keypoints: keypoint_list(&estimate.keypoints),
            reference_keypoints: keypoint_list(&estimate.reference_keypoints),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct EstimateResponse {
    success: bool,
    data: EstimateData,
}

#[derive(Serialize, ToSchema)]
struct FeedbackResponse {
    success: bool,
    /// Coaching text, or a fallback sentence when the model is unavailable
    feedback: String,
}

#[derive(Serialize, ToSchema)]
struct PoseInfo {
    pose_id: String,
    title: String,
    description: String,
}

#[derive(Serialize, ToSchema)]
struct PosesResponse {
    success: bool,
    data: Vec<PoseInfo>,
}

#[derive(Serialize, ToSchema)]
struct ReferenceData {
    pose_id: String,
    title: Option<String>,
    /// "generated" or "preset"
    source: String,
    keypoints: Vec<KeypointData>,
}

impl From<&ReferencePose> for ReferenceData {
    fn from(reference: &ReferencePose) -> Self {
        let source = match reference.source {
            ReferenceSource::Generated => "generated",
            ReferenceSource::Preset => "preset",
        };
        Self {
            pose_id: reference.pose_id.clone(),
            title: reference.title.clone(),
            source: source.to_string(),
            keypoints: keypoint_list(&reference.keypoints),
        }
    }
}

#[derive(Serialize, ToSchema)]
struct ReferenceResponse {
    success: bool,
    data: ReferenceData,
}

#[derive(Serialize, ToSchema)]
struct MedicationData {
    /// Name as given in the query
    name: String,
    active_ingredient: String,
    dosage_forms: String,
    usage: String,
    side_effects: String,
    warnings: String,
    interactions: String,
    pregnancy_category: String,
}

#[derive(Serialize, ToSchema)]
struct MedicationResponse {
    success: bool,
    data: MedicationData,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    /// Error message
    error: String,
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Server status
    status: String,
    message: String,
}

// OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MEDAI Server",
        description = "Prenatal yoga pose estimation, coaching feedback and medication reference API.\n\n## Images\nJSON endpoints accept base64 images with or without a `data:image/...;base64,` prefix. The multipart endpoint expects an `image` field.",
        version = "0.1.0",
        license(name = "AGPL-3.0", url = "https://github.com/ultralytics/inference/blob/main/LICENSE")
    ),
    paths(root, health, poses, reference, estimate, estimate_upload, feedback, medication_info),
    components(schemas(
        EstimateRequest,
        FeedbackRequest,
        PositionData,
        KeypointData,
        EstimateData,
        EstimateResponse,
        FeedbackResponse,
        PoseInfo,
        PosesResponse,
        ReferenceData,
        ReferenceResponse,
        MedicationData,
        MedicationResponse,
        ErrorResponse,
        HealthResponse
    )),
    tags(
        (name = "yoga", description = "Pose estimation and feedback"),
        (name = "medication", description = "Medication reference table"),
        (name = "health", description = "Health check endpoints")
    )
)]
struct ApiDoc;

fn detector_config_from_env() -> DetectorConfig {
    let backend = match env::var("DETECTOR_BACKEND") {
        Ok(value) => value.parse().unwrap_or_else(|err| {
            tracing::warn!("{err}; using the fallback detector");
            DetectorBackend::None
        }),
        Err(_) => DetectorBackend::None,
    };
    let mut config = DetectorConfig::new().with_backend(backend);
    if let Ok(path) = env::var("MODEL_PATH") {
        config = config.with_model(path);
    }
    config
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EstimatorConfig::from_env().with_detector(detector_config_from_env());
    if config.chat.api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; references and feedback will use fallbacks");
    }

    let estimator = PoseEstimator::from_config(&config);
    tracing::info!("Detector: {}", estimator.detector_name());

    let state = Arc::new(AppState {
        estimator: Arc::new(estimator),
    });

    let app = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/yoga/poses", get(poses))
        .route("/api/yoga/reference/{pose_id}", get(reference))
        .route("/api/yoga/estimate", post(estimate))
        .route("/api/yoga/estimate/{pose_id}", post(estimate_upload))
        .route("/api/yoga/feedback", post(feedback))
        .route("/api/medication/info", get(medication_info))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state);

    let port = env::var("PORT").unwrap_or_else(|_| "5001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Server listening on {addr}");
    tracing::info!("Swagger UI available at http://localhost:{port}/swagger-ui/");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Run the estimation chain on the blocking pool.
async fn run_estimate(
    estimator: Arc<PoseEstimator>,
    image: ImageInput,
    pose_id: String,
) -> Result<PoseEstimate, ApiError> {
    tokio::task::spawn_blocking(move || estimator.estimate_pose(&image, &pose_id))
        .await
        .map_err(|e| internal_error(format!("Estimation task failed: {e}")))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(format!("Missing '{field}' field")))
}

/// Root endpoint
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Welcome message", body = String)
    )
)]
async fn root() -> &'static str {
    "MEDAI Server - POST /api/yoga/estimate with a base64 image. Swagger UI at /swagger-ui/"
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "MEDAI AI server is running".to_string(),
    })
}

/// List supported poses
#[utoipa::path(
    get,
    path = "/api/yoga/poses",
    tag = "yoga",
    responses(
        (status = 200, description = "Pose catalogue", body = PosesResponse)
    )
)]
async fn poses() -> Json<PosesResponse> {
    let data = PoseCatalog::default()
        .entries()
        .iter()
        .map(|entry| PoseInfo {
            pose_id: entry.pose_id.to_string(),
            title: entry.title.to_string(),
            description: entry.description.to_string(),
        })
        .collect();
    Json(PosesResponse { success: true, data })
}

/// Reference pose for a pose id
///
/// Generated on first use and cached for the lifetime of the server. Unknown
/// ids and generation failures return a hardcoded preset.
#[utoipa::path(
    get,
    path = "/api/yoga/reference/{pose_id}",
    tag = "yoga",
    params(("pose_id" = String, Path, description = "Pose id, e.g. 2-1")),
    responses(
        (status = 200, description = "Reference pose", body = ReferenceResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn reference(
    State(state): State<Arc<AppState>>,
    Path(pose_id): Path<String>,
) -> Result<Json<ReferenceResponse>, ApiError> {
    let estimator = Arc::clone(&state.estimator);
    let reference = tokio::task::spawn_blocking(move || estimator.references().get_reference(&pose_id))
        .await
        .map_err(|e| internal_error(format!("Reference task failed: {e}")))?;
    Ok(Json(ReferenceResponse {
        success: true,
        data: ReferenceData::from(reference.as_ref()),
    }))
}

/// Estimate a pose from a base64 image
///
/// Undecodable images are not an error: the response carries a neutral score
/// of 50 with the fallback standing pose.
#[utoipa::path(
    post,
    path = "/api/yoga/estimate",
    tag = "yoga",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Estimation result", body = EstimateResponse),
        (status = 400, description = "Missing image or poseId", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn estimate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, ApiError> {
    let image = required(request.image, "image")?;
    let pose_id = required(request.pose_id, "poseId")?;

    let result = run_estimate(Arc::clone(&state.estimator), ImageInput::from(image), pose_id).await?;
    Ok(Json(EstimateResponse {
        success: true,
        data: EstimateData::from(&result),
    }))
}

/// Estimate a pose from an uploaded image file
#[utoipa::path(
    post,
    path = "/api/yoga/estimate/{pose_id}",
    tag = "yoga",
    params(("pose_id" = String, Path, description = "Pose id, e.g. 2-1")),
    request_body(content_type = "multipart/form-data", description = "Image file in the 'image' field"),
    responses(
        (status = 200, description = "Estimation result", body = EstimateResponse),
        (status = 400, description = "Missing 'image' field", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn estimate_upload(
    State(state): State<Arc<AppState>>,
    Path(pose_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<EstimateResponse>, ApiError> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("Failed to read field: {e}")))?;

            let result =
                run_estimate(Arc::clone(&state.estimator), ImageInput::from(data.to_vec()), pose_id).await?;
            return Ok(Json(EstimateResponse {
                success: true,
                data: EstimateData::from(&result),
            }));
        }
    }

    Err(bad_request("Missing 'image' field"))
}

/// Coaching feedback for a pose image
///
/// Always answers with text. When the chat service is unavailable the text is a
/// fixed fallback sentence.
#[utoipa::path(
    post,
    path = "/api/yoga/feedback",
    tag = "yoga",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback text", body = FeedbackResponse),
        (status = 400, description = "Missing image or poseId", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let image = ImageInput::from(required(request.image, "image")?);
    let pose_id = required(request.pose_id, "poseId")?;
    let is_final = request.is_final;

    let estimator = Arc::clone(&state.estimator);
    let feedback = tokio::task::spawn_blocking(move || estimator.pose_feedback(&image, &pose_id, is_final))
        .await
        .map_err(|e| internal_error(format!("Feedback task failed: {e}")))?;
    Ok(Json(FeedbackResponse {
        success: true,
        feedback,
    }))
}

/// Medication reference lookup
#[utoipa::path(
    get,
    path = "/api/medication/info",
    tag = "medication",
    params(MedicationParams),
    responses(
        (status = 200, description = "Medication found", body = MedicationResponse),
        (status = 400, description = "Missing name", body = ErrorResponse),
        (status = 404, description = "Medication not found", body = ErrorResponse)
    )
)]
async fn medication_info(
    Query(params): Query<MedicationParams>,
) -> Result<Json<MedicationResponse>, ApiError> {
    let name = required(params.name, "name")?;
    let Some(info) = lookup_medication(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Medication not found".to_string(),
            }),
        ));
    };

    Ok(Json(MedicationResponse {
        success: true,
        data: MedicationData {
            name,
            active_ingredient: info.active_ingredient.to_string(),
            dosage_forms: info.dosage_forms.to_string(),
            usage: info.usage.to_string(),
            side_effects: info.side_effects.to_string(),
            warnings: info.warnings.to_string(),
            interactions: info.interactions.to_string(),
            pregnancy_category: info.pregnancy_category.to_string(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medai_inference::presets::{mountain_pose, neutral_standing};

    fn sample_estimate() -> PoseEstimate {
        PoseEstimate {
            pose_id: "1-1".to_string(),
            accuracy: 72.5,
            keypoints: neutral_standing(),
            reference_keypoints: mountain_pose(),
        }
    }

    #[test]
    fn test_estimate_keypoints_nest_position() {
        let response = EstimateResponse {
            success: true,
            data: EstimateData::from(&sample_estimate()),
        };
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["pose_id"], "1-1");
        let first = &body["data"]["keypoints"][0];
        assert_eq!(first["part"], "nose");
        assert!(first["position"]["x"].is_number());
        assert!(first["position"]["y"].is_number());
        assert!(first["score"].is_number());
        assert!(first.get("x").is_none());
        assert!(body["data"]["reference_keypoints"][16]["position"]["y"].is_number());
        assert_eq!(body["data"]["keypoints"].as_array().unwrap().len(), 17);
    }

    #[test]
    fn test_server_keypoint_matches_library_json() {
        let estimate = sample_estimate();
        let data = EstimateData::from(&estimate);
        let ours = serde_json::to_value(&data.keypoints).unwrap();
        let library = serde_json::to_value(&estimate.keypoints).unwrap();
        assert_eq!(ours, library);
    }

    #[test]
    fn test_reference_keypoints_nest_position() {
        let reference = ReferencePose::preset("2-1", Some("Warrior II"));
        let body = serde_json::to_value(ReferenceData::from(&reference)).unwrap();
        assert_eq!(body["source"], "preset");
        assert!(body["keypoints"][5]["position"]["x"].is_number());
    }

    #[tokio::test]
    async fn test_medication_echoes_queried_name() {
        let params = MedicationParams {
            name: Some("aricept".to_string()),
        };
        let Json(response) = medication_info(Query(params)).await.unwrap_or_else(|(status, _)| {
            panic!("unexpected status {status}");
        });
        assert!(response.success);
        assert_eq!(response.data.name, "aricept");
        assert_eq!(response.data.active_ingredient, "Donepezil");
    }

    #[tokio::test]
    async fn test_medication_missing_and_unknown() {
        let Err((status, _)) = medication_info(Query(MedicationParams { name: None })).await else {
            panic!("expected an error");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let params = MedicationParams {
            name: Some("Tylenol".to_string()),
        };
        let Err((status, Json(error))) = medication_info(Query(params)).await else {
            panic!("expected an error");
        };
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error.error, "Medication not found");
    }
}
