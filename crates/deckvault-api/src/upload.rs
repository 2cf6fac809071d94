//! Multipart upload intake.

use axum::Json;
use axum::extract::{Multipart, State};
use deckvault_core::{StagedFile, normalize_folder_id};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::ApiState;

/// Body returned when an upload has been organized.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded and organized successfully!";

/// Body returned when the form is missing the file or a usable folder id.
pub const UPLOAD_REJECTED_MESSAGE: &str = "Please select a file and enter a valid folder ID.";

const FIELD_FILE: &str = "ppt_file";
const FIELD_FOLDER: &str = "parent_folder_id";

struct UploadForm {
    file_name: String,
    payload: Vec<u8>,
    destination_folder_id: String,
}

/// `POST /upload`: stage the presentation and organize it inline.
pub(crate) async fn upload(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = parse_form(multipart).await?;

    let staged = StagedFile::stage(&form.file_name, &form.payload)
        .await
        .map_err(|err| {
            warn!(error = %err, "failed to stage an upload");
            ApiError::internal("failed to stage the uploaded file")
        })?;

    info!(
        file = %staged.name(),
        destination = %form.destination_folder_id,
        bytes = form.payload.len(),
        "organizing an interactive upload"
    );

    state
        .store
        .organize(&staged, &form.destination_folder_id)
        .await
        .map_err(|err| {
            warn!(
                file = %staged.name(),
                destination = %form.destination_folder_id,
                error = %err,
                "interactive upload failed"
            );
            ApiError::from(err)
        })?;

    Ok(Json(json!({ "message": UPLOAD_SUCCESS_MESSAGE })))
}

/// Pull the file and folder id out of the form, rejecting anything unusable
/// with the caller-facing message.
async fn parse_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(format!("malformed multipart body: {err}")))?
    {
        match field.name() {
            Some(FIELD_FILE) => {
                let name = field.file_name().unwrap_or("upload.bin").to_string();
                let payload = field
                    .bytes()
                    .await
                    .map_err(|err| {
                        ApiError::bad_request(format!("failed to read upload body: {err}"))
                    })?
                    .to_vec();
                file = Some((name, payload));
            }
            Some(FIELD_FOLDER) => {
                let value = field.text().await.map_err(|err| {
                    ApiError::bad_request(format!("failed to read folder id: {err}"))
                })?;
                folder = Some(value);
            }
            // Unknown fields are ignored, matching lenient form handling.
            _ => {}
        }
    }

    let Some((file_name, payload)) = file else {
        return Err(ApiError::bad_request(UPLOAD_REJECTED_MESSAGE));
    };
    if payload.is_empty() {
        return Err(ApiError::bad_request(UPLOAD_REJECTED_MESSAGE));
    }
    let Some(raw_folder) = folder else {
        return Err(ApiError::bad_request(UPLOAD_REJECTED_MESSAGE));
    };
    let destination_folder_id = normalize_folder_id(&raw_folder)
        .map_err(|_| ApiError::bad_request(UPLOAD_REJECTED_MESSAGE))?;

    Ok(UploadForm {
        file_name,
        payload,
        destination_folder_id,
    })
}
