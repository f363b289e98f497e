//! Contains all endpoint-associated functions. Each handler validates its
//! inputs, performs one delegated call to the object store, and maps the
//! outcome onto an HTTP status plus JSON body.
//!
//! Validation failures short-circuit before any store call and return 400
//! with a `{"status": {field: [message]}}` body. Known store outcomes
//! (already-exists, not-found) become 400 with a descriptive message; any
//! other store failure is logged and becomes a generic 500.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Query, State},
    http::{Response, StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    model::{
        list_query::{DownloadQuery, ListQuery},
        request::ClientRequest,
    },
    storage::StoreError,
};

/// Media types accepted by the upload endpoint.
const ALLOWED_UPLOAD_TYPES: [&str; 4] =
    ["text/plain", "application/pdf", "image/png", "image/jpeg"];

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string().into())
        .unwrap()
}

/// Field-level validation failure, reported before any store call is made.
fn validation_error(field: &str, message: &str) -> Response<Body> {
    json_response(
        StatusCode::BAD_REQUEST,
        json!({ "status": { field: [message] } }),
    )
}

fn internal_error() -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body("Internal Error.".into())
        .unwrap()
}

/// Joins a delete target from its folder and filename, trimmed of leading
/// and trailing separators. An empty result is not a usable delete key.
pub(crate) fn delete_key(folder: &str, filename: &str) -> String {
    let path = format!("{}/{}", folder.trim_matches('/'), filename);
    path.trim_matches('/').to_string()
}

/// Accepts the usual boolean spellings; anything else is a validation error.
fn parse_recursive(raw: Option<&str>) -> Result<bool, ()> {
    match raw {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(_) => Err(()),
    }
}

/// Creates a directory marker, refusing paths that already exist.
pub async fn make_directory(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Response<Body> {
    let Some(dir) = req.dir.filter(|d| !d.is_empty()) else {
        return validation_error("dir", "dir is required");
    };

    match state.store.exists(&dir).await {
        Ok(true) => json_response(
            StatusCode::UNAUTHORIZED,
            json!({ "status": false, "msg": "Diretório já existe!" }),
        ),
        Ok(false) => match state.store.make_directory(&dir).await {
            Ok(()) => json_response(StatusCode::CREATED, json!({ "status": true })),
            Err(e) => {
                tracing::error!("make_directory {dir}: {e}");
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("make_directory {dir}: {e}");
            internal_error()
        }
    }
}

/// Stores a multipart upload at `folder/original_filename`. Only the
/// allow-listed media types are accepted, checked before the store call.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response<Body> {
    let mut file: Option<(String, String, bytes::Bytes)> = None;
    let mut folder: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return validation_error("file", "malformed multipart body"),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let Ok(data) = field.bytes().await else {
                    return validation_error("file", "could not read file field");
                };
                file = Some((filename, content_type, data));
            }
            "folder" => folder = field.text().await.ok(),
            _ => {}
        }
    }

    let Some((filename, content_type, data)) = file else {
        return validation_error("file", "file is required");
    };
    if filename.is_empty() {
        return validation_error("file", "file must carry a filename");
    }
    if !ALLOWED_UPLOAD_TYPES.contains(&content_type.as_str()) {
        return validation_error("file", "unsupported file type");
    }
    let folder = folder.unwrap_or_default();
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        return validation_error("folder", "folder is required");
    }

    let path = format!("{folder}/{filename}");
    match state.store.store(&path, data, &content_type).await {
        Ok(()) => json_response(StatusCode::CREATED, json!({ "status": true })),
        Err(e) => {
            tracing::error!("upload {path}: {e}");
            internal_error()
        }
    }
}

/// Returns a time-limited presigned download link. The generator is never
/// called for paths that are absent from the store.
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Response<Body> {
    let Some(filepath) = query.filepath.filter(|p| !p.is_empty()) else {
        return validation_error("filepath", "filepath is required");
    };

    match state.store.exists(&filepath).await {
        Ok(false) => json_response(
            StatusCode::NOT_FOUND,
            json!({ "status": "Arquivo inexistente" }),
        ),
        Ok(true) => match state
            .store
            .download_url(&filepath, state.config.url_expires)
            .await
        {
            Ok(link) => json_response(StatusCode::OK, json!({ "link": link })),
            Err(e) => {
                tracing::error!("download {filepath}: {e}");
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("download {filepath}: {e}");
            internal_error()
        }
    }
}

enum TransferKind {
    Move,
    Copy,
}

async fn transfer(state: AppState, req: ClientRequest, kind: TransferKind) -> Response<Body> {
    let Some((src, dest)) = req.get_transfer() else {
        if req.src.as_deref().unwrap_or_default().is_empty() {
            return validation_error("src", "src is required");
        }
        return validation_error("dest", "dest is required");
    };

    let result = match kind {
        TransferKind::Move => state.store.move_object(&src, &dest).await,
        TransferKind::Copy => state.store.copy_object(&src, &dest).await,
    };

    match result {
        Ok(done) => json_response(StatusCode::OK, json!({ "sucesso": done })),
        Err(StoreError::AlreadyExists(_)) => json_response(
            StatusCode::BAD_REQUEST,
            json!({
                "status": false,
                "msg": format!("O arquivo \"{dest}\" já existe no diretório de destino."),
            }),
        ),
        Err(StoreError::NotFound(_)) => json_response(
            StatusCode::BAD_REQUEST,
            json!({
                "status": false,
                "msg": format!("Arquivo {src} não encontrado"),
            }),
        ),
        Err(e) => {
            tracing::error!("transfer {src} -> {dest}: {e}");
            internal_error()
        }
    }
}

pub async fn move_file(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Response<Body> {
    transfer(state, req, TransferKind::Move).await
}

pub async fn copy_file(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Response<Body> {
    transfer(state, req, TransferKind::Copy).await
}

/// Deletes one object addressed as `folder/filename`.
pub async fn delete_file(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Response<Body> {
    let path = delete_key(
        req.folder.as_deref().unwrap_or_default(),
        req.filename.as_deref().unwrap_or_default(),
    );
    if path.is_empty() {
        return json_response(StatusCode::BAD_REQUEST, json!({ "status": false }));
    }

    match state.store.exists(&path).await {
        Ok(false) => json_response(
            StatusCode::NOT_FOUND,
            json!({ "status": "Arquivo inexistente" }),
        ),
        Ok(true) => match state.store.delete(&path).await {
            Ok(done) => json_response(
                StatusCode::OK,
                json!({
                    "status": done,
                    "msg": format!("Arquivo {path} removido com sucesso!"),
                }),
            ),
            Err(e) => {
                tracing::error!("delete_file {path}: {e}");
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("delete_file {path}: {e}");
            internal_error()
        }
    }
}

/// Recursively deletes a directory prefix.
pub async fn delete_directory(
    State(state): State<AppState>,
    Json(req): Json<ClientRequest>,
) -> Response<Body> {
    let Some(dir) = req.directory.filter(|d| !d.is_empty()) else {
        return validation_error("directory", "directory is required");
    };

    match state.store.exists(&dir).await {
        Ok(false) => json_response(
            StatusCode::NOT_FOUND,
            json!({ "status": "Diretório não encontrado!" }),
        ),
        Ok(true) => match state.store.delete_directory(&dir).await {
            Ok(done) => json_response(StatusCode::OK, json!({ "sucesso": done })),
            Err(e) => {
                tracing::error!("delete_directory {dir}: {e}");
                internal_error()
            }
        },
        Err(e) => {
            tracing::error!("delete_directory {dir}: {e}");
            internal_error()
        }
    }
}

/// Lists files at `path`; `recursive=true` ignores `path` and walks the
/// whole bucket.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response<Body> {
    let recursive = match parse_recursive(query.recursive.as_deref()) {
        Ok(recursive) => recursive,
        Err(()) => return validation_error("recursive", "recursive must be a boolean"),
    };

    let listing = if recursive {
        state.store.all_files().await
    } else {
        state.store.files(query.path.as_deref().unwrap_or("")).await
    };

    match listing {
        Ok(files) => json_response(StatusCode::OK, json!({ "status": true, "files": files })),
        Err(e) => {
            tracing::error!("list_files: {e}");
            internal_error()
        }
    }
}

/// Lists directories at `path`, with the same recursion rule as
/// [`list_files`].
pub async fn list_directories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response<Body> {
    let recursive = match parse_recursive(query.recursive.as_deref()) {
        Ok(recursive) => recursive,
        Err(()) => return validation_error("recursive", "recursive must be a boolean"),
    };

    let listing = if recursive {
        state.store.all_directories().await
    } else {
        state
            .store
            .directories(query.path.as_deref().unwrap_or(""))
            .await
    };

    match listing {
        Ok(directories) => json_response(
            StatusCode::OK,
            json!({ "status": true, "directories": directories }),
        ),
        Err(e) => {
            tracing::error!("list_directories: {e}");
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{delete_key, parse_recursive};

    #[test]
    fn delete_key_trims_separators() {
        assert_eq!(delete_key("docs", "a.txt"), "docs/a.txt");
        assert_eq!(delete_key("/docs/", "a.txt"), "docs/a.txt");
        assert_eq!(delete_key("docs", ""), "docs");
        assert_eq!(delete_key("", ""), "");
        assert_eq!(delete_key("/", "/"), "");
    }

    #[test]
    fn recursive_accepts_boolean_spellings_only() {
        assert_eq!(parse_recursive(None), Ok(false));
        assert_eq!(parse_recursive(Some("true")), Ok(true));
        assert_eq!(parse_recursive(Some("1")), Ok(true));
        assert_eq!(parse_recursive(Some("false")), Ok(false));
        assert_eq!(parse_recursive(Some("0")), Ok(false));
        assert_eq!(parse_recursive(Some("")), Err(()));
        assert_eq!(parse_recursive(Some("yes")), Err(()));
    }
}
