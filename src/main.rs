use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    BoxError, Json, Router,
};
use futures::{Stream, TryStreamExt};
use hls_ladder::{FfmpegEngine, JobResult, TranscodeService, TranscoderConfig, Upload};
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::{fs::File, io::BufWriter};
use tokio_util::io::StreamReader;
use tracing::{info, warn};

type AppState = Arc<TranscodeService<FfmpegEngine>>;

/// Multipart field carrying the source video.
const UPLOAD_FIELD: &str = "video";

#[tokio::main]
async fn main() {
    let config = TranscoderConfig::from_env();

    tracing_subscriber::fmt::init();

    tokio::fs::create_dir_all(&config.raw_dir)
        .await
        .expect("Failed to create raw upload directory");

    let engine = Arc::new(FfmpegEngine::from_config(&config));
    let service: AppState = Arc::new(TranscodeService::new(config.clone(), engine));

    let app = Router::new()
        .route("/transcode", post(transcode_upload))
        .layer(DefaultBodyLimit::disable())
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    info!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}

// Reserves the job, stores the uploaded video in the raw directory, then runs
// the job to completion.
async fn transcode_upload(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = if let Some(file_name) = field.file_name() {
            file_name.to_owned()
        } else {
            continue;
        };

        // Rejected names and duplicates never touch the raw directory.
        let ticket = match service.begin(Some(Upload::new(file_name))) {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!("Rejected upload: {}", e);
                return respond(e.into());
            }
        };

        info!("Saving upload to {:?}", ticket.raw_path());
        if let Err((status, message)) = stream_to_file(ticket.raw_path(), field).await {
            return (status, Json(json!({ "message": message })));
        }

        return respond(service.start(ticket).result().await);
    }

    respond(service.run(None).await)
}

fn respond(result: JobResult) -> (StatusCode, Json<Value>) {
    match result {
        JobResult::Ok {
            master_playlist_path,
        } => (
            StatusCode::OK,
            Json(json!({
                "message": "Transcoding completed",
                "masterPlaylist": master_playlist_path,
            })),
        ),
        JobResult::Error {
            message,
            status_hint,
        } => (
            StatusCode::from_u16(status_hint.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "message": message })),
        ),
    }
}

// Save a `Stream` to a file. A partially written file is removed on error.
async fn stream_to_file<S, E>(path: &Path, stream: S) -> Result<(), (StatusCode, String)>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let result = async {
        let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let mut file = BufWriter::new(File::create(path).await?);
        tokio::io::copy(&mut body_reader, &mut file).await?;
        tokio::io::AsyncWriteExt::flush(&mut file).await?;

        Ok::<_, io::Error>(())
    }
    .await;

    if let Err(err) = result {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                warn!("Error removing partial upload {:?}: {}", path, e)
            }
            _ => {}
        }
        return Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()));
    }
    Ok(())
}
