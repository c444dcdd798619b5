use crate::routes::downloads::DownloadsApi;
use crate::routes::health::HealthApi;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "ytmp3-server",
    description = "Download YouTube videos as MP3 files"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(HealthApi::openapi());
    root.merge(DownloadsApi::openapi());
    root
}
