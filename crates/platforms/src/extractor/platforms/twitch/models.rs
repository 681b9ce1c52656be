use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GqlResponse {
    pub data: Option<GqlData>,
    #[serde(default)]
    pub errors: Option<Vec<GqlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GqlData {
    pub user: Option<GqlUser>,
}

#[derive(Debug, Deserialize)]
pub struct GqlUser {
    pub stream: Option<GqlStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GqlStream {
    #[serde(rename = "type")]
    pub stream_type: Option<String>,
    pub title: Option<String>,
    pub viewers_count: Option<i64>,
    pub created_at: Option<String>,
    pub game: Option<GqlGame>,
}

#[derive(Debug, Deserialize)]
pub struct GqlGame {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GqlError {
    pub message: Option<String>,
}
