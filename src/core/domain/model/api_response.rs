use serde::Deserialize;

/// The `{ "data": ... }` envelope every backend response uses.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}
