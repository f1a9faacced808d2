//! Identity propagation between services: a well-known metadata key carries
//! the acting user id on every RPC, with a request-extension fallback for
//! in-process callers.

use tonic::metadata::MetadataValue;
use tonic::{Request, Status};
use uuid::Uuid;

/// Metadata key carrying the acting user id on inter-service RPCs.
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// In-process fallback for callers that never touch the wire (local callers
/// and tests). Insert into the request extensions before dispatch.
#[derive(Debug, Clone)]
pub struct LocalUserId(pub String);

/// Resolves the acting user: metadata first, extension fallback second.
/// Missing or malformed identifiers yield `Unauthenticated`.
pub fn user_id_from_request<T>(request: &Request<T>) -> Result<Uuid, Status> {
    if let Some(value) = request.metadata().get(USER_ID_METADATA_KEY) {
        if let Ok(raw) = value.to_str() {
            if let Ok(user_id) = Uuid::parse_str(raw.trim()) {
                return Ok(user_id);
            }
        }
    }

    match request.extensions().get::<LocalUserId>() {
        Some(LocalUserId(raw)) => Uuid::parse_str(raw.trim())
            .map_err(|_| Status::unauthenticated("user_id is missing or invalid")),
        None => Err(Status::unauthenticated("user_id is missing or invalid")),
    }
}

/// Stamps the user id onto an outgoing request's metadata.
pub fn attach_user_id<T>(request: &mut Request<T>, user_id: &Uuid) {
    if let Ok(value) = MetadataValue::try_from(user_id.to_string()) {
        request.metadata_mut().insert(USER_ID_METADATA_KEY, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "11111111-1111-1111-1111-111111111111";

    #[test]
    fn resolves_user_from_metadata() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(USER_ID_METADATA_KEY, USER.parse().unwrap());

        let user_id = user_id_from_request(&request).unwrap();
        assert_eq!(user_id.to_string(), USER);
    }

    #[test]
    fn falls_back_to_local_extension() {
        let mut request = Request::new(());
        request.extensions_mut().insert(LocalUserId(USER.to_string()));

        let user_id = user_id_from_request(&request).unwrap();
        assert_eq!(user_id.to_string(), USER);
    }

    #[test]
    fn malformed_metadata_falls_back_to_extension() {
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert(USER_ID_METADATA_KEY, "not-a-uuid".parse().unwrap());
        request.extensions_mut().insert(LocalUserId(USER.to_string()));

        let user_id = user_id_from_request(&request).unwrap();
        assert_eq!(user_id.to_string(), USER);
    }

    #[test]
    fn missing_identity_is_unauthenticated() {
        let request = Request::new(());

        let err = user_id_from_request(&request).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn malformed_extension_is_unauthenticated() {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(LocalUserId("not-a-uuid".to_string()));

        let err = user_id_from_request(&request).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }

    #[test]
    fn attach_then_resolve_round_trips() {
        let user_id = Uuid::parse_str(USER).unwrap();
        let mut request = Request::new(());
        attach_user_id(&mut request, &user_id);

        assert_eq!(user_id_from_request(&request).unwrap(), user_id);
    }
}
