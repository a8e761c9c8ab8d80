//! Caller identity from trusted request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Identity, RestaurantId, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const RESTAURANT_HEADER: &str = "x-restaurant-id";

/// The identity attached by the upstream identity provider.
///
/// Values are trusted as given; no authentication happens here.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

impl Caller {
    pub fn restaurant_id(&self) -> RestaurantId {
        self.0.restaurant_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?;
        let role = header(parts, ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;
        let restaurant_id = RestaurantId::parse(header(parts, RESTAURANT_HEADER)?)
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {RESTAURANT_HEADER}: {e}")))?;

        Ok(Caller(Identity::new(user_id, role, restaurant_id)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {name} header")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Caller, ApiError> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_all_three_headers() {
        let restaurant_id = RestaurantId::new();
        let request = Request::builder()
            .header(USER_ID_HEADER, "u-7")
            .header(ROLE_HEADER, "kitchen_staff")
            .header(RESTAURANT_HEADER, restaurant_id.to_string())
            .body(())
            .unwrap();

        let caller = extract(request).await.unwrap();
        assert_eq!(caller.0.user_id.as_str(), "u-7");
        assert_eq!(caller.role(), Role::KitchenStaff);
        assert_eq!(caller.restaurant_id(), restaurant_id);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_unknown_values() {
        let missing = Request::builder()
            .header(USER_ID_HEADER, "u-7")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(missing).await,
            Err(ApiError::Unauthenticated(_))
        ));

        let unknown_role = Request::builder()
            .header(USER_ID_HEADER, "u-7")
            .header(ROLE_HEADER, "chef")
            .header(RESTAURANT_HEADER, RestaurantId::new().to_string())
            .body(())
            .unwrap();
        assert!(matches!(
            extract(unknown_role).await,
            Err(ApiError::Unauthenticated(_))
        ));
    }
}
