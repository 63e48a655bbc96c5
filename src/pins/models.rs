use std::fs;

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::models::ImageResponse,
    schema::{pin_votes, pins},
    users::models::{User, UserResponseBrief},
};

#[derive(Insertable, Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(belongs_to(User))]
#[diesel(table_name = pins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Pin {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub image_content_type: Option<String>,
    pub medium_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub user_id: Uuid,
}

impl Pin {
    pub fn into_response(self, author: UserResponseBrief, vote_count: i64) -> PinResponse {
        let content_type = self.image_content_type;

        let image = self
            .image_path
            .zip(content_type.clone())
            .map(|(path, content_type)| ImageResponse { content_type, path });

        let medium_image = self
            .medium_image_path
            .zip(content_type)
            .map(|(path, content_type)| ImageResponse { content_type, path });

        PinResponse {
            id: self.id,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
            author,
            vote_count,
            image,
            medium_image,
        }
    }
}

/// One user's upvote on one pin. The composite key is what makes
/// replayed likes no-ops.
#[derive(Insertable, Queryable, Identifiable, Associations, Selectable, Debug, Clone)]
#[diesel(belongs_to(Pin))]
#[diesel(belongs_to(User))]
#[diesel(table_name = pin_votes)]
#[diesel(primary_key(pin_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PinVote {
    pub pin_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Builder, garde::Validate, Deserialize, Debug)]
#[builder(pattern = "owned")]
pub struct PinData {
    #[garde(length(min = 1, max = 120))]
    pub title: String,
    #[garde(skip)]
    #[builder(default)]
    pub description: Option<String>,
}

impl PinData {
    #[must_use]
    pub fn builder() -> PinDataBuilder {
        PinDataBuilder::default()
    }
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreatePin {
    title: String,
    description: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<fs::File>,
}

#[derive(AsChangeset, garde::Validate, Deserialize, ToSchema, Debug, Default)]
#[diesel(table_name = pins)]
pub struct UpdatePin {
    #[garde(length(min = 1, max = 120))]
    pub title: Option<String>,
    #[garde(skip)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, TS, Debug)]
#[ts(export)]
pub struct PinResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: UserResponseBrief,
    pub vote_count: i64,
    pub image: Option<ImageResponse>,
    pub medium_image: Option<ImageResponse>,
}

#[derive(Serialize, Deserialize, ToSchema, TS, Debug)]
#[ts(export)]
pub struct VoteResponse {
    pub pin_id: Uuid,
    pub vote_count: i64,
}

#[cfg(test)]
mod tests {
    use garde::Validate;

    use super::*;

    #[test]
    fn pin_data_requires_a_title() {
        assert!(PinData::builder().build().is_err());
    }

    #[test]
    fn pin_data_rejects_empty_title() {
        let data = PinData::builder()
            .title(String::new())
            .build()
            .expect("builder");

        assert!(data.validate(&()).is_err());
    }

    #[test]
    fn update_rejects_over_long_title() {
        let changes = UpdatePin {
            title: Some("x".repeat(500)),
            description: None,
        };

        assert!(changes.validate(&()).is_err());
    }

    #[test]
    fn response_pairs_image_paths_with_content_type() {
        let author = UserResponseBrief {
            id: Uuid::now_v7(),
            displayname: String::from("Ferris"),
            username: String::from("ferris"),
            email: String::from("ferris@example.com"),
            role: crate::users::models::UserRole::User,
        };

        let pin = Pin {
            id: Uuid::now_v7(),
            title: String::from("crab"),
            description: None,
            image_path: Some(String::from("abc_crab.png")),
            image_content_type: Some(String::from("image/png")),
            medium_image_path: Some(String::from("medium_abc_crab.png")),
            created_at: Utc::now(),
            updated_at: None,
            user_id: author.id,
        };

        let response = pin.into_response(author, 3);

        assert_eq!(response.vote_count, 3);
        let image = response.image.expect("image");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.path, "abc_crab.png");
        let medium = response.medium_image.expect("medium image");
        assert_eq!(medium.path, "medium_abc_crab.png");
    }

    #[test]
    fn response_has_no_image_for_imageless_pin() {
        let author = UserResponseBrief {
            id: Uuid::now_v7(),
            displayname: String::from("Ferris"),
            username: String::from("ferris"),
            email: String::from("ferris@example.com"),
            role: crate::users::models::UserRole::User,
        };

        let pin = Pin {
            id: Uuid::now_v7(),
            title: String::from("no image"),
            description: Some(String::from("text only")),
            image_path: None,
            image_content_type: None,
            medium_image_path: None,
            created_at: Utc::now(),
            updated_at: None,
            user_id: author.id,
        };

        let response = pin.into_response(author, 0);

        assert!(response.image.is_none());
        assert!(response.medium_image.is_none());
    }
}
