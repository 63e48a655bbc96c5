use std::io::Write;

use chrono::{DateTime, Utc};
use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
    AsExpression, FromSqlRow,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::users;

#[derive(Deserialize, Serialize, Debug, AsExpression, FromSqlRow, TS, Copy, Clone, ToSchema)]
#[diesel(sql_type = crate::schema::sql_types::Userrole)]
#[repr(u32)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

impl ToSql<crate::schema::sql_types::Userrole, Pg> for UserRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            UserRole::Admin => out.write_all(b"admin"),
            UserRole::User => out.write_all(b"user"),
        }?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::Userrole, Pg> for UserRole {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"admin" => Ok(UserRole::Admin),
            b"user" => Ok(UserRole::User),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(Insertable, Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub displayname: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Validate, Deserialize, ToSchema, TS)]
pub struct CreateUser {
    #[garde(length(min = 5, max = 60))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8))]
    pub password: String,
}

#[derive(Deserialize, Serialize, ToSchema, TS)]
#[ts(export)]
pub struct CreateUserResponse {
    pub user_id: Uuid,
}

#[derive(Validate, Deserialize, ToSchema, TS)]
pub struct UserLogin {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct UserResponseBrief {
    pub id: Uuid,
    pub displayname: String,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<User> for UserResponseBrief {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            displayname: user.displayname,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_accepts_well_formed_payload() {
        let payload = CreateUser {
            username: String::from("ferris"),
            email: String::from("ferris@example.com"),
            password: String::from("correct horse"),
        };

        assert!(payload.validate(&()).is_ok());
    }

    #[test]
    fn create_user_rejects_malformed_email() {
        let payload = CreateUser {
            username: String::from("ferris"),
            email: String::from("not-an-email"),
            password: String::from("correct horse"),
        };

        assert!(payload.validate(&()).is_err());
    }

    #[test]
    fn create_user_rejects_short_password() {
        let payload = CreateUser {
            username: String::from("ferris"),
            email: String::from("ferris@example.com"),
            password: String::from("short"),
        };

        assert!(payload.validate(&()).is_err());
    }
}
