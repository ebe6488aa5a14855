use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Client;
use serde::{Deserialize, Serialize};

use crate::db::mongo::DB_NAME;
use crate::middleware::auth::{jwt_secret, Claims};
use crate::models::account::{AdminUser, SigninRequest, UserRole};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    auth_token: String,
}

/*
    POST /api/auth/signin — back-office sign-in for the admin-guarded routes
*/
pub async fn signin(
    data: web::Data<Arc<Client>>,
    input: web::Json<SigninRequest>,
) -> impl Responder {
    let client = data.into_inner();
    let collection: mongodb::Collection<AdminUser> =
        client.database(DB_NAME).collection("Admins");

    let input = input.into_inner();
    let email = input.email.trim().to_lowercase();

    match collection.find_one(doc! { "email": &email }).await {
        Ok(Some(user)) => {
            if bcrypt::verify(&input.password, &user.password).unwrap_or(false) {
                let user_id = match user.id {
                    Some(id) => id,
                    None => {
                        return HttpResponse::InternalServerError().body("Unable to read user id")
                    }
                };
                match generate_token(&email, user_id, user.role) {
                    Ok(token) => HttpResponse::Ok().json(TokenResponse { auth_token: token }),
                    Err(err) => {
                        eprintln!("Token generation failed: {:?}", err);
                        HttpResponse::InternalServerError().body("Token generation failed")
                    }
                }
            } else {
                HttpResponse::Unauthorized().body("Invalid credentials")
            }
        }
        Ok(None) => HttpResponse::Unauthorized().body("Invalid credentials"),
        Err(err) => {
            eprintln!("Database error: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to process signin")
        }
    }
}

fn generate_token(
    email: &str,
    user_id: ObjectId,
    role: UserRole,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(12)).timestamp() as usize,
        user_id: user_id.to_hex(),
        role: Some(
            match role {
                UserRole::Admin => "admin",
                UserRole::Staff => "staff",
            }
            .to_string(),
        ),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
}
