use reqwest::{Method, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;

use crate::error::Error;

use super::{RemoteClient, send_json};

#[derive(Serialize, Debug)]
pub struct SubmitRating<'a> {
    pub chapter_id: &'a str,
    pub rating: f64,
}

#[derive(Deserialize, Debug, Default)]
pub struct SubmitRatingResponse {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub new_average: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct MyRating {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub rating: Option<f64>,
}

#[tracing::instrument(name = "[POST] ratings", skip(client, auth))]
pub async fn submit(
    client: &RemoteClient,
    auth: &HeaderMap,
    rating: &SubmitRating<'_>,
) -> Result<SubmitRatingResponse, Error> {
    send_json(client.request(Method::POST, "/ratings/", auth).json(rating)).await
}

#[tracing::instrument(name = "[GET] ratings my_rating", skip(client, auth))]
pub async fn my_rating(
    client: &RemoteClient,
    auth: &HeaderMap,
    chapter_id: &str,
) -> Result<MyRating, Error> {
    send_json(
        client
            .request(Method::GET, "/ratings/my_rating/", auth)
            .query(&[("chapter", chapter_id)]),
    )
    .await
}
