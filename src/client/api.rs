use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::donor::{Activity, Donor, DonorSubmission, Id, Stats};

/// Enumerates the ways a call to the donor API can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response.
    #[error("network error")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// The server answered with an error status, and possibly a message.
    #[error("API error ({status})")]
    Api { status: u16, message: Option<String> },

    #[error("invalid URL")]
    Url {
        #[from]
        source: url::ParseError,
    },
}

impl ClientError {
    /// The message the server sent along with the error, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// What the search form sends. Empty values are left out of the query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFilter {
    pub blood_group: String,
    pub city: String,
}

impl SearchFilter {
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();

        if !self.blood_group.is_empty() {
            pairs.push(("bloodGroup", self.blood_group.as_str()));
        }

        let city = self.city.trim();
        if !city.is_empty() {
            pairs.push(("city", city));
        }

        pairs
    }
}

/// The calls the pages make.
pub trait DonorApi {
    fn stats(&self) -> BoxFuture<Result<Stats, ClientError>>;

    fn recent_activity(&self) -> BoxFuture<Result<Vec<Activity>, ClientError>>;

    fn list(&self, filter: &SearchFilter) -> BoxFuture<Result<Vec<Donor>, ClientError>>;

    fn register(&self, submission: &DonorSubmission) -> BoxFuture<Result<Id, ClientError>>;

    fn delete(&self, id: Id) -> BoxFuture<Result<(), ClientError>>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct CreationBody {
    #[serde(rename = "donorId")]
    donor_id: Id,
}

/// Talks to the API over HTTP.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
}

impl HttpApi {
    /// `base` is the API root, e.g. `http://localhost:3001/api/`.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        HttpApi {
            client: Client::new(),
            base,
        }
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl DonorApi for HttpApi {
    fn stats(&self) -> BoxFuture<Result<Stats, ClientError>> {
        async move {
            let response = self.client.get(self.url("donors/stats")?).send().await?;

            Ok(check(response).await?.json().await?)
        }
        .boxed()
    }

    fn recent_activity(&self) -> BoxFuture<Result<Vec<Activity>, ClientError>> {
        async move {
            let response = self
                .client
                .get(self.url("donors/recent-activity")?)
                .send()
                .await?;

            Ok(check(response).await?.json().await?)
        }
        .boxed()
    }

    fn list(&self, filter: &SearchFilter) -> BoxFuture<Result<Vec<Donor>, ClientError>> {
        let filter = filter.clone();

        async move {
            let mut url = self.url("donors")?;
            let pairs = filter.query_pairs();

            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs);
            }

            let response = self.client.get(url).send().await?;

            Ok(check(response).await?.json().await?)
        }
        .boxed()
    }

    fn register(&self, submission: &DonorSubmission) -> BoxFuture<Result<Id, ClientError>> {
        let submission = submission.clone();

        async move {
            let response = self
                .client
                .post(self.url("donors")?)
                .json(&submission)
                .send()
                .await?;

            let body: CreationBody = check(response).await?.json().await?;

            Ok(body.donor_id)
        }
        .boxed()
    }

    fn delete(&self, id: Id) -> BoxFuture<Result<(), ClientError>> {
        async move {
            let response = self
                .client
                .delete(self.url(&format!("donors/{}", id))?)
                .send()
                .await?;

            check(response).await?;

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_relative_to_the_api_root() {
        let api = HttpApi::new(Url::parse("http://localhost:3001/api").unwrap());

        assert_eq!(
            api.url("donors/stats").unwrap().as_str(),
            "http://localhost:3001/api/donors/stats"
        );
        assert_eq!(
            api.url("donors/7").unwrap().as_str(),
            "http://localhost:3001/api/donors/7"
        );
    }

    #[test]
    fn empty_filters_are_left_out() {
        assert!(SearchFilter::default().query_pairs().is_empty());

        let filter = SearchFilter {
            blood_group: "O+".to_owned(),
            city: "  Pune ".to_owned(),
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("bloodGroup", "O+"), ("city", "Pune")]
        );

        let mut url = Url::parse("http://localhost:3001/api/donors").unwrap();
        url.query_pairs_mut().extend_pairs(filter.query_pairs());
        assert_eq!(url.query(), Some("bloodGroup=O%2B&city=Pune"));
    }
}
