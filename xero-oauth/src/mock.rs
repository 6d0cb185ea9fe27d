use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use http_client::{
    http_types::{self, StatusCode},
    HttpClient, Request, Response,
};

/// Transport double answering with queued responses and recording requests.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<Recorded>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl MockTransport {
    pub fn with_responses(responses: &[(u16, &str)]) -> Self {
        let transport = Self::default();
        transport.responses.lock().unwrap().extend(
            responses
                .iter()
                .map(|(status, body)| (*status, (*body).to_string())),
        );
        transport
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl HttpClient for MockTransport {
    async fn send(&self, mut req: Request) -> Result<Response, http_types::Error> {
        let body = req.take_body().into_string().await?;
        let headers = req
            .iter()
            .map(|(name, values)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    values.last().as_str().to_string(),
                )
            })
            .collect();
        self.requests.lock().unwrap().push(Recorded {
            method: req.method().to_string(),
            url: req.url().to_string(),
            headers,
            body,
        });

        let next = self.responses.lock().unwrap().pop_front();
        let Some((status, body)) = next else {
            return Err(http_types::Error::from_str(
                StatusCode::InternalServerError,
                "no response queued",
            ));
        };
        let mut response = Response::new(status);
        response.insert_header("Content-Type", "application/json");
        response.set_body(body);
        Ok(response)
    }
}
