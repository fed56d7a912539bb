//! The remote collaborators the controller talks to, and their REST implementation.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{StatsSnapshot, Todo, TodoId, User},
    error::ApiError,
    protocol::{
        CreateTodoRequest, DataEnvelope, ListEnvelope, ListTodosQuery, PageInfo,
        UpdateTodoRequest,
    },
};
use tracing::debug;

use crate::{config::Settings, error::ServiceError};

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
}

#[async_trait]
pub trait TodoService: Send + Sync {
    async fn list_todos(&self, query: &ListTodosQuery) -> Result<Page<Todo>, ServiceError>;
    async fn stats(&self) -> Result<StatsSnapshot, ServiceError>;
    async fn create_todo(&self, request: &CreateTodoRequest) -> Result<Todo, ServiceError>;
    async fn update_todo(
        &self,
        id: &TodoId,
        request: &UpdateTodoRequest,
    ) -> Result<Todo, ServiceError>;
    async fn delete_todo(&self, id: &TodoId) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;
}

pub struct MissingUserDirectory;

#[async_trait]
impl UserDirectory for MissingUserDirectory {
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Err(ServiceError::other("user directory is unavailable"))
    }
}

pub struct HttpTodoService {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTodoService {
    pub fn new(settings: &Settings) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_base().to_string(),
            token: settings.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ServiceError> {
        let res = builder.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .ok()
            .and_then(ApiError::into_message)
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(ServiceError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, ServiceError> {
        res.json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TodoService for HttpTodoService {
    async fn list_todos(&self, query: &ListTodosQuery) -> Result<Page<Todo>, ServiceError> {
        debug!(page = query.page, limit = query.limit, "GET /todos");
        let res = Self::send(self.request(Method::GET, "/todos").query(query)).await?;
        let body: ListEnvelope<Todo> = Self::decode(res).await?;
        Ok(Page {
            items: body.data,
            info: body.pagination,
        })
    }

    async fn stats(&self) -> Result<StatsSnapshot, ServiceError> {
        debug!("GET /todos/stats");
        let res = Self::send(self.request(Method::GET, "/todos/stats")).await?;
        let body: DataEnvelope<StatsSnapshot> = Self::decode(res).await?;
        Ok(body.data)
    }

    async fn create_todo(&self, request: &CreateTodoRequest) -> Result<Todo, ServiceError> {
        debug!(title = %request.title, "POST /todos");
        let res = Self::send(self.request(Method::POST, "/todos").json(request)).await?;
        let body: DataEnvelope<Todo> = Self::decode(res).await?;
        Ok(body.data)
    }

    async fn update_todo(
        &self,
        id: &TodoId,
        request: &UpdateTodoRequest,
    ) -> Result<Todo, ServiceError> {
        debug!(todo = %id, "PUT /todos/:id");
        let res = Self::send(
            self.request(Method::PUT, &format!("/todos/{}", id.as_str()))
                .json(request),
        )
        .await?;
        let body: DataEnvelope<Todo> = Self::decode(res).await?;
        Ok(body.data)
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), ServiceError> {
        debug!(todo = %id, "DELETE /todos/:id");
        Self::send(self.request(Method::DELETE, &format!("/todos/{}", id.as_str()))).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for HttpTodoService {
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        debug!("GET /users");
        let res = Self::send(self.request(Method::GET, "/users")).await?;
        let body: DataEnvelope<Vec<User>> = Self::decode(res).await?;
        Ok(body.data)
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
