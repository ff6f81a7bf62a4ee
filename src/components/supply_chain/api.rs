//! Backend access for the editor.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::EditorError;
use super::types::User;
use super::wire::{ChainPayload, EdgePayload, NodePayload, WireChain, WireEdge, WireNode};

/// Request/response operations the editor needs from the supply-chain
/// service. Futures are not `Send`; everything runs on the browser event loop.
#[async_trait(?Send)]
pub trait SupplyChainBackend {
	async fn fetch_chain(&self, chain_id: &str) -> Result<WireChain, EditorError>;

	async fn replace_chain(&self, chain_id: &str, payload: &ChainPayload) -> Result<(), EditorError>;

	async fn create_node(&self, chain_id: &str, payload: &NodePayload) -> Result<WireNode, EditorError>;

	async fn update_node(
		&self,
		chain_id: &str,
		node_id: i64,
		payload: &NodePayload,
	) -> Result<WireNode, EditorError>;

	async fn delete_node(&self, chain_id: &str, node_id: i64) -> Result<(), EditorError>;

	async fn create_edge(&self, chain_id: &str, payload: &EdgePayload) -> Result<WireEdge, EditorError>;

	async fn delete_edge(&self, chain_id: &str, edge_id: i64) -> Result<(), EditorError>;

	async fn list_users(&self) -> Result<Vec<User>, EditorError>;

	async fn list_roles(&self) -> Result<Vec<String>, EditorError>;
}

/// REST client for the supply-chain service.
#[derive(Clone, Debug)]
pub struct HttpBackend {
	client: Client,
	base_url: String,
	token: Option<String>,
}

impl HttpBackend {
	pub fn new(base_url: &str, token: Option<String>) -> Self {
		Self {
			client: Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			token,
		}
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		debug!("{} {}{}", method, self.base_url, path);
		let builder = self.client.request(method, format!("{}{}", self.base_url, path));
		match &self.token {
			Some(token) => builder.bearer_auth(token),
			None => builder,
		}
	}

	async fn send(&self, builder: RequestBuilder) -> Result<Response, EditorError> {
		let response = builder
			.send()
			.await
			.map_err(|e| EditorError::Network(e.to_string()))?;
		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}
		let body = response.text().await.unwrap_or_default();
		warn!("request failed with {}: {}", status, body);
		Err(status_error(status, body))
	}

	async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, EditorError> {
		self.send(builder)
			.await?
			.json::<T>()
			.await
			.map_err(|e| EditorError::Decode(e.to_string()))
	}
}

fn status_error(status: StatusCode, body: String) -> EditorError {
	if status == StatusCode::UNAUTHORIZED {
		EditorError::Unauthorized
	} else {
		EditorError::Server {
			status: status.as_u16(),
			message: body,
		}
	}
}

#[async_trait(?Send)]
impl SupplyChainBackend for HttpBackend {
	async fn fetch_chain(&self, chain_id: &str) -> Result<WireChain, EditorError> {
		self.json(self.request(Method::GET, &format!("/supply-chains/{chain_id}")))
			.await
	}

	async fn replace_chain(&self, chain_id: &str, payload: &ChainPayload) -> Result<(), EditorError> {
		let builder = self
			.request(Method::PUT, &format!("/supply-chains/{chain_id}"))
			.json(payload);
		self.send(builder).await.map(|_| ())
	}

	async fn create_node(&self, chain_id: &str, payload: &NodePayload) -> Result<WireNode, EditorError> {
		let builder = self
			.request(Method::POST, &format!("/supply-chains/{chain_id}/nodes"))
			.json(payload);
		self.json(builder).await
	}

	async fn update_node(
		&self,
		chain_id: &str,
		node_id: i64,
		payload: &NodePayload,
	) -> Result<WireNode, EditorError> {
		let builder = self
			.request(
				Method::PUT,
				&format!("/supply-chains/{chain_id}/nodes/{node_id}"),
			)
			.json(payload);
		self.json(builder).await
	}

	async fn delete_node(&self, chain_id: &str, node_id: i64) -> Result<(), EditorError> {
		let builder = self.request(
			Method::DELETE,
			&format!("/supply-chains/{chain_id}/nodes/{node_id}"),
		);
		self.send(builder).await.map(|_| ())
	}

	async fn create_edge(&self, chain_id: &str, payload: &EdgePayload) -> Result<WireEdge, EditorError> {
		let builder = self
			.request(Method::POST, &format!("/supply-chains/{chain_id}/edges"))
			.json(payload);
		self.json(builder).await
	}

	async fn delete_edge(&self, chain_id: &str, edge_id: i64) -> Result<(), EditorError> {
		let builder = self.request(
			Method::DELETE,
			&format!("/supply-chains/{chain_id}/edges/{edge_id}"),
		);
		self.send(builder).await.map(|_| ())
	}

	async fn list_users(&self) -> Result<Vec<User>, EditorError> {
		self.json(self.request(Method::GET, "/users/")).await
	}

	async fn list_roles(&self) -> Result<Vec<String>, EditorError> {
		self.json(self.request(Method::GET, "/users/roles")).await
	}
}
