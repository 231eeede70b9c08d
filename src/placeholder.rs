use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};

pub const API_BASE: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

/// Read-only client for the JSONPlaceholder-shaped employee directory.
/// Four endpoints, no authentication, no retries.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("placeholder client user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        let base_url = if config.base_url.trim().is_empty() {
            API_BASE.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn users(&self) -> Result<Vec<User>> {
        let url = format!("{}/users", self.base_url);
        let users: Vec<User> = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(users)
    }

    pub fn user(&self, id: i64) -> Result<User> {
        let url = format!("{}/users/{}", self.base_url, id);
        let user: User = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(user)
    }

    pub fn user_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        let url = format!("{}/posts?userId={}", self.base_url, user_id);
        let posts: Vec<Post> = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(posts)
    }

    pub fn post_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let url = format!("{}/comments?postId={}", self.base_url, post_id);
        let comments: Vec<Comment> = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(comments)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: Company,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    #[serde(default, rename = "catchPhrase")]
    pub catch_phrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "postId")]
    pub post_id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_user_agent() {
        let err = Client::new(ClientConfig::default());
        assert!(err.is_err());
    }

    #[test]
    fn new_defaults_base_url() {
        let client = Client::new(ClientConfig {
            user_agent: "staffboard-test/0.1".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, API_BASE);
    }

    #[test]
    fn new_trims_trailing_slash() {
        let client = Client::new(ClientConfig {
            base_url: "http://localhost:3000/".into(),
            user_agent: "staffboard-test/0.1".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn wire_records_deserialize() {
        let user: User = serde_json::from_str(
            r#"{"id":1,"name":"Leanne Graham","username":"Bret","email":"a@b.c",
                "company":{"name":"Romaguera-Crona","catchPhrase":"Multi-layered client-server neural-net"}}"#,
        )
        .unwrap();
        assert_eq!(user.company.name, "Romaguera-Crona");

        let post: Post = serde_json::from_str(
            r#"{"id":3,"userId":1,"title":"t","body":"b"}"#,
        )
        .unwrap();
        assert_eq!(post.user_id, 1);

        let comment: Comment = serde_json::from_str(
            r#"{"id":9,"postId":3,"name":"n","email":"e@f.g","body":"b"}"#,
        )
        .unwrap();
        assert_eq!(comment.post_id, 3);
    }
}
