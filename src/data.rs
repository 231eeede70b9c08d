use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::error;

use crate::placeholder::{self, Comment, Post, User};

pub trait DirectoryService: Send + Sync {
    fn list_users(&self) -> Result<Vec<User>>;
    fn get_user(&self, id: i64) -> Result<User>;
}

pub trait PostService: Send + Sync {
    fn posts_for_user(&self, user_id: i64) -> Result<Vec<Post>>;
}

pub trait CommentService: Send + Sync {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;
}

/// The three read paths bundled for the page and UI layers.
#[derive(Clone)]
pub struct Services {
    pub directory: Arc<dyn DirectoryService>,
    pub posts: Arc<dyn PostService>,
    pub comments: Arc<dyn CommentService>,
}

impl Services {
    pub fn placeholder(client: Arc<placeholder::Client>) -> Self {
        Self {
            directory: Arc::new(PlaceholderDirectoryService::new(client.clone())),
            posts: Arc::new(PlaceholderPostService::new(client.clone())),
            comments: Arc::new(PlaceholderCommentService::new(client)),
        }
    }

    pub fn mock() -> Self {
        Self {
            directory: Arc::new(MockDirectoryService),
            posts: Arc::new(MockPostService),
            comments: Arc::new(MockCommentService),
        }
    }
}

pub struct PlaceholderDirectoryService {
    client: Arc<placeholder::Client>,
}

impl PlaceholderDirectoryService {
    pub fn new(client: Arc<placeholder::Client>) -> Self {
        Self { client }
    }
}

impl DirectoryService for PlaceholderDirectoryService {
    fn list_users(&self) -> Result<Vec<User>> {
        self.client.users().context("fetch user list")
    }

    fn get_user(&self, id: i64) -> Result<User> {
        self.client.user(id).context("fetch user")
    }
}

pub struct PlaceholderPostService {
    client: Arc<placeholder::Client>,
}

impl PlaceholderPostService {
    pub fn new(client: Arc<placeholder::Client>) -> Self {
        Self { client }
    }
}

impl PostService for PlaceholderPostService {
    fn posts_for_user(&self, user_id: i64) -> Result<Vec<Post>> {
        self.client
            .user_posts(user_id)
            .context("fetch posts for user")
    }
}

pub struct PlaceholderCommentService {
    client: Arc<placeholder::Client>,
}

impl PlaceholderCommentService {
    pub fn new(client: Arc<placeholder::Client>) -> Self {
        Self { client }
    }
}

impl CommentService for PlaceholderCommentService {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        self.client
            .post_comments(post_id)
            .context("fetch comments for post")
    }
}

// Fetch helpers with the page's error contract: a missing identifier is an
// explicit absent result, a failed fetch is logged and swallowed. No retry,
// no escalation; the caller renders whatever came back.

pub fn fetch_users(directory: &dyn DirectoryService) -> Option<Vec<User>> {
    match directory.list_users() {
        Ok(users) => Some(users),
        Err(err) => {
            error!("user list fetch failed: {err:#}");
            None
        }
    }
}

pub fn fetch_user(directory: &dyn DirectoryService, user_id: Option<i64>) -> Option<User> {
    let user_id = user_id?;
    match directory.get_user(user_id) {
        Ok(user) => Some(user),
        Err(err) => {
            error!("user {user_id} fetch failed: {err:#}");
            None
        }
    }
}

pub fn fetch_user_posts(posts: &dyn PostService, user_id: Option<i64>) -> Option<Vec<Post>> {
    let user_id = user_id?;
    match posts.posts_for_user(user_id) {
        Ok(posts) => Some(posts),
        Err(err) => {
            error!("posts fetch for user {user_id} failed: {err:#}");
            None
        }
    }
}

pub fn fetch_post_comments(
    comments: &dyn CommentService,
    post_id: Option<i64>,
) -> Option<Vec<Comment>> {
    let post_id = post_id?;
    match comments.comments_for_post(post_id) {
        Ok(comments) => Some(comments),
        Err(err) => {
            error!("comments fetch for post {post_id} failed: {err:#}");
            None
        }
    }
}

pub struct MockDirectoryService;

impl DirectoryService for MockDirectoryService {
    fn list_users(&self) -> Result<Vec<User>> {
        Ok(vec![
            mock_user(1, "Leanne Graham", "Romaguera-Crona"),
            mock_user(2, "Ervin Howell", "Deckow-Crist"),
        ])
    }

    fn get_user(&self, id: i64) -> Result<User> {
        Ok(mock_user(id, "Leanne Graham", "Romaguera-Crona"))
    }
}

pub struct MockPostService;

impl PostService for MockPostService {
    fn posts_for_user(&self, user_id: i64) -> Result<Vec<Post>> {
        Ok(vec![Post {
            id: user_id * 10,
            user_id,
            title: "sample post".into(),
            body: "Sample content provided for offline browsing.".into(),
        }])
    }
}

pub struct MockCommentService;

impl CommentService for MockCommentService {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        Ok(vec![Comment {
            id: post_id * 100,
            post_id,
            name: "id labore ex et quam laborum".into(),
            email: "Eliseo@gardner.biz".into(),
            body: "laudantium enim quasi est quidem magnam voluptate ipsam eos".into(),
        }])
    }
}

fn mock_user(id: i64, name: &str, company: &str) -> User {
    User {
        id,
        name: name.into(),
        username: name.split(' ').next().unwrap_or_default().into(),
        email: format!("{}@example.org", id),
        company: placeholder::Company {
            name: company.into(),
            catch_phrase: "Multi-layered client-server neural-net".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct FailingDirectory;

    impl DirectoryService for FailingDirectory {
        fn list_users(&self) -> Result<Vec<User>> {
            bail!("connection refused")
        }

        fn get_user(&self, _id: i64) -> Result<User> {
            bail!("connection refused")
        }
    }

    #[test]
    fn fetch_users_swallows_failures() {
        assert_eq!(fetch_users(&FailingDirectory), None);
    }

    #[test]
    fn fetch_user_requires_identifier() {
        // Absent input never reaches the service.
        assert_eq!(fetch_user(&FailingDirectory, None), None);
        assert!(fetch_user(&MockDirectoryService, Some(1)).is_some());
    }

    #[test]
    fn fetch_user_posts_requires_identifier() {
        assert_eq!(fetch_user_posts(&MockPostService, None), None);
        let fetched = fetch_user_posts(&MockPostService, Some(2)).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].user_id, 2);
    }

    #[test]
    fn mock_services_line_up() {
        let services = Services::mock();
        let users = services.directory.list_users().unwrap();
        assert_eq!(users.len(), 2);
        let posts = services.posts.posts_for_user(users[0].id).unwrap();
        let comments = services.comments.comments_for_post(posts[0].id).unwrap();
        assert_eq!(comments[0].post_id, posts[0].id);
    }
}
