use std::collections::HashMap;

use tracing::warn;

use crate::data::{self, Services};
use crate::dom::{Document, NodeId};
use crate::placeholder::{Comment, Post, User};

pub const SHOW_COMMENTS: &str = "Show Comments";
pub const HIDE_COMMENTS: &str = "Hide Comments";
pub const HIDE_CLASS: &str = "hide";
pub const COMMENTS_CLASS: &str = "comments";
pub const DEFAULT_TEXT: &str = "Select an Employee to display their posts.";
pub const DEFAULT_TEXT_CLASS: &str = "default-text";
pub const CATCHPHRASE_LINE: &str = "Multi-layered client-server neural-net";

/// Tri-state element lookup mirroring the page contract: a located element,
/// an explicit not-found answer, or absent input that never queried at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(NodeId),
    NotFound,
    Absent,
}

impl Lookup {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Lookup::Found(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Change { value: String },
    Click { target: NodeId },
}

/// Everything a refresh cycle touched, step by step.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub removed_buttons: Vec<NodeId>,
    pub main: NodeId,
    pub rendered: Vec<NodeId>,
    pub added_buttons: Vec<NodeId>,
}

#[derive(Debug)]
pub struct ChangeOutcome {
    pub user_id: i64,
    pub posts: Option<Vec<Post>>,
    pub refresh: Option<RefreshOutcome>,
}

/// The page: an owned element tree plus the interaction state that the
/// browser original kept ambiently (listener registry, select-disabled flag,
/// refresh generation). All mutation goes through these methods.
pub struct Page {
    doc: Document,
    main: NodeId,
    select: NodeId,
    /// Click listeners keyed by button identity, so detach removes exactly
    /// what attach added. Emptied on every refresh cycle.
    listeners: HashMap<NodeId, i64>,
    generation: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        let mut doc = Document::new();
        let main = doc.create_element("main");
        let select = doc.create_element("select");
        Page {
            doc,
            main,
            select,
            listeners: HashMap::new(),
            generation: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn main(&self) -> NodeId {
        self.main
    }

    pub fn select_menu(&self) -> NodeId {
        self.select
    }

    pub fn select_disabled(&self) -> bool {
        self.doc.element(self.select).disabled
    }

    /// The async front end brackets its change cycle with this the way the
    /// synchronous handler does internally.
    pub fn set_select_disabled(&mut self, disabled: bool) {
        self.doc.element_mut(self.select).disabled = disabled;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // Render layer ---------------------------------------------------------

    /// One option element per user, value = id, label = display name.
    pub fn create_select_options(&mut self, users: Option<&[User]>) -> Option<Vec<NodeId>> {
        let users = users?;
        let mut options = Vec::with_capacity(users.len());
        for user in users {
            let option = self.doc.create_elem_with_text("option", &user.name, None);
            self.doc.element_mut(option).value = user.id.to_string();
            options.push(option);
        }
        Some(options)
    }

    pub fn populate_select_menu(&mut self, users: Option<&[User]>) -> Option<NodeId> {
        let options = self.create_select_options(users)?;
        self.doc.append_all(self.select, &options);
        Some(self.select)
    }

    /// One article per comment: name, body, "From: <email>".
    pub fn create_comments(&mut self, comments: Option<&[Comment]>) -> Option<Vec<NodeId>> {
        let comments = comments?;
        let mut fragment = Vec::with_capacity(comments.len());
        for comment in comments {
            let article = self.doc.create_element("article");
            let name = self.doc.create_elem_with_text("h3", &comment.name, None);
            let body = self.doc.create_elem_with_text("p", &comment.body, None);
            let email =
                self.doc
                    .create_elem_with_text("p", &format!("From: {}", comment.email), None);
            self.doc.append(article, name);
            self.doc.append(article, body);
            self.doc.append(article, email);
            fragment.push(article);
        }
        Some(fragment)
    }

    /// Builds the initially hidden comment section for a post and fills it
    /// with that post's fetched comments.
    pub fn display_comments(
        &mut self,
        services: &Services,
        post_id: Option<i64>,
    ) -> Option<NodeId> {
        let post_id = post_id?;
        let section = self.doc.create_element("section");
        self.doc.element_mut(section).post_id = Some(post_id);
        self.doc.add_class(section, COMMENTS_CLASS);
        self.doc.add_class(section, HIDE_CLASS);

        let comments = data::fetch_post_comments(&*services.comments, Some(post_id));
        if let Some(fragment) = self.create_comments(comments.as_deref()) {
            self.doc.append_all(section, &fragment);
        }
        Some(section)
    }

    /// One article per post, in input order. Strictly sequential: each
    /// post's author and comment fetches complete before the next post is
    /// built.
    pub fn create_posts(
        &mut self,
        services: &Services,
        posts: Option<&[Post]>,
    ) -> Option<Vec<NodeId>> {
        let posts = posts?;
        let mut fragment = Vec::with_capacity(posts.len());
        for post in posts {
            let article = self.doc.create_element("article");
            let title = self.doc.create_elem_with_text("h2", &post.title, None);
            let body = self.doc.create_elem_with_text("p", &post.body, None);
            let id_line =
                self.doc
                    .create_elem_with_text("p", &format!("Post ID: {}", post.id), None);

            // A failed author fetch degrades the line rather than aborting
            // the whole render; the failure is already logged.
            let author = data::fetch_user(&*services.directory, Some(post.user_id));
            let author_text = match author {
                Some(author) => {
                    format!("Author: {} with {}", author.name, author.company.name)
                }
                None => "Author: unknown".to_string(),
            };
            let author_line = self.doc.create_elem_with_text("p", &author_text, None);
            let catchphrase = self.doc.create_elem_with_text("p", CATCHPHRASE_LINE, None);

            let button = self.doc.create_elem_with_text("button", SHOW_COMMENTS, None);
            self.doc.element_mut(button).post_id = Some(post.id);

            self.doc.append(article, title);
            self.doc.append(article, body);
            self.doc.append(article, id_line);
            self.doc.append(article, author_line);
            self.doc.append(article, catchphrase);
            self.doc.append(article, button);

            if let Some(section) = self.display_comments(services, Some(post.id)) {
                self.doc.append(article, section);
            }

            fragment.push(article);
        }
        Some(fragment)
    }

    /// Renders posts into the main container, or the fixed placeholder
    /// paragraph when there is nothing to show.
    pub fn display_posts(&mut self, services: &Services, posts: Option<&[Post]>) -> Vec<NodeId> {
        let rendered = match posts {
            Some(posts) if !posts.is_empty() => {
                self.create_posts(services, Some(posts)).unwrap_or_default()
            }
            _ => {
                vec![self
                    .doc
                    .create_elem_with_text("p", DEFAULT_TEXT, Some(DEFAULT_TEXT_CLASS))]
            }
        };
        self.doc.append_all(self.main, &rendered);
        rendered
    }

    // Interaction layer ----------------------------------------------------

    pub fn toggle_comment_section(&mut self, post_id: Option<i64>) -> Lookup {
        let Some(post_id) = post_id else {
            return Lookup::Absent;
        };
        let section = self
            .doc
            .find(self.main, |el| el.tag == "section" && el.post_id == Some(post_id));
        match section {
            Some(section) => {
                self.doc.toggle_class(section, HIDE_CLASS);
                Lookup::Found(section)
            }
            None => Lookup::NotFound,
        }
    }

    pub fn toggle_comment_button(&mut self, post_id: Option<i64>) -> Lookup {
        let Some(post_id) = post_id else {
            return Lookup::Absent;
        };
        let button = self
            .doc
            .find(self.main, |el| el.tag == "button" && el.post_id == Some(post_id));
        let Some(button) = button else {
            warn!("button with post id {post_id} not found");
            return Lookup::NotFound;
        };
        let label = if self.doc.text(button) == SHOW_COMMENTS {
            HIDE_COMMENTS
        } else {
            SHOW_COMMENTS
        };
        self.doc.set_text(button, label);
        Lookup::Found(button)
    }

    /// Click-dispatch composite: flips the section's visibility and the
    /// button's label together.
    pub fn toggle_comments(&mut self, post_id: Option<i64>) -> Option<(Lookup, Lookup)> {
        let post_id = post_id?;
        let section = self.toggle_comment_section(Some(post_id));
        let button = self.toggle_comment_button(Some(post_id));
        Some((section, button))
    }

    /// Registers every post-tagged button under the main container. Returns
    /// the buttons operated on.
    pub fn add_button_listeners(&mut self) -> Vec<NodeId> {
        let buttons = self.post_buttons();
        for &button in &buttons {
            if let Some(post_id) = self.doc.element(button).post_id {
                self.listeners.insert(button, post_id);
            }
        }
        buttons
    }

    /// Deregisters the same buttons. Keyed on element identity, so this
    /// genuinely detaches what [`Page::add_button_listeners`] attached.
    pub fn remove_button_listeners(&mut self) -> Vec<NodeId> {
        let buttons = self.post_buttons();
        for button in &buttons {
            self.listeners.remove(button);
        }
        buttons
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Routes a click to the composite toggle, but only for buttons with a
    /// registered listener.
    pub fn handle_click(&mut self, target: NodeId) -> Option<(Lookup, Lookup)> {
        let post_id = self.listeners.get(&target).copied()?;
        self.toggle_comments(Some(post_id))
    }

    fn post_buttons(&self) -> Vec<NodeId> {
        self.doc
            .find_all(self.main, |el| el.tag == "button" && el.post_id.is_some())
    }

    // Orchestration --------------------------------------------------------

    /// Full refresh cycle: detach listeners, clear the main container,
    /// render, re-attach. Absent or empty posts leave the page untouched.
    pub fn refresh_posts(
        &mut self,
        services: &Services,
        posts: Option<Vec<Post>>,
    ) -> Option<RefreshOutcome> {
        let posts = posts.filter(|posts| !posts.is_empty())?;
        let removed_buttons = self.remove_button_listeners();
        let main = self.doc.delete_child_elements(Some(self.main))?;
        let rendered = self.display_posts(services, Some(&posts));
        let added_buttons = self.add_button_listeners();
        Some(RefreshOutcome {
            removed_buttons,
            main,
            rendered,
            added_buttons,
        })
    }

    /// Starts a refresh cycle and returns its generation. A later cycle
    /// supersedes every earlier one.
    pub fn begin_refresh(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Applies a refresh only if `generation` is still current; a stale
    /// cycle's result is discarded instead of clobbering a newer one.
    pub fn apply_refresh(
        &mut self,
        generation: u64,
        services: &Services,
        posts: Option<Vec<Post>>,
    ) -> Option<RefreshOutcome> {
        if generation != self.generation {
            return None;
        }
        self.refresh_posts(services, posts)
    }

    /// Selection-change handler: acts on change events only. Disables the
    /// select control for the duration, defaults the user id to 1 when the
    /// value does not parse.
    pub fn select_menu_change_event_handler(
        &mut self,
        services: &Services,
        event: &Event,
    ) -> Option<ChangeOutcome> {
        let Event::Change { value } = event else {
            return None;
        };
        self.doc.element_mut(self.select).disabled = true;
        let user_id = value.parse::<i64>().unwrap_or(1);
        let generation = self.begin_refresh();
        let posts = data::fetch_user_posts(&*services.posts, Some(user_id));
        let refresh = self.apply_refresh(generation, services, posts.clone());
        self.doc.element_mut(self.select).disabled = false;
        Some(ChangeOutcome {
            user_id,
            posts,
            refresh,
        })
    }

    /// Fetches the user list and populates the selection control.
    pub fn init_page(&mut self, services: &Services) -> (Option<Vec<User>>, Option<NodeId>) {
        let users = data::fetch_users(&*services.directory);
        let select = self.populate_select_menu(users.as_deref());
        (users, select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_posts() -> Vec<Post> {
        vec![
            Post {
                id: 10,
                user_id: 1,
                title: "first".into(),
                body: "first body".into(),
            },
            Post {
                id: 11,
                user_id: 1,
                title: "second".into(),
                body: "second body".into(),
            },
        ]
    }

    #[test]
    fn select_options_match_users() {
        let services = Services::mock();
        let mut page = Page::new();
        let users = services.directory.list_users().unwrap();
        let options = page.create_select_options(Some(&users)).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(page.document().element(options[0]).value, "1");
        assert_eq!(page.document().text(options[0]), "Leanne Graham");
        assert_eq!(page.document().element(options[1]).value, "2");
    }

    #[test]
    fn select_options_absent_input() {
        let mut page = Page::new();
        assert!(page.create_select_options(None).is_none());
        assert!(page.populate_select_menu(None).is_none());
    }

    #[test]
    fn display_posts_renders_placeholder_for_empty() {
        let services = Services::mock();
        let mut page = Page::new();
        let rendered = page.display_posts(&services, Some(&[]));
        assert_eq!(rendered.len(), 1);
        let element = page.document().element(rendered[0]);
        assert_eq!(element.tag, "p");
        assert_eq!(element.text, DEFAULT_TEXT);
        assert!(element.has_class(DEFAULT_TEXT_CLASS));
        assert_eq!(page.document().children(page.main()).len(), 1);
    }

    #[test]
    fn create_posts_builds_one_article_per_post_in_order() {
        let services = Services::mock();
        let mut page = Page::new();
        let posts = sample_posts();
        let articles = page.create_posts(&services, Some(&posts)).unwrap();
        assert_eq!(articles.len(), 2);

        for (article, post) in articles.iter().zip(&posts) {
            let doc = page.document();
            assert_eq!(doc.element(*article).tag, "article");
            let id_lines = doc.find_all(*article, |el| {
                el.tag == "p" && el.text == format!("Post ID: {}", post.id)
            });
            assert_eq!(id_lines.len(), 1);
            let button = doc
                .find(*article, |el| el.tag == "button")
                .expect("toggle button");
            assert_eq!(doc.element(button).post_id, Some(post.id));
            assert_eq!(doc.text(button), SHOW_COMMENTS);
            let section = doc
                .find(*article, |el| el.tag == "section")
                .expect("comment section");
            assert!(doc.element(section).has_class(HIDE_CLASS));
            assert_eq!(doc.element(section).post_id, Some(post.id));
        }
    }

    #[test]
    fn comment_blocks_carry_name_body_and_email() {
        let services = Services::mock();
        let mut page = Page::new();
        let comments = services.comments.comments_for_post(10).unwrap();
        let fragment = page.create_comments(Some(&comments)).unwrap();
        assert_eq!(fragment.len(), 1);
        let doc = page.document();
        let children = doc.children(fragment[0]);
        assert_eq!(doc.element(children[0]).tag, "h3");
        assert_eq!(doc.text(children[0]), comments[0].name);
        assert_eq!(doc.text(children[1]), comments[0].body);
        assert_eq!(doc.text(children[2]), format!("From: {}", comments[0].email));
    }

    #[test]
    fn double_toggle_restores_original_state() {
        let services = Services::mock();
        let mut page = Page::new();
        page.refresh_posts(&services, Some(sample_posts()));

        let first = page.toggle_comments(Some(10)).unwrap();
        let section = first.0.node().unwrap();
        let button = first.1.node().unwrap();
        assert!(!page.document().element(section).has_class(HIDE_CLASS));
        assert_eq!(page.document().text(button), HIDE_COMMENTS);

        page.toggle_comments(Some(10)).unwrap();
        assert!(page.document().element(section).has_class(HIDE_CLASS));
        assert_eq!(page.document().text(button), SHOW_COMMENTS);
    }

    #[test]
    fn toggles_signal_not_found_and_absent() {
        let mut page = Page::new();
        assert_eq!(page.toggle_comment_section(Some(99)), Lookup::NotFound);
        assert_eq!(page.toggle_comment_button(Some(99)), Lookup::NotFound);
        assert_eq!(page.toggle_comment_section(None), Lookup::Absent);
        assert_eq!(page.toggle_comment_button(None), Lookup::Absent);
        assert!(page.toggle_comments(None).is_none());
    }

    #[test]
    fn refresh_posts_noop_on_absent_or_empty() {
        let services = Services::mock();
        let mut page = Page::new();
        page.refresh_posts(&services, Some(sample_posts()));
        let before = page.document().children(page.main()).len();

        assert!(page.refresh_posts(&services, None).is_none());
        assert!(page.refresh_posts(&services, Some(Vec::new())).is_none());
        assert_eq!(page.document().children(page.main()).len(), before);
    }

    #[test]
    fn refresh_replaces_previous_render() {
        let services = Services::mock();
        let mut page = Page::new();
        page.refresh_posts(&services, Some(sample_posts()));
        page.refresh_posts(
            &services,
            Some(vec![Post {
                id: 20,
                user_id: 2,
                title: "only".into(),
                body: "only body".into(),
            }]),
        );

        // At most one section and one button per post id after re-render.
        let doc = page.document();
        assert_eq!(doc.children(page.main()).len(), 1);
        let buttons = doc.find_all(page.main(), |el| el.tag == "button");
        assert_eq!(buttons.len(), 1);
        assert_eq!(doc.element(buttons[0]).post_id, Some(20));
        assert_eq!(page.listener_count(), 1);
    }

    #[test]
    fn listeners_detach_by_element_identity() {
        let services = Services::mock();
        let mut page = Page::new();
        page.refresh_posts(&services, Some(sample_posts()));
        assert_eq!(page.listener_count(), 2);

        let removed = page.remove_button_listeners();
        assert_eq!(removed.len(), 2);
        assert_eq!(page.listener_count(), 0);

        // Clicks on deregistered buttons no longer dispatch.
        assert!(page.handle_click(removed[0]).is_none());
    }

    #[test]
    fn click_dispatches_through_registry() {
        let services = Services::mock();
        let mut page = Page::new();
        let outcome = page.refresh_posts(&services, Some(sample_posts())).unwrap();
        let button = outcome.added_buttons[0];
        let (section, toggled) = page.handle_click(button).unwrap();
        assert!(matches!(section, Lookup::Found(_)));
        assert_eq!(toggled, Lookup::Found(button));
    }

    #[test]
    fn change_handler_ignores_other_events() {
        let services = Services::mock();
        let mut page = Page::new();
        let click = Event::Click {
            target: page.main(),
        };
        assert!(page
            .select_menu_change_event_handler(&services, &click)
            .is_none());
    }

    #[test]
    fn change_handler_defaults_unparseable_value_to_one() {
        let services = Services::mock();
        let mut page = Page::new();
        let event = Event::Change {
            value: "not-a-number".into(),
        };
        let outcome = page
            .select_menu_change_event_handler(&services, &event)
            .unwrap();
        assert_eq!(outcome.user_id, 1);
        assert!(outcome.refresh.is_some());
        assert!(!page.select_disabled());
    }

    #[test]
    fn stale_generation_is_discarded() {
        let services = Services::mock();
        let mut page = Page::new();
        let stale = page.begin_refresh();
        let current = page.begin_refresh();
        assert!(page
            .apply_refresh(stale, &services, Some(sample_posts()))
            .is_none());
        assert!(page.document().children(page.main()).is_empty());
        assert!(page
            .apply_refresh(current, &services, Some(sample_posts()))
            .is_some());
    }

    #[test]
    fn init_page_populates_select_menu() {
        let services = Services::mock();
        let mut page = Page::new();
        let (users, select) = page.init_page(&services);
        assert_eq!(users.unwrap().len(), 2);
        let select = select.unwrap();
        assert_eq!(select, page.select_menu());
        assert_eq!(page.document().children(select).len(), 2);
    }
}
