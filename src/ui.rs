use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use textwrap::wrap;

use crate::data::{self, CommentService, DirectoryService, Services};
use crate::dom::NodeId;
use crate::page::{self, Page};
use crate::placeholder::{Comment, Post, User};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Employees,
    Posts,
}

pub struct Options {
    pub status_message: String,
    pub services: Services,
}

struct PendingPosts {
    generation: u64,
    user_name: String,
}

/// Everything a post render needs, fetched off the UI thread. Author and
/// comment lookups during the render are answered from these maps instead of
/// going back to the network.
struct Prefetched {
    posts: Vec<Post>,
    authors: HashMap<i64, User>,
    comments: HashMap<i64, Vec<Comment>>,
}

enum AsyncResponse {
    Posts {
        generation: u64,
        user_name: String,
        bundle: Option<Prefetched>,
    },
}

struct CachedDirectory {
    authors: HashMap<i64, User>,
}

impl DirectoryService for CachedDirectory {
    fn list_users(&self) -> Result<Vec<User>> {
        bail!("user list not prefetched")
    }

    fn get_user(&self, id: i64) -> Result<User> {
        match self.authors.get(&id) {
            Some(user) => Ok(user.clone()),
            None => bail!("author {id} not prefetched"),
        }
    }
}

struct CachedComments {
    comments: HashMap<i64, Vec<Comment>>,
}

impl CommentService for CachedComments {
    fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        match self.comments.get(&post_id) {
            Some(comments) => Ok(comments.clone()),
            None => bail!("comments for post {post_id} not prefetched"),
        }
    }
}

pub struct Model {
    services: Services,
    page: Page,
    users: Vec<User>,
    employee_index: usize,
    selected_employee: Option<usize>,
    post_index: usize,
    focused_pane: Pane,
    status_message: String,
    needs_redraw: bool,
    spinner_frame: usize,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    pending_posts: Option<PendingPosts>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let mut page = Page::new();
        let (users, _) = page.init_page(&options.services);
        let users = users.unwrap_or_default();
        // Nothing selected yet: show the fixed placeholder paragraph.
        page.display_posts(&options.services, None);

        let status_message = if users.is_empty() {
            "Could not load the employee list. Press r to retry, q to quit.".to_string()
        } else {
            options.status_message
        };

        Model {
            services: options.services,
            page,
            users,
            employee_index: 0,
            selected_employee: None,
            post_index: 0,
            focused_pane: Pane::Employees,
            status_message,
            needs_redraw: true,
            spinner_frame: 0,
            response_tx,
            response_rx,
            pending_posts: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let TermEvent::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key.code) {
                        break;
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.pending_posts.is_some() {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) -> bool {
        let mut handled = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            handled = true;
        }
        handled
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Posts {
                generation,
                user_name,
                bundle,
            } => {
                let Some(pending) = self.pending_posts.take() else {
                    return;
                };
                // A newer change superseded this cycle; drop the result.
                if pending.generation != generation {
                    self.pending_posts = Some(pending);
                    return;
                }

                match bundle {
                    Some(bundle) if !bundle.posts.is_empty() => {
                        let render_services = Services {
                            directory: Arc::new(CachedDirectory {
                                authors: bundle.authors,
                            }),
                            posts: self.services.posts.clone(),
                            comments: Arc::new(CachedComments {
                                comments: bundle.comments,
                            }),
                        };
                        let applied = self.page.apply_refresh(
                            generation,
                            &render_services,
                            Some(bundle.posts),
                        );
                        if applied.is_some() {
                            self.post_index = 0;
                            self.focused_pane = Pane::Posts;
                            self.status_message = format!(
                                "Showing posts for {user_name}. Enter toggles comments."
                            );
                        }
                    }
                    Some(_) => {
                        self.status_message = format!("{user_name} has no posts.");
                    }
                    None => {
                        self.status_message =
                            format!("Failed to load posts for {user_name}. Press r to retry.");
                    }
                }
                self.page.set_select_disabled(false);
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('h') | KeyCode::Left => self.focus(Pane::Employees),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.focus(Pane::Posts),
            KeyCode::Enter | KeyCode::Char(' ') => match self.focused_pane {
                Pane::Employees => self.commit_employee_selection(),
                Pane::Posts => self.toggle_selected_post_comments(),
            },
            KeyCode::Char('r') => self.refresh_current_employee(),
            _ => {}
        }
        false
    }

    fn focus(&mut self, pane: Pane) {
        if self.focused_pane != pane {
            self.focused_pane = pane;
            self.mark_dirty();
        }
    }

    fn move_selection(&mut self, delta: i64) {
        match self.focused_pane {
            Pane::Employees => {
                if self.users.is_empty() {
                    return;
                }
                let last = self.users.len() - 1;
                self.employee_index = step(self.employee_index, delta, last);
            }
            Pane::Posts => {
                let articles = self.articles();
                if articles.is_empty() {
                    return;
                }
                let last = articles.len() - 1;
                self.post_index = step(self.post_index, delta, last);
            }
        }
        self.mark_dirty();
    }

    /// Fires the change event for the highlighted employee: disable the
    /// select control, bump the refresh generation, and fetch that user's
    /// posts (with each post's author and comments, sequentially) on a
    /// worker thread.
    fn commit_employee_selection(&mut self) {
        let Some(user) = self.users.get(self.employee_index).cloned() else {
            return;
        };
        if self.page.select_disabled() {
            self.status_message = "Still loading the previous selection…".to_string();
            self.mark_dirty();
            return;
        }

        self.selected_employee = Some(self.employee_index);
        self.page.set_select_disabled(true);
        let generation = self.page.begin_refresh();
        self.pending_posts = Some(PendingPosts {
            generation,
            user_name: user.name.clone(),
        });
        self.status_message = format!("Loading posts for {}…", user.name);
        self.mark_dirty();

        let tx = self.response_tx.clone();
        let posts_service = self.services.posts.clone();
        let directory = self.services.directory.clone();
        let comments_service = self.services.comments.clone();
        let user_id = user.id;
        let user_name = user.name;
        thread::spawn(move || {
            let bundle = data::fetch_user_posts(&*posts_service, Some(user_id)).map(|posts| {
                let mut authors = HashMap::new();
                let mut comments = HashMap::new();
                for post in &posts {
                    if let Some(author) = data::fetch_user(&*directory, Some(post.user_id)) {
                        authors.insert(post.user_id, author);
                    }
                    if let Some(post_comments) =
                        data::fetch_post_comments(&*comments_service, Some(post.id))
                    {
                        comments.insert(post.id, post_comments);
                    }
                }
                Prefetched {
                    posts,
                    authors,
                    comments,
                }
            });
            let _ = tx.send(AsyncResponse::Posts {
                generation,
                user_name,
                bundle,
            });
        });
    }

    fn refresh_current_employee(&mut self) {
        if self.users.is_empty() {
            // The initial user fetch failed; try the whole page again.
            let (users, _) = self.page.init_page(&self.services);
            if let Some(users) = users {
                self.users = users;
                self.status_message =
                    "Employee list loaded. Pick an employee and press Enter.".to_string();
            } else {
                self.status_message =
                    "Could not load the employee list. Press r to retry, q to quit.".to_string();
            }
            self.mark_dirty();
            return;
        }
        if let Some(index) = self.selected_employee {
            self.employee_index = index;
            self.commit_employee_selection();
        }
    }

    fn toggle_selected_post_comments(&mut self) {
        let articles = self.articles();
        let Some(&article) = articles.get(self.post_index) else {
            return;
        };
        let button = self
            .page
            .document()
            .find(article, |el| el.tag == "button" && el.post_id.is_some());
        if let Some(button) = button {
            if self.page.handle_click(button).is_some() {
                self.mark_dirty();
            }
        }
    }

    fn articles(&self) -> Vec<NodeId> {
        self.page
            .document()
            .children(self.page.main())
            .iter()
            .copied()
            .filter(|&id| self.page.document().element(id).tag == "article")
            .collect()
    }

    fn draw(&mut self, frame: &mut Frame) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.size());
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(30)])
            .split(outer[0]);

        self.draw_employees(frame, panes[0]);
        self.draw_posts(frame, panes[1]);
        self.draw_status(frame, outer[1]);
    }

    fn draw_employees(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let items: Vec<ListItem> = self
            .users
            .iter()
            .enumerate()
            .map(|(index, user)| {
                let marker = if Some(index) == self.selected_employee {
                    "* "
                } else {
                    "  "
                };
                ListItem::new(format!("{marker}{}", user.name))
                    .style(Style::default().fg(COLOR_TEXT_PRIMARY))
            })
            .collect();

        let mut state = ListState::default();
        if !self.users.is_empty() {
            state.select(Some(self.employee_index));
        }

        let border = if self.focused_pane == Pane::Employees {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(" Employees ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .style(Style::default().bg(COLOR_BG))
            .highlight_style(
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_posts(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let width = area.width.saturating_sub(2).max(20) as usize;
        let mut lines: Vec<Line> = Vec::new();
        let mut selected_start = 0usize;

        let articles = self.articles();
        if articles.is_empty() {
            // Placeholder paragraph (or nothing at all after a failure).
            for &child in self.page.document().children(self.page.main()) {
                lines.push(Line::styled(
                    self.page.document().text(child).to_string(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ));
            }
        }

        for (index, &article) in articles.iter().enumerate() {
            if index == self.post_index {
                selected_start = lines.len();
            }
            let selected = self.focused_pane == Pane::Posts && index == self.post_index;
            self.article_lines(article, width, selected, &mut lines);
            lines.push(Line::raw(""));
        }

        let border = if self.focused_pane == Pane::Posts {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        let visible = area.height.saturating_sub(2) as usize;
        let scroll = if selected_start >= visible {
            (selected_start - visible / 2) as u16
        } else {
            0
        };
        let posts = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" Posts ")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border)),
            )
            .style(Style::default().bg(COLOR_BG))
            .scroll((scroll, 0));
        frame.render_widget(posts, area);
    }

    fn article_lines(
        &self,
        article: NodeId,
        width: usize,
        selected: bool,
        lines: &mut Vec<Line>,
    ) {
        let doc = self.page.document();
        let title_style = if selected {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD)
        };

        for &child in doc.children(article) {
            let element = doc.element(child);
            match element.tag.as_str() {
                "h2" => lines.push(Line::styled(element.text.clone(), title_style)),
                "p" => {
                    for wrapped in wrap(&element.text, width) {
                        lines.push(Line::styled(
                            wrapped.into_owned(),
                            Style::default().fg(COLOR_TEXT_SECONDARY),
                        ));
                    }
                }
                "button" => lines.push(Line::styled(
                    format!("[{}]", element.text),
                    Style::default().fg(COLOR_ACCENT),
                )),
                "section" => {
                    if !element.has_class(page::HIDE_CLASS) {
                        self.comment_lines(child, width, lines);
                    }
                }
                _ => {}
            }
        }
    }

    fn comment_lines(&self, section: NodeId, width: usize, lines: &mut Vec<Line>) {
        let doc = self.page.document();
        let indent_width = width.saturating_sub(2).max(10);
        for &comment in doc.children(section) {
            for &part in doc.children(comment) {
                let element = doc.element(part);
                let style = if element.tag == "h3" {
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(COLOR_TEXT_SECONDARY)
                };
                for wrapped in wrap(&element.text, indent_width) {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(wrapped.into_owned(), style),
                    ]));
                }
            }
            lines.push(Line::raw(""));
        }
    }

    fn draw_status(&self, frame: &mut Frame, area: ratatui::layout::Rect) {
        let mut spans = Vec::new();
        if self.pending_posts.is_some() {
            spans.push(Span::styled(
                format!("{} ", SPINNER_FRAMES[self.spinner_frame]),
                Style::default().fg(COLOR_ACCENT),
            ));
        }
        let style = if self.status_message.starts_with("Failed")
            || self.status_message.starts_with("Could not")
        {
            Style::default().fg(COLOR_ERROR)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        spans.push(Span::styled(self.status_message.clone(), style));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn step(current: usize, delta: i64, last: usize) -> usize {
    if delta > 0 {
        current.saturating_add(delta as usize).min(last)
    } else {
        current.saturating_sub(delta.unsigned_abs() as usize)
    }
}
