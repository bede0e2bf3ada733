//! Navigation between the three screens
//!
//! The shell owns one controller per route and keeps exactly one of them
//! mounted. Navigation unmounts the current controller, mounts the
//! destination, and runs an "exit, then enter" transition: the outgoing
//! screen slides out to the left, then the incoming one slides in from the
//! right.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::repository::TaskRepository;
use crate::task::Priority;
use crate::views::{CompletedView, TodoListView, View, WelcomeView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Welcome,
    TaskList,
    Completed,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Welcome, Route::TaskList, Route::Completed];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => "/",
            Route::TaskList => "/todos",
            Route::Completed => "/completed",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Route::Welcome => "welcome",
            Route::TaskList => "taskList",
            Route::Completed => "completed",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Welcome => "Welcome",
            Route::TaskList => "Tasks",
            Route::Completed => "Completed",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Route {
    type Err = Error;

    /// Accepts a route name (`taskList`, case-insensitive) or a path (`/todos`).
    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(route) = Route::from_path(value) {
            return Ok(route);
        }
        Self::ALL
            .into_iter()
            .find(|route| route.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown view '{value}' (expected welcome|taskList|completed or /|/todos|/completed)"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Exiting,
    Entering,
}

/// Exit-then-enter slide; each phase lasts `duration`
#[derive(Debug, Clone)]
pub struct Transition {
    duration: Duration,
    running: Option<(Route, Instant)>,
}

impl Transition {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            running: None,
        }
    }

    /// Start sliding `outgoing` away. No-op when animation is disabled.
    pub fn begin(&mut self, outgoing: Route, now: Instant) {
        if self.duration.is_zero() {
            self.running = None;
            return;
        }
        self.running = Some((outgoing, now));
    }

    pub fn phase(&self, now: Instant) -> Phase {
        let Some((_, started)) = self.running else {
            return Phase::Idle;
        };
        let elapsed = now.saturating_duration_since(started);
        if elapsed < self.duration {
            Phase::Exiting
        } else if elapsed < self.duration * 2 {
            Phase::Entering
        } else {
            Phase::Idle
        }
    }

    /// Progress through the current phase, `0.0..=1.0`
    pub fn progress(&self, now: Instant) -> f32 {
        let Some((_, started)) = self.running else {
            return 1.0;
        };
        let elapsed = now.saturating_duration_since(started);
        let within = if elapsed < self.duration {
            elapsed
        } else {
            elapsed.saturating_sub(self.duration)
        };
        (within.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// Horizontal offset for a body `width` cells wide.
    ///
    /// Negative while exiting (sliding left), positive while entering.
    pub fn offset(&self, width: u16, now: Instant) -> i32 {
        let width = f32::from(width);
        let progress = self.progress(now);
        match self.phase(now) {
            Phase::Idle => 0,
            Phase::Exiting => -(width * progress).round() as i32,
            Phase::Entering => (width * (1.0 - progress)).round() as i32,
        }
    }

    /// Screen that is sliding out, while it still is
    pub fn outgoing(&self, now: Instant) -> Option<Route> {
        match self.phase(now) {
            Phase::Exiting => self.running.map(|(route, _)| route),
            _ => None,
        }
    }

    /// Clear a finished transition. Returns whether one is still running.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.phase(now) == Phase::Idle {
            self.running = None;
            return false;
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

#[derive(Debug)]
pub struct Shell {
    route: Route,
    transition: Transition,
    pub welcome: WelcomeView,
    pub todo_list: TodoListView,
    pub completed: CompletedView,
}

impl Shell {
    pub fn new(repo: TaskRepository, default_priority: Priority, transition: Duration) -> Self {
        Self {
            route: Route::Welcome,
            transition: Transition::new(transition),
            welcome: WelcomeView::new(repo.clone()),
            todo_list: TodoListView::new(repo.clone(), default_priority),
            completed: CompletedView::new(repo),
        }
    }

    /// Mount the first screen without animation.
    pub fn start(&mut self, route: Route) {
        self.route = route;
        self.view_mut(route).mount();
        tracing::debug!(route = %route, "shell started");
    }

    /// Current destination
    pub fn route(&self) -> Route {
        self.route
    }

    /// Screen to draw at `now`: the outgoing one while it exits
    pub fn displayed_route(&self, now: Instant) -> Route {
        self.transition.outgoing(now).unwrap_or(self.route)
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    /// Go to `to`. Returns false when already there.
    pub fn navigate(&mut self, to: Route) -> bool {
        self.navigate_at(to, Instant::now())
    }

    pub fn navigate_at(&mut self, to: Route, now: Instant) -> bool {
        if to == self.route {
            return false;
        }
        let from = self.displayed_route(now);
        self.view_mut(self.route).unmount();
        self.route = to;
        self.view_mut(to).mount();
        self.transition.begin(from, now);
        tracing::debug!(from = %from, to = %to, "navigated");
        true
    }

    /// Apply pending updates for the mounted screen and advance the
    /// transition. Returns whether a redraw is needed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let changed = self.view_mut(self.route).poll();
        let animating = self.transition.tick(now);
        changed || animating
    }

    /// Inline error of the mounted screen
    pub fn error(&self) -> Option<&str> {
        self.view(self.route).error()
    }

    pub fn shutdown(&mut self) {
        self.view_mut(self.route).unmount();
    }

    pub fn view(&self, route: Route) -> &dyn View {
        match route {
            Route::Welcome => &self.welcome,
            Route::TaskList => &self.todo_list,
            Route::Completed => &self.completed,
        }
    }

    pub fn view_mut(&mut self, route: Route) -> &mut dyn View {
        match route {
            Route::Welcome => &mut self.welcome,
            Route::TaskList => &mut self.todo_list,
            Route::Completed => &mut self.completed,
        }
    }
}
