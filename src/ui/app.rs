use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::config::Config;
use crate::error::Result;
use crate::repository::TaskRepository;
use crate::shell::{Route, Shell};
use crate::task::Task;

use super::form::{FormAction, FormEditor};
use super::view;

/// Redraw interval while a transition is animating
const FRAME_MS: u64 = 16;

pub struct UiOptions {
    pub config: Config,
    /// Start view overriding `ui.start_view`
    pub view: Option<String>,
}

#[derive(Clone, Copy)]
pub(crate) enum StatusKind {
    Error,
    Info,
}

pub(crate) enum InputMode {
    Normal,
    Search,
    Form(FormEditor),
}

pub struct AppState {
    pub(crate) shell: Shell,
    pub(crate) mode: InputMode,
    pub(crate) task_selected: usize,
    pub(crate) completed_selected: usize,
    info_message: Option<String>,
    poll_interval: Duration,
}

pub fn run(options: UiOptions) -> Result<()> {
    let UiOptions { config, view } = options;
    let start = match view {
        Some(raw) => raw.parse::<Route>()?,
        None => config.ui.start_route()?,
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let repo = TaskRepository::open(&config.store, true)?;
    let shell = Shell::new(
        repo,
        config.tasks.default_priority()?,
        Duration::from_millis(config.ui.transition_ms),
    );
    let mut app = AppState::new(shell, Duration::from_millis(config.ui.poll_ms));
    app.shell.start(start);

    let result = run_terminal(&mut app);
    app.shell.shutdown();
    result
}

fn run_terminal(app: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut AppState) -> Result<()> {
    let mut dirty = true;
    loop {
        let now = Instant::now();
        if app.shell.poll(now) {
            app.clamp_selection();
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app, now))?;
            dirty = false;
        }

        let timeout = if app.shell.transition().is_running() {
            Duration::from_millis(FRAME_MS)
        } else {
            app.poll_interval
        };
        if event::poll(timeout)? {
            match event::read()? {
                // Release and repeat events are reported on some platforms.
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

impl AppState {
    pub fn new(shell: Shell, poll_interval: Duration) -> Self {
        Self {
            shell,
            mode: InputMode::Normal,
            task_selected: 0,
            completed_selected: 0,
            info_message: None,
            poll_interval,
        }
    }

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match std::mem::replace(&mut self.mode, InputMode::Normal) {
            InputMode::Form(editor) => {
                self.handle_form_key(editor, key);
                false
            }
            InputMode::Search => {
                self.handle_search_key(key);
                false
            }
            InputMode::Normal => match self.shell.route() {
                Route::Welcome => self.handle_welcome_key(key),
                Route::TaskList => {
                    self.handle_task_list_key(key);
                    false
                }
                Route::Completed => {
                    self.handle_completed_key(key);
                    false
                }
            },
        }
    }

    fn handle_welcome_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Enter | KeyCode::Char('s') => {
                self.navigate(Route::TaskList);
            }
            KeyCode::Char('c') => {
                self.navigate(Route::Completed);
            }
            KeyCode::Char('m') => self.shell.welcome.toggle_menu(),
            _ => {}
        }
        false
    }

    fn handle_task_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.task_selected = step(self.task_selected, 1, self.shell.todo_list.visible().len());
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.task_selected = step(self.task_selected, -1, self.shell.todo_list.visible().len());
            }
            KeyCode::Char(' ') => match self.selected_task().map(|task| task.id.clone()) {
                Some(id) => self.shell.todo_list.toggle(&id),
                None => self.set_info("no task selected"),
            },
            KeyCode::Char('d') => match self.selected_task().map(|task| task.id.clone()) {
                Some(id) => self.shell.todo_list.remove(&id),
                None => self.set_info("no task selected"),
            },
            KeyCode::Char('/') => {
                self.info_message = None;
                self.mode = InputMode::Search;
            }
            KeyCode::Tab => {
                self.shell.todo_list.cycle_filter();
                self.task_selected = 0;
            }
            KeyCode::Char('n') => {
                self.info_message = None;
                self.mode = InputMode::Form(FormEditor::new());
            }
            KeyCode::Char('c') => self.navigate(Route::Completed),
            KeyCode::Esc => self.navigate(Route::Welcome),
            _ => {}
        }
    }

    fn handle_completed_key(&mut self, key: KeyEvent) {
        let len = self.shell.completed.tasks().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.completed_selected = step(self.completed_selected, 1, len);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.completed_selected = step(self.completed_selected, -1, len);
            }
            KeyCode::Char('d') => {
                let id = self
                    .shell
                    .completed
                    .tasks()
                    .get(self.completed_selected)
                    .map(|task| task.id.clone());
                match id {
                    Some(id) => self.shell.completed.remove(&id),
                    None => self.set_info("no task selected"),
                }
            }
            KeyCode::Esc => self.navigate(Route::TaskList),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let mut term = self.shell.todo_list.search().to_string();
        match key.code {
            KeyCode::Enter => return,
            KeyCode::Esc => {
                self.shell.todo_list.set_search("");
                self.task_selected = 0;
                return;
            }
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => term.clear(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => term.push(ch),
            _ => {}
        }
        self.shell.todo_list.set_search(term);
        self.task_selected = 0;
        self.mode = InputMode::Search;
    }

    fn handle_form_key(&mut self, mut editor: FormEditor, key: KeyEvent) {
        match editor.handle_key(&mut self.shell.todo_list.form, key) {
            FormAction::None => self.mode = InputMode::Form(editor),
            FormAction::Cancel => self.shell.todo_list.clear_error(),
            FormAction::Submit => {
                if !self.shell.todo_list.submit() {
                    self.mode = InputMode::Form(editor);
                }
            }
        }
    }

    fn navigate(&mut self, route: Route) {
        if self.shell.navigate(route) {
            self.info_message = None;
            self.task_selected = 0;
            self.completed_selected = 0;
        }
    }

    pub(crate) fn selected_task(&self) -> Option<&Task> {
        self.shell.todo_list.visible().get(self.task_selected)
    }

    pub(crate) fn clamp_selection(&mut self) {
        self.task_selected = clamp(self.task_selected, self.shell.todo_list.visible().len());
        self.completed_selected = clamp(self.completed_selected, self.shell.completed.tasks().len());
    }

    fn set_info(&mut self, message: &str) {
        self.info_message = Some(message.to_string());
    }

    /// Error of the mounted view wins over local info
    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        if let Some(error) = self.shell.error() {
            return Some((error.to_string(), StatusKind::Error));
        }
        self.info_message
            .as_ref()
            .map(|info| (info.clone(), StatusKind::Info))
    }

    pub(crate) fn footer_hint(&self) -> String {
        match &self.mode {
            InputMode::Form(_) => {
                "tab/enter next  left/right priority  ctrl-u clear  esc cancel".to_string()
            }
            InputMode::Search => "type to search  enter done  esc clear".to_string(),
            InputMode::Normal => match self.shell.route() {
                Route::Welcome => "enter/s tasks  c completed  m menu  q quit".to_string(),
                Route::TaskList => {
                    "j/k move  space toggle  d delete  / search  tab filter  n new  c completed  esc home"
                        .to_string()
                }
                Route::Completed => "j/k move  d delete  esc tasks".to_string(),
            },
        }
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

fn clamp(current: usize, len: usize) -> usize {
    current.min(len.saturating_sub(1))
}
