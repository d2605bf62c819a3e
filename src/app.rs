use crate::input::{handle_key, handle_search_key, Action, SearchEdit};
use crate::scheduler::{Phase, Scheduler};
use crate::ui::dashboard;
use crate::ui::theme::{Theme, ThemeVariant};
use crate::view_model::{Selection, ViewModel};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind, MouseEventKind};
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ── Tick intervals ────────────────────────────────────────────────────

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const VDEV_PAGE:    usize    = 5;

pub struct App {
    pub scheduler:        Scheduler,
    pub selection:        Selection,
    pub theme_variant:    ThemeVariant,
    pub theme:            Theme,
    pub show_help:        bool,
    pub show_diagnostics: bool,
    /// Search prompt open; keys edit `selection.search`.
    pub searching:        bool,
    pub should_quit:      bool,
}

impl App {
    pub fn new(scheduler: Scheduler, theme_variant: ThemeVariant) -> Self {
        let mut app = Self {
            scheduler,
            selection:        Selection::default(),
            theme_variant,
            theme:            Theme::for_variant(theme_variant),
            show_help:        false,
            show_diagnostics: false,
            searching:        false,
            should_quit:      false,
        };
        app.rerender();
        app
    }

    pub fn view(&self) -> &ViewModel { self.scheduler.view() }

    pub fn polling(&self) -> bool { self.scheduler.phase() != Phase::Idle }

    // ── Main event loop ───────────────────────────────────────────────

    pub fn run<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
    ) -> Result<()> {
        info!(interval = ?self.scheduler.interval(), "entering UI loop");
        loop {
            self.scheduler.tick(Instant::now());
            if self.scheduler.pump(&self.selection) {
                self.sync_selection();
            }

            terminal.draw(|f| dashboard::render(f, self))?;

            if event::poll(POLL_TIMEOUT)? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => self.on_key(key),
                    Event::Mouse(me) => match me.kind {
                        MouseEventKind::ScrollDown => self.handle_action(Action::SelectDown),
                        MouseEventKind::ScrollUp   => self.handle_action(Action::SelectUp),
                        _ => {}
                    },
                    _ => {}
                }
            }

            if self.should_quit { break; }
        }
        self.scheduler.shutdown();
        info!("UI loop finished");
        Ok(())
    }

    // ── Input dispatch ────────────────────────────────────────────────

    pub fn on_key(&mut self, key: KeyEvent) {
        if self.searching {
            self.handle_search(handle_search_key(key));
        } else {
            self.handle_action(handle_key(key));
        }
    }

    fn handle_search(&mut self, edit: SearchEdit) {
        match edit {
            SearchEdit::Push(c) => self.selection.search.push(c),
            SearchEdit::Pop     => { self.selection.search.pop(); }
            SearchEdit::Accept  => self.searching = false,
            SearchEdit::Cancel  => {
                self.searching = false;
                self.selection.search.clear();
            }
            SearchEdit::Quit    => {
                self.should_quit = true;
                return;
            }
            SearchEdit::None    => return,
        }
        self.selection.dataset = 0;
        self.rerender();
    }

    fn handle_action(&mut self, action: Action) {
        if self.show_help {
            match action {
                Action::Quit => self.should_quit = true,
                Action::ShowHelp | Action::Back => self.show_help = false,
                _ => {}
            }
            return;
        }

        let tabs = self.view().tabs.len();
        match action {
            Action::Quit => self.should_quit = true,

            Action::Refresh => {
                debug!("manual refresh");
                self.scheduler.request_refresh();
            }

            Action::NextPool if tabs > 0 => self.switch_tab((self.selection.tab + 1) % tabs),
            Action::PrevPool if tabs > 0 => self.switch_tab((self.selection.tab + tabs - 1) % tabs),

            Action::SelectUp   => self.move_dataset(|i| i.saturating_sub(1)),
            Action::SelectDown => self.move_dataset(|i| i.saturating_add(1)),
            Action::JumpTop    => self.move_dataset(|_| 0),
            Action::JumpBottom => self.move_dataset(|_| usize::MAX),

            Action::ScrollUp => {
                self.selection.vdev_scroll = self.selection.vdev_scroll.saturating_sub(VDEV_PAGE);
                self.rerender();
            }
            Action::ScrollDown => {
                self.selection.vdev_scroll = self.selection.vdev_scroll.saturating_add(VDEV_PAGE);
                self.rerender();
            }

            Action::StartSearch => self.searching = true,

            Action::ToggleDiagnostics => self.show_diagnostics = !self.show_diagnostics,

            Action::CycleTheme => {
                self.theme_variant = self.theme_variant.next();
                self.theme = Theme::for_variant(self.theme_variant);
            }

            Action::ShowHelp => self.show_help = true,

            Action::Back => {
                if self.show_diagnostics {
                    self.show_diagnostics = false;
                } else if !self.selection.search.is_empty() {
                    self.selection.search.clear();
                    self.rerender();
                }
            }

            _ => {}
        }
    }

    fn switch_tab(&mut self, tab: usize) {
        self.selection.tab = tab;
        self.selection.dataset = 0;
        self.selection.vdev_scroll = 0;
        self.rerender();
    }

    fn move_dataset(&mut self, f: impl Fn(usize) -> usize) {
        self.selection.dataset = f(self.selection.dataset);
        self.rerender();
    }

    fn rerender(&mut self) {
        self.scheduler.rerender(&self.selection);
        self.sync_selection();
    }

    /// Pull clamped values back from the view so cursors never run past the data.
    fn sync_selection(&mut self) {
        let view = self.scheduler.view();
        self.selection.tab = view.active;
        if let Some(tab) = view.active_tab() {
            self.selection.dataset     = tab.selected.unwrap_or(0);
            self.selection.vdev_scroll = tab.vdev_scroll;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::command::CancelToken;
    use crate::collectors::{fixtures, CollectError, Collection, Collector};
    use crate::filter::Filters;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::sync::Arc;

    struct Fixed;

    impl Collector for Fixed {
        fn collect(&self, _cancel: &CancelToken) -> Result<Collection, CollectError> {
            Ok(fixtures::collection())
        }
    }

    fn app() -> App {
        let mut s = Scheduler::new(Arc::new(Fixed), Filters::default(), Duration::from_secs(60), 10);
        s.seed(Ok(fixtures::collection()), &Selection::default());
        App::new(s, ThemeVariant::Default)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn tabs_wrap_around() {
        let mut a = app();
        assert!(a.view().tabs[0].aggregate);
        press(&mut a, KeyCode::BackTab);
        assert_eq!(a.selection.tab, 2);
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.selection.tab, 0);
    }

    #[test]
    fn dataset_cursor_is_clamped() {
        let mut a = app();
        press(&mut a, KeyCode::Tab);
        press(&mut a, KeyCode::Char('G'));
        assert_eq!(a.selection.dataset, 3);
        press(&mut a, KeyCode::Down);
        assert_eq!(a.selection.dataset, 3);
        press(&mut a, KeyCode::Char('g'));
        press(&mut a, KeyCode::Up);
        assert_eq!(a.selection.dataset, 0);
    }

    #[test]
    fn search_prompt_edits_and_clears() {
        let mut a = app();
        press(&mut a, KeyCode::Char('/'));
        assert!(a.searching);
        for c in "bob".chars() { press(&mut a, KeyCode::Char(c)); }
        press(&mut a, KeyCode::Enter);
        assert!(!a.searching);
        assert_eq!(a.view().tabs[0].datasets.len(), 3);

        press(&mut a, KeyCode::Char('q'));
        assert!(a.should_quit, "q quits once the prompt is closed");

        let mut a = app();
        press(&mut a, KeyCode::Char('/'));
        press(&mut a, KeyCode::Char('q'));
        assert!(!a.should_quit, "q is text inside the prompt");
        press(&mut a, KeyCode::Esc);
        assert!(a.selection.search.is_empty());
        assert_eq!(a.view().tabs[0].datasets.len(), 6);
    }

    #[test]
    fn help_swallows_other_keys() {
        let mut a = app();
        press(&mut a, KeyCode::Char('?'));
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.selection.tab, 0);
        press(&mut a, KeyCode::Esc);
        assert!(!a.show_help);
    }
}
