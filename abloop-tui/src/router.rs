use anyhow::Result;
use abloop_core::{EngineHandle, TrackGeometry};
use ratatui::{Frame, crossterm::event::MouseEvent, layout::Rect};

use crate::{
    keymap::Key,
    routes::{log::LogRoute, playback::PlaybackRoute},
    state::{ActiveTab, AppState},
};

/// Trait that all routes must implement
pub trait RouteHandler: std::fmt::Debug {
    /// Render this route's UI
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState);

    /// Handle a key the global bindings did not claim
    fn handle_input(
        &mut self,
        key: Key,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> Result<RouteAction>;

    fn handle_mouse(
        &mut self,
        _event: MouseEvent,
        _state: &mut AppState,
        _handle: &EngineHandle,
    ) -> Result<()> {
        Ok(())
    }

    /// Called before the router replaces this route
    fn on_leave(&mut self, _state: &mut AppState, _handle: &EngineHandle) -> Result<()> {
        Ok(())
    }

    /// On-screen extent of this route's progress control, if it has one
    fn track_geometry(&self) -> Option<TrackGeometry> {
        None
    }

    fn tab(&self) -> ActiveTab;

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![("Tab", "Switch Tab"), ("Q", "Quit")]
    }
}

/// Actions that can be returned from route handlers
#[derive(Debug)]
pub enum RouteAction {
    /// Do nothing, stay on current route
    None,
    /// Switch to another tab
    Switch(ActiveTab),
}

/// Holds the route of the active tab
pub struct Router {
    current: Box<dyn RouteHandler>,
}

impl Router {
    pub fn new(tab: ActiveTab) -> Self {
        Self {
            current: route_for_tab(tab),
        }
    }

    pub fn current(&self) -> &dyn RouteHandler {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> &mut Box<dyn RouteHandler> {
        &mut self.current
    }

    pub fn execute_action(
        &mut self,
        action: RouteAction,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> Result<()> {
        match action {
            RouteAction::None => Ok(()),
            RouteAction::Switch(tab) => self.switch_to(tab, state, handle),
        }
    }

    /// Replace the current route (tab switching)
    pub fn switch_to(
        &mut self,
        tab: ActiveTab,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> Result<()> {
        if self.current.tab() != tab {
            self.current.on_leave(state, handle)?;
            self.current = route_for_tab(tab);
        }
        state.active_tab = tab;
        Ok(())
    }

    pub fn handle_mouse(
        &mut self,
        event: MouseEvent,
        state: &mut AppState,
        handle: &EngineHandle,
    ) -> Result<()> {
        self.current.handle_mouse(event, state, handle)
    }
}

/// Get a route handler for a tab
pub fn route_for_tab(tab: ActiveTab) -> Box<dyn RouteHandler> {
    match tab {
        ActiveTab::Playback => Box::new(PlaybackRoute::default()),
        ActiveTab::Log => Box::new(LogRoute::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abloop_core::{EngineCommand, PlayerConfig, ScrubGesture};
    use crossbeam_channel::{Receiver, unbounded};

    fn handle() -> (EngineHandle, Receiver<EngineCommand>) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (_resp_tx, resp_rx) = unbounded();
        (EngineHandle { cmd_tx, resp_rx }, cmd_rx)
    }

    #[test]
    fn leaving_playback_mid_drag_ends_the_scrub() {
        let (handle, commands) = handle();
        let mut state = AppState::new(PlayerConfig::default());
        let mut router = Router::new(ActiveTab::Playback);
        state.scrubbing = true;

        router.switch_to(ActiveTab::Log, &mut state, &handle).unwrap();

        assert!(!state.scrubbing);
        assert_eq!(state.active_tab, ActiveTab::Log);
        assert_eq!(router.current().tab(), ActiveTab::Log);
        assert_eq!(
            commands.try_iter().collect::<Vec<_>>(),
            vec![EngineCommand::Scrub(ScrubGesture::End)]
        );
    }

    #[test]
    fn switching_without_a_drag_sends_nothing() {
        let (handle, commands) = handle();
        let mut state = AppState::new(PlayerConfig::default());
        let mut router = Router::new(ActiveTab::Playback);

        router
            .execute_action(RouteAction::Switch(ActiveTab::Log), &mut state, &handle)
            .unwrap();
        router
            .execute_action(RouteAction::Switch(ActiveTab::Log), &mut state, &handle)
            .unwrap();

        assert_eq!(router.current().tab(), ActiveTab::Log);
        assert!(commands.try_recv().is_err());
    }
}
