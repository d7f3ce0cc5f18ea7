//! # Scroll-Follow State Machine
//!
//! Decides whether the conversation view should chase newly streamed
//! content, and tells scrolls the controller issued apart from scrolls the
//! user made (both arrive through the same "offset changed" signal).
//!
//! ```text
//!                 MessageSent / JumpToLatest / ConversationReset
//!            ┌──────────────────────────────────────────────────┐
//!            ▼                                                  │
//!      ┌───────────┐  user scroll away / wheel up / NavigateTo ┌┴─────────┐
//!      │ Following │ ─────────────────────────────────────────▶│ Detached │
//!      └───────────┘ ◀───────────────────────────────────────── └──────────┘
//!                          user scroll back to bottom
//! ```
//!
//! Transitions are pure: [`FollowState::apply`] takes the current state, an
//! event and a clock reading, and returns the next state plus at most one
//! [`ScrollCommand`] for the view to execute. Geometry is in abstract units
//! (pixels for a browser, virtual pixels for the terminal adapter).

use std::time::{Duration, Instant};

/// Bottom tolerance on platforms with inertial trackpad scrolling.
pub const MAC_BOTTOM_EPSILON: u32 = 4;
/// Bottom tolerance everywhere else.
pub const DEFAULT_BOTTOM_EPSILON: u32 = 6;
/// How long an observed scroll is attributed to the controller after it
/// issued one.
pub const DEFAULT_SUPPRESS_WINDOW: Duration = Duration::from_millis(150);
/// Delays of the forced scroll-to-bottom attempts. Virtualized lists settle
/// their heights asynchronously, so one attempt is not enough.
pub const DEFAULT_FORCE_RETRY_MS: [u64; 5] = [0, 50, 150, 300, 600];

/// Bottom tolerance for the platform this binary was built for.
pub fn platform_bottom_epsilon() -> u32 {
    if cfg!(target_os = "macos") {
        MAC_BOTTOM_EPSILON
    } else {
        DEFAULT_BOTTOM_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollConfig {
    pub bottom_epsilon: u32,
    pub suppress_window: Duration,
    pub force_retry_delays: Vec<Duration>,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            bottom_epsilon: platform_bottom_epsilon(),
            suppress_window: DEFAULT_SUPPRESS_WINDOW,
            force_retry_delays: DEFAULT_FORCE_RETRY_MS
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
        }
    }
}

/// Scroll geometry as last measured by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Distance from the top of the content to the top of the viewport.
    pub offset: u32,
    pub content_height: u32,
    pub viewport_height: u32,
}

impl Viewport {
    pub fn new(offset: u32, content_height: u32, viewport_height: u32) -> Self {
        Self {
            offset,
            content_height,
            viewport_height,
        }
    }

    pub fn max_offset(&self) -> u32 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    pub fn distance_to_bottom(&self) -> u32 {
        self.max_offset().saturating_sub(self.offset)
    }

    pub fn is_scrollable(&self) -> bool {
        self.content_height > self.viewport_height
    }

    pub fn is_near_bottom(&self, epsilon: u32) -> bool {
        self.distance_to_bottom() <= epsilon
    }
}

/// A scroll the view must perform on the controller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    /// Put the newest content at the bottom of the viewport.
    ToBottom,
    /// Put the turn at this list position at the top of the viewport.
    TurnToTop(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    Following,
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowEvent {
    /// The user sent a new message.
    MessageSent,
    /// The user asked to jump to the newest content.
    JumpToLatest,
    /// A different conversation was loaded.
    ConversationReset,
    /// The reply finished generating.
    GenerationDone,
    /// A scheduled forced-scroll attempt fired.
    RetryForceScroll,
    /// Streamed content changed the measured geometry.
    ContentChanged(Viewport),
    /// The viewport offset changed (or a command was just executed).
    Observed(Viewport),
    /// Wheel or key scroll input. Negative `delta` is up.
    Wheel { delta: i32, viewport: Viewport },
    PointerDown,
    PointerUp(Viewport),
    /// Jump to the turn at this list position (question navigation).
    NavigateTo(usize),
}

/// Result of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: FollowState,
    pub command: Option<ScrollCommand>,
    /// The command should be retried on the forced-scroll schedule.
    pub retry: bool,
}

impl Transition {
    fn stay(state: FollowState) -> Self {
        Self {
            state,
            command: None,
            retry: false,
        }
    }

    fn scroll(state: FollowState, command: ScrollCommand) -> Self {
        Self {
            state,
            command: Some(command),
            retry: false,
        }
    }

    fn force(state: FollowState) -> Self {
        Self {
            state,
            command: Some(ScrollCommand::ToBottom),
            retry: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowState {
    pub at_bottom: bool,
    pub user_interacting: bool,
    pub auto_follow_disabled: bool,
    pub follow_on_generate: bool,
    /// Observed scrolls before this instant are attributed to the controller.
    pub suppress_until: Option<Instant>,
    /// The controller issued a scroll whose observation is still pending.
    pub by_programmatic: bool,
}

impl Default for FollowState {
    fn default() -> Self {
        Self {
            at_bottom: true,
            user_interacting: false,
            auto_follow_disabled: false,
            follow_on_generate: true,
            suppress_until: None,
            by_programmatic: false,
        }
    }
}

impl FollowState {
    pub fn mode(&self) -> FollowMode {
        if self.is_following() {
            FollowMode::Following
        } else {
            FollowMode::Detached
        }
    }

    pub fn is_following(&self) -> bool {
        !self.auto_follow_disabled && self.follow_on_generate
    }

    pub fn in_suppression(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }

    /// Whether the "jump to latest" affordance should be offered.
    pub fn shows_jump_affordance(&self) -> bool {
        !self.at_bottom
    }

    fn mark_programmatic(&mut self, now: Instant, config: &ScrollConfig) {
        self.by_programmatic = true;
        self.suppress_until = Some(now + config.suppress_window);
    }

    fn detach(&mut self) {
        self.auto_follow_disabled = true;
        self.follow_on_generate = false;
    }

    fn reattach(&mut self) {
        self.auto_follow_disabled = false;
        self.follow_on_generate = true;
    }

    /// Incremental follow on new content: no-op within the bottom epsilon,
    /// otherwise a programmatic scroll with a suppression window.
    pub fn scroll_to_bottom_if_needed(
        self,
        viewport: Viewport,
        now: Instant,
        config: &ScrollConfig,
    ) -> Transition {
        let mut next = self;
        let near = viewport.is_near_bottom(config.bottom_epsilon);

        if !next.is_following() || next.user_interacting {
            next.at_bottom = near;
            return Transition::stay(next);
        }
        if near {
            next.at_bottom = true;
            return Transition::stay(next);
        }
        next.mark_programmatic(now, config);
        next.at_bottom = true;
        Transition::scroll(next, ScrollCommand::ToBottom)
    }

    pub fn apply(self, event: FollowEvent, now: Instant, config: &ScrollConfig) -> Transition {
        let epsilon = config.bottom_epsilon;
        let mut next = self;

        match event {
            FollowEvent::MessageSent
            | FollowEvent::JumpToLatest
            | FollowEvent::ConversationReset => {
                next = FollowState::default();
                next.mark_programmatic(now, config);
                Transition::force(next)
            }
            FollowEvent::GenerationDone => Transition::stay(next),
            FollowEvent::RetryForceScroll => {
                if !next.is_following() {
                    return Transition::stay(next);
                }
                next.mark_programmatic(now, config);
                next.at_bottom = true;
                Transition::scroll(next, ScrollCommand::ToBottom)
            }
            FollowEvent::ContentChanged(viewport) => {
                next.scroll_to_bottom_if_needed(viewport, now, config)
            }
            FollowEvent::Observed(viewport) => {
                let programmatic = std::mem::take(&mut next.by_programmatic);
                if programmatic || next.in_suppression(now) {
                    return Transition::stay(next);
                }
                next.at_bottom = viewport.is_near_bottom(epsilon);
                if !next.at_bottom {
                    next.detach();
                } else if !next.user_interacting {
                    next.reattach();
                }
                Transition::stay(next)
            }
            FollowEvent::Wheel { delta, viewport } => {
                if delta > 0 && viewport.is_near_bottom(epsilon) {
                    return Transition::stay(next);
                }
                if delta < 0 && viewport.is_scrollable() {
                    // Explicit upward input ends any programmatic window.
                    next.suppress_until = None;
                    next.by_programmatic = false;
                    next.at_bottom = false;
                    next.detach();
                }
                Transition::stay(next)
            }
            FollowEvent::PointerDown => {
                next.user_interacting = true;
                Transition::stay(next)
            }
            FollowEvent::PointerUp(viewport) => {
                next.user_interacting = false;
                if next.in_suppression(now) {
                    return Transition::stay(next);
                }
                next.at_bottom = viewport.is_near_bottom(epsilon);
                if !next.at_bottom {
                    next.detach();
                }
                Transition::stay(next)
            }
            FollowEvent::NavigateTo(position) => {
                next.detach();
                next.at_bottom = false;
                next.mark_programmatic(now, config);
                Transition::scroll(next, ScrollCommand::TurnToTop(position))
            }
        }
    }
}
