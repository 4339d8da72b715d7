use droidscope_types::StreamMode;

/// Default live ceiling when no configuration is present.
pub const DEFAULT_NORMAL_MAX: usize = 2000;

/// The preserving ceiling is this fixed multiple of the live ceiling.
const PAUSED_MULTIPLIER: usize = 8;

/// Capacity ceilings for the two buffer regimes.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    normal_max: usize,
    paused_max: usize,
}

impl Limits {
    pub fn new(normal_max: usize) -> Self {
        let normal_max = normal_max.max(1);
        Self {
            normal_max,
            paused_max: normal_max * PAUSED_MULTIPLIER,
        }
    }

    pub fn normal_max(&self) -> usize {
        self.normal_max
    }

    pub fn paused_max(&self) -> usize {
        self.paused_max
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_NORMAL_MAX)
    }
}

/// Verdict for the ingestion step that just appended an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendVerdict {
    /// Within the ceiling; nothing to do.
    Retain,
    /// Over the live ceiling; drop oldest entries down to the ceiling.
    TrimTo(usize),
    /// The preserving ceiling was reached; stop delivering output.
    Pause,
}

/// Command for the session after a consumer-flag change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Truncate to the most recent `truncate_to` entries, then restart the
    /// stream supervisor from scratch.
    Resume { truncate_to: usize },
}

/// The backpressure state machine.
///
/// Pure and synchronous: it returns verdicts and commands, and the session
/// owns the side effects. Mode is `Preserving` whenever the consumer is
/// scrolled away from the tail or a search is active; trimming never happens
/// in `Preserving` or `Paused`, so nothing the consumer is looking at can
/// shift underneath them.
#[derive(Debug)]
pub struct BackpressureController {
    limits: Limits,
    mode: StreamMode,
    following_tail: bool,
    search_active: bool,
}

impl BackpressureController {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            mode: StreamMode::Live,
            following_tail: true,
            search_active: false,
        }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    fn live_eligible(&self) -> bool {
        self.following_tail && !self.search_active
    }

    /// Record the post-append buffer length and decide what the session must
    /// do to restore the capacity invariant before the ingestion step ends.
    pub fn after_append(&mut self, len: usize) -> AppendVerdict {
        match self.mode {
            StreamMode::Live => {
                if len > self.limits.normal_max {
                    AppendVerdict::TrimTo(self.limits.normal_max)
                } else {
                    AppendVerdict::Retain
                }
            }
            StreamMode::Preserving => {
                if len >= self.limits.paused_max {
                    self.mode = StreamMode::Paused;
                    AppendVerdict::Pause
                } else {
                    AppendVerdict::Retain
                }
            }
            // No appends are expected while paused; a straggler must not
            // grow the buffer either.
            StreamMode::Paused => AppendVerdict::Pause,
        }
    }

    pub fn set_following_tail(&mut self, following: bool) -> Option<ControlCommand> {
        self.following_tail = following;
        self.apply_flags()
    }

    pub fn set_search_active(&mut self, active: bool) -> Option<ControlCommand> {
        self.search_active = active;
        self.apply_flags()
    }

    /// Re-derive the mode from the consumer flags. Leaving `Paused` is the
    /// only transition with a side effect to request.
    fn apply_flags(&mut self) -> Option<ControlCommand> {
        match (self.mode, self.live_eligible()) {
            (StreamMode::Paused, true) => {
                self.mode = StreamMode::Live;
                Some(ControlCommand::Resume {
                    truncate_to: self.limits.normal_max,
                })
            }
            (StreamMode::Paused, false) => None,
            (_, true) => {
                self.mode = StreamMode::Live;
                None
            }
            (_, false) => {
                self.mode = StreamMode::Preserving;
                None
            }
        }
    }

    /// `start()` pins the consumer to the tail with no active search.
    pub fn reset_for_start(&mut self) {
        self.following_tail = true;
        self.search_active = false;
        self.mode = StreamMode::Live;
    }
}

impl Default for BackpressureController {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(normal_max: usize) -> BackpressureController {
        BackpressureController::new(Limits::new(normal_max))
    }

    #[test]
    fn limits_derive_the_paused_ceiling() {
        let limits = Limits::new(100);
        assert_eq!(limits.normal_max(), 100);
        assert_eq!(limits.paused_max(), 800);
        // A zero bound is clamped rather than producing an unusable buffer
        assert_eq!(Limits::new(0).normal_max(), 1);
    }

    #[test]
    fn live_mode_trims_above_the_normal_ceiling() {
        let mut ctl = controller(3);
        assert_eq!(ctl.after_append(3), AppendVerdict::Retain);
        assert_eq!(ctl.after_append(4), AppendVerdict::TrimTo(3));
        assert_eq!(ctl.mode(), StreamMode::Live);
    }

    #[test]
    fn preserving_mode_never_trims() {
        let mut ctl = controller(3);
        ctl.set_following_tail(false);
        assert_eq!(ctl.mode(), StreamMode::Preserving);

        for len in 4..Limits::new(3).paused_max() {
            assert_eq!(ctl.after_append(len), AppendVerdict::Retain, "len {len}");
        }
    }

    #[test]
    fn preserving_pauses_the_instant_the_ceiling_is_reached() {
        let mut ctl = controller(2);
        ctl.set_search_active(true);
        let paused_max = ctl.limits().paused_max();

        assert_eq!(ctl.after_append(paused_max - 1), AppendVerdict::Retain);
        assert_eq!(ctl.after_append(paused_max), AppendVerdict::Pause);
        assert_eq!(ctl.mode(), StreamMode::Paused);

        // Stragglers while paused are refused too
        assert_eq!(ctl.after_append(paused_max), AppendVerdict::Pause);
    }

    #[test]
    fn either_flag_forces_preserving() {
        let mut ctl = controller(10);
        ctl.set_following_tail(false);
        assert_eq!(ctl.mode(), StreamMode::Preserving);

        ctl.set_following_tail(true);
        assert_eq!(ctl.mode(), StreamMode::Live);

        ctl.set_search_active(true);
        assert_eq!(ctl.mode(), StreamMode::Preserving);

        // Still searching: scrolling back to the tail is not enough
        ctl.set_following_tail(true);
        assert_eq!(ctl.mode(), StreamMode::Preserving);

        ctl.set_search_active(false);
        assert_eq!(ctl.mode(), StreamMode::Live);
    }

    #[test]
    fn live_preserving_flips_are_silent() {
        let mut ctl = controller(10);
        assert_eq!(ctl.set_following_tail(false), None);
        assert_eq!(ctl.set_following_tail(true), None);
        assert_eq!(ctl.set_search_active(true), None);
        assert_eq!(ctl.set_search_active(false), None);
    }

    #[test]
    fn leaving_paused_commands_truncate_and_restart() {
        let mut ctl = controller(5);
        ctl.set_following_tail(false);
        let paused_max = ctl.limits().paused_max();
        assert_eq!(ctl.after_append(paused_max), AppendVerdict::Pause);

        // Flipping one flag back is not enough while the other still holds
        ctl.set_search_active(false);
        assert_eq!(ctl.mode(), StreamMode::Paused);

        let command = ctl.set_following_tail(true);
        assert_eq!(command, Some(ControlCommand::Resume { truncate_to: 5 }));
        assert_eq!(ctl.mode(), StreamMode::Live);
    }

    #[test]
    fn reset_for_start_pins_live() {
        let mut ctl = controller(5);
        ctl.set_search_active(true);
        let paused_max = ctl.limits().paused_max();
        ctl.after_append(paused_max);
        assert_eq!(ctl.mode(), StreamMode::Paused);

        ctl.reset_for_start();
        assert_eq!(ctl.mode(), StreamMode::Live);
        assert_eq!(ctl.after_append(1), AppendVerdict::Retain);
    }
}
