//! Interactive session driving the lock state machines on a simulated clock.
//!
//! Commands feed button edges, door-sensor reports, and remote requests into
//! the same machines the firmware runs; `wait` advances virtual time in the
//! firmware's loop-period steps so deadline behavior matches the device.

use std::ops::{Add, Sub};
use std::time::Duration;

use lock_core::button::{
    ATTENTION_BUTTON, ButtonEdge, ButtonGesture, ButtonId, ButtonMonitor, FUNCTION_BUTTON,
    LOCK_BUTTON,
};
use lock_core::event::{LockAction, LockActor};
use lock_core::function::{FunctionEvent, FunctionMachine, FunctionState};
use lock_core::lock::{BoltLock, DoorState, LockEvent, LockObserver, LockState};

/// Loop period the firmware's application task runs at.
const STEP_MS: u64 = 10;

pub const HELP_TOPICS: &[&str] = &[
    "press <function|lock|attention>   - press and hold a button",
    "release <function|lock|attention> - release a held button",
    "tap <function|lock|attention>     - press and release in one step",
    "remote <lock|unlock>              - issue a remote method request",
    "door <open|closed|none>           - report a door-sensor state",
    "auto-relock <on|off>              - toggle the auto-relock policy",
    "door-check <on|off>               - toggle the door-sensor gate",
    "duration <secs>                   - set the auto-relock delay",
    "wait <ms>                         - advance the simulated clock",
    "status                            - show machine and timer state",
    "audit                             - replay the recorded trail",
    "help                              - show this text",
];

/// Simulated monotonic instant, in milliseconds since session start.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct SimInstant(u64);

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

/// Observer turning lock notifications into transcript lines.
#[derive(Default)]
struct Transcript {
    lines: Vec<String>,
    now_ms: u64,
}

impl Transcript {
    fn push(&mut self, text: &str) {
        self.lines.push(format!("[{:>6}ms] {text}", self.now_ms));
    }
}

impl LockObserver for Transcript {
    fn on_lock_event(&mut self, event: LockEvent) {
        let text = match event {
            LockEvent::ActionInitiated { action, actor } => {
                format!("{} initiated by {}", action_label(action), actor_label(actor))
            }
            LockEvent::ActionCompleted { action } => {
                format!("{} completed", action_label(action))
            }
            LockEvent::RelockArmed { seconds } => format!("auto-relock armed for {seconds}s"),
            LockEvent::RelockSuspended => "auto-relock suspended, door open".to_string(),
            LockEvent::RelockTriggered => "auto-relock triggered".to_string(),
        };
        self.push(&text);
    }
}

pub struct Session {
    lock: BoltLock<SimInstant>,
    buttons: ButtonMonitor<SimInstant>,
    function: FunctionMachine<SimInstant>,
    transcript: Transcript,
    now: SimInstant,
}

impl Session {
    pub fn new() -> Self {
        Self {
            lock: BoltLock::new(),
            buttons: ButtonMonitor::new(),
            function: FunctionMachine::new(),
            transcript: Transcript::default(),
            now: SimInstant(0),
        }
    }

    /// Executes one command line and returns the lines to print.
    ///
    /// Output is the transcript entries the command produced (state machine
    /// notifications included) followed by any direct response.
    pub fn handle_command(&mut self, line: &str) -> Vec<String> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Vec::new();
        };
        let arg = parts.next();

        let mark = self.transcript.lines.len();
        let response = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("help", _) => return HELP_TOPICS.iter().map(ToString::to_string).collect(),
            ("press", Some(name)) => self.button_edge(name, ButtonEdge::Press),
            ("release", Some(name)) => self.button_edge(name, ButtonEdge::Release),
            ("tap", Some(name)) => {
                let pressed = self.button_edge(name, ButtonEdge::Press);
                if pressed.is_none() {
                    self.button_edge(name, ButtonEdge::Release)
                } else {
                    pressed
                }
            }
            ("remote", Some(name)) => self.remote_request(name),
            ("door", Some(name)) => self.door_report(name),
            ("auto-relock", Some(flag)) => self.set_flag(flag, Setting::AutoRelock),
            ("door-check", Some(flag)) => self.set_flag(flag, Setting::DoorCheck),
            ("duration", Some(value)) => self.set_duration(value),
            ("wait", Some(value)) => self.wait(value),
            ("status", _) => return self.status(),
            ("audit", _) => return self.transcript.lines.clone(),
            _ => Some(format!("ERR unknown command `{line}`")),
        };

        let mut output: Vec<String> = self.transcript.lines[mark..].to_vec();
        output.extend(response);
        output
    }

    fn button_edge(&mut self, name: &str, edge: ButtonEdge) -> Option<String> {
        let Some(pin) = button_by_name(name) else {
            return Some(format!("ERR unknown button `{name}`"));
        };
        let Some(gesture) = self.buttons.handle_edge(pin, edge, self.now) else {
            return None;
        };
        self.apply_gesture(pin, gesture);
        None
    }

    fn apply_gesture(&mut self, pin: ButtonId, gesture: ButtonGesture) {
        if pin == FUNCTION_BUTTON {
            let outcome = match gesture {
                ButtonGesture::Press => self.function.handle_press(self.now),
                ButtonGesture::Release | ButtonGesture::LongPressRelease => {
                    self.function.handle_release(self.now)
                }
                ButtonGesture::LongPress => None,
            };
            if let Some(outcome) = outcome {
                self.apply_function_event(outcome);
            }
            return;
        }

        if pin == LOCK_BUTTON
            && matches!(
                gesture,
                ButtonGesture::Release | ButtonGesture::LongPressRelease
            )
        {
            if self.function.is_engaged() {
                self.transcript.push("lock button ignored, reset gesture active");
                return;
            }
            let action = if self.lock.is_unlocked() {
                LockAction::Lock
            } else {
                LockAction::Unlock
            };
            if !self.lock.initiate_action(
                LockActor::PhysicalButton,
                action,
                self.now,
                &mut self.transcript,
            ) {
                self.transcript.push("request rejected, actuation in progress");
            }
            return;
        }

        if pin == ATTENTION_BUTTON && gesture == ButtonGesture::Press {
            self.transcript.push("attention requested");
        }
    }

    fn apply_function_event(&mut self, event: FunctionEvent) {
        let text = match event {
            FunctionEvent::UpdateCheckRequested => "software update check requested",
            FunctionEvent::ResetArmed => "factory reset armed, release to cancel",
            FunctionEvent::ResetCancelled => "factory reset cancelled",
            FunctionEvent::FactoryReset => "FACTORY RESET",
        };
        self.transcript.push(text);
    }

    fn remote_request(&mut self, name: &str) -> Option<String> {
        let action = match name {
            "lock" => LockAction::Lock,
            "unlock" => LockAction::Unlock,
            _ => return Some(format!("ERR unknown action `{name}`")),
        };
        if !self
            .lock
            .initiate_action(LockActor::RemoteMethod, action, self.now, &mut self.transcript)
        {
            self.transcript.push("request rejected, actuation in progress");
        }
        None
    }

    fn door_report(&mut self, name: &str) -> Option<String> {
        let door = match name {
            "open" => Some(DoorState::Open),
            "closed" => Some(DoorState::Closed),
            "none" => None,
            _ => return Some(format!("ERR unknown door state `{name}`")),
        };
        self.lock.set_door_state(door, self.now, &mut self.transcript);
        None
    }

    fn set_flag(&mut self, flag: &str, setting: Setting) -> Option<String> {
        let enabled = match flag {
            "on" => true,
            "off" => false,
            _ => return Some(format!("ERR expected on|off, got `{flag}`")),
        };
        match setting {
            Setting::AutoRelock => self.lock.set_auto_relock_enabled(enabled),
            Setting::DoorCheck => self.lock.set_door_check_enabled(enabled),
        }
        // Policy changes take effect on the next evaluation, as on-device.
        self.lock.evaluate_auto_relock(self.now, &mut self.transcript);
        None
    }

    fn set_duration(&mut self, value: &str) -> Option<String> {
        match value.parse::<u32>() {
            Ok(seconds) => {
                self.lock.set_auto_lock_duration_secs(seconds);
                None
            }
            Err(_) => Some(format!("ERR expected seconds, got `{value}`")),
        }
    }

    fn wait(&mut self, value: &str) -> Option<String> {
        let Ok(millis) = value.parse::<u64>() else {
            return Some(format!("ERR expected milliseconds, got `{value}`"));
        };

        let target = self.now.0 + millis;
        while self.now.0 < target {
            let step = STEP_MS.min(target - self.now.0);
            self.now = SimInstant(self.now.0 + step);
            self.transcript.now_ms = self.now.0;

            for pin in self.buttons.poll(self.now) {
                self.apply_gesture(pin, ButtonGesture::LongPress);
            }
            if let Some(event) = self.function.poll(self.now) {
                self.apply_function_event(event);
            }
            self.lock.poll(self.now, &mut self.transcript);
        }
        None
    }

    fn status(&self) -> Vec<String> {
        let policy = self.lock.policy();
        vec![
            format!("time: {}ms", self.now.0),
            format!("lock: {}", state_label(self.lock.state())),
            format!(
                "auto-relock: {} ({}s, door-check {})",
                on_off(policy.enabled),
                policy.duration_secs,
                on_off(policy.door_check_enabled)
            ),
            format!("relock timer: {}", armed(self.lock.relock_timer_armed())),
            format!("door: {}", door_label(self.lock.door_state())),
            format!("function: {}", function_label(self.function.state())),
        ]
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

enum Setting {
    AutoRelock,
    DoorCheck,
}

fn button_by_name(name: &str) -> Option<ButtonId> {
    match name {
        "function" => Some(FUNCTION_BUTTON),
        "lock" => Some(LOCK_BUTTON),
        "attention" => Some(ATTENTION_BUTTON),
        _ => None,
    }
}

const fn action_label(action: LockAction) -> &'static str {
    match action {
        LockAction::Lock => "lock",
        LockAction::Unlock => "unlock",
    }
}

const fn actor_label(actor: LockActor) -> &'static str {
    match actor {
        LockActor::PhysicalButton => "button",
        LockActor::RemoteMethod => "remote",
        LockActor::LocalImplicit => "auto-relock",
    }
}

const fn state_label(state: LockState) -> &'static str {
    match state {
        LockState::LockingInitiated => "locking...",
        LockState::LockingCompleted => "locked",
        LockState::UnlockingInitiated => "unlocking...",
        LockState::UnlockingCompleted => "unlocked",
    }
}

const fn function_label(state: FunctionState) -> &'static str {
    match state {
        FunctionState::Idle => "idle",
        FunctionState::ArmedForUpdate => "held (release requests update check)",
        FunctionState::ArmedForReset => "RESET ARMED (release cancels)",
        FunctionState::FactoryReset => "factory reset fired",
    }
}

fn door_label(door: Option<DoorState>) -> &'static str {
    match door {
        Some(DoorState::Open) => "open",
        Some(DoorState::Closed) => "closed",
        None => "no sensor",
    }
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

const fn armed(value: bool) -> &'static str {
    if value { "armed" } else { "idle" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_contain(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn tap_unlocks_and_auto_relock_completes_the_cycle() {
        let mut session = Session::new();
        session.handle_command("door-check off");

        let output = session.handle_command("tap lock");
        assert!(lines_contain(&output, "unlock initiated by button"));

        let output = session.handle_command("wait 2000");
        assert!(lines_contain(&output, "unlock completed"));
        assert!(lines_contain(&output, "auto-relock armed for 10s"));

        let output = session.handle_command("wait 12000");
        assert!(lines_contain(&output, "auto-relock triggered"));
        assert!(lines_contain(&output, "lock completed"));
    }

    #[test]
    fn lock_button_acts_on_release_not_press() {
        let mut session = Session::new();

        let output = session.handle_command("press lock");
        assert!(!lines_contain(&output, "initiated"));

        let output = session.handle_command("release lock");
        assert!(lines_contain(&output, "unlock initiated by button"));
    }

    #[test]
    fn held_function_button_arms_and_release_cancels() {
        let mut session = Session::new();

        session.handle_command("press function");
        let output = session.handle_command("wait 5000");
        assert!(lines_contain(&output, "factory reset armed"));

        let output = session.handle_command("wait 3000");
        assert!(!lines_contain(&output, "FACTORY RESET"));

        let output = session.handle_command("release function");
        assert!(lines_contain(&output, "factory reset cancelled"));
    }

    #[test]
    fn open_door_defers_relock_until_closed() {
        let mut session = Session::new();
        session.handle_command("door open");
        session.handle_command("remote unlock");
        let output = session.handle_command("wait 30000");
        assert!(lines_contain(&output, "unlock completed"));
        assert!(!lines_contain(&output, "auto-relock triggered"));

        let output = session.handle_command("door closed");
        assert!(lines_contain(&output, "auto-relock armed"));
    }

    #[test]
    fn unknown_commands_report_errors() {
        let mut session = Session::new();
        let output = session.handle_command("frobnicate");
        assert!(lines_contain(&output, "ERR unknown command"));

        let output = session.handle_command("press nowhere");
        assert!(lines_contain(&output, "ERR unknown button"));
    }

    #[test]
    fn status_reflects_machine_state() {
        let mut session = Session::new();
        let output = session.handle_command("status");
        assert!(lines_contain(&output, "lock: locked"));
        assert!(lines_contain(&output, "function: idle"));

        session.handle_command("remote unlock");
        let output = session.handle_command("status");
        assert!(lines_contain(&output, "lock: unlocking..."));
    }
}
