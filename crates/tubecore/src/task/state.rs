//! Poller state machine.
//!
//! `Machine::step` is a pure function from (state, event) to
//! (next state, effects). The async driver in `poller.rs` feeds it events
//! and performs the effects; nothing here touches a timer or the network.
//!
//! Every armed session gets a fresh generation. Responses are tagged with
//! the generation of the loop that issued them, and only a response whose
//! generation matches the current `Polling` session is applied.

use crate::api::types::{DownloadTask, ProgressSnapshot, TaskId, TaskStatus};

/// Lifecycle of the single tracked task.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PollerState {
    #[default]
    Idle,
    Polling { task: DownloadTask, generation: u64 },
    Completed { task: DownloadTask },
    Errored { task: DownloadTask, message: String },
}

impl PollerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollerState::Completed { .. } | PollerState::Errored { .. })
    }

    pub fn is_polling(&self) -> bool {
        matches!(self, PollerState::Polling { .. })
    }

    /// Task this state refers to, if any.
    pub fn task(&self) -> Option<&DownloadTask> {
        match self {
            PollerState::Idle => None,
            PollerState::Polling { task, .. } | PollerState::Completed { task } | PollerState::Errored { task, .. } => {
                Some(task)
            }
        }
    }

    /// Generation of the live session, if polling.
    pub fn generation(&self) -> Option<u64> {
        match self {
            PollerState::Polling { generation, .. } => Some(*generation),
            _ => None,
        }
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Start tracking a freshly submitted task
    Arm(DownloadTask),
    /// Stop tracking, from any state
    Disarm,
    /// A progress query answered
    Response { generation: u64, snapshot: ProgressSnapshot },
    /// A progress query failed in transport or decoding
    PollFailed { generation: u64, error: String },
}

/// Work the driver performs after a step, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Schedule a loop whose first tick fires one interval from now
    StartLoop { task_id: TaskId, generation: u64 },
    /// Stop scheduling ticks for this generation
    CancelLoop { generation: u64 },
    /// Hand the snapshot to the presenter
    Emit(ProgressSnapshot),
    /// Re-enable the submit control
    ReleaseSubmission,
    /// Drop the cached lookup result
    ClearVideoInfo,
    /// Reload the artifact listing
    RefreshRegistry,
    /// A failed tick; logged, nothing else
    SkipTick { generation: u64, error: String },
    /// A response from a session that is no longer current
    DiscardStale { generation: u64 },
}

/// Current state plus the last generation handed out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Machine {
    state: PollerState,
    generation: u64,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// Last generation issued; 0 before the first arm.
    pub fn last_generation(&self) -> u64 {
        self.generation
    }

    pub fn step(&self, event: PollEvent) -> (Machine, Vec<Effect>) {
        let mut effects = Vec::new();

        let next_state = match event {
            PollEvent::Arm(task) => {
                if let PollerState::Polling { generation, .. } = &self.state {
                    effects.push(Effect::CancelLoop {
                        generation: *generation,
                    });
                }
                let generation = self.generation + 1;
                effects.push(Effect::StartLoop {
                    task_id: task.id.clone(),
                    generation,
                });
                return (
                    Machine {
                        state: PollerState::Polling { task, generation },
                        generation,
                    },
                    effects,
                );
            }

            PollEvent::Disarm => {
                if let PollerState::Polling { generation, .. } = &self.state {
                    effects.push(Effect::CancelLoop {
                        generation: *generation,
                    });
                    effects.push(Effect::ReleaseSubmission);
                }
                PollerState::Idle
            }

            PollEvent::Response { generation, snapshot } => match self.current(generation) {
                None => {
                    effects.push(Effect::DiscardStale { generation });
                    self.state.clone()
                }
                Some(task) => {
                    let status = snapshot.status;
                    let message = snapshot.error.clone();
                    effects.push(Effect::Emit(snapshot));

                    let next = match status {
                        TaskStatus::Completed => PollerState::Completed { task: task.clone() },
                        TaskStatus::Error => PollerState::Errored {
                            task: task.clone(),
                            message: message.unwrap_or_default(),
                        },
                        TaskStatus::Starting | TaskStatus::Downloading | TaskStatus::Processing => {
                            return (self.clone(), effects);
                        }
                    };
                    effects.extend([
                        Effect::CancelLoop { generation },
                        Effect::ReleaseSubmission,
                        Effect::ClearVideoInfo,
                        Effect::RefreshRegistry,
                    ]);
                    next
                }
            },

            PollEvent::PollFailed { generation, error } => {
                if self.current(generation).is_some() {
                    effects.push(Effect::SkipTick { generation, error });
                } else {
                    effects.push(Effect::DiscardStale { generation });
                }
                return (self.clone(), effects);
            }
        };

        (
            Machine {
                state: next_state,
                generation: self.generation,
            },
            effects,
        )
    }

    /// The polled task, if `generation` is the live session.
    fn current(&self, generation: u64) -> Option<&DownloadTask> {
        match &self.state {
            PollerState::Polling { task, generation: live } if *live == generation => Some(task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::FormatSelector;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn task(id: &str) -> DownloadTask {
        DownloadTask {
            id: TaskId::new(id),
            url: "https://x/1".into(),
            format: FormatSelector::Best,
            audio_only: false,
        }
    }

    fn snapshot(status: &str, progress: f64) -> ProgressSnapshot {
        serde_json::from_value(json!({"status": status, "progress": progress})).unwrap()
    }

    fn armed(id: &str) -> Machine {
        Machine::new().step(PollEvent::Arm(task(id))).0
    }

    #[test]
    fn test_arm_from_idle() {
        let (machine, effects) = Machine::new().step(PollEvent::Arm(task("t1")));
        assert_eq!(machine.state().generation(), Some(1));
        assert_eq!(
            effects,
            vec![Effect::StartLoop {
                task_id: TaskId::new("t1"),
                generation: 1
            }]
        );
    }

    #[test]
    fn test_rearm_cancels_previous_loop_first() {
        let (machine, effects) = armed("t1").step(PollEvent::Arm(task("t2")));
        assert_eq!(
            effects,
            vec![
                Effect::CancelLoop { generation: 1 },
                Effect::StartLoop {
                    task_id: TaskId::new("t2"),
                    generation: 2
                },
            ]
        );
        assert_eq!(machine.state().task().map(|t| t.id.as_str()), Some("t2"));
    }

    #[test]
    fn test_non_terminal_response_stays_polling() {
        let machine = armed("t1");
        let snap = snapshot("downloading", 42.5);
        let (next, effects) = machine.step(PollEvent::Response {
            generation: 1,
            snapshot: snap.clone(),
        });
        assert_eq!(next, machine);
        assert_eq!(effects, vec![Effect::Emit(snap)]);
    }

    #[test]
    fn test_completed_response_is_terminal() {
        let snap = snapshot("completed", 100.0);
        let (next, effects) = armed("t1").step(PollEvent::Response {
            generation: 1,
            snapshot: snap.clone(),
        });
        assert_eq!(next.state(), &PollerState::Completed { task: task("t1") });
        assert_eq!(
            effects,
            vec![
                Effect::Emit(snap),
                Effect::CancelLoop { generation: 1 },
                Effect::ReleaseSubmission,
                Effect::ClearVideoInfo,
                Effect::RefreshRegistry,
            ]
        );
    }

    #[test]
    fn test_error_response_carries_message() {
        let snap: ProgressSnapshot =
            serde_json::from_value(json!({"status": "error", "error": "Unsupported URL"})).unwrap();
        let (next, effects) = armed("t1").step(PollEvent::Response {
            generation: 1,
            snapshot: snap,
        });
        assert_eq!(
            next.state(),
            &PollerState::Errored {
                task: task("t1"),
                message: "Unsupported URL".into()
            }
        );
        assert_eq!(effects.iter().filter(|e| **e == Effect::RefreshRegistry).count(), 1);
    }

    #[test]
    fn test_failed_tick_changes_nothing() {
        let machine = armed("t1");
        let (next, effects) = machine.step(PollEvent::PollFailed {
            generation: 1,
            error: "connection refused".into(),
        });
        assert_eq!(next, machine);
        assert_eq!(
            effects,
            vec![Effect::SkipTick {
                generation: 1,
                error: "connection refused".into()
            }]
        );
    }

    #[test]
    fn test_stale_response_discarded_after_rearm() {
        let machine = armed("t1").step(PollEvent::Arm(task("t2"))).0;
        let (next, effects) = machine.step(PollEvent::Response {
            generation: 1,
            snapshot: snapshot("completed", 100.0),
        });
        assert_eq!(next, machine);
        assert_eq!(effects, vec![Effect::DiscardStale { generation: 1 }]);
    }

    #[test]
    fn test_response_after_disarm_discarded() {
        let machine = armed("t1").step(PollEvent::Disarm).0;
        let (next, effects) = machine.step(PollEvent::Response {
            generation: 1,
            snapshot: snapshot("downloading", 10.0),
        });
        assert_eq!(next.state(), &PollerState::Idle);
        assert_eq!(effects, vec![Effect::DiscardStale { generation: 1 }]);
    }

    #[test]
    fn test_disarm_is_idempotent() {
        let (once, effects) = armed("t1").step(PollEvent::Disarm);
        assert_eq!(
            effects,
            vec![Effect::CancelLoop { generation: 1 }, Effect::ReleaseSubmission]
        );
        let (twice, effects) = once.step(PollEvent::Disarm);
        assert_eq!(twice, once);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_arm_after_terminal_uses_new_generation() {
        let done = armed("t1")
            .step(PollEvent::Response {
                generation: 1,
                snapshot: snapshot("completed", 100.0),
            })
            .0;
        let (next, effects) = done.step(PollEvent::Arm(task("t2")));
        assert_eq!(next.state().generation(), Some(2));
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_at_most_one_live_loop() {
        // Replay an arbitrary event sequence and count loops that were
        // started but not yet cancelled.
        let events = vec![
            PollEvent::Arm(task("a")),
            PollEvent::Arm(task("b")),
            PollEvent::Response {
                generation: 1,
                snapshot: snapshot("completed", 100.0),
            },
            PollEvent::PollFailed {
                generation: 2,
                error: "timeout".into(),
            },
            PollEvent::Disarm,
            PollEvent::Disarm,
            PollEvent::Arm(task("c")),
            PollEvent::Response {
                generation: 3,
                snapshot: snapshot("error", 3.0),
            },
            PollEvent::Arm(task("d")),
            PollEvent::Arm(task("e")),
        ];

        let mut machine = Machine::new();
        let mut live: Vec<u64> = Vec::new();
        for event in events {
            let (next, effects) = machine.step(event);
            for effect in effects {
                match effect {
                    Effect::StartLoop { generation, .. } => live.push(generation),
                    Effect::CancelLoop { generation } => live.retain(|g| *g != generation),
                    _ => {}
                }
            }
            assert!(live.len() <= 1, "live loops: {:?}", live);
            assert_eq!(live.first().copied(), next.state().generation());
            machine = next;
        }
        assert_eq!(machine.last_generation(), 5);
    }
}
